use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use helpdesk_core::audit::DEFAULT_AUDIT_LIMIT;
use helpdesk_core::{AuditFilter, AuditRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub ticket_id: Option<String>,
    /// e.g. `ticket_created`, `webhook_received`
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    /// Inbound channel of webhook events
    pub channel: Option<String>,
    pub tag: Option<String>,
    /// ISO 8601 lower bound
    pub from: Option<DateTime<Utc>>,
    /// ISO 8601 upper bound
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditQueryParams {
    fn into_filter(self) -> AuditFilter {
        let mut filter = AuditFilter::new();
        if let Some(ticket_id) = self.ticket_id {
            filter = filter.with_ticket_id(ticket_id);
        }
        if let Some(event_type) = self.event_type {
            filter = filter.with_event_type(event_type);
        }
        if let Some(user_id) = self.user_id {
            filter = filter.with_user_id(user_id);
        }
        if let Some(channel) = self.channel {
            filter = filter.with_channel(channel);
        }
        if let Some(tag) = self.tag {
            filter = filter.with_tag(tag);
        }

        filter.with_time_range(self.from, self.to).with_page(
            self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT),
            self.offset.unwrap_or(0),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub events: Vec<AuditRecord>,
    /// Matching events across all pages
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query audit events, newest first
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, ApiError> {
    let filter = params.into_filter();

    let events = state.audit_store().query(&filter)?;
    let total = state.audit_store().count(&filter)?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}
