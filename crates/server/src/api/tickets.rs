//! Ticket API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use helpdesk_core::{
    Comment, CommentDraft, SortOrder, Ticket, TicketDraft, TicketFilter, TicketPage, TicketPatch,
    TicketPriority, TicketSource, TicketStatus, TicketView,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use super::error::ApiError;
use crate::metrics::TICKETS_CREATED_TOTAL;
use crate::state::AppState;

/// Default limit for ticket queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for listing tickets
#[derive(Debug, Default, Deserialize)]
pub struct ListTicketsParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub source: Option<String>,
    /// Filter by assignee user id
    pub assigned_to: Option<String>,
    /// Case-insensitive substring over number, title, description and customer name
    pub search: Option<String>,
    /// `asc` or `desc` (default) by creation time
    pub order: Option<String>,
    /// Maximum number of tickets to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset
    pub offset: Option<i64>,
}

impl ListTicketsParams {
    fn into_filter(self) -> Result<TicketFilter, ApiError> {
        let mut filter = TicketFilter::new()
            .with_limit(self.limit.unwrap_or(DEFAULT_LIMIT))
            .with_offset(self.offset.unwrap_or(0));

        if let Some(status) = non_empty(self.status) {
            filter = filter.with_status(parse_param::<TicketStatus>(&status)?);
        }
        if let Some(priority) = non_empty(self.priority) {
            filter = filter.with_priority(parse_param::<TicketPriority>(&priority)?);
        }
        if let Some(source) = non_empty(self.source) {
            filter = filter.with_source(parse_param::<TicketSource>(&source)?);
        }
        if let Some(user_id) = non_empty(self.assigned_to) {
            filter = filter.with_assigned_to(user_id);
        }
        if let Some(term) = non_empty(self.search) {
            filter = filter.with_search(term);
        }
        match non_empty(self.order).as_deref() {
            None | Some("desc") => {}
            Some("asc") => filter = filter.with_order(SortOrder::Asc),
            Some(other) => {
                return Err(ApiError::bad_request(format!(
                    "Invalid order '{}': expected asc or desc",
                    other
                )))
            }
        }

        Ok(filter)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_param<T>(value: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ApiError::bad_request(format!("Invalid filter: {}", e)))
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<TicketDraft>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let ticket = state.tickets().create(draft)?;
    TICKETS_CREATED_TOTAL
        .with_label_values(&[ticket.source.as_str()])
        .inc();
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Get a ticket with its assignee and comment thread
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TicketView>, ApiError> {
    Ok(Json(state.tickets().get(&id)?))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<TicketPage>, ApiError> {
    let filter = params.into_filter()?;
    Ok(Json(state.tickets().list(filter)?))
}

/// Apply a partial update. Only supplied fields change.
pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<TicketPatch>,
) -> Result<Json<Ticket>, ApiError> {
    let update = state.tickets().update(&id, patch)?;
    Ok(Json(update.ticket))
}

/// Soft-delete a ticket
pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tickets().delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<CommentDraft>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state.tickets().add_comment(&id, draft)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn tag_ticket(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.tickets().tag(&id, &name)?))
}

pub async fn untag_ticket(
    State(state): State<Arc<AppState>>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.tickets().untag(&id, &name)?))
}
