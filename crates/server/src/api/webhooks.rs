//! Inbound channel webhooks.
//!
//! Each channel posts its own payload shape; the matching adapter
//! normalizes it and the reconciler decides between opening a ticket and
//! appending to an existing one.

use axum::{extract::State, http::StatusCode, Json};
use helpdesk_core::{
    CallAdapter, CallPayload, ChannelAdapter, EmailAdapter, EmailPayload, WebhookOutcome,
    WebhookResult, WhatsAppAdapter, WhatsAppPayload,
};
use std::sync::Arc;

use super::error::ApiError;
use crate::metrics::{TICKETS_CREATED_TOTAL, WEBHOOK_EVENTS_TOTAL};
use crate::state::AppState;

fn ingest<A: ChannelAdapter>(
    state: &AppState,
    adapter: &A,
    payload: A::Payload,
) -> Result<(StatusCode, Json<WebhookResult>), ApiError> {
    let channel = adapter.channel();
    let result = match state.webhooks().ingest(adapter, payload) {
        Ok(result) => result,
        Err(e) => {
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&[channel.as_str(), "rejected"])
                .inc();
            tracing::warn!(channel = channel.as_str(), error = %e, "Webhook event rejected");
            return Err(e.into());
        }
    };

    WEBHOOK_EVENTS_TOTAL
        .with_label_values(&[channel.as_str(), result.outcome.as_str()])
        .inc();

    let status = match result.outcome {
        WebhookOutcome::Created => {
            TICKETS_CREATED_TOTAL
                .with_label_values(&[channel.as_str()])
                .inc();
            StatusCode::CREATED
        }
        WebhookOutcome::Appended => StatusCode::OK,
    };
    Ok((status, Json(result)))
}

pub async fn email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailPayload>,
) -> Result<(StatusCode, Json<WebhookResult>), ApiError> {
    ingest(&state, &EmailAdapter, payload)
}

pub async fn whatsapp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WhatsAppPayload>,
) -> Result<(StatusCode, Json<WebhookResult>), ApiError> {
    ingest(&state, &WhatsAppAdapter, payload)
}

pub async fn call(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CallPayload>,
) -> Result<(StatusCode, Json<WebhookResult>), ApiError> {
    ingest(&state, &CallAdapter, payload)
}
