use axum::{extract::State, Json};
use helpdesk_core::TicketStats;
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

/// Aggregate counts over live tickets.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<TicketStats>, ApiError> {
    Ok(Json(state.tickets().stats()?))
}
