use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use helpdesk_core::{NewTag, Tag};
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(tag): Json<NewTag>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let tag = state.directory().create_tag(tag)?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.directory().list_tags()?))
}

/// Soft-delete a tag. Tickets carrying it stop listing it.
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.directory().delete_tag(&name)?;
    Ok(StatusCode::NO_CONTENT)
}
