use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use helpdesk_core::{NewUser, User, UserPatch};
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    /// Include deactivated users (default false)
    #[serde(default)]
    pub include_inactive: bool,
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.directory().create_user(user)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.directory().list_users(params.include_inactive)?))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.directory().get_user(&id)?))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.directory().update_user(&id, patch)?))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.directory().delete_user(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
