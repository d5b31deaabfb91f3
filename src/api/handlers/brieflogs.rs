use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::response::{ok, ApiResponse};
use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::*;

pub async fn create_brieflog(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateBriefLogInput>,
) -> Result<(StatusCode, Json<ApiResponse<BriefLog>>), AppError> {
    let log = state.db.create_brieflog(user.id, input)?;
    Ok((StatusCode::CREATED, ok("Brief log recorded", log)))
}

pub async fn list_brieflogs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<BriefLog>>>, AppError> {
    let logs = state.db.list_brieflogs(user.id)?;
    Ok(ok("Brief logs", logs))
}

pub async fn list_task_brieflogs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<BriefLog>>>, AppError> {
    let logs = state.db.list_brieflogs_by_task(user.id, task_id)?;
    Ok(ok("Brief logs", logs))
}
