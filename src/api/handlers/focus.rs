use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::response::{ok, ApiResponse};
use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::*;

pub async fn start_period(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<StartFocusInput>,
) -> Result<(StatusCode, Json<ApiResponse<FocusPeriod>>), AppError> {
    let period = state.db.start_focus(user.id, input)?;
    Ok((StatusCode::CREATED, ok("Focus period started", period)))
}

pub async fn end_period(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    body: Option<Json<EndFocusInput>>,
) -> Result<Json<ApiResponse<FocusPeriod>>, AppError> {
    let interrupted = body.map(|Json(b)| b.interrupted).unwrap_or(false);
    state
        .db
        .end_focus(user.id, id, interrupted)?
        .map(|p| ok("Focus period ended", p))
        .ok_or_else(|| AppError::NotFound("Focus period not found".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Uuid,
}

pub async fn list_periods(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ApiResponse<Vec<FocusPeriod>>>, AppError> {
    let periods = state.db.list_focus_periods(user.id, query.session_id)?;
    Ok(ok("Focus periods", periods))
}

pub async fn active_period(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ApiResponse<Option<FocusPeriod>>>, AppError> {
    let period = state.db.get_active_focus(user.id, query.session_id)?;
    Ok(ok("Active focus period", period))
}

pub async fn period_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<FocusPeriodStats>>, AppError> {
    let stats = state.db.get_focus_period_stats(user.id)?;
    Ok(ok("Focus period stats", stats))
}
