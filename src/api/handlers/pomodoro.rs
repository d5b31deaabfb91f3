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

pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreatePomodoroInput>,
) -> Result<(StatusCode, Json<ApiResponse<PomodoroSession>>), AppError> {
    let session = state.db.create_pomodoro(user.id, input)?;
    Ok((StatusCode::CREATED, ok("Session started", session)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<PomodoroSession>>>, AppError> {
    let sessions = state.db.list_pomodoros(user.id)?;
    Ok(ok("Sessions", sessions))
}

pub async fn active_session(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Option<PomodoroSession>>>, AppError> {
    let session = state.db.get_active_pomodoro(user.id)?;
    Ok(ok("Active session", session))
}

pub async fn complete_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PomodoroSession>>, AppError> {
    state
        .db
        .complete_pomodoro(user.id, id)?
        .map(|s| ok("Session completed", s))
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

pub async fn end_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PomodoroSession>>, AppError> {
    state
        .db
        .end_pomodoro(user.id, id)?
        .map(|s| ok("Session ended", s))
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
}

pub async fn session_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<PomodoroStats>>, AppError> {
    let stats = state.db.get_pomodoro_stats(user.id)?;
    Ok(ok("Session stats", stats))
}
