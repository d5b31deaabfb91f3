use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::response::{ok, ok_empty, ApiResponse};
use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::*;

pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<ApiResponse<Task>>), AppError> {
    let task = state.db.create_task(user.id, input)?;
    Ok((StatusCode::CREATED, ok("Task created", task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Task>>>, AppError> {
    let tasks = state.db.list_tasks(user.id)?;
    Ok(ok("Tasks", tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Task>>, AppError> {
    state
        .db
        .get_task(user.id, id)?
        .map(|t| ok("Task", t))
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<ApiResponse<Task>>, AppError> {
    state
        .db
        .update_task(user.id, id, input)?
        .map(|t| ok("Task updated", t))
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteTaskInput {
    /// Recorded as a delete-reason brief log when present.
    pub reason: Option<String>,
}

pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    body: Option<Json<DeleteTaskInput>>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let reason = body.and_then(|Json(b)| b.reason);
    if state.db.soft_delete_task(user.id, id, reason)? {
        Ok(ok_empty("Task deleted"))
    } else {
        Err(AppError::NotFound("Task not found".to_string()))
    }
}

pub async fn purge_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if state.db.purge_task(user.id, id)? {
        Ok(ok_empty("Task permanently deleted"))
    } else {
        Err(AppError::NotFound("Task not found".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteInput {
    pub ids: Vec<Uuid>,
}

pub async fn batch_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<BatchDeleteInput>,
) -> Result<Json<ApiResponse<usize>>, AppError> {
    if input.ids.is_empty() {
        return Err(AppError::Validation("ids must not be empty".to_string()));
    }
    let deleted = state.db.batch_delete_tasks(user.id, &input.ids)?;
    Ok(ok("Tasks deleted", deleted))
}

pub async fn complete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Task>>, AppError> {
    state
        .db
        .complete_task(user.id, id)?
        .map(|t| ok("Task completed", t))
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct MakeupInput {
    /// The past date being backfilled.
    pub completed_at: DateTime<Utc>,
}

pub async fn makeup_checkin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<MakeupInput>,
) -> Result<Json<ApiResponse<Task>>, AppError> {
    state
        .db
        .makeup_checkin(user.id, id, input.completed_at)?
        .map(|t| ok("Make-up check-in recorded", t))
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

pub async fn search_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<Task>>>, AppError> {
    if query.q.trim().is_empty() {
        return Err(AppError::Validation(
            "Search query must not be empty".to_string(),
        ));
    }
    let tasks = state.db.search_tasks(user.id, &query.q)?;
    Ok(ok("Search results", tasks))
}

pub async fn archived_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Task>>>, AppError> {
    let tasks = state.db.list_archived_tasks(user.id)?;
    Ok(ok("Archived tasks", tasks))
}

pub async fn upcoming_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Task>>>, AppError> {
    let tasks = state.db.upcoming_tasks(user.id)?;
    Ok(ok("Upcoming tasks", tasks))
}

pub async fn overdue_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Task>>>, AppError> {
    let tasks = state.db.overdue_tasks(user.id)?;
    Ok(ok("Overdue tasks", tasks))
}

pub async fn task_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<TaskStats>>, AppError> {
    let stats = state.db.get_task_stats(user.id)?;
    Ok(ok("Task stats", stats))
}
