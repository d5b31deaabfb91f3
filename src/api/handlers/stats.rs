use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::response::{ok, ApiResponse};
use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::stats::{
    self, CompletionStats, FocusStats, HabitStats, Timeframe,
};

#[derive(Debug, Default, Deserialize)]
pub struct TimeframeQuery {
    pub timeframe: Option<Timeframe>,
}

pub async fn focus_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<ApiResponse<FocusStats>>, AppError> {
    let timeframe = query.timeframe.unwrap_or(Timeframe::Week);
    let stats = stats::get_focus_stats(&state.db, user.id, timeframe)?;
    Ok(ok("Focus stats", stats))
}

pub async fn habit_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<ApiResponse<HabitStats>>, AppError> {
    let timeframe = query.timeframe.unwrap_or(Timeframe::Week);
    let stats = stats::get_habit_stats(&state.db, user.id, timeframe)?;
    Ok(ok("Habit stats", stats))
}

pub async fn completion_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<CompletionStats>>, AppError> {
    let stats = stats::get_completion_stats(&state.db, user.id)?;
    Ok(ok("Completion stats", stats))
}
