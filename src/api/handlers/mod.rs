pub mod auth;
pub mod brieflogs;
pub mod focus;
pub mod pomodoro;
pub mod stats;
pub mod tasks;

use axum::{response::IntoResponse, Json};

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
