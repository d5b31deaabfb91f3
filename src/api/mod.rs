mod handlers;
pub mod middleware;
mod response;

use std::time::Duration;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::AuthConfig;
use crate::db::Database;
use middleware::RateLimiter;

pub use response::{envelope_error, ApiResponse};

/// Per-request deadline; requests exceeding it get a 408.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the handlers need, injected at router construction.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthConfig,
    pub limiter: Option<RateLimiter>,
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Auth
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/login-email", post(handlers::auth::login_by_email))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/profile", get(handlers::auth::profile))
        // Tasks
        .route("/tasks", post(handlers::tasks::create_task))
        .route("/tasks", get(handlers::tasks::list_tasks))
        .route("/tasks/search", get(handlers::tasks::search_tasks))
        .route("/tasks/stats", get(handlers::tasks::task_stats))
        .route("/tasks/archive", get(handlers::tasks::archived_tasks))
        .route("/tasks/upcoming", get(handlers::tasks::upcoming_tasks))
        .route("/tasks/overdue", get(handlers::tasks::overdue_tasks))
        .route("/tasks/batch-delete", post(handlers::tasks::batch_delete))
        .route("/tasks/{id}", get(handlers::tasks::get_task))
        .route("/tasks/{id}", put(handlers::tasks::update_task))
        .route("/tasks/{id}", delete(handlers::tasks::delete_task))
        .route("/tasks/{id}/complete", post(handlers::tasks::complete_task))
        .route("/tasks/{id}/makeup", post(handlers::tasks::makeup_checkin))
        .route("/tasks/{id}/purge", delete(handlers::tasks::purge_task))
        // Pomodoro sessions
        .route("/pomodoros", post(handlers::pomodoro::create_session))
        .route("/pomodoros", get(handlers::pomodoro::list_sessions))
        .route("/pomodoros/active", get(handlers::pomodoro::active_session))
        .route("/pomodoros/stats", get(handlers::pomodoro::session_stats))
        .route(
            "/pomodoros/{id}/complete",
            post(handlers::pomodoro::complete_session),
        )
        .route("/pomodoros/{id}/end", post(handlers::pomodoro::end_session))
        // Focus periods
        .route("/focus/start", post(handlers::focus::start_period))
        .route("/focus/active", get(handlers::focus::active_period))
        .route("/focus/stats", get(handlers::focus::period_stats))
        .route("/focus/{id}/end", post(handlers::focus::end_period))
        .route("/focus", get(handlers::focus::list_periods))
        // Brief logs
        .route("/brieflogs", post(handlers::brieflogs::create_brieflog))
        .route("/brieflogs", get(handlers::brieflogs::list_brieflogs))
        .route(
            "/brieflogs/task/{task_id}",
            get(handlers::brieflogs::list_task_brieflogs),
        )
        // Analytics
        .route("/analytics/focus", get(handlers::stats::focus_stats))
        .route("/analytics/habits", get(handlers::stats::habit_stats))
        .route(
            "/analytics/completion",
            get(handlers::stats::completion_stats),
        )
        // Health
        .route("/health", get(handlers::health))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
