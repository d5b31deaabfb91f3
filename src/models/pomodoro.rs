use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pomodoro work session.
///
/// At most one session per user may be active (`completed_at IS NULL`) at a
/// time; the database enforces this with a unique partial index, so starting
/// a second session while one is open fails with a conflict rather than
/// racing a read-then-write check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroSession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Task this session counts toward, if any.
    pub task_id: Option<Uuid>,
    /// Planned length of the session in minutes.
    pub duration_minutes: i64,
    /// True when the session ran to its planned end; ended-early sessions
    /// close with `completed = false`.
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for starting a new pomodoro session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePomodoroInput {
    pub task_id: Option<Uuid>,
    pub duration_minutes: i64,
}

/// Aggregates over a user's pomodoro sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PomodoroStats {
    pub total_sessions: i64,
    pub completed_sessions: i64,
    /// Sum of planned minutes across completed sessions.
    pub total_minutes: i64,
}
