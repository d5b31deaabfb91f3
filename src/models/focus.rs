use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One contiguous stretch of focused work inside a pomodoro session.
///
/// A period is open while `end_time` is null; closing it computes
/// `duration_min` from the wall-clock delta. At most one period per session
/// may be open at a time (unique partial index, same scheme as the
/// one-active-session rule).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusPeriod {
    pub id: Uuid,
    pub session_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Whole minutes between start and end, set when the period closes.
    pub duration_min: Option<i64>,
    /// True when the period ended because focus was broken rather than the
    /// session finishing.
    pub is_interrupted: bool,
}

/// Input for starting a focus period within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartFocusInput {
    pub session_id: Uuid,
}

/// Input for closing a focus period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndFocusInput {
    #[serde(default)]
    pub interrupted: bool,
}

/// Aggregates over a user's closed focus periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusPeriodStats {
    pub total_periods: i64,
    pub interrupted_periods: i64,
    pub total_minutes: i64,
}
