use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::window::{StatsWindow, Timeframe};
use crate::db::Database;
use crate::error::AppError;
use crate::models::{FocusPeriod, PomodoroSession};

/// Closed periods longer than this are treated as clock errors and dropped.
const MAX_PERIOD_MINUTES: i64 = 300;

/// Focus metrics for one timeframe window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusStats {
    /// Sum of closed focus period durations in the window, minutes.
    pub total_focus_time: i64,
    pub total_interruptions: i64,
    /// Sum of planned session minutes for sessions started in the window.
    pub total_planned_time: i64,
    /// Focus minutes per day elapsed so far, not per full window length.
    pub avg_focus_time: f64,
    /// Actual-to-planned ratio as a percentage, capped at 100.
    pub focus_index: i64,
    pub daily: Vec<DailyFocus>,
}

/// One day of the per-day breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyFocus {
    pub date: NaiveDate,
    pub session_duration: i64,
    pub interruptions: i64,
    pub focus_index: i64,
}

pub fn get_focus_stats(
    db: &Database,
    user_id: Uuid,
    timeframe: Timeframe,
) -> Result<FocusStats, AppError> {
    let now = Utc::now();
    let periods = db.list_user_focus_periods(user_id)?;
    let sessions = db.list_pomodoros(user_id)?;
    Ok(compute_focus_stats(&periods, &sessions, timeframe, now))
}

/// Pure aggregation over already-fetched rows.
pub fn compute_focus_stats(
    periods: &[FocusPeriod],
    sessions: &[PomodoroSession],
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> FocusStats {
    let window = StatsWindow::for_timeframe(timeframe, now);

    let (total_focus_time, total_interruptions) = sum_periods(periods, &window);
    let total_planned_time = sum_planned(sessions, &window);

    let avg_focus_time = total_focus_time as f64 / window.days_elapsed(now) as f64;
    let focus_index = focus_index(total_focus_time, total_planned_time);

    let daily = window
        .days()
        .into_iter()
        .map(|date| {
            let day = StatsWindow::day(date);
            let (session_duration, interruptions) = sum_periods(periods, &day);
            let planned = sum_planned(sessions, &day);
            DailyFocus {
                date,
                session_duration,
                interruptions,
                focus_index: self::focus_index(session_duration, planned),
            }
        })
        .collect();

    FocusStats {
        total_focus_time,
        total_interruptions,
        total_planned_time,
        avg_focus_time,
        focus_index,
        daily,
    }
}

/// Sum durations and count interruptions for periods that closed with a sane
/// duration and started inside the window.
fn sum_periods(periods: &[FocusPeriod], window: &StatsWindow) -> (i64, i64) {
    let mut total = 0;
    let mut interruptions = 0;
    for p in periods {
        let Some(duration) = p.duration_min else {
            continue;
        };
        if duration > MAX_PERIOD_MINUTES || !window.contains(p.start_time) {
            continue;
        }
        total += duration;
        if p.is_interrupted {
            interruptions += 1;
        }
    }
    (total, interruptions)
}

fn sum_planned(sessions: &[PomodoroSession], window: &StatsWindow) -> i64 {
    sessions
        .iter()
        .filter(|s| window.contains(s.started_at))
        .map(|s| s.duration_minutes)
        .sum()
}

fn focus_index(focus_time: i64, planned_time: i64) -> i64 {
    if planned_time <= 0 {
        return 0;
    }
    let ratio = (focus_time as f64 / planned_time as f64 * 100.0).round() as i64;
    ratio.min(100)
}
