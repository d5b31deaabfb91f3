use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::window::{StatsWindow, Timeframe};
use crate::db::Database;
use crate::error::AppError;
use crate::models::{BriefLog, BriefType, Category, Task};

/// Display offset for the time-of-day histogram. Bucketing shifts UTC hours
/// into UTC+8 before slotting; nothing else in the system leaves UTC.
const HISTOGRAM_UTC_OFFSET_HOURS: u32 = 8;

/// Behavioral metrics derived from problematic task edits (brief types 1-4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitStats {
    /// Distinct tasks with at least one problematic edit in the window.
    /// Multiple edits to one task count once.
    pub total_problematic_events: i64,
    pub total_tasks_created: i64,
    /// Problematic tasks per task created, as a rounded percentage.
    /// Zero when nothing was created.
    pub problematic_event_ratio: i64,
    pub daily: Vec<DailyHabits>,
    pub categories: Vec<CategoryBreakdown>,
    /// The three busiest 2-hour slots for problematic edits, UTC+8.
    pub peak_slots: Vec<HourSlot>,
}

/// Per-day counts of each problematic brief type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyHabits {
    pub date: NaiveDate,
    pub deletes: i64,
    pub category_changes: i64,
    pub priority_changes: i64,
    pub due_date_changes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    /// Distinct tasks of this category touched by a problematic edit.
    pub affected_count: i64,
    /// Tasks of this category created in the window.
    pub total_count: i64,
    pub percentage: f64,
}

/// A 2-hour histogram bucket. `slot_start` is the starting hour in UTC+8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourSlot {
    pub slot_start: u32,
    pub count: i64,
}

pub fn get_habit_stats(
    db: &Database,
    user_id: Uuid,
    timeframe: Timeframe,
) -> Result<HabitStats, AppError> {
    let now = Utc::now();
    let window = StatsWindow::for_timeframe(timeframe, now);
    let logs = db.list_problematic_brieflogs(user_id, window.start, window.end)?;
    // Soft-deleted tasks stay in: brief logs routinely reference them.
    let tasks = db.list_tasks_with_deleted(user_id)?;
    Ok(compute_habit_stats(&logs, &tasks, timeframe, now))
}

/// Pure aggregation. `logs` must already be restricted to brief types 1-4;
/// anything else in the slice is ignored. Window filtering is re-applied
/// here so the function is self-contained for direct use in tests.
pub fn compute_habit_stats(
    logs: &[BriefLog],
    tasks: &[Task],
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> HabitStats {
    let window = StatsWindow::for_timeframe(timeframe, now);

    let logs: Vec<&BriefLog> = logs
        .iter()
        .filter(|l| l.brief_type.is_problematic() && window.contains(l.created_at))
        .collect();

    let problematic_tasks: HashSet<Uuid> = logs.iter().map(|l| l.task_id).collect();
    let total_problematic_events = problematic_tasks.len() as i64;

    let created_in_window: Vec<&Task> = tasks
        .iter()
        .filter(|t| window.contains(t.created_at))
        .collect();
    let total_tasks_created = created_in_window.len() as i64;

    let problematic_event_ratio = if total_tasks_created > 0 {
        (total_problematic_events as f64 / total_tasks_created as f64 * 100.0).round() as i64
    } else {
        0
    };

    let daily = daily_series(&logs, &window);
    let categories = category_breakdown(&problematic_tasks, tasks, &created_in_window);
    let peak_slots = peak_slots(&logs);

    HabitStats {
        total_problematic_events,
        total_tasks_created,
        problematic_event_ratio,
        daily,
        categories,
        peak_slots,
    }
}

fn daily_series(logs: &[&BriefLog], window: &StatsWindow) -> Vec<DailyHabits> {
    window
        .days()
        .into_iter()
        .map(|date| {
            let day = StatsWindow::day(date);
            let mut entry = DailyHabits {
                date,
                deletes: 0,
                category_changes: 0,
                priority_changes: 0,
                due_date_changes: 0,
            };
            for log in logs.iter().filter(|l| day.contains(l.created_at)) {
                match log.brief_type {
                    BriefType::DeleteReason => entry.deletes += 1,
                    BriefType::CategoryChange => entry.category_changes += 1,
                    BriefType::PriorityChange => entry.priority_changes += 1,
                    BriefType::DueDateChange => entry.due_date_changes += 1,
                    _ => {}
                }
            }
            entry
        })
        .collect()
}

fn category_breakdown(
    problematic_tasks: &HashSet<Uuid>,
    all_tasks: &[Task],
    created_in_window: &[&Task],
) -> Vec<CategoryBreakdown> {
    let category_of: HashMap<Uuid, Category> =
        all_tasks.iter().map(|t| (t.id, t.category)).collect();

    Category::ALL
        .iter()
        .map(|&category| {
            let affected_count = problematic_tasks
                .iter()
                .filter(|id| category_of.get(id) == Some(&category))
                .count() as i64;
            let total_count = created_in_window
                .iter()
                .filter(|t| t.category == category)
                .count() as i64;
            let percentage = if total_count > 0 {
                let pct = affected_count as f64 / total_count as f64 * 100.0;
                (pct * 10.0).round() / 10.0
            } else {
                0.0
            };
            CategoryBreakdown {
                category,
                affected_count,
                total_count,
                percentage,
            }
        })
        .collect()
}

fn peak_slots(logs: &[&BriefLog]) -> Vec<HourSlot> {
    let mut counts = [0i64; 12];
    for log in logs {
        let shifted = (log.created_at.hour() + HISTOGRAM_UTC_OFFSET_HOURS) % 24;
        counts[(shifted / 2) as usize] += 1;
    }

    let mut slots: Vec<HourSlot> = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| HourSlot {
            slot_start: i as u32 * 2,
            count,
        })
        .collect();
    // Busiest first; earlier slot wins ties for a stable order.
    slots.sort_by(|a, b| b.count.cmp(&a.count).then(a.slot_start.cmp(&b.slot_start)));
    slots.truncate(3);
    slots
}
