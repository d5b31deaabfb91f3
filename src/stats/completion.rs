use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::window::StatsWindow;
use crate::db::Database;
use crate::error::AppError;
use crate::models::Task;

/// Weekly completion metrics: the current week plus a 4-point trend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionStats {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub completion_rate: f64,
    pub overdue_rate: f64,
    /// Oldest week first, current week last. Always 4 entries.
    pub trend: Vec<WeekCompletion>,
}

/// One week's bucket. A task belongs to the week its due date falls in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekCompletion {
    pub week_start: NaiveDate,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub completion_rate: f64,
    pub overdue_rate: f64,
}

pub fn get_completion_stats(db: &Database, user_id: Uuid) -> Result<CompletionStats, AppError> {
    let now = Utc::now();

    // Oldest week first: three weeks back, two, one, current.
    let mut trend = Vec::with_capacity(4);
    for weeks_back in (0..4).rev() {
        let window = StatsWindow::week_before(now, weeks_back);
        let tasks = db.tasks_due_between(user_id, window.start, window.end)?;
        trend.push(compute_week_completion(&tasks, &window, now));
    }

    Ok(from_trend(trend))
}

/// Assemble the response from a 4-week trend; the last entry is the current
/// week and provides the headline numbers.
pub fn from_trend(trend: Vec<WeekCompletion>) -> CompletionStats {
    let current = trend.last().expect("trend always has 4 entries");
    CompletionStats {
        total_tasks: current.total_tasks,
        completed_tasks: current.completed_tasks,
        overdue_tasks: current.overdue_tasks,
        completion_rate: current.completion_rate,
        overdue_rate: current.overdue_rate,
        trend: trend.clone(),
    }
}

/// Pure aggregation over tasks already restricted to due dates within
/// `window` (re-checked here so the function stands alone).
pub fn compute_week_completion(
    tasks: &[Task],
    window: &StatsWindow,
    now: DateTime<Utc>,
) -> WeekCompletion {
    let in_week: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.due_date.is_some_and(|d| window.contains(d)))
        .collect();

    let total_tasks = in_week.len() as i64;
    let completed_tasks = in_week.iter().filter(|t| t.completed).count() as i64;
    let overdue_tasks = in_week
        .iter()
        .filter(|t| !t.completed && t.due_date.is_some_and(|d| d < now))
        .count() as i64;

    WeekCompletion {
        week_start: window.start.date_naive(),
        total_tasks,
        completed_tasks,
        overdue_tasks,
        completion_rate: rate(completed_tasks, total_tasks),
        overdue_rate: rate(overdue_tasks, total_tasks),
    }
}

/// Percentage rounded to one decimal, 0 on an empty denominator.
fn rate(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority};

    fn dt(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn task(due: &str, completed: bool) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: "t".to_string(),
            description: None,
            category: Category::Work,
            priority: Priority::Medium,
            completed,
            completed_at: completed.then(|| dt(due)),
            focus_time: 0,
            pomodoro_count: 0,
            due_date: Some(dt(due)),
            alarm_offset_min: None,
            deleted_at: None,
            created_at: dt("2024-06-01T00:00:00Z"),
            updated_at: dt("2024-06-01T00:00:00Z"),
        }
    }

    // 2024-06-12 is a Wednesday; its week is 06-10 .. 06-16.
    const NOW: &str = "2024-06-12T18:00:00Z";

    #[test]
    fn counts_partition_the_week_bucket() {
        let window = StatsWindow::week_of(dt(NOW));
        let tasks = vec![
            task("2024-06-10T09:00:00Z", true),  // completed
            task("2024-06-11T09:00:00Z", false), // overdue (past due, open)
            task("2024-06-14T09:00:00Z", false), // open, not yet due
        ];
        let week = compute_week_completion(&tasks, &window, dt(NOW));
        assert_eq!(week.total_tasks, 3);
        assert_eq!(week.completed_tasks, 1);
        assert_eq!(week.overdue_tasks, 1);
        // completed + overdue + still-open partitions the bucket, so the
        // two rates can never sum past 100.
        assert!(week.completion_rate + week.overdue_rate <= 100.0);
        assert!((week.completion_rate - 33.3).abs() < 1e-9);
        assert!((week.overdue_rate - 33.3).abs() < 1e-9);
    }

    #[test]
    fn tasks_never_leak_into_adjacent_weeks() {
        let this_week = StatsWindow::week_of(dt(NOW));
        let last_week = StatsWindow::week_before(dt(NOW), 1);
        let tasks = vec![
            task("2024-06-09T23:59:59Z", false), // Sunday of last week
            task("2024-06-10T00:00:00Z", false), // Monday of this week
        ];
        let current = compute_week_completion(&tasks, &this_week, dt(NOW));
        let previous = compute_week_completion(&tasks, &last_week, dt(NOW));
        assert_eq!(current.total_tasks, 1);
        assert_eq!(previous.total_tasks, 1);
    }

    #[test]
    fn empty_week_has_zero_rates() {
        let window = StatsWindow::week_of(dt(NOW));
        let week = compute_week_completion(&[], &window, dt(NOW));
        assert_eq!(week.total_tasks, 0);
        assert_eq!(week.completion_rate, 0.0);
        assert_eq!(week.overdue_rate, 0.0);
    }

    #[test]
    fn future_due_open_task_is_not_overdue() {
        let window = StatsWindow::week_of(dt(NOW));
        let tasks = vec![task("2024-06-15T09:00:00Z", false)];
        let week = compute_week_completion(&tasks, &window, dt(NOW));
        assert_eq!(week.overdue_tasks, 0);
    }

    #[test]
    fn headline_numbers_come_from_current_week() {
        let window = StatsWindow::week_of(dt(NOW));
        let older = WeekCompletion {
            week_start: window.start.date_naive() - chrono::Duration::days(7),
            total_tasks: 9,
            completed_tasks: 9,
            overdue_tasks: 0,
            completion_rate: 100.0,
            overdue_rate: 0.0,
        };
        let current =
            compute_week_completion(&[task("2024-06-10T09:00:00Z", true)], &window, dt(NOW));
        let stats = from_trend(vec![older, current]);
        assert_eq!(stats.total_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert!((stats.completion_rate - 100.0).abs() < f64::EPSILON);
    }
}
