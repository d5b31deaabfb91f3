use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use super::{brieflogs, parse_datetime, parse_datetime_opt, parse_uuid, Database};
use crate::error::AppError;
use crate::models::*;

const TASK_COLUMNS: &str = "id, user_id, title, description, category, priority, completed, \
     completed_at, focus_time, pomodoro_count, due_date, alarm_offset_min, \
     deleted_at, created_at, updated_at";

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        category: Category::from_str(&row.get::<_, String>(4)?).unwrap_or(Category::Life),
        priority: Priority::from_str(&row.get::<_, String>(5)?).unwrap_or(Priority::Medium),
        completed: row.get::<_, i64>(6)? != 0,
        completed_at: parse_datetime_opt(row.get(7)?),
        focus_time: row.get(8)?,
        pomodoro_count: row.get(9)?,
        due_date: parse_datetime_opt(row.get(10)?),
        alarm_offset_min: row.get(11)?,
        deleted_at: parse_datetime_opt(row.get(12)?),
        created_at: parse_datetime(row.get::<_, String>(13)?),
        updated_at: parse_datetime(row.get::<_, String>(14)?),
    })
}

impl Database {
    pub fn create_task(&self, user_id: Uuid, input: CreateTaskInput) -> Result<Task, AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        if input.title.chars().count() > 200 {
            return Err(AppError::Validation(
                "Title must be at most 200 characters".to_string(),
            ));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tasks (id, user_id, title, description, category, priority, completed,
                focus_time, pomodoro_count, due_date, alarm_offset_min, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?, ?)",
            (
                id.to_string(),
                user_id.to_string(),
                &input.title,
                &input.description,
                input.category.as_str(),
                input.priority.as_str(),
                input.due_date.map(|d| d.to_rfc3339()),
                input.alarm_offset_min,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Task {
            id,
            user_id,
            title: input.title,
            description: input.description,
            category: input.category,
            priority: input.priority,
            completed: false,
            completed_at: None,
            focus_time: 0,
            pomodoro_count: 0,
            due_date: input.due_date,
            alarm_offset_min: input.alarm_offset_min,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch a live (not soft-deleted) task owned by `user_id`.
    pub fn get_task(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        ))?;

        let mut rows = stmt.query((id.to_string(), user_id.to_string()))?;
        match rows.next()? {
            Some(row) => Ok(Some(task_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Fetch a task regardless of soft-deletion. Brief logs may reference
    /// deleted tasks, so their ownership checks use this.
    pub fn get_task_any(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?",
        ))?;

        let mut rows = stmt.query((id.to_string(), user_id.to_string()))?;
        match rows.next()? {
            Some(row) => Ok(Some(task_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ? AND deleted_at IS NULL ORDER BY created_at DESC",
        ))?;

        let tasks = stmt
            .query_map([user_id.to_string()], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Soft-deleted tasks only, newest deletion first.
    pub fn list_archived_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ? AND deleted_at IS NOT NULL ORDER BY deleted_at DESC",
        ))?;

        let tasks = stmt
            .query_map([user_id.to_string()], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Every task the user has, soft-deleted included. The habit analytics
    /// correlate brief logs against deleted tasks, so this must not filter.
    pub fn list_tasks_with_deleted(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ? ORDER BY created_at",
        ))?;

        let tasks = stmt
            .query_map([user_id.to_string()], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn search_tasks(&self, user_id: Uuid, query: &str) -> Result<Vec<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ? AND deleted_at IS NULL
               AND (title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')
             ORDER BY created_at DESC",
        ))?;

        let tasks = stmt
            .query_map((user_id.to_string(), &pattern, &pattern), task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Update a task. If the input carries a brief annotation, it is written
    /// in the same transaction so an edit never lands without its log entry.
    pub fn update_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: UpdateTaskInput,
    ) -> Result<Option<Task>, AppError> {
        let Some(existing) = self.get_task(user_id, id)? else {
            return Ok(None);
        };

        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("Title must not be empty".to_string()));
            }
        }
        if input.brief_type.is_some() != input.brief_content.is_some() {
            return Err(AppError::Validation(
                "brief_type and brief_content must be provided together".to_string(),
            ));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        let title = input.title.unwrap_or(existing.title);
        let description = input.description.or(existing.description);
        let category = input.category.unwrap_or(existing.category);
        let priority = input.priority.unwrap_or(existing.priority);
        let due_date = input.due_date.or(existing.due_date);
        let alarm_offset_min = input.alarm_offset_min.or(existing.alarm_offset_min);

        tx.execute(
            "UPDATE tasks SET title = ?, description = ?, category = ?, priority = ?,
                due_date = ?, alarm_offset_min = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
            (
                &title,
                &description,
                category.as_str(),
                priority.as_str(),
                due_date.map(|d| d.to_rfc3339()),
                alarm_offset_min,
                now.to_rfc3339(),
                id.to_string(),
                user_id.to_string(),
            ),
        )?;

        if let (Some(brief_type), Some(content)) = (input.brief_type, input.brief_content) {
            brieflogs::insert(&tx, user_id, id, brief_type, &content, now)?;
        }

        tx.commit()?;

        Ok(Some(Task {
            id,
            user_id,
            title,
            description,
            category,
            priority,
            completed: existing.completed,
            completed_at: existing.completed_at,
            focus_time: existing.focus_time,
            pomodoro_count: existing.pomodoro_count,
            due_date,
            alarm_offset_min,
            deleted_at: None,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn complete_task(&self, user_id: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let Some(existing) = self.get_task(user_id, id)? else {
            return Ok(None);
        };
        if existing.completed {
            return Err(AppError::Conflict("Task is already completed".to_string()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        conn.execute(
            "UPDATE tasks SET completed = 1, completed_at = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
            (
                now.to_rfc3339(),
                now.to_rfc3339(),
                id.to_string(),
                user_id.to_string(),
            ),
        )?;

        Ok(Some(Task {
            completed: true,
            completed_at: Some(now),
            updated_at: now,
            ..existing
        }))
    }

    /// Make-up check-in: backfill a completion for a past date.
    ///
    /// Limited to 2 per user per calendar month; the quota counter lives on
    /// the user row and is reset by the monthly scheduler. Quota check and
    /// bump happen in one transaction with the task update.
    pub fn makeup_checkin(
        &self,
        user_id: Uuid,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Task>, AppError> {
        let now = Utc::now();
        if completed_at > now {
            return Err(AppError::Validation(
                "Make-up check-in date must be in the past".to_string(),
            ));
        }

        let Some(existing) = self.get_task(user_id, id)? else {
            return Ok(None);
        };
        if existing.completed {
            return Err(AppError::Conflict("Task is already completed".to_string()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.unchecked_transaction()?;

        let reward_count: i64 = tx.query_row(
            "SELECT reward_count FROM users WHERE id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        if reward_count >= 2 {
            return Err(AppError::Conflict(
                "Make-up check-in quota exhausted for this month".to_string(),
            ));
        }

        tx.execute(
            "UPDATE tasks SET completed = 1, completed_at = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
            (
                completed_at.to_rfc3339(),
                now.to_rfc3339(),
                id.to_string(),
                user_id.to_string(),
            ),
        )?;
        tx.execute(
            "UPDATE users SET reward_count = reward_count + 1 WHERE id = ?",
            [user_id.to_string()],
        )?;

        tx.commit()?;

        Ok(Some(Task {
            completed: true,
            completed_at: Some(completed_at),
            updated_at: now,
            ..existing
        }))
    }

    /// Soft-delete a task: mark `deleted_at`, drop any open pomodoro session
    /// on it, and record the delete reason as a brief log — all or nothing.
    pub fn soft_delete_task(
        &self,
        user_id: Uuid,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<bool, AppError> {
        if self.get_task(user_id, id)?.is_none() {
            return Ok(false);
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        tx.execute(
            "UPDATE tasks SET deleted_at = ?, updated_at = ? WHERE id = ? AND user_id = ?",
            (
                now.to_rfc3339(),
                now.to_rfc3339(),
                id.to_string(),
                user_id.to_string(),
            ),
        )?;

        // Open sessions on a deleted task make no sense; focus periods go
        // with them via ON DELETE CASCADE.
        tx.execute(
            "DELETE FROM pomodoro_sessions
             WHERE task_id = ? AND user_id = ? AND completed_at IS NULL",
            (id.to_string(), user_id.to_string()),
        )?;

        if let Some(reason) = reason {
            brieflogs::insert(&tx, user_id, id, BriefType::DeleteReason, &reason, now)?;
        }

        tx.commit()?;
        Ok(true)
    }

    /// Physically remove a task row. Brief logs referencing it are kept.
    pub fn purge_task(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM tasks WHERE id = ? AND user_id = ?",
            (id.to_string(), user_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    pub fn batch_delete_tasks(&self, user_id: Uuid, ids: &[Uuid]) -> Result<usize, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.unchecked_transaction()?;

        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute(
                "DELETE FROM tasks WHERE id = ? AND user_id = ?",
                (id.to_string(), user_id.to_string()),
            )?;
        }

        tx.commit()?;
        Ok(deleted)
    }

    pub fn upcoming_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ? AND deleted_at IS NULL AND completed = 0 AND due_date > ?
             ORDER BY due_date LIMIT 50",
        ))?;

        let tasks = stmt
            .query_map(
                (user_id.to_string(), Utc::now().to_rfc3339()),
                task_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn overdue_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ? AND deleted_at IS NULL AND completed = 0
               AND due_date IS NOT NULL AND due_date < ?
             ORDER BY due_date",
        ))?;

        let tasks = stmt
            .query_map(
                (user_id.to_string(), Utc::now().to_rfc3339()),
                task_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Live tasks with a due date inside `[start, end]`, for the weekly
    /// completion buckets.
    pub fn tasks_due_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Task>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ? AND deleted_at IS NULL
               AND due_date IS NOT NULL AND due_date >= ? AND due_date <= ?
             ORDER BY due_date",
        ))?;

        let tasks = stmt
            .query_map(
                (
                    user_id.to_string(),
                    start.to_rfc3339(),
                    end.to_rfc3339(),
                ),
                task_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn get_task_stats(&self, user_id: Uuid) -> Result<TaskStats, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now().to_rfc3339();
        let stats = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(completed), 0),
                    COALESCE(SUM(CASE WHEN completed = 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN completed = 0 AND due_date IS NOT NULL
                                       AND due_date < ? THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(focus_time), 0),
                    COALESCE(SUM(pomodoro_count), 0)
             FROM tasks WHERE user_id = ? AND deleted_at IS NULL",
            (&now, user_id.to_string()),
            |row| {
                Ok(TaskStats {
                    total: row.get(0)?,
                    completed: row.get(1)?,
                    pending: row.get(2)?,
                    overdue: row.get(3)?,
                    total_focus_time: row.get(4)?,
                    total_pomodoros: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }
}
