use chrono::Utc;
use rusqlite::Row;
use uuid::Uuid;

use super::{minutes_between, parse_datetime, parse_datetime_opt, parse_uuid, Database};
use crate::error::AppError;
use crate::models::*;

/// Caps session list fetches; the analytics layer never needs more history.
pub const SESSION_FETCH_CAP: u32 = 1000;

const SESSION_COLUMNS: &str =
    "id, user_id, task_id, duration_minutes, completed, started_at, completed_at";

fn session_from_row(row: &Row) -> rusqlite::Result<PomodoroSession> {
    Ok(PomodoroSession {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        task_id: row.get::<_, Option<String>>(2)?.map(parse_uuid),
        duration_minutes: row.get(3)?,
        completed: row.get::<_, i64>(4)? != 0,
        started_at: parse_datetime(row.get::<_, String>(5)?),
        completed_at: parse_datetime_opt(row.get(6)?),
    })
}

impl Database {
    /// Start a pomodoro session. The unique partial index on
    /// `(user_id) WHERE completed_at IS NULL` rejects a second open session
    /// with a constraint violation, which surfaces as a conflict.
    pub fn create_pomodoro(
        &self,
        user_id: Uuid,
        input: CreatePomodoroInput,
    ) -> Result<PomodoroSession, AppError> {
        if input.duration_minutes <= 0 || input.duration_minutes > 240 {
            return Err(AppError::Validation(
                "duration_minutes must be between 1 and 240".to_string(),
            ));
        }
        if let Some(task_id) = input.task_id {
            if self.get_task(user_id, task_id)?.is_none() {
                return Err(AppError::NotFound("Task not found".to_string()));
            }
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO pomodoro_sessions (id, user_id, task_id, duration_minutes, completed, started_at)
             VALUES (?, ?, ?, ?, 0, ?)",
            (
                id.to_string(),
                user_id.to_string(),
                input.task_id.map(|t| t.to_string()),
                input.duration_minutes,
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("An active pomodoro session already exists".to_string())
            }
            other => other,
        })?;

        Ok(PomodoroSession {
            id,
            user_id,
            task_id: input.task_id,
            duration_minutes: input.duration_minutes,
            completed: false,
            started_at: now,
            completed_at: None,
        })
    }

    pub fn get_pomodoro(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PomodoroSession>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions WHERE id = ? AND user_id = ?",
        ))?;

        let mut rows = stmt.query((id.to_string(), user_id.to_string()))?;
        match rows.next()? {
            Some(row) => Ok(Some(session_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_active_pomodoro(&self, user_id: Uuid) -> Result<Option<PomodoroSession>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions
             WHERE user_id = ? AND completed_at IS NULL",
        ))?;

        let mut rows = stmt.query([user_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(session_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_pomodoros(&self, user_id: Uuid) -> Result<Vec<PomodoroSession>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions
             WHERE user_id = ? ORDER BY started_at DESC LIMIT {SESSION_FETCH_CAP}",
        ))?;

        let sessions = stmt
            .query_map([user_id.to_string()], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Close a session as completed and roll the planned minutes up into its
    /// task's accumulators. Any still-open focus period is closed cleanly.
    /// Runs in one transaction.
    pub fn complete_pomodoro(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PomodoroSession>, AppError> {
        let Some(session) = self.get_pomodoro(user_id, id)? else {
            return Ok(None);
        };
        if session.completed_at.is_some() {
            return Err(AppError::Conflict("Session is already closed".to_string()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        close_open_period(&tx, id, false, now)?;

        tx.execute(
            "UPDATE pomodoro_sessions SET completed = 1, completed_at = ? WHERE id = ?",
            (now.to_rfc3339(), id.to_string()),
        )?;

        if let Some(task_id) = session.task_id {
            tx.execute(
                "UPDATE tasks SET focus_time = focus_time + ?,
                        pomodoro_count = pomodoro_count + 1, updated_at = ?
                 WHERE id = ?",
                (
                    session.duration_minutes,
                    now.to_rfc3339(),
                    task_id.to_string(),
                ),
            )?;
        }

        tx.commit()?;

        Ok(Some(PomodoroSession {
            completed: true,
            completed_at: Some(now),
            ..session
        }))
    }

    /// End a session early. No roll-up; the open focus period, if any, is
    /// closed as interrupted.
    pub fn end_pomodoro(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PomodoroSession>, AppError> {
        let Some(session) = self.get_pomodoro(user_id, id)? else {
            return Ok(None);
        };
        if session.completed_at.is_some() {
            return Err(AppError::Conflict("Session is already closed".to_string()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();

        close_open_period(&tx, id, true, now)?;

        tx.execute(
            "UPDATE pomodoro_sessions SET completed = 0, completed_at = ? WHERE id = ?",
            (now.to_rfc3339(), id.to_string()),
        )?;

        tx.commit()?;

        Ok(Some(PomodoroSession {
            completed: false,
            completed_at: Some(now),
            ..session
        }))
    }

    pub fn get_pomodoro_stats(&self, user_id: Uuid) -> Result<PomodoroStats, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let stats = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(completed), 0),
                    COALESCE(SUM(CASE WHEN completed = 1 THEN duration_minutes ELSE 0 END), 0)
             FROM pomodoro_sessions WHERE user_id = ?",
            [user_id.to_string()],
            |row| {
                Ok(PomodoroStats {
                    total_sessions: row.get(0)?,
                    completed_sessions: row.get(1)?,
                    total_minutes: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }
}

fn close_open_period(
    tx: &rusqlite::Connection,
    session_id: Uuid,
    interrupted: bool,
    now: chrono::DateTime<Utc>,
) -> Result<(), AppError> {
    let open: Option<(String, String)> = tx
        .query_row(
            "SELECT id, start_time FROM focus_periods
             WHERE session_id = ? AND end_time IS NULL",
            [session_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    if let Some((period_id, start_time)) = open {
        let start = parse_datetime(start_time);
        let duration_min = minutes_between(start, now);
        tx.execute(
            "UPDATE focus_periods SET end_time = ?, duration_min = ?, is_interrupted = ?
             WHERE id = ?",
            (
                now.to_rfc3339(),
                duration_min,
                interrupted as i64,
                period_id,
            ),
        )?;
    }

    Ok(())
}
