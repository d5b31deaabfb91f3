use chrono::Utc;
use rusqlite::Row;
use uuid::Uuid;

use super::{minutes_between, parse_datetime, parse_datetime_opt, parse_uuid, Database};
use crate::error::AppError;
use crate::models::*;

const PERIOD_COLUMNS: &str = "id, session_id, start_time, end_time, duration_min, is_interrupted";

fn period_from_row(row: &Row) -> rusqlite::Result<FocusPeriod> {
    Ok(FocusPeriod {
        id: parse_uuid(row.get::<_, String>(0)?),
        session_id: parse_uuid(row.get::<_, String>(1)?),
        start_time: parse_datetime(row.get::<_, String>(2)?),
        end_time: parse_datetime_opt(row.get(3)?),
        duration_min: row.get(4)?,
        is_interrupted: row.get::<_, i64>(5)? != 0,
    })
}

impl Database {
    /// Open a focus period inside one of the user's sessions. The unique
    /// partial index on `(session_id) WHERE end_time IS NULL` rejects a
    /// second open period.
    pub fn start_focus(
        &self,
        user_id: Uuid,
        input: StartFocusInput,
    ) -> Result<FocusPeriod, AppError> {
        let session = self
            .get_pomodoro(user_id, input.session_id)?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if session.completed_at.is_some() {
            return Err(AppError::Conflict(
                "Cannot start a focus period in a closed session".to_string(),
            ));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO focus_periods (id, session_id, start_time, is_interrupted)
             VALUES (?, ?, ?, 0)",
            (
                id.to_string(),
                input.session_id.to_string(),
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("An open focus period already exists".to_string())
            }
            other => other,
        })?;

        Ok(FocusPeriod {
            id,
            session_id: input.session_id,
            start_time: now,
            end_time: None,
            duration_min: None,
            is_interrupted: false,
        })
    }

    /// Close a focus period, computing its duration from the wall-clock
    /// delta. Ownership is checked through the period's session.
    pub fn end_focus(
        &self,
        user_id: Uuid,
        period_id: Uuid,
        interrupted: bool,
    ) -> Result<Option<FocusPeriod>, AppError> {
        let Some(period) = self.get_focus_period(user_id, period_id)? else {
            return Ok(None);
        };
        if period.end_time.is_some() {
            return Err(AppError::Conflict(
                "Focus period is already closed".to_string(),
            ));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let duration_min = minutes_between(period.start_time, now);

        conn.execute(
            "UPDATE focus_periods SET end_time = ?, duration_min = ?, is_interrupted = ?
             WHERE id = ?",
            (
                now.to_rfc3339(),
                duration_min,
                interrupted as i64,
                period_id.to_string(),
            ),
        )?;

        Ok(Some(FocusPeriod {
            end_time: Some(now),
            duration_min: Some(duration_min),
            is_interrupted: interrupted,
            ..period
        }))
    }

    pub fn get_focus_period(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FocusPeriod>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT p.id, p.session_id, p.start_time, p.end_time, p.duration_min, p.is_interrupted
             FROM focus_periods p
             JOIN pomodoro_sessions s ON s.id = p.session_id
             WHERE p.id = ? AND s.user_id = ?",
        )?;

        let mut rows = stmt.query((id.to_string(), user_id.to_string()))?;
        match rows.next()? {
            Some(row) => Ok(Some(period_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_focus_periods(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<Vec<FocusPeriod>, AppError> {
        if self.get_pomodoro(user_id, session_id)?.is_none() {
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {PERIOD_COLUMNS} FROM focus_periods
             WHERE session_id = ? ORDER BY start_time",
        ))?;

        let periods = stmt
            .query_map([session_id.to_string()], period_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(periods)
    }

    pub fn get_active_focus(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<Option<FocusPeriod>, AppError> {
        if self.get_pomodoro(user_id, session_id)?.is_none() {
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {PERIOD_COLUMNS} FROM focus_periods
             WHERE session_id = ? AND end_time IS NULL",
        ))?;

        let mut rows = stmt.query([session_id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(period_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// All of the user's focus periods, joined through their sessions.
    /// The analytics layer filters these in code.
    pub fn list_user_focus_periods(&self, user_id: Uuid) -> Result<Vec<FocusPeriod>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT p.id, p.session_id, p.start_time, p.end_time, p.duration_min, p.is_interrupted
             FROM focus_periods p
             JOIN pomodoro_sessions s ON s.id = p.session_id
             WHERE s.user_id = ?
             ORDER BY p.start_time",
        )?;

        let periods = stmt
            .query_map([user_id.to_string()], period_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(periods)
    }

    pub fn get_focus_period_stats(&self, user_id: Uuid) -> Result<FocusPeriodStats, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let stats = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(p.is_interrupted), 0),
                    COALESCE(SUM(p.duration_min), 0)
             FROM focus_periods p
             JOIN pomodoro_sessions s ON s.id = p.session_id
             WHERE s.user_id = ? AND p.end_time IS NOT NULL",
            [user_id.to_string()],
            |row| {
                Ok(FocusPeriodStats {
                    total_periods: row.get(0)?,
                    interrupted_periods: row.get(1)?,
                    total_minutes: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }
}
