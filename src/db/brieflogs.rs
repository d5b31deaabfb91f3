use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use super::{parse_datetime, parse_uuid, Database};
use crate::error::AppError;
use crate::models::*;

const BRIEFLOG_COLUMNS: &str = "id, user_id, task_id, brief_type, content, created_at";

fn brieflog_from_row(row: &Row) -> rusqlite::Result<BriefLog> {
    Ok(BriefLog {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        task_id: parse_uuid(row.get::<_, String>(2)?),
        brief_type: BriefType::from_code(row.get(3)?).unwrap_or(BriefType::Other),
        content: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

/// Append a brief log row on an existing connection or transaction, so task
/// mutations can log in the same transaction as the edit.
pub(super) fn insert(
    conn: &Connection,
    user_id: Uuid,
    task_id: Uuid,
    brief_type: BriefType,
    content: &str,
    now: DateTime<Utc>,
) -> Result<BriefLog, AppError> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO task_brieflogs (id, user_id, task_id, brief_type, content, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        (
            id.to_string(),
            user_id.to_string(),
            task_id.to_string(),
            brief_type.code(),
            content,
            now.to_rfc3339(),
        ),
    )?;

    Ok(BriefLog {
        id,
        user_id,
        task_id,
        brief_type,
        content: content.to_string(),
        created_at: now,
    })
}

impl Database {
    /// Append a brief log. The task must belong to the user but may be
    /// soft-deleted; delete reasons arrive after the task is gone.
    pub fn create_brieflog(
        &self,
        user_id: Uuid,
        input: CreateBriefLogInput,
    ) -> Result<BriefLog, AppError> {
        if input.content.trim().is_empty() {
            return Err(AppError::Validation(
                "Content must not be empty".to_string(),
            ));
        }
        if self.get_task_any(user_id, input.task_id)?.is_none() {
            return Err(AppError::NotFound("Task not found".to_string()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        insert(
            &conn,
            user_id,
            input.task_id,
            input.brief_type,
            &input.content,
            Utc::now(),
        )
    }

    pub fn list_brieflogs_by_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<Vec<BriefLog>, AppError> {
        if self.get_task_any(user_id, task_id)?.is_none() {
            return Err(AppError::NotFound("Task not found".to_string()));
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {BRIEFLOG_COLUMNS} FROM task_brieflogs
             WHERE user_id = ? AND task_id = ? ORDER BY created_at",
        ))?;

        let logs = stmt
            .query_map((user_id.to_string(), task_id.to_string()), brieflog_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    pub fn list_brieflogs(&self, user_id: Uuid) -> Result<Vec<BriefLog>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {BRIEFLOG_COLUMNS} FROM task_brieflogs
             WHERE user_id = ? ORDER BY created_at DESC",
        ))?;

        let logs = stmt
            .query_map([user_id.to_string()], brieflog_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Brief logs of the problematic types (1-4) inside `[start, end]`,
    /// for the habit analytics.
    pub fn list_problematic_brieflogs(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BriefLog>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {BRIEFLOG_COLUMNS} FROM task_brieflogs
             WHERE user_id = ? AND brief_type <= 4 AND created_at >= ? AND created_at <= ?
             ORDER BY created_at",
        ))?;

        let logs = stmt
            .query_map(
                (
                    user_id.to_string(),
                    start.to_rfc3339(),
                    end.to_rfc3339(),
                ),
                brieflog_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}
