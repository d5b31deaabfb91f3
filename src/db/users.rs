use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use super::{parse_datetime, parse_uuid, Database};
use crate::error::AppError;
use crate::models::*;

const USER_COLUMNS: &str = "id, username, email, password_hash, reward_count, created_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        reward_count: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

impl Database {
    /// Insert a new account. Username and email are unique; violations
    /// surface as conflicts.
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, reward_count, created_at)
             VALUES (?, ?, ?, ?, 0, ?)",
            (
                id.to_string(),
                username,
                email,
                password_hash,
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("Username or email is already taken".to_string())
            }
            other => other,
        })?;

        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            reward_count: 0,
            created_at: now,
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(user_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))?;

        let mut rows = stmt.query([username])?;
        match rows.next()? {
            Some(row) => Ok(Some(user_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))?;

        let mut rows = stmt.query([email])?;
        match rows.next()? {
            Some(row) => Ok(Some(user_from_row(row)?)),
            None => Ok(None),
        }
    }

    /// Monthly scheduler hook: zero every user's make-up quota usage.
    pub fn reset_all_reward_counts(&self) -> Result<usize, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("UPDATE users SET reward_count = 0", [])?;
        Ok(rows)
    }

    // ============================================================
    // Refresh tokens
    // ============================================================

    pub fn insert_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at)
             VALUES (?, ?, ?, ?)",
            (
                token,
                user_id.to_string(),
                expires_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    pub fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT token, user_id, expires_at, created_at FROM refresh_tokens WHERE token = ?",
        )?;

        let mut rows = stmt.query([token])?;
        match rows.next()? {
            Some(row) => Ok(Some(RefreshToken {
                token: row.get(0)?,
                user_id: parse_uuid(row.get::<_, String>(1)?),
                expires_at: parse_datetime(row.get::<_, String>(2)?),
                created_at: parse_datetime(row.get::<_, String>(3)?),
            })),
            None => Ok(None),
        }
    }

    pub fn delete_refresh_token(&self, token: &str) -> Result<bool, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM refresh_tokens WHERE token = ?", [token])?;
        Ok(rows > 0)
    }

    pub fn delete_user_refresh_tokens(&self, user_id: Uuid) -> Result<usize, AppError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM refresh_tokens WHERE user_id = ?",
            [user_id.to_string()],
        )?;
        Ok(rows)
    }
}
