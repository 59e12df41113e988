//! Login sessions for cloudvault.
//!
//! A session is an opaque random token bound to a user. Tokens are never
//! reused: logging out flips `valid` instead of deleting the row.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::is_unique_violation;
use crate::{CloudError, Result};

/// Session entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// Unique session ID.
    pub id: i64,
    /// Owner of the session.
    pub user_id: i64,
    /// Opaque token handed to the client.
    pub session_token: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// False once the session was invalidated.
    pub valid: bool,
}

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new SessionRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new session token for a user.
    pub async fn create(&self, user_id: i64, token: &str) -> Result<Session> {
        let result = sqlx::query(
            "INSERT INTO sessions (user_id, session_token, created_at, valid) VALUES (?, ?, ?, 1)",
        )
        .bind(user_id)
        .bind(token)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CloudError::Database("session token collision".to_string())
            } else {
                e.into()
            }
        })?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, session_token, created_at, valid FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(CloudError::SessionInvalid)
    }

    /// Look up a session by token, valid or not.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, session_token, created_at, valid
             FROM sessions WHERE session_token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// Invalidate a session by token.
    ///
    /// Returns true if a valid session was invalidated.
    pub async fn invalidate(&self, token: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE sessions SET valid = 0 WHERE session_token = ? AND valid = 1")
                .bind(token)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Invalidate every session of a user.
    ///
    /// Returns the number of sessions invalidated.
    pub async fn invalidate_all_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("UPDATE sessions SET valid = 0 WHERE user_id = ? AND valid = 1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
