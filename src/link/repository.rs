//! Upload link and unlock repositories.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::model::{LinkUnlock, NewUploadLink, UploadLink};
use crate::db::is_unique_violation;
use crate::{CloudError, Result};

const LINK_COLUMNS: &str = "id, name, password, link_token, created_at, expires_at";
const UNLOCK_COLUMNS: &str = "id, user_id, upload_link_id, created_at, valid, expiry";

/// Repository for upload link rows.
pub struct UploadLinkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UploadLinkRepository<'a> {
    /// Create a new UploadLinkRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a link.
    pub async fn create(&self, link: &NewUploadLink) -> Result<UploadLink> {
        let result = sqlx::query(
            "INSERT INTO upload_links (name, password, link_token, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&link.name)
        .bind(&link.password_hash)
        .bind(&link.link_token)
        .bind(Utc::now())
        .bind(link.expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CloudError::Database("link token collision".to_string())
            } else {
                e.into()
            }
        })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id).await?.ok_or(CloudError::LinkNotFound)
    }

    /// Get a link by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<UploadLink>> {
        let link = sqlx::query_as::<_, UploadLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM upload_links WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(link)
    }

    /// Get a link by its token.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<UploadLink>> {
        let link = sqlx::query_as::<_, UploadLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM upload_links WHERE link_token = ?"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(link)
    }

    /// List all links, newest first.
    pub async fn list(&self) -> Result<Vec<UploadLink>> {
        let links = sqlx::query_as::<_, UploadLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM upload_links ORDER BY id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(links)
    }
}

/// Repository for link unlock rows.
pub struct LinkUnlockRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LinkUnlockRepository<'a> {
    /// Create a new LinkUnlockRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an unlock.
    pub async fn create(
        &self,
        user_id: i64,
        upload_link_id: i64,
        expiry: DateTime<Utc>,
    ) -> Result<LinkUnlock> {
        let result = sqlx::query(
            "INSERT INTO link_unlocks (user_id, upload_link_id, created_at, expiry)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(upload_link_id)
        .bind(Utc::now())
        .bind(expiry)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        let unlock = sqlx::query_as::<_, LinkUnlock>(&format!(
            "SELECT {UNLOCK_COLUMNS} FROM link_unlocks WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(unlock)
    }

    /// The most recent unlock of a link by a user.
    pub async fn get_latest(
        &self,
        user_id: i64,
        upload_link_id: i64,
    ) -> Result<Option<LinkUnlock>> {
        let unlock = sqlx::query_as::<_, LinkUnlock>(&format!(
            "SELECT {UNLOCK_COLUMNS} FROM link_unlocks
             WHERE user_id = ? AND upload_link_id = ?
             ORDER BY id DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(upload_link_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(unlock)
    }

    /// List a user's unlocks, newest first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<LinkUnlock>> {
        let unlocks = sqlx::query_as::<_, LinkUnlock>(&format!(
            "SELECT {UNLOCK_COLUMNS} FROM link_unlocks WHERE user_id = ? ORDER BY id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(unlocks)
    }

    /// Mark every unlock of a link by a user as invalid.
    ///
    /// Returns the number of rows revoked.
    pub async fn invalidate(&self, user_id: i64, upload_link_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE link_unlocks SET valid = 0
             WHERE user_id = ? AND upload_link_id = ? AND valid = 1",
        )
        .bind(user_id)
        .bind(upload_link_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
