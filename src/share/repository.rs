//! Share repository for cloudvault.

use chrono::Utc;
use sqlx::SqlitePool;

use super::model::{FileShare, NewFileShare, SharedFile};
use crate::db::is_unique_violation;
use crate::{CloudError, Result};

const SHARE_COLUMNS: &str = "id, file_id, shared_with_id, permission, created_at, expires_at";

/// Repository for file share rows.
pub struct ShareRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ShareRepository<'a> {
    /// Create a new ShareRepository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a share.
    ///
    /// A second share of the same file with the same recipient fails with
    /// `ShareAlreadyExists`.
    pub async fn create(&self, share: &NewFileShare) -> Result<FileShare> {
        let result = sqlx::query(
            "INSERT INTO file_shares (file_id, shared_with_id, permission, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(share.file_id)
        .bind(share.shared_with_id)
        .bind(share.permission)
        .bind(Utc::now())
        .bind(share.expires_at)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CloudError::ShareAlreadyExists
            } else {
                e.into()
            }
        })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id).await?.ok_or(CloudError::ShareNotFound)
    }

    /// Get a share by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileShare>> {
        let share = sqlx::query_as::<_, FileShare>(&format!(
            "SELECT {SHARE_COLUMNS} FROM file_shares WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(share)
    }

    /// Get the share of a file with a recipient, expired or not.
    pub async fn get_by_file_and_recipient(
        &self,
        file_id: i64,
        recipient_id: i64,
    ) -> Result<Option<FileShare>> {
        let share = sqlx::query_as::<_, FileShare>(&format!(
            "SELECT {SHARE_COLUMNS} FROM file_shares WHERE file_id = ? AND shared_with_id = ?"
        ))
        .bind(file_id)
        .bind(recipient_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(share)
    }

    /// List every share addressed to a recipient, expired ones included.
    pub async fn list_by_recipient(&self, recipient_id: i64) -> Result<Vec<FileShare>> {
        let shares = sqlx::query_as::<_, FileShare>(&format!(
            "SELECT {SHARE_COLUMNS} FROM file_shares
             WHERE shared_with_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(recipient_id)
        .fetch_all(self.pool)
        .await?;

        Ok(shares)
    }

    /// List the shares of one file.
    pub async fn list_by_file(&self, file_id: i64) -> Result<Vec<FileShare>> {
        let shares = sqlx::query_as::<_, FileShare>(&format!(
            "SELECT {SHARE_COLUMNS} FROM file_shares WHERE file_id = ? ORDER BY id"
        ))
        .bind(file_id)
        .fetch_all(self.pool)
        .await?;

        Ok(shares)
    }

    /// List files shared with a recipient, joined with file and owner details.
    ///
    /// Expired shares are included; callers filter against their own clock.
    pub async fn list_shared_files(&self, recipient_id: i64) -> Result<Vec<SharedFile>> {
        let files = sqlx::query_as::<_, SharedFile>(
            "SELECT s.id AS share_id, f.id AS file_id, f.name, f.size, f.mime_type,
                    f.created_at, s.expires_at, u.username AS shared_by_name, s.permission
             FROM file_shares s
             JOIN files f ON f.id = s.file_id
             JOIN users u ON u.id = f.user_id
             WHERE s.shared_with_id = ?
             ORDER BY f.name, s.id",
        )
        .bind(recipient_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Delete a share by ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM file_shares WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
