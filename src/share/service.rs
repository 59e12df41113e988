//! Direct file shares between users.
//!
//! A share's lifecycle belongs to the file's owner: only the owner creates,
//! inspects or revokes it. Expiry is evaluated on read against the caller's
//! clock, nothing sweeps expired rows.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::model::{FileShare, NewFileShare, SharePermission, SharedFile};
use super::repository::ShareRepository;
use crate::db::{DbPool, UserRepository};
use crate::file::{FileMetadata, FileRepository};
use crate::{CloudError, Result};

/// Service for creating, listing and revoking file shares.
pub struct ShareRegistry<'a> {
    pool: &'a DbPool,
}

impl<'a> ShareRegistry<'a> {
    /// Create a new ShareRegistry.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    fn shares(&self) -> ShareRepository<'a> {
        ShareRepository::new(self.pool)
    }

    /// Load a file and make sure `owner_id` owns it.
    async fn owned_file(&self, owner_id: i64, file_id: i64) -> Result<FileMetadata> {
        let file = FileRepository::new(self.pool)
            .get_by_id(file_id)
            .await?
            .ok_or(CloudError::FileNotFound)?;

        if file.user_id != owner_id {
            return Err(CloudError::NotOwner);
        }
        Ok(file)
    }

    /// Share a file with another user.
    ///
    /// `permission` must be exactly `read` or `write`.
    pub async fn create_file_share(
        &self,
        owner_id: i64,
        file_id: i64,
        recipient_id: i64,
        permission: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<FileShare> {
        let permission: SharePermission = permission.parse()?;
        let file = self.owned_file(owner_id, file_id).await?;

        if recipient_id == owner_id {
            return Err(CloudError::InvalidRecipient);
        }
        if !UserRepository::new(self.pool).exists(recipient_id).await? {
            return Err(CloudError::UserNotFound);
        }

        let mut new_share = NewFileShare::new(file.id, recipient_id, permission);
        if let Some(expires_at) = expires_at {
            new_share = new_share.expires_at(expires_at);
        }
        let share = self.shares().create(&new_share).await?;

        info!(
            "User {} shared file {} with user {} ({})",
            owner_id, file.id, recipient_id, permission
        );
        Ok(share)
    }

    /// All shares addressed to a user, including expired ones.
    pub async fn get_by_recipient(&self, user_id: i64) -> Result<Vec<FileShare>> {
        self.shares().list_by_recipient(user_id).await
    }

    /// Files currently shared with a user, with owner names.
    pub async fn get_shared_files(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<SharedFile>> {
        let files = self.shares().list_shared_files(user_id).await?;

        Ok(files
            .into_iter()
            .filter(|f| f.expires_at.map_or(true, |expires_at| expires_at > now))
            .collect())
    }

    /// Get a share, visible only to the owner of the shared file.
    pub async fn get_by_id(&self, requester_id: i64, share_id: i64) -> Result<FileShare> {
        let share = self
            .shares()
            .get_by_id(share_id)
            .await?
            .ok_or(CloudError::ShareNotFound)?;

        self.owned_file(requester_id, share.file_id).await?;
        Ok(share)
    }

    /// Revoke a share. Only the file's owner may do this.
    pub async fn delete_file_share(&self, requester_id: i64, share_id: i64) -> Result<()> {
        let share = self.get_by_id(requester_id, share_id).await?;
        self.shares().delete(share.id).await?;

        info!(
            "User {} revoked share {} of file {}",
            requester_id, share.id, share.file_id
        );
        Ok(())
    }

    /// The share granting `recipient_id` access to `file_id` at `now`.
    ///
    /// Missing and expired shares both fail with `FileNotFound`.
    pub async fn get_active_share(
        &self,
        file_id: i64,
        recipient_id: i64,
        now: DateTime<Utc>,
    ) -> Result<FileShare> {
        match self
            .shares()
            .get_by_file_and_recipient(file_id, recipient_id)
            .await?
        {
            Some(share) if share.is_active_at(now) => Ok(share),
            _ => {
                debug!("No active share of file {} for user {}", file_id, recipient_id);
                Err(CloudError::FileNotFound)
            }
        }
    }

    /// All shares of a file, for its owner.
    pub async fn get_shares_for_file(&self, owner_id: i64, file_id: i64) -> Result<Vec<FileShare>> {
        self.owned_file(owner_id, file_id).await?;
        self.shares().list_by_file(file_id).await
    }
}
