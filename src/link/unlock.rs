//! Per-user unlocks of upload links.
//!
//! An unlock has its own expiry, independent of the link's. Revoking one
//! user's unlock leaves the link and other users' unlocks untouched.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::model::LinkUnlock;
use super::registry::UploadLinkRegistry;
use super::repository::LinkUnlockRepository;
use crate::db::DbPool;
use crate::{CloudError, Result};

/// Default lifetime of an unlock obtained with a password.
pub const DEFAULT_UNLOCK_TTL_SECS: i64 = 3600;

/// Tracks which users unlocked which links, and until when.
pub struct LinkUnlockTracker<'a> {
    pool: &'a DbPool,
    unlock_ttl: Duration,
}

impl<'a> LinkUnlockTracker<'a> {
    /// Create a new LinkUnlockTracker.
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            unlock_ttl: Duration::seconds(DEFAULT_UNLOCK_TTL_SECS),
        }
    }

    /// Set the lifetime of unlocks created by `unlock_with_password`.
    pub fn with_unlock_ttl(mut self, ttl: Duration) -> Self {
        self.unlock_ttl = ttl;
        self
    }

    fn unlocks(&self) -> LinkUnlockRepository<'a> {
        LinkUnlockRepository::new(self.pool)
    }

    /// Record that a user unlocked a link until `expiry`.
    pub async fn unlock_link(
        &self,
        user_id: i64,
        upload_link_id: i64,
        expiry: DateTime<Utc>,
    ) -> Result<LinkUnlock> {
        let unlock = self.unlocks().create(user_id, upload_link_id, expiry).await?;

        info!(
            "User {} unlocked upload link {} until {}",
            user_id, upload_link_id, expiry
        );
        Ok(unlock)
    }

    /// Whether a user currently holds an unlock of a link.
    ///
    /// The latest unlock governs. Returns `Ok(false)` when the user never
    /// unlocked the link; a past expiry fails with `LinkUnlockExpired` and
    /// a revoked unlock with `LinkUnlockInvalid`.
    pub async fn has_unlocked(
        &self,
        user_id: i64,
        upload_link_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(unlock) = self.unlocks().get_latest(user_id, upload_link_id).await? else {
            debug!("User {} has no unlock for link {}", user_id, upload_link_id);
            return Ok(false);
        };

        if now > unlock.expiry {
            return Err(CloudError::LinkUnlockExpired);
        }
        if !unlock.valid {
            return Err(CloudError::LinkUnlockInvalid);
        }
        Ok(true)
    }

    /// Validate a link password and record an unlock for the user.
    ///
    /// The unlock lasts for the configured TTL, but never past the link's
    /// own expiry.
    pub async fn unlock_with_password(
        &self,
        user_id: i64,
        token: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LinkUnlock> {
        let link = UploadLinkRegistry::new(self.pool)
            .validate_password(token, password, now)
            .await?;
        let expiry = now
            .checked_add_signed(self.unlock_ttl)
            .map_or(link.expires_at, |end| end.min(link.expires_at));

        self.unlock_link(user_id, link.id, expiry).await
    }

    /// Revoke a user's unlocks of a link.
    ///
    /// Returns true if an active unlock was revoked.
    pub async fn revoke_unlock(&self, user_id: i64, upload_link_id: i64) -> Result<bool> {
        let revoked = self.unlocks().invalidate(user_id, upload_link_id).await?;
        if revoked > 0 {
            info!(
                "Revoked {} unlock(s) of link {} for user {}",
                revoked, upload_link_id, user_id
            );
        }
        Ok(revoked > 0)
    }

    /// All unlocks held by a user, newest first.
    pub async fn get_user_unlocks(&self, user_id: i64) -> Result<Vec<LinkUnlock>> {
        self.unlocks().list_by_user(user_id).await
    }
}
