//! Upload link registry.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::model::{NewUploadLink, UploadLink};
use super::repository::UploadLinkRepository;
use crate::auth::{hash_password, verify_password};
use crate::db::DbPool;
use crate::token::{generate_token, DEFAULT_TOKEN_BYTES};
use crate::{CloudError, Result};

/// Service for password-protected upload links.
pub struct UploadLinkRegistry<'a> {
    pool: &'a DbPool,
    token_bytes: usize,
}

impl<'a> UploadLinkRegistry<'a> {
    /// Create a new UploadLinkRegistry.
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            token_bytes: DEFAULT_TOKEN_BYTES,
        }
    }

    /// Set the number of random bytes in generated link tokens.
    pub fn with_token_bytes(mut self, token_bytes: usize) -> Self {
        self.token_bytes = token_bytes;
        self
    }

    fn links(&self) -> UploadLinkRepository<'a> {
        UploadLinkRepository::new(self.pool)
    }

    /// Create a link protected by `password`.
    ///
    /// The password is stored as an Argon2 hash; the returned link carries
    /// a freshly generated token.
    pub async fn create_upload_link(
        &self,
        name: &str,
        password: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<UploadLink> {
        let name = name.trim();
        if name.is_empty() || password.is_empty() {
            return Err(CloudError::EmptyFields);
        }

        let new_link = NewUploadLink {
            name: name.to_string(),
            password_hash: hash_password(password)?,
            link_token: generate_token(self.token_bytes),
            expires_at,
        };
        let link = self.links().create(&new_link).await?;

        info!("Created upload link {} ({:?})", link.id, link.name);
        Ok(link)
    }

    /// Check a password against a link.
    ///
    /// Expiry is checked before the password, so an expired link never
    /// reveals whether the password was right.
    pub async fn validate_password(
        &self,
        token: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<UploadLink> {
        let link = self.get_active_by_token(token, now).await?;

        if !verify_password(password, &link.password) {
            debug!("Wrong password for upload link {}", link.id);
            return Err(CloudError::InvalidPassword);
        }
        Ok(link)
    }

    /// All links, newest first.
    pub async fn get_all_links(&self) -> Result<Vec<UploadLink>> {
        self.links().list().await
    }

    /// Resolve a token without looking at expiry.
    pub async fn get_by_token(&self, token: &str) -> Result<UploadLink> {
        self.links()
            .get_by_token(token)
            .await?
            .ok_or(CloudError::LinkNotFound)
    }

    /// Resolve a token, failing with `LinkExpired` past the link's expiry.
    pub async fn get_active_by_token(&self, token: &str, now: DateTime<Utc>) -> Result<UploadLink> {
        let link = self.get_by_token(token).await?;
        if link.is_expired_at(now) {
            return Err(CloudError::LinkExpired);
        }
        Ok(link)
    }
}
