//! Upload link and unlock models.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A named, password-protected, time-limited link.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UploadLink {
    /// Unique link ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Argon2 hash of the link password.
    pub password: String,
    /// Unguessable URL token.
    pub link_token: String,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
    /// After this instant the link is permanently unusable.
    pub expires_at: DateTime<Utc>,
}

impl UploadLink {
    /// Whether the link has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Record that a user proved a link's password.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LinkUnlock {
    /// Unique unlock ID.
    pub id: i64,
    /// User who unlocked the link.
    pub user_id: i64,
    /// Unlocked link.
    pub upload_link_id: i64,
    /// When the unlock was recorded.
    pub created_at: DateTime<Utc>,
    /// False once revoked.
    pub valid: bool,
    /// When the unlock stops working.
    pub expiry: DateTime<Utc>,
}

impl LinkUnlock {
    /// Whether the unlock grants access at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.valid && now <= self.expiry
    }
}

/// Data for creating an upload link.
#[derive(Debug, Clone)]
pub struct NewUploadLink {
    pub name: String,
    pub password_hash: String,
    pub link_token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_link_expiry() {
        let now = Utc::now();
        let link = UploadLink {
            id: 1,
            name: "drop".to_string(),
            password: "hash".to_string(),
            link_token: "abc".to_string(),
            created_at: now,
            expires_at: now,
        };

        assert!(!link.is_expired_at(now));
        assert!(link.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_unlock_active() {
        let now = Utc::now();
        let mut unlock = LinkUnlock {
            id: 1,
            user_id: 1,
            upload_link_id: 1,
            created_at: now,
            valid: true,
            expiry: now + Duration::minutes(1),
        };
        assert!(unlock.is_active_at(now));
        assert!(!unlock.is_active_at(now + Duration::minutes(2)));

        unlock.valid = false;
        assert!(!unlock.is_active_at(now));
    }
}
