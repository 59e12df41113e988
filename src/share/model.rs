//! Share entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::CloudError;

/// Access level granted by a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum SharePermission {
    /// Recipient may download the file.
    Read,
    /// Recipient may also modify the file.
    Write,
}

impl SharePermission {
    /// Return the permission as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for SharePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SharePermission {
    type Err = CloudError;

    /// Exactly `read` or `write`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            _ => Err(CloudError::InvalidPermission),
        }
    }
}

/// A direct grant of one file to another user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FileShare {
    /// Unique share ID.
    pub id: i64,
    /// Shared file.
    pub file_id: i64,
    /// Recipient.
    pub shared_with_id: i64,
    /// Granted access level.
    pub permission: SharePermission,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
    /// When the share stops working (None means never).
    pub expires_at: Option<DateTime<Utc>>,
}

impl FileShare {
    /// Whether the share is usable at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// A file shared with the current user, joined with file and owner details.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SharedFile {
    /// Share ID.
    pub share_id: i64,
    /// Shared file ID.
    pub file_id: i64,
    /// File name.
    pub name: String,
    /// File size in bytes.
    pub size: i64,
    /// MIME type.
    pub mime_type: String,
    /// When the file was uploaded.
    pub created_at: DateTime<Utc>,
    /// When the share expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Username of the file's owner.
    pub shared_by_name: String,
    /// Granted access level.
    pub permission: SharePermission,
}

/// Data for creating a share.
#[derive(Debug, Clone)]
pub struct NewFileShare {
    /// File to share.
    pub file_id: i64,
    /// Recipient.
    pub shared_with_id: i64,
    /// Access level.
    pub permission: SharePermission,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewFileShare {
    /// Create a share definition without expiry.
    pub fn new(file_id: i64, shared_with_id: i64, permission: SharePermission) -> Self {
        Self {
            file_id,
            shared_with_id,
            permission,
            expires_at: None,
        }
    }

    /// Set an expiry.
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_permission_from_str() {
        assert_eq!("read".parse::<SharePermission>().unwrap(), SharePermission::Read);
        assert_eq!("write".parse::<SharePermission>().unwrap(), SharePermission::Write);
        assert!(matches!(
            "admin".parse::<SharePermission>(),
            Err(CloudError::InvalidPermission)
        ));
        assert!("READ".parse::<SharePermission>().is_err());
        assert!("".parse::<SharePermission>().is_err());
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(SharePermission::Read.to_string(), "read");
        assert_eq!(SharePermission::Write.as_str(), "write");
    }

    #[test]
    fn test_is_active_at() {
        let now = Utc::now();
        let mut share = FileShare {
            id: 1,
            file_id: 1,
            shared_with_id: 2,
            permission: SharePermission::Read,
            created_at: now,
            expires_at: None,
        };
        assert!(share.is_active_at(now));

        share.expires_at = Some(now + Duration::hours(1));
        assert!(share.is_active_at(now));

        share.expires_at = Some(now);
        assert!(!share.is_active_at(now));
    }
}
