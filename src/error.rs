//! Error types for cloudvault.

use thiserror::Error;

/// Common error type for cloudvault.
///
/// Ownership mismatches are reported with the same "not found" kinds as
/// genuinely missing rows, so callers never learn that another user's
/// resource exists.
#[derive(Error, Debug)]
pub enum CloudError {
    /// Database error.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Password(String),

    /// The folder does not exist or belongs to someone else.
    #[error("folder not found")]
    FolderNotFound,

    /// Folder name is empty or contains a path separator.
    #[error("invalid folder name")]
    InvalidFolderName,

    /// A folder with the same path already exists for this user.
    #[error("folder already exists")]
    FolderAlreadyExists,

    /// Moving a folder below itself would create a cycle.
    #[error("cannot move a folder into itself or one of its descendants")]
    CannotMoveToChild,

    /// Folder still has subfolders and cannot be deleted.
    #[error("folder is not empty")]
    FolderNotEmpty,

    /// The root folder cannot be moved or deleted.
    #[error("the root folder cannot be moved or deleted")]
    RootFolderProtected,

    /// The file does not exist or is not visible to the caller.
    #[error("file not found")]
    FileNotFound,

    /// The caller does not own the file.
    #[error("only the owner can access this file")]
    NotOwner,

    /// The caller may not perform this action on the file.
    #[error("unauthorized")]
    Unauthorized,

    /// Share permission is neither `read` nor `write`.
    #[error("permission must be read or write")]
    InvalidPermission,

    /// A file cannot be shared with its own owner.
    #[error("a file cannot be shared with its owner")]
    InvalidRecipient,

    /// Share does not exist.
    #[error("share not found")]
    ShareNotFound,

    /// The file is already shared with this recipient.
    #[error("file is already shared with this user")]
    ShareAlreadyExists,

    /// User does not exist.
    #[error("user not found")]
    UserNotFound,

    /// Username is taken.
    #[error("username already exists")]
    UserAlreadyExists,

    /// A required field was blank.
    #[error("required fields are empty")]
    EmptyFields,

    /// Unknown username or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Session token is unknown or was invalidated.
    #[error("session invalid")]
    SessionInvalid,

    /// Upload link token does not resolve.
    #[error("upload link not found")]
    LinkNotFound,

    /// Upload link is past its expiry.
    #[error("upload link expired")]
    LinkExpired,

    /// Upload link password did not match.
    #[error("invalid password")]
    InvalidPassword,

    /// The unlock was revoked.
    #[error("the link unlock has been invalidated")]
    LinkUnlockInvalid,

    /// The unlock is past its own expiry.
    #[error("the link unlock has expired")]
    LinkUnlockExpired,

    /// Path contains traversal or unsafe characters.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Uploaded part is larger than the configured limit.
    #[error("upload exceeds the maximum size of {limit} bytes")]
    UploadTooLarge {
        /// Limit in bytes.
        limit: u64,
    },

    /// A multi-file upload stopped part-way.
    ///
    /// Files listed in `stored` were persisted and are not rolled back.
    #[error("upload of {failed:?} failed after storing {} file(s): {source}", .stored.len())]
    PartialUpload {
        /// Names of the files stored before the failure.
        stored: Vec<String>,
        /// Name of the file that failed.
        failed: String,
        /// Underlying error.
        source: Box<CloudError>,
    },
}

impl From<sqlx::Error> for CloudError {
    fn from(e: sqlx::Error) -> Self {
        CloudError::Database(e.to_string())
    }
}

/// Result type alias for cloudvault operations.
pub type Result<T> = std::result::Result<T, CloudError>;
