//! cloudvault - personal cloud storage core
//!
//! Per-user folder trees, streamed file content with SHA-256 hashes, direct
//! file shares and password-protected upload links, on SQLite and a local
//! data directory.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod link;
pub mod logging;
pub mod path;
pub mod services;
pub mod share;
pub mod token;

pub use auth::{hash_password, verify_password, AuthProvider, AuthService, Registration};
pub use config::Config;
pub use db::{Database, NewUser, Session, User, UserRepository};
pub use error::{CloudError, Result};
pub use file::{
    ContentStore, ContentStream, FileCatalog, FileMetadata, Folder, FolderTree, UploadPart,
};
pub use link::{LinkUnlock, LinkUnlockTracker, UploadLink, UploadLinkRegistry};
pub use path::{Breadcrumb, PathConverter};
pub use services::Services;
pub use share::{FileShare, SharePermission, ShareRegistry, SharedFile};
