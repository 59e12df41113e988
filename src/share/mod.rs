//! File sharing module for cloudvault.
//!
//! This module provides direct, permissioned grants of a single file to
//! another user:
//! - Share model and permission levels
//! - Share repository
//! - ShareRegistry service with owner-only lifecycle and read-time expiry

mod model;
mod repository;
mod service;

pub use model::{FileShare, NewFileShare, SharePermission, SharedFile};
pub use repository::ShareRepository;
pub use service::ShareRegistry;
