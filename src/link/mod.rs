//! Upload links for cloudvault.
//!
//! This module provides:
//! - Password-protected, time-limited upload links
//! - Per-user unlock records with their own expiry and revocation

mod model;
mod registry;
mod repository;
mod unlock;

pub use model::{LinkUnlock, NewUploadLink, UploadLink};
pub use registry::UploadLinkRegistry;
pub use repository::{LinkUnlockRepository, UploadLinkRepository};
pub use unlock::{LinkUnlockTracker, DEFAULT_UNLOCK_TTL_SECS};
