//! Authentication module for cloudvault.
//!
//! This module provides password hashing, session handling and user
//! registration.

mod password;
mod registration;
mod service;

pub use password::{hash_password, verify_password, MAX_PASSWORD_LENGTH};
pub use registration::Registration;
pub use service::{AuthProvider, AuthService};
