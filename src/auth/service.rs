//! Account and session service.
//!
//! The storage core only needs to turn a session token into a user; that
//! capability is the [`AuthProvider`] trait. [`AuthService`] implements it
//! over the `users` and `sessions` tables.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::auth::{hash_password, verify_password};
use crate::db::{DbPool, NewUser, Session, SessionRepository, User, UserRepository};
use crate::token::{generate_token, DEFAULT_TOKEN_BYTES};
use crate::{CloudError, Result};

/// Resolves the current user from a session token.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Return the user owning a valid session.
    ///
    /// Fails with `SessionInvalid` for unknown or invalidated tokens.
    async fn resolve_user(&self, session_token: &str) -> Result<User>;
}

/// Registration, login and session handling.
pub struct AuthService<'a> {
    pool: &'a DbPool,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    fn users(&self) -> UserRepository<'a> {
        UserRepository::new(self.pool)
    }

    fn sessions(&self) -> SessionRepository<'a> {
        SessionRepository::new(self.pool)
    }

    /// Create an account.
    pub async fn register(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(CloudError::EmptyFields);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users()
            .create(&NewUser::new(username, password_hash))
            .await?;

        info!(username = %user.username, user_id = user.id, "New user registered");
        Ok(user)
    }

    /// Check a username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let Some(user) = self.users().get_by_username(username.trim()).await? else {
            warn!(username = %username, "Login failed: user not found");
            return Err(CloudError::InvalidCredentials);
        };

        if !verify_password(password, &user.password) {
            warn!(username = %username, "Login failed: wrong password");
            return Err(CloudError::InvalidCredentials);
        }

        debug!(username = %username, user_id = user.id, "Credentials accepted");
        Ok(user)
    }

    /// Open a session for a user and return it.
    pub async fn create_session(&self, user: &User) -> Result<Session> {
        let token = generate_token(DEFAULT_TOKEN_BYTES);
        let session = self.sessions().create(user.id, &token).await?;

        info!(username = %user.username, user_id = user.id, "Login successful");
        Ok(session)
    }

    /// Invalidate a session.
    ///
    /// Returns true if a valid session was closed.
    pub async fn destroy_session(&self, session_token: &str) -> Result<bool> {
        let closed = self.sessions().invalidate(session_token).await?;
        if closed {
            info!("Session logged out");
        }
        Ok(closed)
    }
}

#[async_trait]
impl AuthProvider for AuthService<'_> {
    async fn resolve_user(&self, session_token: &str) -> Result<User> {
        let session = match self.sessions().get_by_token(session_token).await? {
            Some(session) if session.valid => session,
            _ => return Err(CloudError::SessionInvalid),
        };

        self.users()
            .get_by_id(session.user_id)
            .await?
            .ok_or(CloudError::SessionInvalid)
    }
}
