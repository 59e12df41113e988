//! User registration for cloudvault.
//!
//! Registering creates the account and the user's root folder. The user
//! row is removed again if the root folder cannot be created, so every
//! account owns exactly one root.

use tracing::{info, warn};

use super::service::AuthService;
use crate::db::{DbPool, User, UserRepository};
use crate::file::{ContentStore, Folder, FolderTree};
use crate::path::PathConverter;
use crate::{CloudError, Result};

/// Creates accounts together with their root folder.
pub struct Registration<'a> {
    pool: &'a DbPool,
    store: &'a ContentStore,
}

impl<'a> Registration<'a> {
    /// Create a new Registration.
    pub fn new(pool: &'a DbPool, store: &'a ContentStore) -> Self {
        Self { pool, store }
    }

    /// Register a user and create their root folder.
    ///
    /// The username doubles as the root directory name, so it must be a
    /// valid single path segment.
    pub async fn register(&self, username: &str, password: &str) -> Result<(User, Folder)> {
        let trimmed = username.trim();
        if !trimmed.is_empty() && !PathConverter::is_valid_name(trimmed) {
            return Err(CloudError::InvalidPath(trimmed.to_string()));
        }

        let user = AuthService::new(self.pool).register(trimmed, password).await?;

        let root = match FolderTree::new(self.pool, self.store)
            .create_root_folder(user.id, &user.username)
            .await
        {
            Ok(root) => root,
            Err(e) => {
                warn!(
                    username = %user.username,
                    user_id = user.id,
                    error = %e,
                    "Root folder creation failed, removing account"
                );
                UserRepository::new(self.pool).delete(user.id).await?;
                return Err(e);
            }
        };

        info!(
            username = %user.username,
            user_id = user.id,
            root_id = root.id,
            "Account ready"
        );
        Ok((user, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::db::Database;

    #[tokio::test]
    async fn test_register_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let store = ContentStore::new(PathConverter::new(temp_dir.path()));
        let registration = Registration::new(db.pool(), &store);

        let (user, root) = registration.register("bob", "password123").await.unwrap();

        assert_eq!(root.user_id, user.id);
        assert_eq!(root.path, "bob");
        assert!(root.is_root());
        assert!(temp_dir.path().join("bob").is_dir());

        let tree = FolderTree::new(db.pool(), &store);
        let by_path = tree.get_by_path(user.id, "bob", "").await.unwrap();
        assert_eq!(by_path.id, root.id);
    }

    #[tokio::test]
    async fn test_register_rejects_unsafe_username() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let store = ContentStore::new(PathConverter::new(temp_dir.path()));
        let registration = Registration::new(db.pool(), &store);

        assert!(matches!(
            registration.register("../bob", "pw").await,
            Err(CloudError::InvalidPath(_))
        ));
        assert!(matches!(
            registration.register("", "pw").await,
            Err(CloudError::EmptyFields)
        ));
        assert_eq!(UserRepository::new(db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let store = ContentStore::new(PathConverter::new(temp_dir.path()));
        let registration = Registration::new(db.pool(), &store);

        registration.register("bob", "pw").await.unwrap();
        assert!(matches!(
            registration.register("bob", "pw").await,
            Err(CloudError::UserAlreadyExists)
        ));
    }
}
