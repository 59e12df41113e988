//! User repository for cloudvault.
//!
//! This module provides CRUD operations for users in the database.

use chrono::Utc;
use sqlx::SqlitePool;

use super::is_unique_violation;
use super::user::{NewUser, User};
use crate::{CloudError, Result};

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns `UserAlreadyExists` if the username is taken.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result =
            sqlx::query("INSERT INTO users (username, password, created_at) VALUES (?, ?, ?)")
                .bind(&new_user.username)
                .bind(&new_user.password)
                .bind(Utc::now())
                .execute(self.pool)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        CloudError::UserAlreadyExists
                    } else {
                        e.into()
                    }
                })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id).await?.ok_or(CloudError::UserNotFound)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Check whether a user with the given ID exists.
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// Delete a user by ID.
    ///
    /// Sessions, folders, files, shares and unlocks owned by the user are
    /// removed by the schema's cascades. Files on disk are left alone.
    /// Returns true if a user was deleted.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
