//! Folder types and repository for cloudvault.
//!
//! The repository is a thin mapping onto the `folders` table. Ownership,
//! name validation and cycle checks live in [`FolderTree`](super::FolderTree).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::is_unique_violation;
use crate::{CloudError, Result};

/// A folder in a user's tree.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Owner.
    pub user_id: i64,
    /// Parent folder ID (None for the user's root).
    pub parent_id: Option<i64>,
    /// Folder name (the username for the root).
    pub name: String,
    /// Stored path, always starting with the owner's username.
    pub path: String,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last moved or renamed.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Whether this is the user's root folder.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Owner.
    pub user_id: i64,
    /// Parent folder ID (None for the root).
    pub parent_id: Option<i64>,
    /// Folder name.
    pub name: String,
    /// Stored path (username-prefixed).
    pub path: String,
}

impl NewFolder {
    /// Create a root folder definition.
    pub fn new(user_id: i64, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            user_id,
            parent_id: None,
            name: name.into(),
            path: path.into(),
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// A planned move or rename of a folder subtree.
#[derive(Debug, Clone)]
pub struct FolderMove {
    /// Owner of the subtree.
    pub user_id: i64,
    /// Folder being moved.
    pub folder_id: i64,
    /// New parent folder.
    pub new_parent_id: i64,
    /// New folder name.
    pub new_name: String,
    /// Stored path before the move.
    pub old_path: String,
    /// Stored path after the move.
    pub new_path: String,
    /// DB path before the move.
    pub old_db_path: String,
    /// DB path after the move.
    pub new_db_path: String,
}

const FOLDER_COLUMNS: &str = "id, user_id, parent_id, name, path, created_at, updated_at";

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    ///
    /// A duplicate `(user_id, path)` or a second root for the same user
    /// fails with `FolderAlreadyExists`.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO folders (user_id, parent_id, name, path, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(folder.user_id)
        .bind(folder.parent_id)
        .bind(&folder.name)
        .bind(&folder.path)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CloudError::FolderAlreadyExists
            } else {
                e.into()
            }
        })?;

        let id = result.last_insert_rowid();
        self.get_by_id(id).await?.ok_or(CloudError::FolderNotFound)
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// Get a user's folder by stored path.
    pub async fn get_by_path(&self, user_id: i64, path: &str) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ? AND path = ?"
        ))
        .bind(user_id)
        .bind(path)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// Get a user's root folder.
    pub async fn get_root(&self, user_id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ? AND parent_id IS NULL"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// List a user's root folders (parent_id is NULL).
    pub async fn list_root(&self, user_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE user_id = ? AND parent_id IS NULL ORDER BY name, id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// List a user's child folders of a parent folder.
    pub async fn list_by_parent(&self, user_id: i64, parent_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE user_id = ? AND parent_id = ? ORDER BY name, id"
        ))
        .bind(user_id)
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// List every folder of a user, ordered by path.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ? ORDER BY path"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Get the chain of folders from the root down to `id`.
    ///
    /// Stops early if a parent is missing or a loop is detected.
    pub async fn get_path(&self, id: i64) -> Result<Vec<Folder>> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current_id = Some(id);

        while let Some(folder_id) = current_id {
            if !seen.insert(folder_id) {
                break;
            }
            match self.get_by_id(folder_id).await? {
                Some(folder) => {
                    current_id = folder.parent_id;
                    path.push(folder);
                }
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }

    /// Count direct subfolders.
    pub async fn count_children(&self, folder_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE parent_id = ?")
            .bind(folder_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Count files directly in a folder.
    pub async fn count_files(&self, folder_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE folder_id = ?")
            .bind(folder_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Move a folder, rewriting the paths below it.
    ///
    /// The folder row, every descendant folder's `path` and every file
    /// `location` under the old DB path are updated in one transaction.
    pub async fn relocate(&self, plan: &FolderMove) -> Result<Option<Folder>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE folders SET parent_id = ?, name = ?, path = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(plan.new_parent_id)
        .bind(&plan.new_name)
        .bind(&plan.new_path)
        .bind(now)
        .bind(plan.folder_id)
        .bind(plan.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CloudError::FolderAlreadyExists
            } else {
                e.into()
            }
        })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        // Descendants: replace the old prefix, keep the tail.
        let old_prefix = format!("{}/", plan.old_path);
        let new_prefix = format!("{}/", plan.new_path);
        let old_chars = old_prefix.chars().count() as i64;
        sqlx::query(
            "UPDATE folders SET path = ? || substr(path, ?), updated_at = ?
             WHERE user_id = ? AND substr(path, 1, ?) = ?",
        )
        .bind(&new_prefix)
        .bind(old_chars + 1)
        .bind(now)
        .bind(plan.user_id)
        .bind(old_chars)
        .bind(&old_prefix)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CloudError::FolderAlreadyExists
            } else {
                e.into()
            }
        })?;

        let old_prefix = format!("{}/", plan.old_db_path);
        let new_prefix = format!("{}/", plan.new_db_path);
        let old_chars = old_prefix.chars().count() as i64;
        sqlx::query(
            "UPDATE files SET location = ? || substr(location, ?)
             WHERE user_id = ? AND substr(location, 1, ?) = ?",
        )
        .bind(&new_prefix)
        .bind(old_chars + 1)
        .bind(plan.user_id)
        .bind(old_chars)
        .bind(&old_prefix)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_by_id(plan.folder_id).await
    }

    /// Delete a folder by ID, orphaning the files directly inside it.
    ///
    /// Fails with a database error while subfolders still reference it.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE files SET folder_id = NULL WHERE folder_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
