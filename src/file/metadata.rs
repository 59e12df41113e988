//! File metadata types and repository for cloudvault.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{CloudError, Result};

/// Catalog entry for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileMetadata {
    /// Unique file ID.
    pub id: i64,
    /// Owner.
    pub user_id: i64,
    /// Containing folder, or None once the folder was deleted.
    pub folder_id: Option<i64>,
    /// Uploaded file name (display name).
    pub name: String,
    /// File size in bytes.
    pub size: i64,
    /// Detected MIME type.
    pub mime_type: String,
    /// DB path of the bytes below the owner's root.
    pub location: String,
    /// Lowercase hex SHA-256 of the content.
    pub hash: String,
    /// When the file was uploaded.
    pub created_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Whether the containing folder was deleted.
    pub fn is_orphaned(&self) -> bool {
        self.folder_id.is_none()
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Owner.
    pub user_id: i64,
    /// Containing folder.
    pub folder_id: Option<i64>,
    /// Uploaded file name.
    pub name: String,
    /// File size in bytes.
    pub size: i64,
    /// MIME type.
    pub mime_type: String,
    /// DB path of the stored bytes.
    pub location: String,
    /// Content hash.
    pub hash: String,
}

impl NewFile {
    /// Create a new NewFile.
    pub fn new(
        user_id: i64,
        folder_id: Option<i64>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            folder_id,
            name: name.into(),
            size: 0,
            mime_type: crate::file::mime::OCTET_STREAM.to_string(),
            location: location.into(),
            hash: String::new(),
        }
    }

    /// Set size and hash from what the content store wrote.
    pub fn with_content(mut self, size: i64, hash: impl Into<String>) -> Self {
        self.size = size;
        self.hash = hash.into();
        self
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

const FILE_COLUMNS: &str =
    "id, user_id, folder_id, name, size, mime_type, location, hash, created_at";

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new file entry.
    pub async fn create(&self, file: &NewFile) -> Result<FileMetadata> {
        let result = sqlx::query(
            "INSERT INTO files
                 (user_id, folder_id, name, size, mime_type, location, hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.user_id)
        .bind(file.folder_id)
        .bind(&file.name)
        .bind(file.size)
        .bind(&file.mime_type)
        .bind(&file.location)
        .bind(&file.hash)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id).await?.ok_or(CloudError::FileNotFound)
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileMetadata>> {
        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List all files of a user, newest first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// List a user's files directly inside a folder, ordered by name.
    pub async fn list_by_folder(&self, user_id: i64, folder_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ? AND folder_id = ? ORDER BY name, id"
        ))
        .bind(user_id)
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// List a user's orphaned files.
    pub async fn list_orphaned(&self, user_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ? AND folder_id IS NULL ORDER BY name, id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// List a user's files whose bytes sit below a DB path, at any depth.
    pub async fn list_under_location(
        &self,
        user_id: i64,
        db_path: &str,
    ) -> Result<Vec<FileMetadata>> {
        let prefix = format!("{db_path}/");
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ? AND substr(location, 1, ?) = ? ORDER BY id"
        ))
        .bind(user_id)
        .bind(prefix.chars().count() as i64)
        .bind(&prefix)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Point a file at another folder.
    ///
    /// Returns true if the file exists.
    pub async fn update_folder(&self, id: i64, folder_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET folder_id = ? WHERE id = ?")
            .bind(folder_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a new location after the bytes were moved, keeping the folder.
    pub async fn set_location(&self, id: i64, location: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET location = ? WHERE id = ?")
            .bind(location)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update folder and location together after the bytes were moved.
    pub async fn update_location(&self, id: i64, folder_id: i64, location: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET folder_id = ?, location = ? WHERE id = ?")
            .bind(folder_id)
            .bind(location)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a file entry.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};
    use crate::file::{FolderRepository, NewFolder};

    async fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("bob", "hash"))
            .await
            .unwrap();
        let root = FolderRepository::new(db.pool())
            .create(&NewFolder::new(user.id, "bob", "bob"))
            .await
            .unwrap();
        (db, user.id, root.id)
    }

    fn sample(user_id: i64, folder_id: i64, name: &str) -> NewFile {
        NewFile::new(user_id, Some(folder_id), name, name)
            .with_content(3, "abc123")
            .with_mime_type("text/plain")
    }

    #[tokio::test]
    async fn test_create_file() {
        let (db, user_id, root_id) = setup().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample(user_id, root_id, "a.txt")).await.unwrap();

        assert!(file.id > 0);
        assert_eq!(file.user_id, user_id);
        assert_eq!(file.folder_id, Some(root_id));
        assert_eq!(file.name, "a.txt");
        assert_eq!(file.size, 3);
        assert_eq!(file.hash, "abc123");
        assert_eq!(file.mime_type, "text/plain");
        assert!(!file.is_orphaned());
    }

    #[tokio::test]
    async fn test_list_files() {
        let (db, user_id, root_id) = setup().await;
        let repo = FileRepository::new(db.pool());

        repo.create(&sample(user_id, root_id, "b.txt")).await.unwrap();
        repo.create(&sample(user_id, root_id, "a.txt")).await.unwrap();

        let in_root = repo.list_by_folder(user_id, root_id).await.unwrap();
        assert_eq!(in_root.len(), 2);
        assert_eq!(in_root[0].name, "a.txt");

        assert_eq!(repo.list_by_user(user_id).await.unwrap().len(), 2);
        assert!(repo.list_by_user(user_id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_folder_and_orphans() {
        let (db, user_id, root_id) = setup().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample(user_id, root_id, "a.txt")).await.unwrap();

        assert!(repo.update_folder(file.id, None).await.unwrap());
        let orphans = repo.list_orphaned(user_id).await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert!(orphans[0].is_orphaned());

        assert!(repo.update_location(file.id, root_id, "x/a.txt").await.unwrap());
        let moved = repo.get_by_id(file.id).await.unwrap().unwrap();
        assert_eq!(moved.folder_id, Some(root_id));
        assert_eq!(moved.location, "x/a.txt");

        assert!(repo.set_location(file.id, "a.txt").await.unwrap());
        let back = repo.get_by_id(file.id).await.unwrap().unwrap();
        assert_eq!(back.location, "a.txt");
        assert_eq!(back.folder_id, Some(root_id));
    }

    #[tokio::test]
    async fn test_list_under_location() {
        let (db, user_id, root_id) = setup().await;
        let repo = FileRepository::new(db.pool());

        for location in ["docs/a.txt", "docs/deep/b.txt", "docs2/c.txt", "d.txt"] {
            repo.create(&NewFile::new(user_id, Some(root_id), "f", location))
                .await
                .unwrap();
        }

        let under: Vec<String> = repo
            .list_under_location(user_id, "docs")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.location)
            .collect();
        assert_eq!(under, vec!["docs/a.txt", "docs/deep/b.txt"]);
        assert!(repo.list_under_location(user_id + 1, "docs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (db, user_id, root_id) = setup().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample(user_id, root_id, "a.txt")).await.unwrap();

        assert!(repo.delete(file.id).await.unwrap());
        assert!(repo.get_by_id(file.id).await.unwrap().is_none());
        assert!(!repo.delete(file.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_folder_delete_orphans_files() {
        let (db, user_id, root_id) = setup().await;
        let folders = FolderRepository::new(db.pool());
        let repo = FileRepository::new(db.pool());

        let docs = folders
            .create(&NewFolder::new(user_id, "docs", "bob/docs").with_parent(root_id))
            .await
            .unwrap();
        let file = repo.create(&sample(user_id, docs.id, "a.txt")).await.unwrap();

        folders.delete(docs.id).await.unwrap();

        let file = repo.get_by_id(file.id).await.unwrap().unwrap();
        assert_eq!(file.folder_id, None);
    }
}
