//! File catalog for cloudvault.
//!
//! This module provides high-level file operations including:
//! - Streaming multi-file upload into a user's folder
//! - Download by the owner or by a share recipient
//! - File listing and deletion
//!
//! Bytes are written before the catalog row. If the insert fails the
//! bytes are removed best-effort and the leftover is logged.

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tracing::{info, warn};

use super::folder::FolderRepository;
use super::metadata::{FileMetadata, FileRepository, NewFile};
use super::mime::detect_mime_type;
use super::storage::{ContentStore, ContentStream};
use crate::db::{DbPool, User, UserRepository};
use crate::path::PathConverter;
use crate::share::ShareRegistry;
use crate::{CloudError, Result};

/// One file of a multi-file upload.
#[derive(Debug)]
pub struct UploadPart<R> {
    /// File name as sent by the client.
    pub filename: String,
    /// Content.
    pub reader: R,
}

impl<R> UploadPart<R> {
    /// Create a new upload part.
    pub fn new(filename: impl Into<String>, reader: R) -> Self {
        Self {
            filename: filename.into(),
            reader,
        }
    }
}

/// Service binding file metadata to stored content.
pub struct FileCatalog<'a> {
    pool: &'a DbPool,
    store: &'a ContentStore,
}

impl<'a> FileCatalog<'a> {
    /// Create a new FileCatalog.
    pub fn new(pool: &'a DbPool, store: &'a ContentStore) -> Self {
        Self { pool, store }
    }

    fn files(&self) -> FileRepository<'a> {
        FileRepository::new(self.pool)
    }

    /// Store every part of an upload into one of the user's folders.
    ///
    /// Parts without a file name are skipped. Parts are stored in order and
    /// a failure stops the upload. Files stored before the failing part are
    /// kept, and the error is wrapped in `PartialUpload` naming them.
    pub async fn store_files<S, R>(
        &self,
        user: &User,
        folder_id: i64,
        mut parts: S,
    ) -> Result<Vec<FileMetadata>>
    where
        S: Stream<Item = Result<UploadPart<R>>> + Unpin,
        R: AsyncRead + Unpin,
    {
        let folder = match FolderRepository::new(self.pool).get_by_id(folder_id).await? {
            Some(folder) if folder.user_id == user.id => folder,
            _ => return Err(CloudError::FolderNotFound),
        };
        let folder_db_path = PathConverter::folder_db_path(&user.username, &folder.path);

        let mut stored: Vec<FileMetadata> = Vec::new();
        let mut current = String::new();

        while let Some(part) = parts.next().await {
            let result = match part {
                Ok(mut part) => {
                    if part.filename.trim().is_empty() {
                        continue;
                    }
                    current = part.filename.clone();
                    self.store_one(user, folder.id, &folder_db_path, &mut part)
                        .await
                }
                Err(e) => {
                    current.clear();
                    Err(e)
                }
            };

            match result {
                Ok(file) => stored.push(file),
                Err(e) if stored.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        "Upload for user {} stopped at {:?} after {} file(s)",
                        user.id,
                        current,
                        stored.len()
                    );
                    return Err(CloudError::PartialUpload {
                        stored: stored.into_iter().map(|f| f.name).collect(),
                        failed: current,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(stored)
    }

    async fn store_one<R>(
        &self,
        user: &User,
        folder_id: i64,
        folder_db_path: &str,
        part: &mut UploadPart<R>,
    ) -> Result<FileMetadata>
    where
        R: AsyncRead + Unpin,
    {
        let name = ContentStore::sanitize_file_name(&part.filename)?;
        let saved = self
            .store
            .save_file(&user.username, folder_db_path, &name, &mut part.reader)
            .await?;

        let new_file = NewFile::new(user.id, Some(folder_id), &name, &saved.location)
            .with_content(saved.size as i64, &saved.hash)
            .with_mime_type(detect_mime_type(&saved.head, &name));

        match self.files().create(&new_file).await {
            Ok(file) => {
                info!(
                    "User {} uploaded {:?} ({} bytes) as file {}",
                    user.id, file.name, file.size, file.id
                );
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self
                    .store
                    .delete_file(&user.username, &saved.location)
                    .await
                {
                    warn!(
                        "Orphaned bytes at {:?} for user {}: insert failed ({}), cleanup ({})",
                        saved.location, user.id, e, cleanup
                    );
                } else {
                    warn!(
                        "Removed bytes at {:?} for user {} after catalog insert failed: {}",
                        saved.location, user.id, e
                    );
                }
                Err(e)
            }
        }
    }

    /// All files of a user, newest first.
    pub async fn get_by_user(&self, user_id: i64) -> Result<Vec<FileMetadata>> {
        self.files().list_by_user(user_id).await
    }

    /// A user's files directly inside a folder.
    pub async fn get_by_user_and_folder(
        &self,
        user_id: i64,
        folder_id: i64,
    ) -> Result<Vec<FileMetadata>> {
        self.files().list_by_folder(user_id, folder_id).await
    }

    /// A user's files whose folder was deleted.
    pub async fn get_orphaned(&self, user_id: i64) -> Result<Vec<FileMetadata>> {
        self.files().list_orphaned(user_id).await
    }

    /// Get a file by ID.
    ///
    /// Ownership is not checked here.
    pub async fn get_by_id(&self, file_id: i64) -> Result<FileMetadata> {
        self.files()
            .get_by_id(file_id)
            .await?
            .ok_or(CloudError::FileNotFound)
    }

    /// Open one of the user's own files.
    ///
    /// Fails with `NotOwner` when the file belongs to someone else, which
    /// callers use as the signal to try `download_shared`.
    pub async fn download_own(&self, user: &User, file_id: i64) -> Result<ContentStream> {
        let file = self.get_by_id(file_id).await?;
        if file.user_id != user.id {
            return Err(CloudError::NotOwner);
        }

        self.open(&user.username, file).await
    }

    /// Open a file shared with `user_id` through an active share.
    pub async fn download_shared(
        &self,
        user_id: i64,
        file_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ContentStream> {
        ShareRegistry::new(self.pool)
            .get_active_share(file_id, user_id, now)
            .await?;

        let file = self.get_by_id(file_id).await?;
        let owner = UserRepository::new(self.pool)
            .get_by_id(file.user_id)
            .await?
            .ok_or(CloudError::UserNotFound)?;

        self.open(&owner.username, file).await
    }

    async fn open(&self, owner_username: &str, file: FileMetadata) -> Result<ContentStream> {
        let (reader, size) = self.store.open_file(owner_username, &file.location).await?;
        Ok(ContentStream {
            reader,
            size,
            name: file.name,
        })
    }

    /// Delete one of the user's files and its content.
    ///
    /// Content that is already gone is not an error.
    pub async fn delete_file(&self, user: &User, file_id: i64) -> Result<()> {
        let file = self.get_by_id(file_id).await?;
        if file.user_id != user.id {
            return Err(CloudError::Unauthorized);
        }

        if !self.store.delete_file(&user.username, &file.location).await? {
            warn!(
                "Content of file {} was already missing at {:?}",
                file.id, file.location
            );
        }
        self.files().delete(file.id).await?;

        info!("User {} deleted file {}", user.id, file.id);
        Ok(())
    }

    /// Point a file at another folder without moving its bytes.
    ///
    /// No ownership check; callers verify both the file and the folder.
    pub async fn update_folder(&self, file_id: i64, folder_id: Option<i64>) -> Result<()> {
        if !self.files().update_folder(file_id, folder_id).await? {
            return Err(CloudError::FileNotFound);
        }
        Ok(())
    }
}
