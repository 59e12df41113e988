//! Content storage for cloudvault.
//!
//! Bytes live under a per-user subtree that mirrors the DB path hierarchy:
//!
//! ```text
//! {data_root}/
//! ├── bob/
//! │   ├── documents/
//! │   │   ├── invoice.pdf
//! │   │   └── invoice (1).pdf
//! │   └── notes.txt
//! └── alice/
//!     └── ...
//! ```
//!
//! Uploads are streamed once: every chunk is written to a temporary sibling
//! file, fed to SHA-256 and counted. The temporary file is renamed into place
//! only after the whole stream was read.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::path::PathConverter;
use crate::{CloudError, Result};

/// Number of leading bytes kept for content sniffing.
pub const SNIFF_LEN: usize = 512;

const CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on collision suffixes tried for one file name.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Result of persisting one stream.
#[derive(Debug, Clone)]
pub struct SavedContent {
    /// DB path of the stored bytes, relative to the owner's root.
    pub location: String,
    /// File name on disk (differs from the requested one after a collision).
    pub stored_name: String,
    /// Lowercase hex SHA-256 of the bytes written.
    pub hash: String,
    /// Number of bytes written.
    pub size: u64,
    /// First bytes of the content, at most [`SNIFF_LEN`].
    pub head: Vec<u8>,
}

/// A readable file together with the metadata a download needs.
#[derive(Debug)]
pub struct ContentStream {
    /// Open handle positioned at the start of the file.
    pub reader: File,
    /// Size in bytes.
    pub size: u64,
    /// Name to present to the client.
    pub name: String,
}

/// Filesystem store for file content.
#[derive(Debug, Clone)]
pub struct ContentStore {
    paths: PathConverter,
    max_upload: Option<u64>,
}

impl ContentStore {
    /// Create a store on top of a path converter.
    pub fn new(paths: PathConverter) -> Self {
        Self {
            paths,
            max_upload: None,
        }
    }

    /// Reject uploads larger than `bytes`.
    pub fn with_max_upload(mut self, bytes: u64) -> Self {
        self.max_upload = Some(bytes);
        self
    }

    /// The path converter this store resolves locations with.
    pub fn paths(&self) -> &PathConverter {
        &self.paths
    }

    /// Reduce an uploaded file name to a safe base name.
    ///
    /// Anything up to the last `/` or `\` is dropped.
    ///
    /// ```
    /// use cloudvault::file::ContentStore;
    ///
    /// assert_eq!(ContentStore::sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
    /// assert_eq!(ContentStore::sanitize_file_name("C:\\Users\\bob\\a.txt").unwrap(), "a.txt");
    /// assert!(ContentStore::sanitize_file_name("..").is_err());
    /// ```
    pub fn sanitize_file_name(name: &str) -> Result<String> {
        let base = name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or_default()
            .trim();

        if !PathConverter::is_valid_name(base) {
            return Err(CloudError::InvalidPath(name.to_string()));
        }
        Ok(base.to_string())
    }

    /// Create the directory for a DB path if absent and return it.
    ///
    /// Fails with `InvalidPath` for paths that would leave the user's subtree.
    pub async fn ensure_dir(&self, username: &str, db_path: &str) -> Result<PathBuf> {
        let dir = self.paths.from_db_path(username, db_path)?;
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Stream `reader` into `folder_db_path/filename`.
    ///
    /// An existing file with the same name is never overwritten; the new
    /// content is stored as `name (1).ext`, `name (2).ext` and so on.
    pub async fn save_file<R>(
        &self,
        username: &str,
        folder_db_path: &str,
        filename: &str,
        reader: &mut R,
    ) -> Result<SavedContent>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let filename = Self::sanitize_file_name(filename)?;
        let folder_db_path = PathConverter::sanitize_path(folder_db_path)?;
        let dir = self.ensure_dir(username, &folder_db_path).await?;

        let (stored_name, final_path) = reserve_name(&dir, &filename).await?;
        let temp_path = dir.join(format!(".{}.part", Uuid::new_v4()));

        let written = match self.write_temp(&temp_path, reader).await {
            Ok(written) => written,
            Err(e) => {
                remove_quietly(&temp_path).await;
                remove_quietly(&final_path).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            remove_quietly(&temp_path).await;
            remove_quietly(&final_path).await;
            return Err(e.into());
        }

        let (hash, size, head) = written;
        let location = PathConverter::join_db_path([folder_db_path.as_str(), stored_name.as_str()]);
        debug!(
            "Stored {} bytes for {} at {:?} (sha256 {})",
            size, username, location, hash
        );

        Ok(SavedContent {
            location,
            stored_name,
            hash,
            size,
            head,
        })
    }

    async fn write_temp<R>(
        &self,
        temp_path: &Path,
        reader: &mut R,
    ) -> Result<(String, u64, Vec<u8>)>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp_path)
            .await?;

        let mut hasher = Sha256::new();
        let mut head = Vec::with_capacity(SNIFF_LEN);
        let mut size: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            size += n as u64;
            if let Some(limit) = self.max_upload {
                if size > limit {
                    return Err(CloudError::UploadTooLarge { limit });
                }
            }

            let chunk = &buf[..n];
            hasher.update(chunk);
            if head.len() < SNIFF_LEN {
                let take = (SNIFF_LEN - head.len()).min(n);
                head.extend_from_slice(&chunk[..take]);
            }
            out.write_all(chunk).await?;
        }

        out.flush().await?;
        out.sync_all().await?;

        Ok((hex::encode(hasher.finalize()), size, head))
    }

    /// Open stored content for reading.
    ///
    /// Returns the handle and the size on disk.
    pub async fn open_file(&self, username: &str, location: &str) -> Result<(File, u64)> {
        let path = self.paths.full_file_path(username, location)?;
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CloudError::FileNotFound),
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok((file, size))
    }

    /// Delete stored content.
    ///
    /// Returns `false` if it was already gone.
    pub async fn delete_file(&self, username: &str, location: &str) -> Result<bool> {
        let path = self.paths.full_file_path(username, location)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Move stored content into another folder.
    ///
    /// Returns the new location, which carries a collision suffix if the
    /// destination already holds a file of that name.
    pub async fn move_file(
        &self,
        username: &str,
        location: &str,
        dest_folder_db_path: &str,
    ) -> Result<String> {
        let source = self.paths.full_file_path(username, location)?;
        let dest_folder_db_path = PathConverter::sanitize_path(dest_folder_db_path)?;
        if !fs::try_exists(&source).await? {
            return Err(CloudError::FileNotFound);
        }

        let dir = self.ensure_dir(username, &dest_folder_db_path).await?;
        let filename = PathConverter::base_name(location);
        let (stored_name, dest) = reserve_name(&dir, filename).await?;

        if let Err(e) = fs::rename(&source, &dest).await {
            remove_quietly(&dest).await;
            return Err(e.into());
        }

        Ok(PathConverter::join_db_path([
            dest_folder_db_path.as_str(),
            stored_name.as_str(),
        ]))
    }

    /// Rename a folder's directory.
    ///
    /// An empty directory at the destination is replaced. Fails with
    /// `FolderAlreadyExists` if the destination holds anything. A missing
    /// source directory is created at the destination instead.
    pub async fn move_folder(
        &self,
        username: &str,
        from_db_path: &str,
        to_db_path: &str,
    ) -> Result<()> {
        let from = self.paths.from_db_path(username, from_db_path)?;
        let to = self.paths.from_db_path(username, to_db_path)?;

        if fs::try_exists(&to).await? {
            if fs::remove_dir(&to).await.is_err() {
                return Err(CloudError::FolderAlreadyExists);
            }
            debug!("Replaced empty directory {:?}", to);
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }

        match fs::rename(&from, &to).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Directory {:?} missing on disk, recreating at {:?}", from, to);
                fs::create_dir_all(&to).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Recursively remove a folder's directory.
    ///
    /// Returns `false` if it did not exist.
    pub async fn delete_folder(&self, username: &str, db_path: &str) -> Result<bool> {
        let dir = self.paths.from_db_path(username, db_path)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Pick a free name in `dir` and claim it with an empty placeholder.
///
/// `create_new` makes the claim atomic, so concurrent uploads of the same
/// name end up with different suffixes.
async fn reserve_name(dir: &Path, filename: &str) -> Result<(String, PathBuf)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = collision_name(filename, attempt);
        let path = dir.join(&candidate);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => return Ok((candidate, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(CloudError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {filename:?}"),
    )))
}

/// `report.pdf` -> `report (2).pdf` for attempt 2.
fn collision_name(filename: &str, attempt: u32) -> String {
    if attempt == 0 {
        return filename.to_string();
    }

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{stem} ({attempt}).{ext}"),
        None => format!("{stem} ({attempt})"),
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}
