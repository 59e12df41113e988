//! Test helpers for integration tests.
//!
//! Provides a throwaway storage environment: an in-memory database and a
//! temporary data root wired into `Services`.

#![allow(dead_code)]

use std::path::PathBuf;

use futures::stream::{self, Stream};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use cloudvault::{Config, ContentStream, Database, Folder, Result, Services, UploadPart, User};

/// Storage environment backed by a temporary directory.
pub struct TestEnv {
    _temp_dir: TempDir,
    pub data_root: PathBuf,
    pub services: Services,
}

impl TestEnv {
    /// Create an environment with default limits.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create an environment, adjusting the config first.
    pub async fn with_config(configure: impl FnOnce(&mut Config)) -> Self {
        cloudvault::logging::init_for_tests();

        let temp_dir = TempDir::new().unwrap();
        let data_root = temp_dir.path().join("files");

        let mut config = Config::default();
        config.storage.data_root = data_root.to_string_lossy().into_owned();
        configure(&mut config);

        let db = Database::open_in_memory().await.unwrap();
        let services = Services::with_database(db, config);

        Self {
            _temp_dir: temp_dir,
            data_root,
            services,
        }
    }

    /// Register a user, returning the user and their root folder.
    pub async fn register(&self, username: &str) -> (User, Folder) {
        self.services
            .registration()
            .register(username, "password123")
            .await
            .unwrap()
    }
}

/// Build an upload stream from `(filename, content)` pairs.
pub fn upload<'a>(
    items: &[(&str, &'a str)],
) -> impl Stream<Item = Result<UploadPart<&'a [u8]>>> + Unpin {
    let parts: Vec<_> = items
        .iter()
        .map(|(name, content)| Ok(UploadPart::new(*name, content.as_bytes())))
        .collect();
    stream::iter(parts)
}

/// Read a download to the end.
pub async fn read_all(mut content: ContentStream) -> Vec<u8> {
    let mut buf = Vec::new();
    content.reader.read_to_end(&mut buf).await.unwrap();
    buf
}
