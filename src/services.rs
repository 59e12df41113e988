//! Service wiring for cloudvault.
//!
//! `Services` owns the database and the content store and hands out the
//! borrowed service objects, configured from [`Config`].

use std::path::Path;

use chrono::Duration;

use crate::auth::{AuthService, Registration};
use crate::config::Config;
use crate::db::Database;
use crate::file::{ContentStore, FileCatalog, FolderTree};
use crate::link::{LinkUnlockTracker, UploadLinkRegistry};
use crate::path::PathConverter;
use crate::share::ShareRegistry;
use crate::Result;

/// Shared state for the storage core.
#[derive(Debug)]
pub struct Services {
    db: Database,
    store: ContentStore,
    config: Config,
}

impl Services {
    /// Open the configured database and data root.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Database::open(&config.database.path).await?;
        Ok(Self::with_database(db, config))
    }

    /// Build services on an already opened database.
    pub fn with_database(db: Database, config: Config) -> Self {
        let store = ContentStore::new(PathConverter::new(Path::new(&config.storage.data_root)))
            .with_max_upload(config.storage.max_upload_bytes());
        Self { db, store, config }
    }

    /// The database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The content store.
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// The configuration the services were built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Account and session operations.
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.db.pool())
    }

    /// Sign-up: the account together with its root folder.
    pub fn registration(&self) -> Registration<'_> {
        Registration::new(self.db.pool(), &self.store)
    }

    /// Folder hierarchy of every user.
    pub fn folders(&self) -> FolderTree<'_> {
        FolderTree::new(self.db.pool(), &self.store)
    }

    /// File upload, download and catalog.
    pub fn files(&self) -> FileCatalog<'_> {
        FileCatalog::new(self.db.pool(), &self.store)
    }

    /// Direct file shares between users.
    pub fn shares(&self) -> ShareRegistry<'_> {
        ShareRegistry::new(self.db.pool())
    }

    /// Upload links, with tokens of the configured length.
    pub fn links(&self) -> UploadLinkRegistry<'_> {
        UploadLinkRegistry::new(self.db.pool()).with_token_bytes(self.config.links.token_bytes)
    }

    /// Per-user link unlocks, lasting the configured TTL.
    pub fn unlocks(&self) -> LinkUnlockTracker<'_> {
        let secs = i64::try_from(self.config.links.unlock_ttl_secs).unwrap_or(i64::MAX);
        let ttl = Duration::try_seconds(secs).unwrap_or(Duration::MAX);
        LinkUnlockTracker::new(self.db.pool()).with_unlock_ttl(ttl)
    }
}
