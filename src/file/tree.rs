//! Per-user folder hierarchy.
//!
//! Every lookup is scoped to the requesting user. A folder that exists but
//! belongs to someone else is reported as `FolderNotFound`.
//!
//! Directory creation happens before the row insert: an empty directory
//! without a row is harmless, a row without its directory is not. Moves
//! rename the directory first and then rewrite the rows in one transaction.
//! Deleting a folder moves the bytes of its orphaned files up into the
//! parent's directory, so no directory outlives its folder row.

use tracing::{debug, info, warn};

use super::folder::{Folder, FolderMove, FolderRepository, NewFolder};
use super::metadata::{FileMetadata, FileRepository};
use super::storage::ContentStore;
use crate::db::DbPool;
use crate::path::PathConverter;
use crate::{CloudError, Result};

/// Service for folder CRUD with ownership and tree invariants.
pub struct FolderTree<'a> {
    pool: &'a DbPool,
    store: &'a ContentStore,
}

impl<'a> FolderTree<'a> {
    /// Create a new FolderTree.
    pub fn new(pool: &'a DbPool, store: &'a ContentStore) -> Self {
        Self { pool, store }
    }

    fn folders(&self) -> FolderRepository<'a> {
        FolderRepository::new(self.pool)
    }

    fn files(&self) -> FileRepository<'a> {
        FileRepository::new(self.pool)
    }

    /// Create the user's root folder and its directory.
    ///
    /// The root is named after the user and sits at DB path `""`. A second
    /// call fails with `FolderAlreadyExists`.
    pub async fn create_root_folder(&self, user_id: i64, username: &str) -> Result<Folder> {
        if !PathConverter::is_valid_name(username) {
            return Err(CloudError::InvalidFolderName);
        }

        self.store.ensure_dir(username, "").await?;
        let root = self
            .folders()
            .create(&NewFolder::new(user_id, username, username))
            .await?;

        info!("Created root folder {} for user {}", root.id, user_id);
        Ok(root)
    }

    /// Create a folder below `parent_id`, or below the user's root when None.
    ///
    /// The stored path is derived from the parent's path and `name`, so
    /// callers never pass a path that could disagree with the tree.
    pub async fn create_folder(
        &self,
        user_id: i64,
        username: &str,
        parent_id: Option<i64>,
        name: &str,
    ) -> Result<Folder> {
        let name = name.trim();
        if !PathConverter::is_valid_name(name) {
            return Err(CloudError::InvalidFolderName);
        }

        let parent = match parent_id {
            Some(id) => self.get_by_id(user_id, id).await?,
            None => self.get_root(user_id).await?,
        };

        let parent_db_path = PathConverter::folder_db_path(username, &parent.path);
        let db_path = PathConverter::join_db_path([parent_db_path.as_str(), name]);
        let path = PathConverter::to_folder_path(username, &db_path);

        self.store.ensure_dir(username, &db_path).await?;
        let folder = self
            .folders()
            .create(&NewFolder::new(user_id, name, path).with_parent(parent.id))
            .await?;

        info!(
            "Created folder {} ({:?}) for user {}",
            folder.id, folder.path, user_id
        );
        Ok(folder)
    }

    /// Get a user's folder by ID.
    pub async fn get_by_id(&self, user_id: i64, folder_id: i64) -> Result<Folder> {
        match self.folders().get_by_id(folder_id).await? {
            Some(folder) if folder.user_id == user_id => Ok(folder),
            _ => {
                debug!("Folder {} not visible to user {}", folder_id, user_id);
                Err(CloudError::FolderNotFound)
            }
        }
    }

    /// Get a user's folder by DB path (`""` is the root).
    pub async fn get_by_path(&self, user_id: i64, username: &str, db_path: &str) -> Result<Folder> {
        let db_path = PathConverter::sanitize_path(db_path)?;
        let path = PathConverter::to_folder_path(username, &db_path);

        self.folders()
            .get_by_path(user_id, &path)
            .await?
            .ok_or(CloudError::FolderNotFound)
    }

    /// Get the user's root folder.
    pub async fn get_root(&self, user_id: i64) -> Result<Folder> {
        self.folders()
            .get_root(user_id)
            .await?
            .ok_or(CloudError::FolderNotFound)
    }

    /// List the user's root folders.
    pub async fn list_root_folders(&self, user_id: i64) -> Result<Vec<Folder>> {
        self.folders().list_root(user_id).await
    }

    /// List the direct subfolders of one of the user's folders.
    pub async fn list_children(&self, user_id: i64, parent_id: i64) -> Result<Vec<Folder>> {
        self.get_by_id(user_id, parent_id).await?;
        self.folders().list_by_parent(user_id, parent_id).await
    }

    /// Direct subfolders and direct files of a folder.
    pub async fn get_folder_contents(
        &self,
        user_id: i64,
        folder_id: i64,
    ) -> Result<(Vec<Folder>, Vec<FileMetadata>)> {
        self.get_by_id(user_id, folder_id).await?;

        let subfolders = self.folders().list_by_parent(user_id, folder_id).await?;
        let files = self.files().list_by_folder(user_id, folder_id).await?;
        Ok((subfolders, files))
    }

    /// The chain from the root down to `folder_id`, both included.
    pub async fn ancestors(&self, user_id: i64, folder_id: i64) -> Result<Vec<Folder>> {
        self.get_by_id(user_id, folder_id).await?;
        self.folders().get_path(folder_id).await
    }

    /// Move a folder below another of the user's folders.
    ///
    /// The whole subtree moves with it: the directory is renamed and the
    /// stored paths of all descendants and file locations are rewritten.
    pub async fn move_folder(
        &self,
        user_id: i64,
        username: &str,
        folder_id: i64,
        new_parent_id: i64,
    ) -> Result<Folder> {
        let folder = self.get_by_id(user_id, folder_id).await?;
        let new_parent = self.get_by_id(user_id, new_parent_id).await?;
        let name = folder.name.clone();

        self.relocate(user_id, username, folder, new_parent, name).await
    }

    /// Give a folder a new DB path.
    ///
    /// The parent of `db_path` must be an existing folder of the user; the
    /// last segment becomes the folder's name. Covers both rename and move.
    pub async fn update_path(
        &self,
        user_id: i64,
        username: &str,
        folder_id: i64,
        db_path: &str,
    ) -> Result<Folder> {
        let db_path = PathConverter::sanitize_path(db_path)?;
        if PathConverter::is_root_path(&db_path) {
            return Err(CloudError::RootFolderProtected);
        }

        let name = PathConverter::base_name(&db_path).to_string();
        if !PathConverter::is_valid_name(&name) {
            return Err(CloudError::InvalidFolderName);
        }

        let folder = self.get_by_id(user_id, folder_id).await?;
        let new_parent = self
            .get_by_path(user_id, username, &PathConverter::parent_db_path(&db_path))
            .await?;

        self.relocate(user_id, username, folder, new_parent, name).await
    }

    async fn relocate(
        &self,
        user_id: i64,
        username: &str,
        folder: Folder,
        new_parent: Folder,
        new_name: String,
    ) -> Result<Folder> {
        if folder.is_root() {
            return Err(CloudError::RootFolderProtected);
        }

        // Walk up from the destination; meeting the folder itself means a cycle.
        let chain = self.folders().get_path(new_parent.id).await?;
        if chain.iter().any(|f| f.id == folder.id) {
            return Err(CloudError::CannotMoveToChild);
        }

        let old_db_path = PathConverter::folder_db_path(username, &folder.path);
        let parent_db_path = PathConverter::folder_db_path(username, &new_parent.path);
        let new_db_path = PathConverter::join_db_path([parent_db_path.as_str(), new_name.as_str()]);
        let new_path = PathConverter::to_folder_path(username, &new_db_path);

        if new_path == folder.path {
            return Ok(folder);
        }
        if self.folders().get_by_path(user_id, &new_path).await?.is_some() {
            return Err(CloudError::FolderAlreadyExists);
        }

        self.store
            .move_folder(username, &old_db_path, &new_db_path)
            .await?;

        let plan = FolderMove {
            user_id,
            folder_id: folder.id,
            new_parent_id: new_parent.id,
            new_name,
            old_path: folder.path.clone(),
            new_path,
            old_db_path: old_db_path.clone(),
            new_db_path: new_db_path.clone(),
        };

        match self.folders().relocate(&plan).await {
            Ok(Some(moved)) => {
                info!(
                    "Moved folder {} from {:?} to {:?} for user {}",
                    moved.id, folder.path, moved.path, user_id
                );
                Ok(moved)
            }
            Ok(None) => Err(CloudError::FolderNotFound),
            Err(e) => {
                warn!(
                    "Folder {} rows not updated after directory move ({}); moving {:?} back",
                    folder.id, e, new_db_path
                );
                if let Err(undo) = self
                    .store
                    .move_folder(username, &new_db_path, &old_db_path)
                    .await
                {
                    warn!(
                        "Directory {:?} left at {:?} for user {}: {}",
                        old_db_path, new_db_path, user_id, undo
                    );
                }
                Err(e)
            }
        }
    }

    /// Delete one of the user's folders.
    ///
    /// Folders with subfolders are rejected with `FolderNotEmpty`. Files
    /// directly inside are orphaned, not deleted. Their bytes move into the
    /// parent folder's directory (with a collision suffix if needed) and the
    /// folder's directory is removed. The root cannot be deleted.
    pub async fn delete_folder(&self, user_id: i64, folder_id: i64) -> Result<()> {
        let folder = self.get_by_id(user_id, folder_id).await?;
        if folder.is_root() {
            return Err(CloudError::RootFolderProtected);
        }

        if self.folders().count_children(folder.id).await? > 0 {
            return Err(CloudError::FolderNotEmpty);
        }

        // The root folder is named after its owner.
        let username = self.get_root(user_id).await?.name;
        let db_path = PathConverter::folder_db_path(&username, &folder.path);
        let parent_db_path = PathConverter::parent_db_path(&db_path);
        let moved = self
            .move_bytes_out(user_id, &username, &db_path, &parent_db_path)
            .await?;

        let orphaned = self.folders().count_files(folder.id).await?;
        if !self.folders().delete(folder.id).await? {
            return Err(CloudError::FolderNotFound);
        }

        if let Err(e) = self.store.delete_folder(&username, &db_path).await {
            warn!(
                "Directory {:?} of deleted folder {} left on disk: {}",
                db_path, folder.id, e
            );
        }

        info!(
            "Deleted folder {} ({:?}) for user {}, {} file(s) orphaned, {} moved to {:?}",
            folder.id, folder.path, user_id, orphaned, moved, parent_db_path
        );
        Ok(())
    }

    /// Move the bytes of every file stored below `db_path` into `dest_db_path`.
    ///
    /// Rows keep their folder; only `location` follows the bytes. Files whose
    /// bytes are already missing are skipped.
    async fn move_bytes_out(
        &self,
        user_id: i64,
        username: &str,
        db_path: &str,
        dest_db_path: &str,
    ) -> Result<usize> {
        let mut moved = 0;
        for file in self.files().list_under_location(user_id, db_path).await? {
            let new_location = match self
                .store
                .move_file(username, &file.location, dest_db_path)
                .await
            {
                Ok(location) => location,
                Err(CloudError::FileNotFound) => {
                    warn!("File {} has no bytes at {:?}", file.id, file.location);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Err(e) = self.files().set_location(file.id, &new_location).await {
                warn!(
                    "File {} row not updated after move ({}); moving bytes back",
                    file.id, e
                );
                let old_dir = PathConverter::parent_db_path(&file.location);
                if let Err(undo) = self.store.move_file(username, &new_location, &old_dir).await {
                    warn!("File {} bytes left at {:?}: {}", file.id, new_location, undo);
                }
                return Err(e);
            }
            moved += 1;
        }
        Ok(moved)
    }

    /// Move one of the user's files into another of the user's folders.
    ///
    /// The bytes are moved first; the row follows.
    pub async fn move_file(
        &self,
        user_id: i64,
        username: &str,
        file_id: i64,
        folder_id: i64,
    ) -> Result<FileMetadata> {
        let file = match self.files().get_by_id(file_id).await? {
            Some(file) if file.user_id == user_id => file,
            _ => return Err(CloudError::FileNotFound),
        };
        let folder = self.get_by_id(user_id, folder_id).await?;
        if file.folder_id == Some(folder.id) {
            return Ok(file);
        }

        let dest_db_path = PathConverter::folder_db_path(username, &folder.path);
        let new_location = self
            .store
            .move_file(username, &file.location, &dest_db_path)
            .await?;

        if let Err(e) = self
            .files()
            .update_location(file.id, folder.id, &new_location)
            .await
        {
            warn!(
                "File {} row not updated after move ({}); moving bytes back",
                file.id, e
            );
            let old_folder_db_path = PathConverter::parent_db_path(&file.location);
            if let Err(undo) = self
                .store
                .move_file(username, &new_location, &old_folder_db_path)
                .await
            {
                warn!(
                    "File {} bytes left at {:?}: {}",
                    file.id, new_location, undo
                );
            }
            return Err(e);
        }

        info!(
            "Moved file {} into folder {} for user {}",
            file.id, folder.id, user_id
        );
        self.files()
            .get_by_id(file.id)
            .await?
            .ok_or(CloudError::FileNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NewUser, UserRepository};
    use crate::file::NewFile;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct Fixture {
        _temp_dir: TempDir,
        db: Database,
        store: ContentStore,
        bob: i64,
        alice: i64,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let bob = users.create(&NewUser::new("bob", "h")).await.unwrap().id;
        let alice = users.create(&NewUser::new("alice", "h")).await.unwrap().id;
        let store = ContentStore::new(PathConverter::new(temp_dir.path()));

        let fixture = Fixture {
            _temp_dir: temp_dir,
            db,
            store,
            bob,
            alice,
        };
        {
            let tree = FolderTree::new(fixture.db.pool(), &fixture.store);
            tree.create_root_folder(bob, "bob").await.unwrap();
            tree.create_root_folder(alice, "alice").await.unwrap();
        }
        fixture
    }

    fn data_path(f: &Fixture, rel: &str) -> std::path::PathBuf {
        f.store.paths().data_root().join(rel)
    }

    #[tokio::test]
    async fn test_root_folder() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let root = tree.get_root(f.bob).await.unwrap();
        assert_eq!(root.path, "bob");
        assert_eq!(root.name, "bob");
        assert!(root.is_root());
        assert!(data_path(&f, "bob").is_dir());

        let again = tree.create_root_folder(f.bob, "bob").await;
        assert!(matches!(again, Err(CloudError::FolderAlreadyExists)));
        assert_eq!(tree.list_root_folders(f.bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_folder() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let docs = tree.create_folder(f.bob, "bob", None, "documents").await.unwrap();
        assert_eq!(docs.path, "bob/documents");
        assert!(data_path(&f, "bob/documents").is_dir());

        let year = tree
            .create_folder(f.bob, "bob", Some(docs.id), "2024")
            .await
            .unwrap();
        assert_eq!(year.path, "bob/documents/2024");
        assert_eq!(year.parent_id, Some(docs.id));
    }

    #[tokio::test]
    async fn test_create_folder_invalid_name() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        for name in ["", "  ", "a/b", "..", "bad|name"] {
            let result = tree.create_folder(f.bob, "bob", None, name).await;
            assert!(
                matches!(result, Err(CloudError::InvalidFolderName)),
                "{name:?} accepted"
            );
        }
    }

    #[tokio::test]
    async fn test_create_folder_duplicate() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        tree.create_folder(f.bob, "bob", None, "dup").await.unwrap();
        let result = tree.create_folder(f.bob, "bob", None, "dup").await;

        assert!(matches!(result, Err(CloudError::FolderAlreadyExists)));
    }

    #[tokio::test]
    async fn test_create_folder_in_foreign_parent() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let alice_root = tree.get_root(f.alice).await.unwrap();
        let result = tree
            .create_folder(f.bob, "bob", Some(alice_root.id), "sneaky")
            .await;

        assert!(matches!(result, Err(CloudError::FolderNotFound)));
    }

    #[tokio::test]
    async fn test_ownership_isolation() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let docs = tree.create_folder(f.bob, "bob", None, "documents").await.unwrap();

        assert!(matches!(
            tree.get_by_id(f.alice, docs.id).await,
            Err(CloudError::FolderNotFound)
        ));
        assert!(matches!(
            tree.get_by_path(f.alice, "alice", "documents").await,
            Err(CloudError::FolderNotFound)
        ));
        assert!(matches!(
            tree.get_folder_contents(f.alice, docs.id).await,
            Err(CloudError::FolderNotFound)
        ));
        assert!(matches!(
            tree.delete_folder(f.alice, docs.id).await,
            Err(CloudError::FolderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_get_by_path() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let docs = tree.create_folder(f.bob, "bob", None, "documents").await.unwrap();

        assert_eq!(tree.get_by_path(f.bob, "bob", "documents").await.unwrap().id, docs.id);
        assert_eq!(tree.get_by_path(f.bob, "bob", "documents/").await.unwrap().id, docs.id);
        assert!(tree.get_by_path(f.bob, "bob", "").await.unwrap().is_root());
        assert!(matches!(
            tree.get_by_path(f.bob, "bob", "../alice").await,
            Err(CloudError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_folder_contents_not_recursive() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);
        let files = FileRepository::new(f.db.pool());

        let root = tree.get_root(f.bob).await.unwrap();
        let docs = tree.create_folder(f.bob, "bob", None, "documents").await.unwrap();
        tree.create_folder(f.bob, "bob", Some(docs.id), "deep").await.unwrap();
        files
            .create(&NewFile::new(f.bob, Some(root.id), "top.txt", "top.txt"))
            .await
            .unwrap();
        files
            .create(&NewFile::new(f.bob, Some(docs.id), "inner.txt", "documents/inner.txt"))
            .await
            .unwrap();

        let (subfolders, direct_files) = tree.get_folder_contents(f.bob, root.id).await.unwrap();
        assert_eq!(subfolders.len(), 1);
        assert_eq!(subfolders[0].name, "documents");
        assert_eq!(direct_files.len(), 1);
        assert_eq!(direct_files[0].name, "top.txt");
    }

    #[tokio::test]
    async fn test_ancestors() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let a = tree.create_folder(f.bob, "bob", None, "a").await.unwrap();
        let b = tree.create_folder(f.bob, "bob", Some(a.id), "b").await.unwrap();

        let chain = tree.ancestors(f.bob, b.id).await.unwrap();
        let names: Vec<&str> = chain.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "a", "b"]);
    }

    #[tokio::test]
    async fn test_move_folder() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let a = tree.create_folder(f.bob, "bob", None, "a").await.unwrap();
        let inner = tree.create_folder(f.bob, "bob", Some(a.id), "inner").await.unwrap();
        let target = tree.create_folder(f.bob, "bob", None, "target").await.unwrap();

        let mut content: &[u8] = b"x";
        let saved = f.store.save_file("bob", "a/inner", "x.txt", &mut content).await.unwrap();
        let file = FileRepository::new(f.db.pool())
            .create(&NewFile::new(f.bob, Some(inner.id), "x.txt", saved.location))
            .await
            .unwrap();

        let moved = tree.move_folder(f.bob, "bob", a.id, target.id).await.unwrap();
        assert_eq!(moved.path, "bob/target/a");
        assert_eq!(moved.parent_id, Some(target.id));

        let inner = tree.get_by_id(f.bob, inner.id).await.unwrap();
        assert_eq!(inner.path, "bob/target/a/inner");

        let file = FileRepository::new(f.db.pool())
            .get_by_id(file.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.location, "target/a/inner/x.txt");
        assert!(data_path(&f, "bob/target/a/inner/x.txt").is_file());
        assert!(!data_path(&f, "bob/a").exists());
    }

    #[tokio::test]
    async fn test_move_folder_into_descendant() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let a = tree.create_folder(f.bob, "bob", None, "a").await.unwrap();
        let b = tree.create_folder(f.bob, "bob", Some(a.id), "b").await.unwrap();
        let c = tree.create_folder(f.bob, "bob", Some(b.id), "c").await.unwrap();

        assert!(matches!(
            tree.move_folder(f.bob, "bob", a.id, c.id).await,
            Err(CloudError::CannotMoveToChild)
        ));
        assert!(matches!(
            tree.move_folder(f.bob, "bob", a.id, a.id).await,
            Err(CloudError::CannotMoveToChild)
        ));
        assert_eq!(tree.get_by_id(f.bob, a.id).await.unwrap().path, "bob/a");
    }

    #[tokio::test]
    async fn test_move_folder_rules() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let root = tree.get_root(f.bob).await.unwrap();
        let a = tree.create_folder(f.bob, "bob", None, "a").await.unwrap();
        let b = tree.create_folder(f.bob, "bob", None, "b").await.unwrap();
        tree.create_folder(f.bob, "bob", Some(b.id), "a").await.unwrap();
        let alice_root = tree.get_root(f.alice).await.unwrap();

        assert!(matches!(
            tree.move_folder(f.bob, "bob", root.id, a.id).await,
            Err(CloudError::RootFolderProtected)
        ));
        assert!(matches!(
            tree.move_folder(f.bob, "bob", a.id, b.id).await,
            Err(CloudError::FolderAlreadyExists)
        ));
        assert!(matches!(
            tree.move_folder(f.bob, "bob", a.id, alice_root.id).await,
            Err(CloudError::FolderNotFound)
        ));

        let same = tree.move_folder(f.bob, "bob", a.id, root.id).await.unwrap();
        assert_eq!(same.path, "bob/a");
    }

    #[tokio::test]
    async fn test_update_path() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let a = tree.create_folder(f.bob, "bob", None, "a").await.unwrap();
        tree.create_folder(f.bob, "bob", None, "b").await.unwrap();

        let renamed = tree.update_path(f.bob, "bob", a.id, "b/renamed/").await.unwrap();
        assert_eq!(renamed.path, "bob/b/renamed");
        assert_eq!(renamed.name, "renamed");
        assert!(data_path(&f, "bob/b/renamed").is_dir());

        assert!(matches!(
            tree.update_path(f.bob, "bob", a.id, "missing/x").await,
            Err(CloudError::FolderNotFound)
        ));
        assert!(matches!(
            tree.update_path(f.bob, "bob", a.id, "../x").await,
            Err(CloudError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.update_path(f.bob, "bob", a.id, "/etc/x").await,
            Err(CloudError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.update_path(f.bob, "bob", a.id, "/").await,
            Err(CloudError::RootFolderProtected)
        ));
    }

    #[tokio::test]
    async fn test_update_path_into_folder_named_after_owner() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let own_name = tree.create_folder(f.bob, "bob", None, "bob").await.unwrap();
        let a = tree.create_folder(f.bob, "bob", None, "a").await.unwrap();

        let moved = tree.update_path(f.bob, "bob", a.id, "bob/a").await.unwrap();
        assert_eq!(moved.path, "bob/bob/a");
        assert_eq!(moved.parent_id, Some(own_name.id));
        assert!(data_path(&f, "bob/bob/a").is_dir());
        assert!(!data_path(&f, "bob/a").exists());
    }

    async fn save(f: &Fixture, folder: &Folder, name: &str, content: &str) -> FileMetadata {
        let db_path = PathConverter::folder_db_path("bob", &folder.path);
        let mut reader = content.as_bytes();
        let saved = f.store.save_file("bob", &db_path, name, &mut reader).await.unwrap();
        FileRepository::new(f.db.pool())
            .create(&NewFile::new(f.bob, Some(folder.id), name, saved.location))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_delete_folder_orphans_files() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);
        let files = FileRepository::new(f.db.pool());

        let root = tree.get_root(f.bob).await.unwrap();
        let docs = tree.create_folder(f.bob, "bob", None, "documents").await.unwrap();
        save(&f, &root, "a.txt", "root copy").await;
        let file = save(&f, &docs, "a.txt", "docs copy").await;

        tree.delete_folder(f.bob, docs.id).await.unwrap();

        assert!(matches!(
            tree.get_by_id(f.bob, docs.id).await,
            Err(CloudError::FolderNotFound)
        ));
        let file = files.get_by_id(file.id).await.unwrap().unwrap();
        assert!(file.is_orphaned());
        assert_eq!(file.location, "a (1).txt");
        assert_eq!(
            std::fs::read(data_path(&f, "bob/a (1).txt")).unwrap(),
            b"docs copy"
        );
        assert!(!data_path(&f, "bob/documents").exists());

        // the orphan stays out of the root listing
        let (_, in_root) = tree.get_folder_contents(f.bob, root.id).await.unwrap();
        assert_eq!(in_root.len(), 1);
    }

    #[tokio::test]
    async fn test_name_of_deleted_folder_is_free_again() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let docs = tree.create_folder(f.bob, "bob", None, "documents").await.unwrap();
        let orphan = save(&f, &docs, "invoice.pdf", "1234567890").await;
        tree.delete_folder(f.bob, docs.id).await.unwrap();

        let other = tree.create_folder(f.bob, "bob", None, "other").await.unwrap();
        let renamed = tree.update_path(f.bob, "bob", other.id, "documents").await.unwrap();
        assert_eq!(renamed.path, "bob/documents");
        assert!(data_path(&f, "bob/documents").is_dir());

        let root = tree.get_root(f.bob).await.unwrap();
        let target = tree.create_folder(f.bob, "bob", None, "target").await.unwrap();
        tree.delete_folder(f.bob, target.id).await.unwrap();
        let sub = tree
            .create_folder(f.bob, "bob", Some(renamed.id), "target")
            .await
            .unwrap();
        let moved = tree.move_folder(f.bob, "bob", sub.id, root.id).await.unwrap();
        assert_eq!(moved.path, "bob/target");

        let orphan = FileRepository::new(f.db.pool())
            .get_by_id(orphan.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(orphan.location, "invoice.pdf");
        let (mut reader, size) = f.store.open_file("bob", &orphan.location).await.unwrap();
        assert_eq!(size, 10);
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"1234567890");
    }

    #[tokio::test]
    async fn test_delete_folder_rules() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);

        let root = tree.get_root(f.bob).await.unwrap();
        let a = tree.create_folder(f.bob, "bob", None, "a").await.unwrap();
        tree.create_folder(f.bob, "bob", Some(a.id), "child").await.unwrap();

        assert!(matches!(
            tree.delete_folder(f.bob, root.id).await,
            Err(CloudError::RootFolderProtected)
        ));
        assert!(matches!(
            tree.delete_folder(f.bob, a.id).await,
            Err(CloudError::FolderNotEmpty)
        ));
        assert!(tree.get_by_id(f.bob, a.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_move_file() {
        let f = setup().await;
        let tree = FolderTree::new(f.db.pool(), &f.store);
        let files = FileRepository::new(f.db.pool());

        let root = tree.get_root(f.bob).await.unwrap();
        let docs = tree.create_folder(f.bob, "bob", None, "documents").await.unwrap();

        let mut content: &[u8] = b"abc";
        let saved = f.store.save_file("bob", "", "a.txt", &mut content).await.unwrap();
        let file = files
            .create(&NewFile::new(f.bob, Some(root.id), "a.txt", saved.location))
            .await
            .unwrap();

        let moved = tree.move_file(f.bob, "bob", file.id, docs.id).await.unwrap();
        assert_eq!(moved.folder_id, Some(docs.id));
        assert_eq!(moved.location, "documents/a.txt");
        assert!(data_path(&f, "bob/documents/a.txt").is_file());
        assert!(!data_path(&f, "bob/a.txt").exists());

        assert!(matches!(
            tree.move_file(f.alice, "alice", file.id, docs.id).await,
            Err(CloudError::FileNotFound)
        ));
    }
}
