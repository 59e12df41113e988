//! Path conversion between URL paths, DB paths and filesystem paths.
//!
//! Three path spaces are in play:
//!
//! - **URL path**: absolute, rooted at [`URL_PREFIX`], no username segment
//!   (`/files/documents/invoices`).
//! - **DB path**: relative, no leading or trailing slash, no username segment,
//!   `""` is the user's root (`documents/invoices`).
//! - **Filesystem path**: `{data_root}/{username}/{db_path}`.
//!
//! The one exception is [`Folder::path`](crate::file::Folder), which is stored
//! with the username as its first segment; [`PathConverter::folder_db_path`]
//! is the only place that strips it.
//!
//! Nothing here touches the filesystem or the database.

use std::path::{Path, PathBuf};

use crate::{CloudError, Result};

/// URL prefix under which user files are exposed.
pub const URL_PREFIX: &str = "/files";

/// URL of a user's root folder.
pub const ROOT_URL: &str = "/files/";

/// Characters that are never allowed in a path.
const UNSAFE_CHARS: [char; 9] = ['\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// One element of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Display name ("Home" for the root).
    pub name: String,
    /// DB path of this element.
    pub db_path: String,
    /// URL path of this element.
    pub url_path: String,
    /// Whether this is the final element.
    pub is_last: bool,
}

/// Translates between the URL, DB and filesystem path spaces.
#[derive(Debug, Clone)]
pub struct PathConverter {
    data_root: PathBuf,
}

impl PathConverter {
    /// Create a converter rooted at `data_root`.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// Root directory holding one subdirectory per user.
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Convert any user-supplied path into a DB path.
    ///
    /// Strips leading slashes, a leading username segment and trailing
    /// slashes. `"."` and `"/"` collapse to `""`.
    ///
    /// ```
    /// use cloudvault::PathConverter;
    ///
    /// assert_eq!(PathConverter::to_db_path("bob", "/bob/documents/"), "documents");
    /// assert_eq!(PathConverter::to_db_path("bob", "bobby/notes"), "bobby/notes");
    /// assert_eq!(PathConverter::to_db_path("bob", "/"), "");
    /// ```
    pub fn to_db_path(username: &str, input: &str) -> String {
        let trimmed = input.trim_start_matches('/');
        let without_user = match trimmed.strip_prefix(username) {
            Some(rest) if !username.is_empty() && (rest.is_empty() || rest.starts_with('/')) => {
                rest
            }
            _ => trimmed,
        };
        let cleaned = without_user.trim_start_matches('/').trim_end_matches('/');

        if cleaned == "." {
            return String::new();
        }
        cleaned.to_string()
    }

    /// DB path of a folder, given its stored (username-prefixed) path.
    pub fn folder_db_path(username: &str, folder_path: &str) -> String {
        Self::to_db_path(username, folder_path)
    }

    /// Stored folder path for a DB path: the username followed by the DB path.
    pub fn to_folder_path(username: &str, db_path: &str) -> String {
        Self::join_db_path([username, db_path])
    }

    /// Absolute filesystem path for a DB path.
    ///
    /// Both the username and the DB path are validated first: an absolute
    /// path or a `..` segment fails with `InvalidPath` instead of resolving
    /// outside the user's subtree.
    pub fn from_db_path(&self, username: &str, db_path: &str) -> Result<PathBuf> {
        if !Self::is_valid_name(username) {
            return Err(CloudError::InvalidPath(username.to_string()));
        }
        let db_path = Self::sanitize_path(db_path)?;

        let user_root = self.data_root.join(username);
        if db_path.is_empty() {
            return Ok(user_root);
        }
        Ok(user_root.join(db_path))
    }

    /// Absolute filesystem path of a stored file.
    pub fn full_file_path(&self, username: &str, location: &str) -> Result<PathBuf> {
        self.from_db_path(username, location)
    }

    /// URL path for a DB path.
    ///
    /// ```
    /// use cloudvault::PathConverter;
    ///
    /// assert_eq!(PathConverter::to_url_path(""), "/files/");
    /// assert_eq!(PathConverter::to_url_path("documents/2024"), "/files/documents/2024");
    /// ```
    pub fn to_url_path(db_path: &str) -> String {
        let cleaned = db_path.trim_matches('/');
        if cleaned.is_empty() {
            return ROOT_URL.to_string();
        }
        format!("{URL_PREFIX}/{cleaned}")
    }

    /// DB path for a URL path. Inverse of [`Self::to_url_path`].
    pub fn from_url_path(url_path: &str) -> String {
        let without_prefix = match url_path.strip_prefix(URL_PREFIX) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => url_path,
        };
        let cleaned = without_prefix.trim_matches('/');

        if cleaned == "." {
            return String::new();
        }
        cleaned.to_string()
    }

    /// Join DB path segments, skipping empty and `"."` segments.
    ///
    /// ```
    /// use cloudvault::PathConverter;
    ///
    /// let joined = PathConverter::join_db_path(["", "documents", "invoices"]);
    /// assert_eq!(joined, "documents/invoices");
    /// assert_eq!(PathConverter::join_db_path([".", ""]), "");
    /// ```
    pub fn join_db_path<I, S>(segments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .map(|s| s.as_ref().trim_matches('/').to_string())
            .filter(|s| !s.is_empty() && s != ".")
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Parent of a DB path (`""` for top-level entries and the root).
    pub fn parent_db_path(db_path: &str) -> String {
        match db_path.trim_end_matches('/').rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        }
    }

    /// Last segment of a DB path.
    pub fn base_name(db_path: &str) -> &str {
        let trimmed = db_path.trim_end_matches('/');
        match trimmed.rsplit_once('/') {
            Some((_, name)) => name,
            None => trimmed,
        }
    }

    /// Whether the DB path denotes the user's root.
    pub fn is_root_path(db_path: &str) -> bool {
        db_path.is_empty()
    }

    /// Whether `child` lies strictly below `parent`.
    pub fn is_child_of(child: &str, parent: &str) -> bool {
        if parent.is_empty() {
            return !child.is_empty();
        }
        child
            .strip_prefix(parent)
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }

    /// Number of segments in a DB path (0 for the root).
    pub fn depth(db_path: &str) -> usize {
        if db_path.is_empty() {
            return 0;
        }
        db_path.matches('/').count() + 1
    }

    /// Breadcrumb trail for a DB path, starting with "Home".
    pub fn breadcrumbs(db_path: &str) -> Vec<Breadcrumb> {
        let parts: Vec<&str> = db_path.split('/').filter(|p| !p.is_empty()).collect();

        let mut crumbs = Vec::with_capacity(parts.len() + 1);
        crumbs.push(Breadcrumb {
            name: "Home".to_string(),
            db_path: String::new(),
            url_path: ROOT_URL.to_string(),
            is_last: parts.is_empty(),
        });

        let mut current = String::new();
        for (i, part) in parts.iter().enumerate() {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);

            crumbs.push(Breadcrumb {
                name: (*part).to_string(),
                db_path: current.clone(),
                url_path: Self::to_url_path(&current),
                is_last: i == parts.len() - 1,
            });
        }

        crumbs
    }

    /// Whether a path is free of traversal, absolute components and unsafe characters.
    ///
    /// `"/"` on its own is accepted as the root.
    pub fn is_valid_path(input: &str) -> bool {
        if input.split('/').any(|segment| segment == "..") {
            return false;
        }
        if input.starts_with('/') && input.len() > 1 {
            return false;
        }
        !input.contains(&UNSAFE_CHARS[..])
    }

    /// Whether a single name (folder or file) is usable as one path segment.
    pub fn is_valid_name(name: &str) -> bool {
        !name.trim().is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains(&UNSAFE_CHARS[..])
    }

    /// Validate and normalise a path into DB form.
    ///
    /// `..` is rejected, never resolved. Empty and `.` segments are dropped.
    pub fn sanitize_path(input: &str) -> Result<String> {
        if !Self::is_valid_path(input) {
            return Err(CloudError::InvalidPath(input.to_string()));
        }
        Ok(Self::join_db_path(input.split('/')))
    }
}
