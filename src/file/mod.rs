//! File management module for cloudvault.
//!
//! This module provides file storage and organisation including:
//! - Per-user folder hierarchy with ownership and cycle checks
//! - Folder and file metadata repositories
//! - Streaming content store with SHA-256 hashing
//! - Content sniffing for MIME types

mod folder;
mod metadata;
pub mod mime;
mod service;
mod storage;
mod tree;

pub use folder::{Folder, FolderMove, FolderRepository, NewFolder};
pub use metadata::{FileMetadata, FileRepository, NewFile};
pub use mime::detect_mime_type;
pub use service::{FileCatalog, UploadPart};
pub use storage::{ContentStore, ContentStream, SavedContent, SNIFF_LEN};
pub use tree::FolderTree;
