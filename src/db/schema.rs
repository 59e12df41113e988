//! Database schema and migrations for cloudvault.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded. Timestamps are stored as TEXT and always bound from Rust.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users and sessions
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- Argon2 hash
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE sessions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    session_token   TEXT NOT NULL UNIQUE,
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    valid           INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX idx_sessions_user ON sessions(user_id);
"#,
    // v2: Folder tree
    r#"
-- parent_id has no cascade: subfolders must be removed first
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    parent_id   INTEGER REFERENCES folders(id),
    name        TEXT NOT NULL,
    path        TEXT NOT NULL,           -- username-prefixed, e.g. 'bob/docs/2024'
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (user_id, path)
);

CREATE INDEX idx_folders_parent ON folders(user_id, parent_id);
CREATE UNIQUE INDEX idx_folders_single_root ON folders(user_id) WHERE parent_id IS NULL;
"#,
    // v3: File catalog
    r#"
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    folder_id   INTEGER REFERENCES folders(id) ON DELETE SET NULL,
    name        TEXT NOT NULL,
    size        INTEGER NOT NULL CHECK (size >= 0),
    mime_type   TEXT NOT NULL,
    location    TEXT NOT NULL,           -- DB path of the stored bytes below the owner's root
    hash        TEXT NOT NULL,           -- lowercase hex SHA-256
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_user ON files(user_id);
CREATE INDEX idx_files_folder ON files(folder_id);
"#,
    // v4: Shares
    r#"
CREATE TABLE file_shares (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id         INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    shared_with_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    permission      TEXT NOT NULL CHECK (permission IN ('read', 'write')),
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    expires_at      TEXT,                -- NULL means never
    UNIQUE (file_id, shared_with_id)
);

CREATE INDEX idx_file_shares_recipient ON file_shares(shared_with_id);
"#,
    // v5: Upload links and unlocks
    r#"
CREATE TABLE upload_links (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    password    TEXT NOT NULL,           -- Argon2 hash
    link_token  TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    expires_at  TEXT NOT NULL
);

CREATE TABLE link_unlocks (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    upload_link_id  INTEGER NOT NULL REFERENCES upload_links(id) ON DELETE CASCADE,
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    valid           INTEGER NOT NULL DEFAULT 1,
    expiry          TEXT NOT NULL
);

CREATE INDEX idx_link_unlocks_user ON link_unlocks(user_id);
CREATE INDEX idx_link_unlocks_link ON link_unlocks(upload_link_id);
"#,
];
