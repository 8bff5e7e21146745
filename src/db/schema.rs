//! Database schema and migrations.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded. Never edit a migration that has shipped; append a new one.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- SHA-1 hex digest
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: files and folders
    r#"
-- parent_id is '0' for the root, otherwise the id of a folder row.
-- No foreign key: the root sentinel is not a row.
CREATE TABLE files (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(id),
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL CHECK (kind IN ('folder', 'file', 'image')),
    parent_id   TEXT NOT NULL DEFAULT '0',
    is_public   INTEGER NOT NULL DEFAULT 0,
    local_path  TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK ((kind = 'folder') = (local_path IS NULL))
);

CREATE INDEX idx_files_owner_parent ON files(user_id, parent_id);
"#,
    // v3: persistent sessions
    r#"
CREATE TABLE sessions (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    expires_at  INTEGER NOT NULL         -- unix seconds
);

CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
"#,
];
