//! File metadata types and repository.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::db::DbPool;
use crate::id::{EntityId, ParentId};
use crate::{FilesError, Result};

/// Kind of entry in a user's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Container for other entries; has no bytes.
    Folder,
    /// Opaque bytes.
    File,
    /// Raster image; gets thumbnail variants.
    Image,
}

impl FileKind {
    /// Database and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Folder => "folder",
            FileKind::File => "file",
            FileKind::Image => "image",
        }
    }

    /// Whether entries of this kind carry a blob.
    pub fn has_content(&self) -> bool {
        !matches!(self, FileKind::Folder)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "folder" => Ok(FileKind::Folder),
            "file" => Ok(FileKind::File),
            "image" => Ok(FileKind::Image),
            _ => Err(format!("unknown file type: {s}")),
        }
    }
}

/// A file or folder as stored in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique file ID.
    pub id: EntityId,
    /// Owner.
    pub user_id: EntityId,
    /// Display name.
    pub name: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Whether the content can be downloaded without a session.
    pub is_public: bool,
    /// Containing folder, or the root.
    pub parent_id: ParentId,
    /// Blob path; present iff the kind has content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

impl FileRecord {
    /// Whether `user_id` owns this entry.
    pub fn is_owned_by(&self, user_id: &EntityId) -> bool {
        &self.user_id == user_id
    }
}

impl<'r> FromRow<'r, SqliteRow> for FileRecord {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("kind")?;
        let kind: FileKind = kind.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
            index: "kind".to_string(),
            source: e.into(),
        })?;
        let parent_id: String = row.try_get("parent_id")?;

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            kind,
            is_public: row.try_get("is_public")?,
            parent_id: ParentId::from_storage(&parent_id),
            local_path: row.try_get("local_path")?,
        })
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Owner.
    pub user_id: EntityId,
    /// Display name.
    pub name: String,
    /// Entry kind.
    pub kind: FileKind,
    /// Containing folder, or the root.
    pub parent_id: ParentId,
    /// Initial visibility.
    pub is_public: bool,
    /// Blob path for non-folder entries.
    pub local_path: Option<String>,
}

impl NewFile {
    /// Create a folder entry.
    pub fn folder(user_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            kind: FileKind::Folder,
            parent_id: ParentId::Root,
            is_public: false,
            local_path: None,
        }
    }

    /// Create a file or image entry backed by the blob at `local_path`.
    pub fn with_content(
        user_id: EntityId,
        name: impl Into<String>,
        kind: FileKind,
        local_path: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            kind,
            parent_id: ParentId::Root,
            is_public: false,
            local_path: Some(local_path.into()),
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: ParentId) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the initial visibility.
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, name, kind, parent_id, is_public, local_path FROM files";

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new entry and return it with its generated ID.
    ///
    /// Rejects a folder with a blob path and a file without one; callers
    /// are expected to have validated already.
    pub async fn create(&self, file: &NewFile) -> Result<FileRecord> {
        if file.kind.has_content() != file.local_path.is_some() {
            return Err(FilesError::BadRequest(format!(
                "{} entries {} a local path",
                file.kind,
                if file.kind.has_content() {
                    "require"
                } else {
                    "cannot have"
                }
            )));
        }

        let id = EntityId::generate();

        sqlx::query(
            "INSERT INTO files (id, user_id, name, kind, parent_id, is_public, local_path)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&file.user_id)
        .bind(&file.name)
        .bind(file.kind.as_str())
        .bind(file.parent_id.as_storage())
        .bind(file.is_public)
        .bind(&file.local_path)
        .execute(self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| FilesError::NotFound("file".to_string()))
    }

    /// Get an entry by ID regardless of owner.
    pub async fn get_by_id(&self, id: &EntityId) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(file)
    }

    /// Get an entry by ID only if `user_id` owns it.
    pub async fn get_owned(&self, id: &EntityId, user_id: &EntityId) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS} WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List a page of the owner's entries under `parent_id`, in insertion order.
    pub async fn list_by_parent(
        &self,
        user_id: &EntityId,
        parent_id: &ParentId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ? AND parent_id = ?
             ORDER BY rowid LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(parent_id.as_storage())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Set the visibility of an owned entry in a single statement.
    ///
    /// Returns the updated record, or `None` if no entry with that ID is
    /// owned by `user_id`.
    pub async fn set_public(
        &self,
        id: &EntityId,
        user_id: &EntityId,
        is_public: bool,
    ) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(
            "UPDATE files SET is_public = ? WHERE id = ? AND user_id = ?
             RETURNING id, user_id, name, kind, parent_id, is_public, local_path",
        )
        .bind(is_public)
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// Count all entries.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
