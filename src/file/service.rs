//! File service.
//!
//! This module provides the file lifecycle operations:
//! - Lookup and listing scoped to the owner
//! - Publish / unpublish
//! - Public download, including thumbnail variants
//!
//! Uploads live in the `upload` module as another `impl FileService`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::metadata::{FileKind, FileRecord, FileRepository};
use super::storage::{thumbnail_path, BlobSink};
use super::{DEFAULT_MAX_FILE_SIZE, PAGE_SIZE, THUMBNAIL_WIDTHS};
use crate::db::Database;
use crate::id::{EntityId, ParentId};
use crate::worker::JobQueue;
use crate::{FilesError, Result};

/// Result of a download.
#[derive(Debug)]
pub struct Download {
    /// Content type guessed from the file name.
    pub content_type: String,
    /// Raw bytes.
    pub content: Vec<u8>,
}

/// File service over the metadata store, blob sink and job queue.
#[derive(Clone)]
pub struct FileService {
    pub(super) db: Database,
    pub(super) blobs: Arc<dyn BlobSink>,
    pub(super) jobs: Arc<dyn JobQueue>,
    pub(super) max_file_size: u64,
    pub(super) enqueue_required: bool,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(db: Database, blobs: Arc<dyn BlobSink>, jobs: Arc<dyn JobQueue>) -> Self {
        Self {
            db,
            blobs,
            jobs,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            enqueue_required: false,
        }
    }

    /// Set the maximum decoded upload size in bytes.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Fail image uploads whose thumbnail job cannot be queued.
    pub fn with_enqueue_required(mut self, required: bool) -> Self {
        self.enqueue_required = required;
        self
    }

    /// Get an entry owned by `user_id`.
    ///
    /// An entry owned by someone else is reported exactly like a missing one.
    pub async fn get_file(&self, user_id: &EntityId, file_id: &str) -> Result<FileRecord> {
        let id = parse_file_id(file_id)?;

        FileRepository::new(self.db.pool())
            .get_owned(&id, user_id)
            .await?
            .ok_or_else(not_found)
    }

    /// List one page of the caller's entries under `parent_id`.
    ///
    /// A parent folder owned by someone else yields an empty page.
    /// Negative pages are treated as the first page.
    pub async fn list_files(
        &self,
        user_id: &EntityId,
        parent_id: &ParentId,
        page: i64,
    ) -> Result<Vec<FileRecord>> {
        let repo = FileRepository::new(self.db.pool());

        if let Some(folder_id) = parent_id.folder() {
            if let Some(parent) = repo.get_by_id(folder_id).await? {
                if !parent.is_owned_by(user_id) {
                    debug!(user_id = %user_id, parent_id = %parent_id, "Listing foreign folder");
                    return Ok(Vec::new());
                }
            }
        }

        let offset = page.max(0).saturating_mul(PAGE_SIZE);
        repo.list_by_parent(user_id, parent_id, offset, PAGE_SIZE)
            .await
    }

    /// Make an owned entry publicly downloadable.
    pub async fn publish(&self, user_id: &EntityId, file_id: &str) -> Result<FileRecord> {
        self.set_public(user_id, file_id, true).await
    }

    /// Revoke public access to an owned entry.
    pub async fn unpublish(&self, user_id: &EntityId, file_id: &str) -> Result<FileRecord> {
        self.set_public(user_id, file_id, false).await
    }

    async fn set_public(
        &self,
        user_id: &EntityId,
        file_id: &str,
        is_public: bool,
    ) -> Result<FileRecord> {
        let id = parse_file_id(file_id)?;

        let file = FileRepository::new(self.db.pool())
            .set_public(&id, user_id, is_public)
            .await?
            .ok_or_else(not_found)?;

        info!(file_id = %file.id, user_id = %user_id, is_public, "File visibility changed");
        Ok(file)
    }

    /// Download the content of a public file, or one of its thumbnails.
    ///
    /// `size` selects a thumbnail width. A thumbnail that has not been
    /// generated yet is `NotFound`; callers retry later.
    pub async fn download_content(&self, file_id: &str, size: Option<&str>) -> Result<Download> {
        let id = EntityId::parse(file_id).ok_or_else(not_found)?;

        let file = FileRepository::new(self.db.pool())
            .get_by_id(&id)
            .await?
            .filter(|f| f.is_public)
            .ok_or_else(not_found)?;

        if file.kind == FileKind::Folder {
            return Err(FilesError::BadRequest(
                "A folder doesn't have content".to_string(),
            ));
        }

        let local_path = file.local_path.as_deref().ok_or_else(not_found)?;
        let path = match size {
            None => local_path.to_string(),
            Some(size) => thumbnail_path(local_path, parse_width(size)?),
        };

        let content = self.blobs.read_bytes(&path).await?.ok_or_else(not_found)?;

        let content_type = mime_guess::from_path(&file.name)
            .first_or_octet_stream()
            .to_string();

        Ok(Download {
            content_type,
            content,
        })
    }

    /// Count all entries.
    pub async fn count_files(&self) -> Result<i64> {
        FileRepository::new(self.db.pool()).count().await
    }
}

impl fmt::Debug for FileService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileService")
            .field("max_file_size", &self.max_file_size)
            .field("enqueue_required", &self.enqueue_required)
            .finish_non_exhaustive()
    }
}

fn not_found() -> FilesError {
    FilesError::NotFound("file".to_string())
}

/// Parse a caller-supplied file ID; an empty one is a bad request.
fn parse_file_id(file_id: &str) -> Result<EntityId> {
    if file_id.trim().is_empty() {
        return Err(FilesError::BadRequest("Missing id".to_string()));
    }
    EntityId::parse(file_id).ok_or_else(not_found)
}

/// Parse a thumbnail width; only the generated widths are accepted.
fn parse_width(size: &str) -> Result<u32> {
    size.trim()
        .parse::<u32>()
        .ok()
        .filter(|w| THUMBNAIL_WIDTHS.contains(w))
        .ok_or_else(|| FilesError::BadRequest("Invalid size".to_string()))
}
