//! Upload pipeline.
//!
//! Creating an entry runs in a fixed order: validate the request, check
//! the parent, write the blob, insert the record, then queue thumbnails
//! for images. Nothing is written before validation passes. A failure
//! after the blob write is not rolled back and can leave an orphaned blob.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::metadata::{FileKind, FileRecord, FileRepository, NewFile};
use super::service::FileService;
use super::storage::BlobSink;
use crate::id::{EntityId, ParentId};
use crate::worker::{JobQueue, ThumbnailJob};
use crate::{FilesError, Result};

/// Request data for creating a file or folder.
///
/// Every field is optional on the wire so that each missing one gets its
/// own error message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Display name.
    pub name: Option<String>,
    /// `folder`, `file` or `image`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Containing folder; the root when absent.
    #[serde(default)]
    pub parent_id: ParentId,
    /// Initial visibility; private when absent.
    pub is_public: Option<bool>,
    /// Base64-encoded content. Required unless the entry is a folder.
    pub data: Option<String>,
}

impl UploadRequest {
    /// Create a folder request.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(FileKind::Folder.to_string()),
            ..Default::default()
        }
    }

    /// Create a file or image request carrying raw `bytes`.
    pub fn content(name: impl Into<String>, kind: FileKind, bytes: &[u8]) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(kind.to_string()),
            data: Some(BASE64.encode(bytes)),
            ..Default::default()
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: impl Into<ParentId>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    /// Set the initial visibility.
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = Some(is_public);
        self
    }
}

/// A request that passed validation.
struct ValidatedUpload {
    name: String,
    kind: FileKind,
    parent_id: ParentId,
    is_public: bool,
    content: Option<Vec<u8>>,
}

impl FileService {
    /// Create a file or folder owned by `user_id`.
    ///
    /// Image uploads also queue a thumbnail job. Queue failures are logged
    /// and ignored unless the service was built with
    /// [`with_enqueue_required`](FileService::with_enqueue_required).
    pub async fn create_entry(&self, user_id: &EntityId, request: UploadRequest) -> Result<FileRecord> {
        let upload = self.validate_upload(request)?;
        let repo = FileRepository::new(self.db.pool());

        if let Some(parent_id) = upload.parent_id.folder() {
            let parent = repo
                .get_by_id(parent_id)
                .await?
                .ok_or_else(|| FilesError::BadRequest("Parent not found".to_string()))?;
            if parent.kind != FileKind::Folder {
                return Err(FilesError::BadRequest("Parent is not a folder".to_string()));
            }
        }

        let new_file = match upload.content {
            None => NewFile::folder(user_id.clone(), upload.name),
            Some(content) => {
                let path = self.blobs.allocate_path();
                self.blobs.write_bytes(&path, &content).await?;
                debug!(path = %path, size = content.len(), "Blob written");

                NewFile::with_content(user_id.clone(), upload.name, upload.kind, path)
            }
        }
        .with_parent(upload.parent_id)
        .with_public(upload.is_public);

        let file = repo.create(&new_file).await?;
        info!(
            file_id = %file.id,
            user_id = %user_id,
            kind = %file.kind,
            "File created"
        );

        if file.kind == FileKind::Image {
            match self.jobs.enqueue(ThumbnailJob::new(user_id, &file.id)).await {
                Ok(job_id) => {
                    debug!(file_id = %file.id, job_id = %job_id, "Thumbnail job queued");
                }
                Err(e) if self.enqueue_required => return Err(e),
                Err(e) => {
                    warn!(file_id = %file.id, error = %e, "Failed to queue thumbnail job");
                }
            }
        }

        Ok(file)
    }

    fn validate_upload(&self, request: UploadRequest) -> Result<ValidatedUpload> {
        let name = request
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| FilesError::BadRequest("Missing name".to_string()))?;

        let kind: FileKind = request
            .kind
            .as_deref()
            .and_then(|k| k.parse().ok())
            .ok_or_else(|| FilesError::BadRequest("Missing type".to_string()))?;

        let content = if kind.has_content() {
            let data = request
                .data
                .filter(|d| !d.is_empty())
                .ok_or_else(|| FilesError::BadRequest("Missing data".to_string()))?;
            let bytes = BASE64
                .decode(data.trim())
                .map_err(|_| FilesError::BadRequest("Invalid data".to_string()))?;

            if bytes.len() as u64 > self.max_file_size {
                let max_mb = self.max_file_size / 1024 / 1024;
                return Err(FilesError::BadRequest(format!(
                    "File too large (max {max_mb}MB)"
                )));
            }
            Some(bytes)
        } else {
            None
        };

        Ok(ValidatedUpload {
            name,
            kind,
            parent_id: request.parent_id,
            is_public: request.is_public.unwrap_or(false),
            content,
        })
    }
}
