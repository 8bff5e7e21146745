//! Blob storage.
//!
//! Uploaded bytes and thumbnail variants are written as plain files under a
//! base directory:
//! ```text
//! {base_path}/
//! ├── 3f2a9c...e1          original upload
//! ├── 3f2a9c...e1_500      thumbnail variants
//! ├── 3f2a9c...e1_250
//! └── 3f2a9c...e1_100
//! ```
//! Every upload gets a fresh UUID path, so no two writers ever target the
//! same file and no locking is needed.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::{FilesError, Result};

/// Byte store addressed by generated path names.
#[async_trait]
pub trait BlobSink: Send + Sync {
    /// Generate a new unique path for an upload.
    fn allocate_path(&self) -> String;

    /// Write `bytes` to `path`, replacing any previous content.
    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read the bytes at `path`. Returns `None` if nothing is stored there.
    async fn read_bytes(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Whether something is stored at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Path of the thumbnail variant of `local_path` at `width` pixels.
pub fn thumbnail_path(local_path: &str, width: u32) -> String {
    format!("{local_path}_{width}")
}

/// Filesystem blob sink rooted at a base directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for blob storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `base_path`.
    ///
    /// The directory is created lazily on first write, so a missing
    /// directory at startup is not an error.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a blob path to the filesystem, refusing anything outside the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let resolved = PathBuf::from(path);
        // Only the part below the root is checked; the root may itself contain `..`
        let escapes = resolved.strip_prefix(&self.base_path).map_or(true, |rest| {
            rest.as_os_str().is_empty()
                || rest
                    .components()
                    .any(|c| !matches!(c, std::path::Component::Normal(_)))
        });

        if escapes {
            return Err(FilesError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("blob path outside storage root: {path}"),
            )));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl BlobSink for FileStorage {
    fn allocate_path(&self) -> String {
        self.base_path
            .join(Uuid::new_v4().to_string())
            .to_string_lossy()
            .into_owned()
    }

    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let file_path = self.resolve(path)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&file_path, bytes).await?;
        Ok(())
    }

    async fn read_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let file_path = self.resolve(path)?;

        match fs::read(&file_path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let file_path = self.resolve(path)?;
        Ok(fs::try_exists(&file_path).await?)
    }
}
