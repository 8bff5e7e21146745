//! File management module.
//!
//! This module provides the per-user file tree:
//! - File and folder metadata with ownership and visibility
//! - Blob storage with UUID naming and thumbnail siblings
//! - Upload, listing, publishing and download through [`FileService`]

mod metadata;
mod service;
mod storage;
mod upload;

pub use metadata::{FileKind, FileRecord, FileRepository, NewFile};
pub use service::{Download, FileService};
pub use storage::{thumbnail_path, BlobSink, FileStorage};
pub use upload::UploadRequest;

/// Number of entries per listing page.
pub const PAGE_SIZE: i64 = 20;

/// Thumbnail widths generated for every image, in pixels.
pub const THUMBNAIL_WIDTHS: [u32; 3] = [500, 250, 100];

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
