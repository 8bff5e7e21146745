//! Thumbnail worker.
//!
//! Consumes [`ThumbnailJob`]s and writes resized variants of uploaded
//! images next to the original blob, one per width in
//! [`THUMBNAIL_WIDTHS`]. Widths are rendered concurrently on the blocking
//! pool. When one width fails the job fails, and the widths that did
//! succeed stay on disk.

use std::io::Cursor;
use std::sync::Arc;

use futures::future::join_all;
use image::imageops::FilterType;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::queue::{JobConsumer, QueuedJob, ThumbnailJob};
use crate::db::Database;
use crate::file::{thumbnail_path, BlobSink, FileKind, FileRepository, THUMBNAIL_WIDTHS};
use crate::id::EntityId;
use crate::{FilesError, Result};

/// Default number of jobs processed at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Why a job failed. The display text is recorded as the failure reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The job has no file ID.
    #[error("Missing fileId")]
    MissingFileId,

    /// The job has no user ID.
    #[error("Missing userId")]
    MissingUserId,

    /// No file with that ID is owned by that user.
    #[error("File not found")]
    FileNotFound,

    /// Reading, decoding, resizing, encoding or writing failed.
    #[error("Image processing error")]
    ImageProcessing,

    /// The metadata store could not be queried.
    #[error("database error: {0}")]
    Database(String),
}

/// Resize an encoded image to `width` pixels, keeping the aspect ratio.
///
/// The output uses the same format as the input.
pub fn render_thumbnail(bytes: &[u8], width: u32) -> Result<Vec<u8>> {
    if width == 0 {
        return Err(FilesError::ImageProcessing("zero width".to_string()));
    }

    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;

    let height = (u64::from(img.height()) * u64::from(width) / u64::from(img.width().max(1))).max(1);
    let height = u32::try_from(height)
        .map_err(|_| FilesError::ImageProcessing("thumbnail too tall".to_string()))?;

    let resized = img.resize_exact(width, height, FilterType::Triangle);

    let mut buf = Cursor::new(Vec::new());
    resized.write_to(&mut buf, format)?;
    Ok(buf.into_inner())
}

/// Background consumer of the thumbnail queue.
#[derive(Clone)]
pub struct ThumbnailWorker {
    db: Database,
    blobs: Arc<dyn BlobSink>,
    concurrency: usize,
}

impl ThumbnailWorker {
    /// Create a worker over the metadata store and blob sink.
    pub fn new(db: Database, blobs: Arc<dyn BlobSink>) -> Self {
        Self {
            db,
            blobs,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set how many jobs may run at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Process one job.
    ///
    /// Jobs for entries that are not images succeed without doing anything.
    pub async fn process(&self, job: &ThumbnailJob) -> std::result::Result<(), JobError> {
        let file_id = job
            .file_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(JobError::MissingFileId)?;
        let user_id = job
            .user_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(JobError::MissingUserId)?;

        let (Some(file_id), Some(user_id)) = (EntityId::parse(file_id), EntityId::parse(user_id))
        else {
            return Err(JobError::FileNotFound);
        };

        let file = FileRepository::new(self.db.pool())
            .get_owned(&file_id, &user_id)
            .await
            .map_err(|e| JobError::Database(e.to_string()))?
            .ok_or(JobError::FileNotFound)?;

        if file.kind != FileKind::Image {
            debug!(file_id = %file_id, kind = %file.kind, "Not an image, nothing to do");
            return Ok(());
        }

        let local_path = file.local_path.ok_or(JobError::ImageProcessing)?;
        let original = match self.blobs.read_bytes(&local_path).await {
            Ok(Some(bytes)) => Arc::new(bytes),
            Ok(None) => {
                warn!(file_id = %file_id, "Original blob is missing");
                return Err(JobError::ImageProcessing);
            }
            Err(e) => {
                warn!(file_id = %file_id, error = %e, "Failed to read original blob");
                return Err(JobError::ImageProcessing);
            }
        };

        let results = join_all(
            THUMBNAIL_WIDTHS
                .iter()
                .map(|&width| self.write_variant(&local_path, Arc::clone(&original), width)),
        )
        .await;

        let mut failed = false;
        for (width, result) in THUMBNAIL_WIDTHS.iter().zip(results) {
            if let Err(e) = result {
                warn!(file_id = %file_id, width, error = %e, "Thumbnail generation failed");
                failed = true;
            }
        }

        if failed {
            return Err(JobError::ImageProcessing);
        }

        info!(file_id = %file_id, "Thumbnails generated");
        Ok(())
    }

    async fn write_variant(&self, local_path: &str, original: Arc<Vec<u8>>, width: u32) -> Result<()> {
        let rendered = tokio::task::spawn_blocking(move || render_thumbnail(&original, width))
            .await
            .map_err(|e| FilesError::ImageProcessing(e.to_string()))??;

        self.blobs
            .write_bytes(&thumbnail_path(local_path, width), &rendered)
            .await?;

        debug!(path = %local_path, width, "Thumbnail written");
        Ok(())
    }

    /// Consume jobs until every producer is dropped.
    ///
    /// Up to `concurrency` jobs run at once. Returns after in-flight jobs
    /// have finished.
    pub async fn run(self, mut consumer: JobConsumer) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let states = consumer.states();
        info!(concurrency = self.concurrency, "Thumbnail worker started");

        while let Some(QueuedJob { id, job }) = consumer.recv().await {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "Worker semaphore closed");
                    break;
                }
            };

            let worker = self.clone();
            let states = states.clone();
            tokio::spawn(async move {
                let outcome = worker.process(&job).await;
                match &outcome {
                    Ok(()) => debug!(job_id = %id, "Thumbnail job done"),
                    Err(e) => warn!(job_id = %id, reason = %e, "Thumbnail job failed"),
                }
                states.complete(id, outcome.map_err(|e| e.to_string()));
                drop(permit);
            });
        }

        // Wait for in-flight jobs
        let all = u32::try_from(self.concurrency).unwrap_or(u32::MAX);
        let _ = semaphore.acquire_many(all).await;
        info!("Thumbnail worker stopped");
    }

    /// Spawn [`run`](Self::run) as a background task.
    pub fn spawn(self, consumer: JobConsumer) -> JoinHandle<()> {
        tokio::spawn(self.run(consumer))
    }
}

impl std::fmt::Debug for ThumbnailWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailWorker")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::file::{FileStorage, NewFile};
    use crate::worker::{JobQueue, JobState, MemoryJobQueue};
    use image::{ImageFormat, RgbImage};
    use tempfile::TempDir;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    struct Fixture {
        _temp_dir: TempDir,
        db: Database,
        storage: Arc<FileStorage>,
        worker: ThumbnailWorker,
        user_id: EntityId,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let storage = Arc::new(FileStorage::new(temp_dir.path().join("blobs")));
        let user_id = UserRepository::new(db.pool())
            .create(&NewUser::new("a@x.com", "hash"))
            .await
            .unwrap()
            .id;

        let worker = ThumbnailWorker::new(db.clone(), storage.clone());
        Fixture {
            _temp_dir: temp_dir,
            db,
            storage,
            worker,
            user_id,
        }
    }

    async fn store_file(fx: &Fixture, kind: FileKind, bytes: &[u8]) -> (EntityId, String) {
        let path = fx.storage.allocate_path();
        fx.storage.write_bytes(&path, bytes).await.unwrap();
        let file = FileRepository::new(fx.db.pool())
            .create(&NewFile::with_content(fx.user_id.clone(), "pic.png", kind, path.clone()))
            .await
            .unwrap();
        (file.id, path)
    }

    #[test]
    fn test_render_thumbnail_keeps_ratio_and_format() {
        let thumb = render_thumbnail(&png(1000, 600), 100).unwrap();

        assert_eq!(image::guess_format(&thumb).unwrap(), ImageFormat::Png);
        let img = image::load_from_memory(&thumb).unwrap();
        assert_eq!((img.width(), img.height()), (100, 60));
    }

    #[test]
    fn test_render_thumbnail_rejects_garbage() {
        assert!(matches!(
            render_thumbnail(b"definitely not an image", 100),
            Err(FilesError::ImageProcessing(_))
        ));
    }

    #[tokio::test]
    async fn test_process_generates_all_widths() {
        let fx = setup().await;
        let (file_id, path) = store_file(&fx, FileKind::Image, &png(800, 400)).await;

        fx.worker
            .process(&ThumbnailJob::new(&fx.user_id, &file_id))
            .await
            .unwrap();

        for width in THUMBNAIL_WIDTHS {
            let bytes = fx
                .storage
                .read_bytes(&thumbnail_path(&path, width))
                .await
                .unwrap()
                .unwrap();
            let img = image::load_from_memory(&bytes).unwrap();
            assert_eq!(img.width(), width);
            assert_eq!(img.height(), width / 2);
        }
    }

    #[tokio::test]
    async fn test_process_validation_failures() {
        let fx = setup().await;

        let job = ThumbnailJob {
            user_id: Some(fx.user_id.to_string()),
            file_id: None,
        };
        assert_eq!(fx.worker.process(&job).await, Err(JobError::MissingFileId));

        let job = ThumbnailJob {
            user_id: None,
            file_id: Some("abc".to_string()),
        };
        assert_eq!(fx.worker.process(&job).await, Err(JobError::MissingUserId));

        let job = ThumbnailJob::new(&fx.user_id, &EntityId::generate());
        assert_eq!(fx.worker.process(&job).await, Err(JobError::FileNotFound));
    }

    #[tokio::test]
    async fn test_process_requires_owner() {
        let fx = setup().await;
        let (file_id, _) = store_file(&fx, FileKind::Image, &png(10, 10)).await;

        let job = ThumbnailJob::new(&EntityId::generate(), &file_id);
        assert_eq!(fx.worker.process(&job).await, Err(JobError::FileNotFound));
    }

    #[tokio::test]
    async fn test_process_non_image_is_noop() {
        let fx = setup().await;
        let (file_id, path) = store_file(&fx, FileKind::File, b"plain bytes").await;

        fx.worker
            .process(&ThumbnailJob::new(&fx.user_id, &file_id))
            .await
            .unwrap();
        assert!(!fx.storage.exists(&thumbnail_path(&path, 100)).await.unwrap());
    }

    #[tokio::test]
    async fn test_process_undecodable_image() {
        let fx = setup().await;
        let (file_id, _) = store_file(&fx, FileKind::Image, b"not really a png").await;

        let result = fx.worker.process(&ThumbnailJob::new(&fx.user_id, &file_id)).await;
        assert_eq!(result, Err(JobError::ImageProcessing));
        assert_eq!(JobError::ImageProcessing.to_string(), "Image processing error");
    }

    /// Blob sink that refuses writes whose path ends with `suffix`.
    struct FailingSink {
        inner: Arc<FileStorage>,
        suffix: &'static str,
    }

    #[async_trait::async_trait]
    impl BlobSink for FailingSink {
        fn allocate_path(&self) -> String {
            self.inner.allocate_path()
        }

        async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
            if path.ends_with(self.suffix) {
                return Err(FilesError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.write_bytes(path, bytes).await
        }

        async fn read_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
            self.inner.read_bytes(path).await
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            self.inner.exists(path).await
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_written_widths() {
        let fx = setup().await;
        let (file_id, path) = store_file(&fx, FileKind::Image, &png(800, 400)).await;

        let sink = Arc::new(FailingSink {
            inner: fx.storage.clone(),
            suffix: "_250",
        });
        let worker = ThumbnailWorker::new(fx.db.clone(), sink);

        let result = worker.process(&ThumbnailJob::new(&fx.user_id, &file_id)).await;
        assert_eq!(result, Err(JobError::ImageProcessing));

        assert!(fx.storage.exists(&thumbnail_path(&path, 500)).await.unwrap());
        assert!(fx.storage.exists(&thumbnail_path(&path, 100)).await.unwrap());
        assert!(!fx.storage.exists(&thumbnail_path(&path, 250)).await.unwrap());
    }

    #[tokio::test]
    async fn test_run_records_outcomes() {
        let fx = setup().await;
        let (image_id, path) = store_file(&fx, FileKind::Image, &png(600, 300)).await;

        let (queue, consumer) = MemoryJobQueue::new(8);
        let ok = queue
            .enqueue(ThumbnailJob::new(&fx.user_id, &image_id))
            .await
            .unwrap();
        let bad = queue
            .enqueue(ThumbnailJob::new(&fx.user_id, &EntityId::generate()))
            .await
            .unwrap();

        let states = consumer.states();
        let handle = fx.worker.clone().with_concurrency(2).spawn(consumer);

        // Dropping the only producer lets the worker drain and stop
        drop(queue);
        handle.await.unwrap();

        assert_eq!(states.get(ok), Some(JobState::Done));
        assert_eq!(
            states.get(bad),
            Some(JobState::Failed("File not found".to_string()))
        );
        assert!(fx.storage.exists(&thumbnail_path(&path, 250)).await.unwrap());
    }
}
