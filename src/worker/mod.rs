//! Background thumbnail generation.
//!
//! Image uploads push a [`ThumbnailJob`] onto a [`JobQueue`]; the
//! [`ThumbnailWorker`] consumes it and writes the resized variants.

mod queue;
mod thumbnail;

pub use queue::{
    JobConsumer, JobId, JobQueue, JobState, JobStates, MemoryJobQueue, QueuedJob, ThumbnailJob,
    DEFAULT_STATE_RETENTION,
};
pub use thumbnail::{render_thumbnail, JobError, ThumbnailWorker, DEFAULT_CONCURRENCY};
