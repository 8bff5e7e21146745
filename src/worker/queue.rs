//! Thumbnail job queue.
//!
//! The producer side ([`JobQueue`]) is handed to the upload path; the
//! consumer side ([`JobConsumer`]) is owned by the worker. Every job gets a
//! [`JobId`] whose lifecycle can be observed through [`JobQueue::state`]:
//!
//! ```text
//! Queued -> Processing -> Done
//!                      \-> Failed(reason)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::id::EntityId;
use crate::{FilesError, Result};

/// Request to generate thumbnails for an uploaded image.
///
/// Both fields are optional on the wire; the worker rejects jobs with
/// either one missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailJob {
    /// Owner of the file.
    pub user_id: Option<String>,
    /// File to process.
    pub file_id: Option<String>,
}

impl ThumbnailJob {
    /// Create a job for `file_id` owned by `user_id`.
    pub fn new(user_id: &EntityId, file_id: &EntityId) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            file_id: Some(file_id.to_string()),
        }
    }
}

/// Queue-assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Waiting for the consumer.
    Queued,
    /// Taken by the consumer.
    Processing,
    /// Finished successfully (including no-op jobs).
    Done,
    /// Finished with an error. Failed jobs are not resubmitted.
    Failed(String),
}

impl JobState {
    /// Whether the job has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed(_))
    }
}

/// Producer side of the thumbnail queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit a job.
    async fn enqueue(&self, job: ThumbnailJob) -> Result<JobId>;

    /// Current state of a job, if the queue knows it.
    fn state(&self, id: JobId) -> Option<JobState>;
}

/// A job as delivered to the consumer.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    /// Queue-assigned id.
    pub id: JobId,
    /// Job payload.
    pub job: ThumbnailJob,
}

/// Number of recent job ids whose terminal state is kept by default.
pub const DEFAULT_STATE_RETENTION: u64 = 1024;

/// Shared job state table.
///
/// Pending and running jobs are always tracked. A terminal state is kept
/// only while its job is among the `retention` most recently queued.
#[derive(Debug, Clone)]
pub struct JobStates {
    states: Arc<DashMap<JobId, JobState>>,
    retention: u64,
}

impl JobStates {
    fn new(retention: u64) -> Self {
        Self {
            states: Arc::new(DashMap::new()),
            retention: retention.max(1),
        }
    }

    /// Current state of a job.
    pub fn get(&self, id: JobId) -> Option<JobState> {
        self.states.get(&id).map(|s| s.clone())
    }

    /// Number of jobs tracked.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no job is tracked.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Record the final outcome of a job and drop stale terminal states.
    pub fn complete(&self, id: JobId, outcome: std::result::Result<(), String>) {
        let state = match outcome {
            Ok(()) => JobState::Done,
            Err(reason) => JobState::Failed(reason),
        };
        self.states.insert(id, state);

        let retention = self.retention;
        self.states
            .retain(|job, state| !state.is_terminal() || job.0.saturating_add(retention) > id.0);
    }

    fn set(&self, id: JobId, state: JobState) {
        self.states.insert(id, state);
    }

    fn remove(&self, id: JobId) {
        self.states.remove(&id);
    }
}

/// In-process bounded queue.
#[derive(Debug)]
pub struct MemoryJobQueue {
    tx: mpsc::Sender<QueuedJob>,
    states: JobStates,
    next_id: AtomicU64,
}

impl MemoryJobQueue {
    /// Create a queue holding at most `capacity` pending jobs.
    ///
    /// Returns the producer and the single consumer.
    pub fn new(capacity: usize) -> (Self, JobConsumer) {
        Self::with_retention(capacity, DEFAULT_STATE_RETENTION)
    }

    /// Like [`new`](Self::new), keeping terminal states for the last
    /// `retention` jobs.
    pub fn with_retention(capacity: usize, retention: u64) -> (Self, JobConsumer) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let states = JobStates::new(retention);

        let queue = Self {
            tx,
            states: states.clone(),
            next_id: AtomicU64::new(1),
        };
        (queue, JobConsumer { rx, states })
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: ThumbnailJob) -> Result<JobId> {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.states.set(id, JobState::Queued);

        match self.tx.try_send(QueuedJob { id, job }) {
            Ok(()) => {
                tracing::debug!(job_id = %id, "Thumbnail job queued");
                Ok(id)
            }
            Err(e) => {
                self.states.remove(id);
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "queue is full",
                    mpsc::error::TrySendError::Closed(_) => "queue is closed",
                };
                Err(FilesError::Queue(reason.to_string()))
            }
        }
    }

    fn state(&self, id: JobId) -> Option<JobState> {
        self.states.get(id)
    }
}

/// Consumer side of a [`MemoryJobQueue`].
#[derive(Debug)]
pub struct JobConsumer {
    rx: mpsc::Receiver<QueuedJob>,
    states: JobStates,
}

impl JobConsumer {
    /// Wait for the next job and mark it as processing.
    ///
    /// Returns `None` once every producer has been dropped and the queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<QueuedJob> {
        let queued = self.rx.recv().await?;
        self.states.set(queued.id, JobState::Processing);
        Some(queued)
    }

    /// Take the next job if one is already waiting.
    pub fn try_recv(&mut self) -> Option<QueuedJob> {
        let queued = self.rx.try_recv().ok()?;
        self.states.set(queued.id, JobState::Processing);
        Some(queued)
    }

    /// Record the final outcome of a job.
    pub fn complete(&self, id: JobId, outcome: std::result::Result<(), String>) {
        self.states.complete(id, outcome);
    }

    /// Handle for completing jobs from other tasks.
    pub fn states(&self) -> JobStates {
        self.states.clone()
    }
}
