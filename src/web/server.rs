//! HTTP server and process wiring.
//!
//! [`WebServer`] owns every long-lived handle: the metadata database, the
//! session store, the blob storage, the job queue and the thumbnail worker.
//! They are constructed once here and injected into the services.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::auth::{AuthService, SessionManager};
use crate::config::{Config, SessionBackend};
use crate::db::Database;
use crate::file::{FileService, FileStorage};
use crate::store::{spawn_session_cleanup, DatabaseSessionStore, MemorySessionStore, SessionStore};
use crate::worker::{JobConsumer, MemoryJobQueue, ThumbnailWorker};
use crate::Result;

use super::handlers::AppState;
use super::router::{body_limit_for, create_router};

/// How long shutdown waits for in-flight thumbnail jobs.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Web server for the API.
pub struct WebServer {
    host: String,
    port: u16,
    cors_origins: Vec<String>,
    body_limit: usize,
    app_state: Arc<AppState>,
    worker: Option<(ThumbnailWorker, JobConsumer)>,
    sessions: Arc<dyn SessionStore>,
    cleanup_interval: Duration,
}

impl WebServer {
    /// Open the database named in `config` and build the server.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open(&config.database.path, config.database.max_connections).await?;
        Ok(Self::new(config, db))
    }

    /// Build the server over an already opened database.
    pub fn new(config: &Config, db: Database) -> Self {
        let ttl = Duration::from_secs(config.session.ttl_secs);
        let session_store: Arc<dyn SessionStore> = match config.session.backend {
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
            SessionBackend::Database => Arc::new(DatabaseSessionStore::new(db.clone())),
        };

        let storage = Arc::new(FileStorage::new(&config.files.storage_path));
        let (queue, consumer) = MemoryJobQueue::with_retention(
            config.worker.queue_capacity,
            config.worker.state_retention,
        );

        let auth = AuthService::new(db.clone(), SessionManager::new(Arc::clone(&session_store), ttl));
        let files = FileService::new(db.clone(), storage.clone(), Arc::new(queue))
            .with_max_file_size(config.max_upload_bytes())
            .with_enqueue_required(config.worker.enqueue_required);

        let worker = config.worker.enabled.then(|| {
            let worker = ThumbnailWorker::new(db.clone(), storage)
                .with_concurrency(config.worker.concurrency);
            (worker, consumer)
        });

        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            cors_origins: config.server.cors_origins.clone(),
            body_limit: body_limit_for(config.max_upload_bytes()),
            app_state: Arc::new(AppState::new(db, auth, files)),
            worker,
            sessions: session_store,
            cleanup_interval: Duration::from_secs(config.session.cleanup_interval_secs.max(1)),
        }
    }

    /// Shared application state.
    pub fn app_state(&self) -> Arc<AppState> {
        Arc::clone(&self.app_state)
    }

    /// Build the router without starting anything.
    pub fn router(&self) -> Router {
        create_router(self.app_state(), &self.cors_origins, self.body_limit)
    }

    /// Serve until `shutdown` resolves.
    ///
    /// The thumbnail worker and the session purge task run alongside the
    /// server. On shutdown the worker gets a bounded time to finish queued
    /// jobs, then the database is closed.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        let local_addr = listener.local_addr()?;
        let router = self.router();

        let worker_handle = match self.worker {
            Some((worker, consumer)) => Some(worker.spawn(consumer)),
            None => {
                tracing::warn!("Thumbnail worker disabled; image jobs will not be processed");
                None
            }
        };

        tracing::info!(
            interval_secs = self.cleanup_interval.as_secs(),
            "Session cleanup task started"
        );
        let cleanup_handle = spawn_session_cleanup(self.sessions, self.cleanup_interval);

        tracing::info!("Web server listening on http://{}", local_addr);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Web server stopped");
        cleanup_handle.abort();

        // Dropping the last queue producer lets the worker drain and exit
        let db = self.app_state.db.clone();
        drop(self.app_state);
        if let Some(handle) = worker_handle {
            if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("Thumbnail worker did not drain in time");
            }
        }

        db.close().await;
        Ok(())
    }
}

impl std::fmt::Debug for WebServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("worker", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}
