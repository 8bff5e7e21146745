//! Test helpers for HTTP API tests.
//!
//! Builds the full service stack over an in-memory database and a temporary
//! blob directory. The thumbnail worker is not spawned; tests drive it with
//! [`TestApp::run_pending_jobs`] so job completion is deterministic.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageFormat, RgbImage};
use serde_json::{json, Value};
use tempfile::TempDir;

use files_manager::auth::{AuthService, SessionManager};
use files_manager::file::{FileService, FileStorage};
use files_manager::store::MemorySessionStore;
use files_manager::web::router::{body_limit_for, create_router};
use files_manager::web::AppState;
use files_manager::worker::{
    JobConsumer, JobId, JobQueue, JobState, MemoryJobQueue, ThumbnailWorker,
};
use files_manager::Database;

/// Maximum decoded upload size used by tests.
pub const TEST_MAX_UPLOAD: u64 = 1024 * 1024;

/// Full application with a test HTTP client.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub storage: Arc<FileStorage>,
    pub queue: Arc<MemoryJobQueue>,
    pub consumer: JobConsumer,
    pub worker: ThumbnailWorker,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Create an app with an in-memory database and an empty blob root.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");

        let storage = Arc::new(FileStorage::new(temp_dir.path().join("files_manager")));
        let (queue, consumer) = MemoryJobQueue::new(64);
        let queue = Arc::new(queue);

        let sessions = SessionManager::new(
            Arc::new(MemorySessionStore::new()),
            Duration::from_secs(86_400),
        );
        let auth = AuthService::new(db.clone(), sessions);
        let files = FileService::new(db.clone(), storage.clone(), queue.clone())
            .with_max_file_size(TEST_MAX_UPLOAD);
        let worker = ThumbnailWorker::new(db.clone(), storage.clone());

        let app_state = Arc::new(AppState::new(db.clone(), auth, files));
        let router = create_router(app_state, &[], body_limit_for(TEST_MAX_UPLOAD));
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            storage,
            queue,
            consumer,
            worker,
            _temp_dir: temp_dir,
        }
    }

    /// Register an account, returning the response body.
    pub async fn register(&self, email: &str, password: &str) -> Value {
        let response = self
            .server
            .post("/users")
            .json(&json!({"email": email, "password": password}))
            .await;
        response.json::<Value>()
    }

    /// Log in with Basic credentials, returning the token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .get("/connect")
            .add_header(AUTHORIZATION, basic_auth(email, password))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Register and log in, returning the token.
    pub async fn signup(&self, email: &str, password: &str) -> String {
        self.register(email, password).await;
        self.login(email, password).await
    }

    /// Create an entry, returning the response body.
    pub async fn create(&self, token: &str, body: Value) -> Value {
        let response = with_token(self.server.post("/files"), token).json(&body).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }

    /// State of a job as seen by the producer side.
    pub fn queue_state(&self, id: JobId) -> Option<JobState> {
        self.queue.state(id)
    }

    /// Process every queued thumbnail job and record its outcome.
    pub async fn run_pending_jobs(&mut self) -> Vec<(JobId, JobState)> {
        let mut outcomes = Vec::new();
        while let Some(queued) = self.consumer.try_recv() {
            let outcome = self.worker.process(&queued.job).await;
            self.consumer
                .complete(queued.id, outcome.map_err(|e| e.to_string()));
            let state = self
                .consumer
                .states()
                .get(queued.id)
                .expect("state for completed job");
            outcomes.push((queued.id, state));
        }
        outcomes
    }
}

/// Attach the session token header.
pub fn with_token(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-token"),
        HeaderValue::from_str(token).expect("valid token header"),
    )
}

/// `Authorization: Basic ...` value for `email:password`.
pub fn basic_auth(email: &str, password: &str) -> HeaderValue {
    let encoded = BASE64.encode(format!("{email}:{password}"));
    HeaderValue::from_str(&format!("Basic {encoded}")).expect("valid basic header")
}

/// Encode bytes for an upload body.
pub fn b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// A solid-color PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([20, 120, 220]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("encode test png");
    buf.into_inner()
}
