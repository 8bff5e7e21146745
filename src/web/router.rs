//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    connect, create_file, disconnect, download_file, get_file, list_files, me, publish_file,
    register, stats, status, unpublish_file, AppState,
};
use super::middleware::create_cors_layer;

/// Create the main API router.
///
/// `body_limit` caps request bodies in bytes; uploads arrive base64
/// encoded, so it must leave room for the encoding overhead.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String], body_limit: usize) -> Router {
    let status_routes = Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats));

    let auth_routes = Router::new()
        .route("/users", post(register))
        .route("/users/me", get(me))
        .route("/connect", get(connect))
        .route("/disconnect", get(disconnect));

    let file_routes = Router::new()
        .route("/files", post(create_file).get(list_files))
        .route("/files/:id", get(get_file))
        .route("/files/:id/publish", put(publish_file))
        .route("/files/:id/unpublish", put(unpublish_file))
        .route("/files/:id/data", get(download_file));

    Router::new()
        .merge(status_routes)
        .merge(auth_routes)
        .merge(file_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}

/// Request body limit for a given maximum decoded upload size.
pub fn body_limit_for(max_upload_bytes: u64) -> usize {
    // base64 inflates by 4/3, plus room for the JSON envelope
    let encoded = max_upload_bytes.saturating_mul(4) / 3 + 64 * 1024;
    usize::try_from(encoded).unwrap_or(usize::MAX)
}
