//! Service status handlers.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Backing store reachability.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Metadata database answers queries.
    pub db: bool,
    /// Session store answers queries.
    pub sessions: bool,
}

/// Collection sizes.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Registered users.
    pub users: i64,
    /// Files and folders.
    pub files: i64,
}

/// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        db: state.db.is_alive().await,
        sessions: state.auth.sessions().is_alive().await,
    })
}

/// GET /stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(StatsResponse {
        users: state.auth.count_users().await?,
        files: state.files.count_files().await?,
    }))
}
