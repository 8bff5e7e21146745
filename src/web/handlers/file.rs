//! File handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::file::{FileRecord, UploadRequest};
use crate::id::ParentId;
use crate::web::error::ApiError;
use crate::web::extract::JsonBody;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Query parameters for listing.
///
/// Both are kept as raw strings; anything unparseable falls back to the
/// default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Parent folder ID, `0` for the root.
    pub parent_id: Option<String>,
    /// Zero-based page number.
    pub page: Option<String>,
}

impl ListQuery {
    fn parent(&self) -> ParentId {
        self.parent_id
            .as_deref()
            .map(ParentId::from_storage)
            .unwrap_or_default()
    }

    fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Query parameters for download.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Thumbnail width.
    pub size: Option<String>,
}

/// POST /files - Create a file or folder.
pub async fn create_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    JsonBody(request): JsonBody<UploadRequest>,
) -> Result<(StatusCode, Json<FileRecord>), ApiError> {
    let file = state.files.create_entry(&user_id, request).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// GET /files/:id - Get an owned entry.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let file = state.files.get_file(&user_id, &file_id).await?;
    Ok(Json(file))
}

/// GET /files - List a page of owned entries under a parent.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    query: Option<Query<ListQuery>>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let files = state
        .files
        .list_files(&user_id, &query.parent(), query.page())
        .await?;
    Ok(Json(files))
}

/// PUT /files/:id/publish
pub async fn publish_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let file = state.files.publish(&user_id, &file_id).await?;
    Ok(Json(file))
}

/// PUT /files/:id/unpublish
pub async fn unpublish_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let file = state.files.unpublish(&user_id, &file_id).await?;
    Ok(Json(file))
}

/// GET /files/:id/data - Download public content, optionally a thumbnail.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    query: Option<Query<DownloadQuery>>,
) -> Result<Response, ApiError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let download = state
        .files
        .download_content(&file_id, query.size.as_deref())
        .await?;

    Ok((
        [(header::CONTENT_TYPE, download.content_type)],
        download.content,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::default();
        assert_eq!(query.parent(), ParentId::Root);
        assert_eq!(query.page(), 0);
    }

    #[test]
    fn test_list_query_parsing() {
        let query = ListQuery {
            parent_id: Some("0".to_string()),
            page: Some("abc".to_string()),
        };
        assert_eq!(query.parent(), ParentId::Root);
        assert_eq!(query.page(), 0);

        let query = ListQuery {
            parent_id: Some("5f1e".to_string()),
            page: Some("2".to_string()),
        };
        assert!(!query.parent().is_root());
        assert_eq!(query.page(), 2);
    }
}
