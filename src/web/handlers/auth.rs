//! Account and session handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use serde::Serialize;

use crate::auth::RegistrationRequest;
use crate::db::UserSummary;
use crate::web::error::ApiError;
use crate::web::extract::JsonBody;
use crate::web::handlers::AppState;
use crate::web::middleware::XToken;

/// Login response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Session token for the `X-Token` header.
    pub token: String,
}

/// POST /users - Register a new account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<RegistrationRequest>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    let user = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /connect - Log in with `Authorization: Basic base64(email:password)`.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let TypedHeader(Authorization(basic)) = credentials.ok_or_else(ApiError::unauthorized)?;

    let token = state.auth.login(basic.username(), basic.password()).await?;
    Ok(Json(TokenResponse { token }))
}

/// GET /disconnect - Revoke the session token.
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    token: XToken,
) -> Result<StatusCode, ApiError> {
    state.auth.logout(token.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/me - The account behind the session token.
pub async fn me(
    State(state): State<Arc<AppState>>,
    token: XToken,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state.auth.whoami(token.as_deref()).await?;
    Ok(Json(user))
}
