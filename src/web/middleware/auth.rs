//! Session token extraction.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::id::EntityId;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-token";

/// Raw `X-Token` header value, if present and valid UTF-8.
#[derive(Debug, Clone)]
pub struct XToken(pub Option<String>);

impl XToken {
    /// Token as a string slice.
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for XToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(XToken(token))
    }
}

/// Extractor for authenticated users.
///
/// Resolves the `X-Token` header through the session store and yields the
/// user ID. Rejects with 401 when the token is missing, unknown or expired.
#[derive(Debug, Clone)]
pub struct AuthUser(pub EntityId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let XToken(token) = XToken::from_request_parts(parts, state).await?;
        let user_id = state.auth.resolve(token.as_deref()).await?;
        Ok(AuthUser(user_id))
    }
}
