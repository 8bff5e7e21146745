//! Request body extractors.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::web::error::ApiError;

/// A JSON body that falls back to `T::default()` when no body is sent.
///
/// A request without a JSON content type counts as having no body. A body
/// that is present but does not deserialize is rejected as a bad request.
///
/// # Example
///
/// ```ignore
/// async fn create(JsonBody(request): JsonBody<UploadRequest>) -> ... {
///     // request fields are all optional; validation happens in the service
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => Ok(JsonBody(T::default())),
            Err(e) => Err(ApiError::bad_request(format!(
                "Invalid JSON: {}",
                e.body_text()
            ))),
        }
    }
}
