//! HTTP API.
//!
//! Translates requests into [`AuthService`](crate::auth::AuthService) and
//! [`FileService`](crate::file::FileService) calls. Authenticated routes
//! read the session token from the `X-Token` header.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
