//! Request extractors and layers.

pub mod auth;
pub mod cors;

pub use auth::{AuthUser, XToken, TOKEN_HEADER};
pub use cors::create_cors_layer;
