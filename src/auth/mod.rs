//! Authentication module.
//!
//! This module provides password hashing, session tokens, user
//! registration and the [`AuthService`] that combines them.

mod password;
mod registration;
mod service;
mod session;

pub use password::{hash_password, verify_password};
pub use registration::{register, RegistrationRequest};
pub use service::AuthService;
pub use session::{SessionManager, DEFAULT_SESSION_DURATION_SECS};
