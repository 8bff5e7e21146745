//! API handlers.

pub mod auth;
pub mod file;
pub mod status;

pub use auth::*;
pub use file::*;
pub use status::*;

use crate::auth::AuthService;
use crate::db::Database;
use crate::file::FileService;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Metadata database.
    pub db: Database,
    /// Accounts and sessions.
    pub auth: AuthService,
    /// File operations.
    pub files: FileService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, auth: AuthService, files: FileService) -> Self {
        Self { db, auth, files }
    }
}
