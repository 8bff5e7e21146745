//! files-manager - multi-tenant file storage service
//!
//! Users register, log in for a session token, and manage a private tree
//! of files and folders. Files can be published for anonymous download,
//! and uploaded images get thumbnail variants generated in the background.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod id;
pub mod logging;
pub mod store;
pub mod web;
pub mod worker;

pub use auth::{AuthService, RegistrationRequest, SessionManager};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository, UserSummary};
pub use error::{FilesError, Result};
pub use file::{BlobSink, FileKind, FileRecord, FileService, FileStorage, UploadRequest};
pub use id::{EntityId, ParentId};
pub use store::{DatabaseSessionStore, MemorySessionStore, SessionStore};
pub use web::{create_router, AppState, WebServer};
pub use worker::{JobQueue, JobState, MemoryJobQueue, ThumbnailJob, ThumbnailWorker};
