//! Key/value stores with expiry.

mod session;

pub use session::{spawn_session_cleanup, DatabaseSessionStore, MemorySessionStore, SessionStore};
