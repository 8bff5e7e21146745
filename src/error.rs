//! Error types for the file service.

use thiserror::Error;

/// Common error type for the file service.
///
/// The first four variants are caller-facing and map directly onto HTTP
/// status codes. Everything else is an internal failure of one of the
/// backing stores.
#[derive(Error, Debug)]
pub enum FilesError {
    /// Missing, invalid or expired session, or a credential mismatch.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Validation failure on caller input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Entity absent, or not visible to the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// Entity already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Metadata store error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error (blob sink, config and log files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Job queue error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Thumbnail generation failed.
    #[error("image processing error: {0}")]
    ImageProcessing(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FilesError {
    /// Whether this error is an internal failure rather than a caller error.
    pub fn is_internal(&self) -> bool {
        !matches!(
            self,
            FilesError::Unauthorized(_)
                | FilesError::BadRequest(_)
                | FilesError::NotFound(_)
                | FilesError::Conflict(_)
        )
    }
}

impl From<sqlx::Error> for FilesError {
    fn from(e: sqlx::Error) -> Self {
        FilesError::Database(e.to_string())
    }
}

impl From<image::ImageError> for FilesError {
    fn from(e: image::ImageError) -> Self {
        FilesError::ImageProcessing(e.to_string())
    }
}

/// Result type alias for file service operations.
pub type Result<T> = std::result::Result<T, FilesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_display() {
        let err = FilesError::Unauthorized("session expired".to_string());
        assert_eq!(err.to_string(), "unauthorized: session expired");
    }

    #[test]
    fn test_not_found_display() {
        let err = FilesError::NotFound("file".to_string());
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_bad_request_display() {
        let err = FilesError::BadRequest("Missing name".to_string());
        assert_eq!(err.to_string(), "bad request: Missing name");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: FilesError = io_err.into();
        assert!(matches!(err, FilesError::Io(_)));
        assert!(err.is_internal());
    }

    #[test]
    fn test_caller_errors_are_not_internal() {
        assert!(!FilesError::Unauthorized(String::new()).is_internal());
        assert!(!FilesError::BadRequest(String::new()).is_internal());
        assert!(!FilesError::NotFound(String::new()).is_internal());
        assert!(!FilesError::Conflict(String::new()).is_internal());
        assert!(FilesError::Database(String::new()).is_internal());
        assert!(FilesError::Queue(String::new()).is_internal());
    }
}
