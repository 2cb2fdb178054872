//! Error types for docket.

use thiserror::Error;

/// Result type alias using docket's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docket operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Case not found (vanished between scan and processing, or not owned)
    #[error("Case not found: {0}")]
    CaseNotFound(i64),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not authorized)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the failure came from the relational store itself.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let cases = [
            (Error::NotFound("folder 3".into()), "Not found: folder 3"),
            (Error::CaseNotFound(42), "Case not found: 42"),
            (Error::InvalidInput("title is required".into()), "Invalid input: title is required"),
            (Error::Unauthorized("invalid token".into()), "Unauthorized: invalid token"),
            (Error::Forbidden("admin only".into()), "Forbidden: admin only"),
            (Error::Storage("disk full".into()), "Storage error: disk full"),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_io_and_json_conversions() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().ends_with("gone"));

        let err: Error = serde_json::from_str::<i32>("x").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(msg) if !msg.is_empty()));
    }

    #[test]
    fn test_persistence_failure_classification() {
        assert!(Error::Database(sqlx::Error::PoolTimedOut).is_persistence_failure());
        assert!(!Error::CaseNotFound(1).is_persistence_failure());
        assert!(!Error::Internal("x".into()).is_persistence_failure());
    }
}
