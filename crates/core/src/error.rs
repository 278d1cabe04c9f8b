//! Error types for eventfile
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! - `Persistence`: backing file creation, read, parse, encode or write failure
//! - `UnknownEventType` / `MalformedRecord`: message reconstruction failures
//! - `InvalidState`: transaction discipline violations
//! - `OutOfRange` / `InvalidArgument`: bad pagination or filter patterns
//! - `ProjectionNotFound`: lookup of an unregistered projection
//! - `UnsupportedOperation`: operations a component refuses to perform
//! - `StreamNotFound` / `StreamExistsAlready`: stream store contract violations

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for eventfile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for eventfile
#[derive(Debug, Error)]
pub enum Error {
    /// Backing file could not be created, read, parsed, encoded or written
    #[error("Failed to persist {}: {reason}", path.display())]
    Persistence {
        /// Backing file involved in the failure
        path: PathBuf,
        /// Human-readable failure description
        reason: String,
    },

    /// No reconstruction function is registered for this message name
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// A persisted record is missing fields or has the wrong shape
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Transaction discipline violation (nested begin, commit while idle, ...)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Pagination argument out of range
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Invalid argument, e.g. a regex pattern that does not compile
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Projection name is not registered
    #[error("A projection with name \"{0}\" could not be found")]
    ProjectionNotFound(String),

    /// Operation is not supported by the component
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Stream does not exist
    #[error("A stream with name \"{0}\" could not be found")]
    StreamNotFound(String),

    /// Stream already exists
    #[error("A stream with name \"{0}\" already exists")]
    StreamExistsAlready(String),
}

impl Error {
    /// Build a persistence error for the given file
    pub fn persistence(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Error::Persistence {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Build an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Build a malformed record error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedRecord(msg.into())
    }

    /// Check if this is a persistence failure
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence { .. })
    }

    /// Check if this is a transaction discipline violation
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }

    /// Check if this is a pagination range error
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::OutOfRange(_))
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    /// Check if this is a missing stream error
    pub fn is_stream_not_found(&self) -> bool {
        matches!(self, Error::StreamNotFound(_))
    }

    /// Check if this error came from message reconstruction
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownEventType(_) | Error::MalformedRecord(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_persistence() {
        let err = Error::persistence("/tmp/store.json", "Touch file failed");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/store.json"));
        assert!(msg.contains("Touch file failed"));
        assert!(err.is_persistence());
    }

    #[test]
    fn test_error_display_unknown_event_type() {
        let err = Error::UnknownEventType("UserRegistered".to_string());
        assert!(err.to_string().contains("UserRegistered"));
        assert!(err.is_codec_error());
    }

    #[test]
    fn test_error_display_stream_not_found() {
        let err = Error::StreamNotFound("user-1".to_string());
        assert_eq!(
            err.to_string(),
            "A stream with name \"user-1\" could not be found"
        );
        assert!(err.is_stream_not_found());
    }

    #[test]
    fn test_error_display_projection_not_found() {
        let err = Error::ProjectionNotFound("balances".to_string());
        assert!(err.to_string().contains("\"balances\""));
    }

    #[test]
    fn test_error_predicates_are_exclusive() {
        let err = Error::invalid_state("Transaction already started");
        assert!(err.is_invalid_state());
        assert!(!err.is_persistence());
        assert!(!err.is_out_of_range());
        assert!(!err.is_codec_error());
    }
}
