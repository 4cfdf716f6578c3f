//! Centralized error types for inboxsweep.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the inboxsweep library.
#[derive(Error, Debug)]
pub enum SweepError {
    /// A single message could not be turned into a record.
    #[error("Parse error in message '{id}': {reason}")]
    Parse { id: String, reason: String },

    /// A single message reference (or a listing page) could not be fetched.
    #[error("Fetch error for '{reference}': {reason}")]
    Fetch { reference: String, reason: String },

    /// A batch flush to the record store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The snapshot file is corrupt or was written by an incompatible version.
    #[error("Corrupt or incompatible snapshot '{path}': {reason}")]
    InvalidSnapshot { path: PathBuf, reason: String },

    /// The configuration could not be applied.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, SweepError>`.
pub type Result<T> = std::result::Result<T, SweepError>;

impl SweepError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Parse` variant for the given message id.
    pub fn parse(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a `Fetch` variant for the given reference.
    pub fn fetch(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Whether the pipeline skips this error and keeps going.
    pub fn is_per_message(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Fetch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_message_errors() {
        assert!(SweepError::parse("m1", "bad").is_per_message());
        assert!(SweepError::fetch("m1", "timeout").is_per_message());
        assert!(!SweepError::Persistence("disk full".into()).is_per_message());
    }

    #[test]
    fn test_display_includes_context() {
        let err = SweepError::fetch("abc123", "connection reset");
        assert_eq!(
            err.to_string(),
            "Fetch error for 'abc123': connection reset"
        );
    }
}
