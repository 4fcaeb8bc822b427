//! Error types for the interaction-store crate.
//!
//! Every store operation reports failures through [`StoreError`]. Read paths
//! let callers decide how to degrade; write paths must surface the error so
//! that interactions and feedback are never silently lost.

use thiserror::Error;

/// Errors that can occur while reading, writing or loading interaction data
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached (connection refused, pool
    /// exhausted, remote timeout...)
    #[error("Interaction store unavailable: {0}")]
    Unavailable(String),

    /// Data file could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in a JSON-lines data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A record field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl StoreError {
    /// Shorthand for an [`StoreError::Unavailable`] error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable(reason.into())
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, StoreError>;
