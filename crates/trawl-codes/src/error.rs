//! Error types for the code-table subsystem.

use thiserror::Error;

/// Errors that can occur while loading code tables.
#[derive(Error, Debug)]
pub enum CodeError {
    /// Failed to read a code table file
    #[error("failed to load code table from {path}: {source}")]
    LoadError {
        /// Path to the table file
        path: String,
        /// Underlying error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse a code table file as JSON
    #[error("failed to parse code table JSON in {path}: {source}")]
    ParseError {
        /// Path to the table file
        path: String,
        /// JSON parse error
        #[source]
        source: serde_json::Error,
    },

    /// Table contents do not have the expected shape
    #[error("invalid code table {table}: {reason}")]
    ValidationError {
        /// Table being validated
        table: String,
        /// Reason for validation failure
        reason: String,
    },

    /// Code table directory not found
    #[error("code table directory not found at {path}")]
    DirectoryNotFound {
        /// Expected directory path
        path: String,
    },

    /// I/O error while accessing code tables
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for code-table operations.
pub type Result<T> = std::result::Result<T, CodeError>;
