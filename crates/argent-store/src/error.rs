//! # Store Error Types
//!
//! Error types for JSON tree persistence.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io::Error / serde_json::Error                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds path context and categorization       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError::Persistence ← Caller must reload() to resynchronize      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// JSON tree persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    ///
    /// ## When This Occurs
    /// - File permissions issue
    /// - Disk full
    /// - Backing directory removed at runtime
    #[error("I/O failure at {path}: {message}")]
    Io { path: String, message: String },

    /// The backing file exists but does not parse as a JSON object.
    #[error("Corrupt store file {path}: {message}")]
    Corrupt { path: String, message: String },

    /// (De)serialization of a tree value failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A merge write carried a revision that is not newer than the stored
    /// one. Another writer got there first; the caller must re-read.
    #[error("Stale write at {path}: stored revision {stored}, offered {offered}")]
    StaleWrite {
        path: String,
        stored: u64,
        offered: u64,
    },

    /// A tree path or root value that the store cannot accept.
    #[error("Invalid tree path or value: {0}")]
    InvalidPath(String),
}

impl StoreError {
    /// Creates an Io error with path context.
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
