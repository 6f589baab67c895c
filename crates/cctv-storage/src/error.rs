//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

use cctv_models::TimestampError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Directory not readable: {path}: {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Move failed: {0}")]
    MoveFailed(String),

    #[error("Alias update failed: {0}")]
    AliasFailed(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] TimestampError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn list_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ListFailed {
            path: path.into(),
            source,
        }
    }

    pub fn move_failed(msg: impl Into<String>) -> Self {
        Self::MoveFailed(msg.into())
    }

    pub fn alias_failed(msg: impl Into<String>) -> Self {
        Self::AliasFailed(msg.into())
    }
}
