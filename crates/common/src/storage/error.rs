//! Storage error types

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused the write (quota, permission, I/O)
    #[error("write rejected for key '{key}': {reason}")]
    WriteFailed { key: String, reason: String },

    /// The backend could not be read
    #[error("read failed for key '{key}': {reason}")]
    ReadFailed { key: String, reason: String },

    /// Value could not be encoded as JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Shorthand for a rejected write
    pub fn write_failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteFailed { key: key.into(), reason: reason.into() }
    }

    /// Shorthand for a failed read
    pub fn read_failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReadFailed { key: key.into(), reason: reason.into() }
    }
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl ErrorClassification for StorageError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ReadFailed { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ReadFailed { .. } => ErrorSeverity::Warning,
            Self::WriteFailed { .. } | Self::Io(_) => ErrorSeverity::Error,
            Self::Serialization(_) => ErrorSeverity::Critical,
        }
    }
}
