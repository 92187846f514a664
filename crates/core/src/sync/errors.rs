//! Sync-specific error types

use marginalia_common::{ErrorClassification, ErrorSeverity, StorageError};
use marginalia_domain::{ErrorEnvelope, MarginaliaError};
use thiserror::Error;

/// Categories of sync errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorCategory {
    /// Mutation can never be routed - non-retryable
    Invalid,
    /// Local persistence failed - retryable
    Storage,
    /// Server refused a live write - retryable only when the envelope says so
    Rejected,
}

/// Sync operation errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("Queue persistence failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Write rejected: {0}")]
    Rejected(ErrorEnvelope),
}

impl SyncError {
    pub const fn category(&self) -> SyncErrorCategory {
        match self {
            Self::InvalidMutation(_) => SyncErrorCategory::Invalid,
            Self::Storage(_) => SyncErrorCategory::Storage,
            Self::Rejected(_) => SyncErrorCategory::Rejected,
        }
    }

    /// Envelope of a rejected live write
    pub const fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Self::Rejected(envelope) => Some(envelope),
            _ => None,
        }
    }
}

impl ErrorClassification for SyncError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidMutation(_) => false,
            Self::Storage(err) => err.is_retryable(),
            Self::Rejected(envelope) => envelope.retryable,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidMutation(_) | Self::Rejected(_) => ErrorSeverity::Warning,
            Self::Storage(_) => ErrorSeverity::Error,
        }
    }
}

impl From<SyncError> for MarginaliaError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InvalidMutation(message) => Self::InvalidInput(message),
            SyncError::Storage(err) => Self::Storage(err.to_string()),
            SyncError::Rejected(envelope) => Self::Network(envelope.to_string()),
        }
    }
}
