//! Response and error envelopes
//!
//! The server wraps every payload in `{code, message, data}`. Every failure
//! the client sees, whether from the transport, the HTTP layer or a business
//! rejection, is normalized into an [`ErrorEnvelope`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::{
    CLIENT_ERROR_CODE, MALFORMED_RESPONSE_CODE, NETWORK_ERROR_CODE, TIMEOUT_ERROR_CODE,
};
use crate::impl_wire_str_conversions;

/// Closed taxonomy of client-visible failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Network,
    Timeout,
    AuthExpired,
    Forbidden,
    BusinessRejected,
    QuotaExceeded,
    MalformedResponse,
    Unknown,
}

impl_wire_str_conversions!(ErrorKind {
    Network => "network",
    Timeout => "timeout",
    AuthExpired => "authExpired",
    Forbidden => "forbidden",
    BusinessRejected => "businessRejected",
    QuotaExceeded => "quotaExceeded",
    MalformedResponse => "malformedResponse",
    Unknown => "unknown",
});

impl ErrorKind {
    /// Failures that justify parking a write in the offline queue
    #[must_use]
    pub const fn is_deferrable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }

    /// Failures that invalidate the session
    #[must_use]
    pub const fn is_auth(self) -> bool {
        matches!(self, Self::AuthExpired | Self::Forbidden)
    }
}

/// Normalized failure returned by every request
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{kind} (code {code}): {message}")]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub code: i64,
    pub message: String,
    pub retryable: bool,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, code: i64, message: impl Into<String>, retryable: bool) -> Self {
        Self { kind, code, message: message.into(), retryable }
    }

    /// Transport could not reach the server
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, NETWORK_ERROR_CODE, message, true)
    }

    /// Transport gave up waiting
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, TIMEOUT_ERROR_CODE, message, true)
    }

    /// Response did not carry a usable envelope
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, MALFORMED_RESPONSE_CODE, message, false)
    }

    /// Failure raised locally, never reaching or leaving the transport
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, CLIENT_ERROR_CODE, message, false)
    }

    /// See [`ErrorKind::is_deferrable`]
    #[must_use]
    pub const fn is_deferrable(&self) -> bool {
        self.kind.is_deferrable()
    }
}

/// Server response wrapper; `code == 0` means success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_serializes_with_camel_case_kind() {
        let envelope = ErrorEnvelope::new(ErrorKind::AuthExpired, 401, "session expired", false);
        let expected = json!({
            "kind": "authExpired",
            "code": 401,
            "message": "session expired",
            "retryable": false
        });
        assert_eq!(serde_json::to_value(&envelope).unwrap(), expected);
        assert_eq!(envelope.to_string(), "authExpired (code 401): session expired");
    }

    #[test]
    fn only_transport_failures_are_deferrable() {
        assert!(ErrorEnvelope::network("offline").is_deferrable());
        assert!(ErrorEnvelope::timeout("slow").is_deferrable());
        assert!(!ErrorEnvelope::malformed("{}").is_deferrable());
        assert!(!ErrorKind::QuotaExceeded.is_deferrable());
        assert!(ErrorKind::Forbidden.is_auth());
    }

    #[test]
    fn response_envelope_tolerates_missing_message_and_data() {
        let envelope: ResponseEnvelope = serde_json::from_value(json!({"code": 0})).unwrap();
        assert_eq!(envelope.code, 0);
        assert!(envelope.data.is_null());
    }
}
