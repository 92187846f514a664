//! Per-request trace context

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected trace context construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceContextError {
    #[error("trace context field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("trace context timestamp must be positive, got {0}")]
    InvalidTimestamp(i64),
}

/// Correlation data attached to one logical request
///
/// All four fields are mandatory. The only ways to obtain a value are
/// [`TraceContext::new`] and deserialization, and both validate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTraceContext")]
pub struct TraceContext {
    trace_id: String,
    user_id_hash: String,
    timestamp_ms: i64,
    platform: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTraceContext {
    trace_id: String,
    user_id_hash: String,
    timestamp_ms: i64,
    platform: String,
}

impl TryFrom<RawTraceContext> for TraceContext {
    type Error = TraceContextError;

    fn try_from(raw: RawTraceContext) -> Result<Self, Self::Error> {
        Self::new(raw.trace_id, raw.user_id_hash, raw.timestamp_ms, raw.platform)
    }
}

impl TraceContext {
    /// Build a validated trace context
    ///
    /// # Errors
    ///
    /// Fails when any string field is blank or the timestamp is not positive.
    pub fn new(
        trace_id: impl Into<String>,
        user_id_hash: impl Into<String>,
        timestamp_ms: i64,
        platform: impl Into<String>,
    ) -> Result<Self, TraceContextError> {
        let trace_id = non_empty("traceId", trace_id.into())?;
        let user_id_hash = non_empty("userIdHash", user_id_hash.into())?;
        let platform = non_empty("platform", platform.into())?;
        if timestamp_ms <= 0 {
            return Err(TraceContextError::InvalidTimestamp(timestamp_ms));
        }
        Ok(Self { trace_id, user_id_hash, timestamp_ms, platform })
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn user_id_hash(&self) -> &str {
        &self.user_id_hash
    }

    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, TraceContextError> {
    if value.trim().is_empty() {
        Err(TraceContextError::EmptyField(field))
    } else {
        Ok(value)
    }
}
