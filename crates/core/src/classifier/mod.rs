//! Business error classification
//!
//! A pure mapping from a transport outcome to either the unwrapped `data`
//! of a successful envelope or an [`ErrorEnvelope`] plus the way it should
//! be handled. Rules are applied in priority order:
//!
//! 1. transport timeout / network failure
//! 2. HTTP 401 / 403, regardless of body
//! 3. body without an integer `code`
//! 4. `code == 0` on a 2xx (success)
//! 5. business rejection, quota exhaustion, transient codes
//!
//! Silencing only changes [`Handling`]; the envelope is identical either way.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use marginalia_domain::constants::SUCCESS_CODE;
use marginalia_domain::{ClassifierConfig, ErrorEnvelope, ErrorKind};
use serde_json::Value;

use crate::pipeline::ports::TransportFailure;

/// What the transport produced for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No HTTP response was obtained
    Transport(TransportFailure),
    /// An HTTP response with its raw body
    Http { status: u16, body: String },
}

/// How a classified failure is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    /// Show to the user
    Surface,
    /// Log only
    Silent,
    /// Clear the session and send the user to login
    AuthRedirect,
}

impl Handling {
    /// Lowercase name used in log fields
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Silent => "silent",
            Self::AuthRedirect => "auth_redirect",
        }
    }
}

/// A failure and its handling policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub envelope: ErrorEnvelope,
    pub handling: Handling,
}

/// Classifier result
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Envelope `data` of a successful response
    Success(Value),
    Failure(Classification),
}

/// Code ranges that refine business rejections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierPolicy {
    pub quota_codes: RangeInclusive<i64>,
    pub transient_codes: BTreeSet<i64>,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self::from(&ClassifierConfig::default())
    }
}

impl From<&ClassifierConfig> for ClassifierPolicy {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            quota_codes: config.quota_code_min..=config.quota_code_max,
            transient_codes: config.transient_codes.iter().copied().collect(),
        }
    }
}

/// Maps outcomes to verdicts using a [`ClassifierPolicy`]
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    policy: ClassifierPolicy,
}

impl ErrorClassifier {
    /// Classifier applying `policy` to business codes
    pub const fn new(policy: ClassifierPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &ClassifierPolicy {
        &self.policy
    }

    /// Classify one outcome
    ///
    /// `silenced_codes` and `silent` only influence the returned
    /// [`Handling`]. Auth failures always map to [`Handling::AuthRedirect`].
    pub fn classify(
        &self,
        outcome: Outcome,
        silenced_codes: &BTreeSet<i64>,
        silent: bool,
    ) -> Verdict {
        let envelope = match outcome {
            Outcome::Transport(TransportFailure::Timeout(after)) => {
                ErrorEnvelope::timeout(format!("request timed out after {}ms", after.as_millis()))
            }
            Outcome::Transport(TransportFailure::Network(reason)) => ErrorEnvelope::network(reason),
            Outcome::Http { status: 401, .. } => {
                return auth_failure(ErrorKind::AuthExpired, 401, "session expired");
            }
            Outcome::Http { status: 403, .. } => {
                return auth_failure(ErrorKind::Forbidden, 403, "access forbidden");
            }
            Outcome::Http { status, body } => match self.inspect_body(status, &body) {
                Ok(data) => return Verdict::Success(data),
                Err(envelope) => envelope,
            },
        };

        let handling = Self::handling_for(&envelope, silenced_codes, silent);
        Verdict::Failure(Classification { envelope, handling })
    }

    /// Handling for a non-auth failure given the caller's presentation flags
    pub fn handling_for(
        envelope: &ErrorEnvelope,
        silenced_codes: &BTreeSet<i64>,
        silent: bool,
    ) -> Handling {
        if envelope.kind.is_auth() {
            Handling::AuthRedirect
        } else if silent || silenced_codes.contains(&envelope.code) {
            Handling::Silent
        } else {
            Handling::Surface
        }
    }

    fn inspect_body(&self, status: u16, body: &str) -> Result<Value, ErrorEnvelope> {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let code = parsed.as_ref().and_then(|v| v.get("code")).and_then(Value::as_i64);
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        let success_status = (200..300).contains(&status);

        let code = match code {
            None if success_status => {
                return Err(ErrorEnvelope::malformed(
                    message.unwrap_or_else(|| "response body is missing an integer code".into()),
                ));
            }
            Some(SUCCESS_CODE) if success_status => {
                let data = parsed.and_then(|mut v| v.get_mut("data").map(Value::take));
                return Ok(data.unwrap_or(Value::Null));
            }
            None | Some(SUCCESS_CODE) => return Err(unenveloped_http_failure(status, message)),
            Some(code) => code,
        };

        let kind = if self.policy.quota_codes.contains(&code) {
            ErrorKind::QuotaExceeded
        } else {
            ErrorKind::BusinessRejected
        };
        let retryable = self.policy.transient_codes.contains(&code);
        Err(ErrorEnvelope::new(
            kind,
            code,
            message.unwrap_or_else(|| "request rejected".to_string()),
            retryable,
        ))
    }
}

/// Non-2xx response that carries no business code
fn unenveloped_http_failure(status: u16, message: Option<String>) -> ErrorEnvelope {
    ErrorEnvelope::new(
        ErrorKind::Unknown,
        i64::from(status),
        message.unwrap_or_else(|| format!("HTTP {status}")),
        status >= 500 || status == 429,
    )
}

fn auth_failure(kind: ErrorKind, status: i64, message: &str) -> Verdict {
    Verdict::Failure(Classification {
        envelope: ErrorEnvelope::new(kind, status, message, false),
        handling: Handling::AuthRedirect,
    })
}
