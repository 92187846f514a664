//! Port interfaces for the request pipeline

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use marginalia_domain::{ErrorEnvelope, HttpMethod, TraceContext};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Fully resolved outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

/// Raw HTTP response as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: BTreeMap::new(), body: body.into() }
    }
}

/// Failure before any HTTP response arrived
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network failure: {0}")]
    Network(String),
}

/// HTTP client abstraction
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request; any HTTP status counts as a response
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure>;
}

/// Process-wide busy indicator
pub trait LoadingIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Presents surfaced failures to the user (toast, banner)
pub trait ErrorPresenter: Send + Sync {
    fn present(&self, error: &ErrorEnvelope, trace: &TraceContext);
}

/// Navigates to the login flow after the session is rejected
pub trait AuthRedirect: Send + Sync {
    fn redirect_to_login(&self, reason: &ErrorEnvelope);
}

/// Indicator for headless contexts
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLoadingIndicator;

impl LoadingIndicator for NoopLoadingIndicator {
    fn show(&self) {}

    fn hide(&self) {}
}

/// Presenter that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl ErrorPresenter for TracingPresenter {
    fn present(&self, error: &ErrorEnvelope, trace: &TraceContext) {
        warn!(
            trace_id = trace.trace_id(),
            kind = %error.kind,
            code = error.code,
            message = %error.message,
            "Request failed"
        );
    }
}

/// Redirect that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuthRedirect;

impl AuthRedirect for TracingAuthRedirect {
    fn redirect_to_login(&self, reason: &ErrorEnvelope) {
        warn!(kind = %reason.kind, code = reason.code, "Session rejected, login required");
    }
}
