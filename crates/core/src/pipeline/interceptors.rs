//! Interceptor chain
//!
//! Request interceptors run in registration order before the first attempt.
//! Response interceptors run on every HTTP response before classification.
//! Error interceptors run only on failure and must hand an envelope back, so
//! they can rewrite or log a failure but never turn it into a success.

use async_trait::async_trait;
use marginalia_common::KeyedStore;
use marginalia_domain::constants::{TOKEN_KEY, TRACE_ID_HEADER};
use marginalia_domain::{ErrorEnvelope, TraceContext};

use super::ports::{TransportRequest, TransportResponse};

/// Mutates outgoing requests
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Returning an error aborts the call without touching the transport
    async fn on_request(
        &self,
        request: &mut TransportRequest,
        trace: &TraceContext,
    ) -> Result<(), ErrorEnvelope>;
}

/// Observes or rewrites raw responses
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn on_response(&self, response: &mut TransportResponse, trace: &TraceContext);
}

/// Observes or rewrites failures
#[async_trait]
pub trait ErrorInterceptor: Send + Sync {
    async fn on_error(&self, error: ErrorEnvelope, trace: &TraceContext) -> ErrorEnvelope;
}

/// First interceptor of every pipeline
///
/// Injects `Authorization: Bearer {token}` when the store holds a token and
/// always injects the trace id header.
#[derive(Debug, Clone)]
pub struct SessionHeadersInterceptor {
    store: KeyedStore,
}

impl SessionHeadersInterceptor {
    pub const fn new(store: KeyedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RequestInterceptor for SessionHeadersInterceptor {
    async fn on_request(
        &self,
        request: &mut TransportRequest,
        trace: &TraceContext,
    ) -> Result<(), ErrorEnvelope> {
        if let Some(token) = self.store.get::<String>(TOKEN_KEY).filter(|t| !t.is_empty()) {
            request.headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        }
        request.headers.insert(TRACE_ID_HEADER.to_string(), trace.trace_id().to_string());
        Ok(())
    }
}
