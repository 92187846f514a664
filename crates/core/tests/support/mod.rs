//! Shared test helpers for `marginalia-core` integration tests.
//!
//! In-memory fakes for every pipeline port so tests can script server
//! behaviour and observe what the pipeline did with it.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use marginalia_common::{KeyedStore, MemoryBackend};
use marginalia_core::pipeline::{
    AuthRedirect, ErrorPresenter, LoadingIndicator, RequestPipelineBuilder, Transport,
    TransportFailure, TransportRequest, TransportResponse,
};
use marginalia_domain::{ErrorEnvelope, TraceContext};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://api.test";

/// One scripted transport reply
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, String),
    Fail(TransportFailure),
    /// Never answers within any sensible timeout
    Hang,
}

impl Reply {
    pub fn ok(data: Value) -> Self {
        Self::Json(200, json!({"code": 0, "message": "ok", "data": data}))
    }

    pub fn business(code: i64, message: &str) -> Self {
        Self::Json(200, json!({"code": code, "message": message}))
    }
}

/// Transport answering from a script, recording every request
///
/// When the script runs out the last reply repeats.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    requests: Mutex<Vec<TransportRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into_iter().collect()), ..Self::default() })
    }

    /// Hold every reply for `delay` before answering
    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().push_back(reply);
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> Reply {
        let mut replies = self.replies.lock();
        let mut last = self.last.lock();
        if let Some(reply) = replies.pop_front() {
            *last = Some(reply.clone());
            return reply;
        }
        last.clone().unwrap_or_else(|| Reply::ok(Value::Null))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure> {
        self.requests.lock().push(request);
        let reply = self.next_reply();
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Reply::Json(status, body) => Ok(TransportResponse::new(status, body.to_string())),
            Reply::Raw(status, body) => Ok(TransportResponse::new(status, body)),
            Reply::Fail(failure) => Err(failure),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportFailure::Network("hung transport woke up".into()))
            }
        }
    }
}

/// Loading indicator counting show/hide transitions
#[derive(Debug, Default)]
pub struct CountingIndicator {
    pub shows: AtomicUsize,
    pub hides: AtomicUsize,
}

impl CountingIndicator {
    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub fn hides(&self) -> usize {
        self.hides.load(Ordering::SeqCst)
    }
}

impl LoadingIndicator for CountingIndicator {
    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }
}

/// Presenter remembering every surfaced error
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    presented: Mutex<Vec<(ErrorEnvelope, String)>>,
}

impl RecordingPresenter {
    pub fn presented(&self) -> Vec<ErrorEnvelope> {
        self.presented.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn trace_ids(&self) -> Vec<String> {
        self.presented.lock().iter().map(|(_, t)| t.clone()).collect()
    }
}

impl ErrorPresenter for RecordingPresenter {
    fn present(&self, error: &ErrorEnvelope, trace: &TraceContext) {
        self.presented.lock().push((error.clone(), trace.trace_id().to_string()));
    }
}

/// Login redirect counter
#[derive(Debug, Default)]
pub struct CountingRedirect {
    pub count: AtomicUsize,
}

impl CountingRedirect {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl AuthRedirect for CountingRedirect {
    fn redirect_to_login(&self, _reason: &ErrorEnvelope) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Every fake wired into one pipeline builder
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub store: KeyedStore,
    pub indicator: Arc<CountingIndicator>,
    pub presenter: Arc<RecordingPresenter>,
    pub redirect: Arc<CountingRedirect>,
}

impl Harness {
    pub fn new(transport: Arc<ScriptedTransport>) -> Self {
        Self {
            transport,
            store: KeyedStore::new(Arc::new(MemoryBackend::new()), "test:"),
            indicator: Arc::new(CountingIndicator::default()),
            presenter: Arc::new(RecordingPresenter::default()),
            redirect: Arc::new(CountingRedirect::default()),
        }
    }

    pub fn builder(&self) -> RequestPipelineBuilder {
        RequestPipelineBuilder::new(self.transport.clone(), self.store.clone())
            .base_url(BASE_URL)
            .loading_indicator(self.indicator.clone())
            .presenter(self.presenter.clone())
            .auth_redirect(self.redirect.clone())
    }
}
