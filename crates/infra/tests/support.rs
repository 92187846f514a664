//! Shared helpers for infra integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use marginalia_core::pipeline::{AuthRedirect, ErrorPresenter};
use marginalia_core::sync::Connectivity;
use marginalia_domain::{Config, ErrorEnvelope, TraceContext};
use marginalia_infra::{ClientContext, ClientPorts};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub presented: Mutex<Vec<ErrorEnvelope>>,
}

impl ErrorPresenter for RecordingPresenter {
    fn present(&self, error: &ErrorEnvelope, _trace: &TraceContext) {
        self.presented.lock().push(error.clone());
    }
}

#[derive(Debug, Default)]
pub struct CountingRedirect {
    pub count: AtomicUsize,
}

impl AuthRedirect for CountingRedirect {
    fn redirect_to_login(&self, _reason: &ErrorEnvelope) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connectivity flag flipped by the test
#[derive(Debug)]
pub struct Toggle(pub AtomicBool);

impl Connectivity for Toggle {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Context talking to `base_url` with observable presenter and redirect
pub struct TestClient {
    pub context: ClientContext,
    pub presenter: Arc<RecordingPresenter>,
    pub redirect: Arc<CountingRedirect>,
}

pub fn client(base_url: &str, tweak: impl FnOnce(&mut Config)) -> TestClient {
    let mut config = Config::default();
    config.api.base_url = Some(base_url.to_string());
    config.api.timeout_ms = 2_000;
    tweak(&mut config);

    let presenter = Arc::new(RecordingPresenter::default());
    let redirect = Arc::new(CountingRedirect::default());
    let ports = ClientPorts {
        presenter: Some(presenter.clone()),
        auth_redirect: Some(redirect.clone()),
        ..ClientPorts::default()
    };
    let context = ClientContext::from_config(config, ports).expect("client context");
    TestClient { context, presenter, redirect }
}
