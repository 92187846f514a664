//! Offline queue against a real HTTP server
//!
//! **Coverage:**
//! - Outage (timeout): write deferred, flush keeps it, recovery drains it
//! - Outage (connection refused) across a restart with a file-backed store
//! - Idempotency key on replay when enabled
//! - Offline connectivity skips the network entirely

#[path = "support.rs"]
mod support;

use std::net::TcpListener;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use marginalia_core::sync::WriteOutcome;
use marginalia_domain::constants::IDEMPOTENCY_KEY_HEADER;
use marginalia_domain::{MutationAction, MutationDomain};
use marginalia_infra::{ClientContext, ClientPorts};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn accepted() -> ResponseTemplate {
    let body = json!({"code": 0, "message": "ok", "data": {"id": "n1"}});
    ResponseTemplate::new(200).set_body_json(body)
}

#[tokio::test]
async fn note_written_during_outage_is_delivered_after_recovery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(accepted().set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = support::client(&server.uri(), |config| config.api.timeout_ms = 100);
    let sync = &client.context.sync;

    let outcome = sync
        .submit_or_defer(MutationDomain::Note, MutationAction::Create, json!({"text": "margin"}))
        .await
        .unwrap();
    let WriteOutcome::Deferred(id) = outcome else { panic!("expected deferral") };

    let during_outage = sync.flush().await;
    assert_eq!(during_outage.still_pending, vec![id.clone()]);
    assert_eq!(sync.len(), 1);

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/notes"))
        .and(body_json(json!({"text": "margin"})))
        .respond_with(accepted())
        .expect(1)
        .mount(&server)
        .await;

    let recovered = sync.flush().await;
    assert_eq!(recovered.succeeded, vec![id]);
    assert!(sync.is_empty());
}

#[tokio::test]
async fn queue_persists_across_restart_and_replays_to_new_host() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("marginalia.json");

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener); // release the port so that requests fail with ECONNREFUSED

    let offline = support::client(&dead_url, |config| {
        config.storage.path = Some(store_path.clone());
    });
    let update = json!({"id": "b7", "title": "t"});
    offline
        .context
        .sync
        .submit_or_defer(MutationDomain::Book, MutationAction::Update, update)
        .await
        .unwrap();
    offline
        .context
        .sync
        .enqueue(MutationDomain::Bookmark, MutationAction::Delete, json!({"id": 3}))
        .unwrap();
    assert_eq!(offline.presenter.presented.lock().len(), 1);
    drop(offline);

    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/books/b7"))
        .respond_with(accepted())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/bookmarks/3"))
        .respond_with(accepted())
        .expect(1)
        .mount(&server)
        .await;

    let online = support::client(&server.uri(), |config| {
        config.storage.path = Some(store_path.clone());
    });
    assert_eq!(online.context.sync.len(), 2);

    let report = online.context.sync.flush().await;

    assert!(report.is_drained());
    assert_eq!(report.succeeded.len(), 2);
    assert!(online.presenter.presented.lock().is_empty());
}

#[tokio::test]
async fn replay_carries_idempotency_key_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists(IDEMPOTENCY_KEY_HEADER))
        .respond_with(accepted())
        .expect(1)
        .mount(&server)
        .await;

    let client = support::client(&server.uri(), |config| config.sync.attach_idempotency_key = true);
    let id = client
        .context
        .sync
        .enqueue(MutationDomain::Note, MutationAction::Create, json!({"text": "x"}))
        .unwrap();

    let report = client.context.sync.flush().await;

    assert_eq!(report.succeeded, vec![id.clone()]);
    let requests = server.received_requests().await.unwrap();
    let sent = requests[0].headers.get(IDEMPOTENCY_KEY_HEADER).and_then(|v| v.to_str().ok());
    assert_eq!(sent, Some(id.as_str()));
}

#[tokio::test]
async fn offline_device_never_touches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(accepted()).expect(0).mount(&server).await;

    let mut config = marginalia_domain::Config::default();
    config.api.base_url = Some(server.uri());
    let ports = ClientPorts {
        connectivity: Some(Arc::new(support::Toggle(AtomicBool::new(false)))),
        ..ClientPorts::default()
    };
    let context = ClientContext::from_config(config, ports).unwrap();

    let outcome = context
        .sync
        .submit_or_defer(MutationDomain::Mindmap, MutationAction::Create, json!({"title": "m"}))
        .await
        .unwrap();

    assert!(matches!(outcome, WriteOutcome::Deferred(_)));
    assert_eq!(context.sync.len(), 1);
}
