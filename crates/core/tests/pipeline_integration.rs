//! Request pipeline behaviour against scripted transports

mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use marginalia_common::RetryPolicy;
use marginalia_core::pipeline::{ErrorInterceptor, TransportFailure};
use marginalia_domain::constants::{TOKEN_KEY, TRACE_ID_HEADER, USER_ID_KEY};
use marginalia_domain::{ErrorEnvelope, ErrorKind, RequestConfig, TraceContext};
use serde_json::json;
use support::{Harness, Reply, ScriptedTransport, BASE_URL};

#[tokio::test]
async fn success_unwraps_data_and_sends_session_headers() {
    let harness = Harness::new(ScriptedTransport::new([Reply::ok(json!({"title": "Dune"}))]));
    harness.store.set(TOKEN_KEY, "tok-1", None).unwrap();
    let pipeline = harness.builder().build().unwrap();

    let data = pipeline.get("books/7").await.unwrap();

    assert_eq!(data, json!({"title": "Dune"}));
    let requests = harness.transport.requests();
    assert_eq!(requests[0].url, format!("{BASE_URL}/api/v1/books/7"));
    assert_eq!(requests[0].headers.get("Authorization").map(String::as_str), Some("Bearer tok-1"));
    assert!(requests[0].headers.contains_key(TRACE_ID_HEADER));
    assert!(harness.presenter.presented().is_empty());
}

#[tokio::test]
async fn absolute_urls_bypass_the_base_url() {
    let harness = Harness::new(ScriptedTransport::new([Reply::ok(json!(null))]));
    let pipeline = harness.builder().build().unwrap();

    pipeline.get("https://cdn.test/manifest").await.unwrap();

    assert_eq!(harness.transport.requests()[0].url, "https://cdn.test/manifest");
}

#[tokio::test(start_paused = true)]
async fn overlapping_requests_show_the_indicator_once() {
    let transport =
        ScriptedTransport::new([Reply::ok(json!(1))]).with_delay(Duration::from_millis(100));
    let harness = Harness::new(transport);
    let pipeline = harness.builder().build().unwrap();

    let urls: Vec<String> = (0..5).map(|i| format!("notes/{i}")).collect();
    let results = join_all(urls.iter().map(|url| pipeline.get(url))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(harness.indicator.shows(), 1);
    assert_eq!(harness.indicator.hides(), 1);
    assert_eq!(pipeline.loading().active(), 0);
}

#[tokio::test]
async fn failed_request_still_hides_the_indicator() {
    let failure = Reply::Fail(TransportFailure::Network("refused".into()));
    let harness = Harness::new(ScriptedTransport::new([failure]));
    let pipeline = harness.builder().build().unwrap();

    let err = pipeline.get("notes").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(harness.indicator.shows(), 1);
    assert_eq!(harness.indicator.hides(), 1);
}

#[tokio::test]
async fn silent_requests_skip_indicator_and_presenter() {
    let harness = Harness::new(ScriptedTransport::new([Reply::business(4001, "nope")]));
    let pipeline = harness.builder().build().unwrap();

    let err = pipeline.request(&RequestConfig::get("notes").silent()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::BusinessRejected);
    assert_eq!(harness.indicator.shows(), 0);
    assert!(harness.presenter.presented().is_empty());
}

#[tokio::test]
async fn burst_of_expired_sessions_redirects_once_and_clears_session() {
    let harness = Harness::new(ScriptedTransport::new([Reply::Raw(401, String::new())]));
    harness.store.set(TOKEN_KEY, "stale", None).unwrap();
    harness.store.set(USER_ID_KEY, "u-1", None).unwrap();
    let pipeline = harness.builder().build().unwrap();

    for _ in 0..3 {
        let err = pipeline.get("books").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AuthExpired);
    }

    assert_eq!(harness.redirect.count(), 1);
    assert!(!harness.store.contains(TOKEN_KEY));
    assert!(!harness.store.contains(USER_ID_KEY));
    assert!(harness.presenter.presented().is_empty());
}

#[tokio::test]
async fn forbidden_redirects_even_when_silenced() {
    let body = json!({"code": 7, "message": "x"});
    let harness = Harness::new(ScriptedTransport::new([Reply::Json(403, body)]));
    let pipeline = harness.builder().build().unwrap();

    let config = RequestConfig::get("books").silent().silence_code(403);
    let err = pipeline.request(&config).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(harness.redirect.count(), 1);
}

#[tokio::test]
async fn empty_object_is_malformed_and_surfaced() {
    let harness = Harness::new(ScriptedTransport::new([Reply::Json(200, json!({}))]));
    let pipeline = harness.builder().build().unwrap();

    let err = pipeline.get("notes").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::MalformedResponse);
    assert!(!err.retryable);
    assert_eq!(harness.presenter.presented(), vec![err]);
}

#[tokio::test]
async fn silenced_business_code_is_not_presented() {
    let harness = Harness::new(ScriptedTransport::new([
        Reply::business(4001, "duplicate title"),
        Reply::business(4002, "title too long"),
    ]));
    let pipeline = harness.builder().build().unwrap();
    let config = RequestConfig::post("books", json!({"title": "x"})).silence_code(4001);

    let silenced = pipeline.request(&config).await.unwrap_err();
    let surfaced = pipeline.request(&config).await.unwrap_err();

    assert_eq!(silenced.code, 4001);
    assert_eq!(surfaced.code, 4002);
    let presented = harness.presenter.presented();
    assert_eq!(presented.len(), 1);
    assert_eq!(presented[0].code, 4002);
}

#[tokio::test]
async fn quota_codes_classify_as_quota_exceeded() {
    let harness = Harness::new(ScriptedTransport::new([Reply::business(4291, "daily limit")]));
    let pipeline = harness.builder().build().unwrap();

    let err = pipeline.get("mindmaps").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    assert_eq!(err.message, "daily limit");
}

#[tokio::test(start_paused = true)]
async fn retries_idempotent_requests_until_success() {
    let harness = Harness::new(ScriptedTransport::new([
        Reply::Raw(503, "unavailable".into()),
        Reply::Fail(TransportFailure::Network("reset".into())),
        Reply::ok(json!("done")),
    ]));
    let policy = RetryPolicy::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(200))
        .build()
        .unwrap();
    let pipeline = harness.builder().retry_policy(policy).build().unwrap();

    let data = pipeline.get("notes").await.unwrap();

    assert_eq!(data, json!("done"));
    assert_eq!(harness.transport.calls(), 3);
    assert!(harness.presenter.presented().is_empty());
}

#[tokio::test(start_paused = true)]
async fn post_is_not_retried_by_default() {
    let harness = Harness::new(ScriptedTransport::new([Reply::Raw(503, String::new())]));
    let policy = RetryPolicy::builder().max_attempts(3).build().unwrap();
    let pipeline = harness.builder().retry_policy(policy).build().unwrap();

    let err = pipeline.post("notes", json!({"text": "x"})).await.unwrap_err();

    assert_eq!(err.code, 503);
    assert!(err.retryable);
    assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn business_rejections_are_not_retried() {
    let harness = Harness::new(ScriptedTransport::new([Reply::business(4001, "bad")]));
    let policy = RetryPolicy::builder().max_attempts(3).build().unwrap();
    let pipeline = harness.builder().retry_policy(policy).build().unwrap();

    pipeline.get("notes").await.unwrap_err();

    assert_eq!(harness.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn hung_transport_times_out() {
    let harness = Harness::new(ScriptedTransport::new([Reply::Hang]));
    let pipeline = harness.builder().build().unwrap();

    let config = RequestConfig::get("notes").with_timeout(Duration::from_millis(50));
    let err = pipeline.request(&config).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(err.retryable);
    assert_eq!(harness.indicator.hides(), 1);
}

#[tokio::test]
async fn caller_config_is_left_untouched() {
    let harness = Harness::new(ScriptedTransport::new([Reply::ok(json!(null))]));
    harness.store.set(TOKEN_KEY, "tok", None).unwrap();
    let pipeline = harness.builder().build().unwrap();

    let config = RequestConfig::get("notes").with_header("Accept-Language", "de");
    let before = config.clone();
    pipeline.request(&config).await.unwrap();

    assert_eq!(config, before);
    assert!(config.trace_context.is_none());
    assert_eq!(harness.transport.requests()[0].headers.len(), 3);
}

#[tokio::test]
async fn caller_trace_context_is_reused() {
    let harness = Harness::new(ScriptedTransport::new([Reply::business(4001, "bad")]));
    let pipeline = harness.builder().build().unwrap();
    let trace = TraceContext::new("trace-fixed", "anonymous", 1_700_000_000_000, "test").unwrap();

    pipeline.request(&RequestConfig::get("notes").with_trace_context(trace)).await.unwrap_err();

    let sent = &harness.transport.requests()[0];
    assert_eq!(sent.headers.get(TRACE_ID_HEADER).map(String::as_str), Some("trace-fixed"));
    assert_eq!(harness.presenter.trace_ids(), vec!["trace-fixed".to_string()]);
}

#[tokio::test]
async fn cached_get_skips_transport_until_invalidated() {
    let harness = Harness::new(ScriptedTransport::new([
        Reply::ok(json!(["a"])),
        Reply::ok(json!(["a", "b"])),
    ]));
    let pipeline = harness.builder().build().unwrap();
    let config = RequestConfig::get("notes").cached("notes:list", None);

    assert_eq!(pipeline.request(&config).await.unwrap(), json!(["a"]));
    assert_eq!(pipeline.request(&config).await.unwrap(), json!(["a"]));
    assert_eq!(harness.transport.calls(), 1);

    assert_eq!(pipeline.invalidate("notes"), 1);
    assert_eq!(pipeline.request(&config).await.unwrap(), json!(["a", "b"]));
    assert_eq!(harness.transport.calls(), 2);
}

struct Relabel;

#[async_trait]
impl ErrorInterceptor for Relabel {
    async fn on_error(&self, mut error: ErrorEnvelope, _trace: &TraceContext) -> ErrorEnvelope {
        error.message = format!("[books] {}", error.message);
        error
    }
}

#[tokio::test]
async fn error_interceptors_rewrite_before_presentation() {
    let harness = Harness::new(ScriptedTransport::new([Reply::business(4001, "bad title")]));
    let pipeline = harness.builder().error_interceptor(Arc::new(Relabel)).build().unwrap();

    let err = pipeline.get("books").await.unwrap_err();

    assert_eq!(err.message, "[books] bad title");
    assert_eq!(harness.presenter.presented()[0].message, "[books] bad title");
}

#[tokio::test]
async fn typed_decoding_reports_shape_mismatch_as_malformed() {
    let harness = Harness::new(ScriptedTransport::new([Reply::ok(json!({"unexpected": true}))]));
    let pipeline = harness.builder().build().unwrap();

    let err = pipeline.request_as::<Vec<String>>(&RequestConfig::get("notes")).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::MalformedResponse);
}

#[test]
fn builder_requires_a_base_url() {
    let harness = Harness::new(ScriptedTransport::new(Vec::new()));
    let pipeline = marginalia_core::pipeline::RequestPipelineBuilder::new(
        harness.transport.clone(),
        harness.store.clone(),
    )
    .build();

    assert!(pipeline.is_err());
}
