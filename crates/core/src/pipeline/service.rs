//! Request pipeline
//!
//! Turns a [`RequestConfig`] into either the envelope's `data` or an
//! [`ErrorEnvelope`]. Per call:
//!
//! 1. allocate a trace context unless the caller supplied one
//! 2. serve a fresh cached GET without touching the transport
//! 3. run request interceptors (session headers first)
//! 4. hold the loading indicator while attempts are in flight
//! 5. send, run response interceptors, classify, retry when allowed
//! 6. on failure run error interceptors, then redirect, surface or stay
//!    silent according to the classification

use std::sync::Arc;
use std::time::Duration;

use marginalia_common::{Clock, KeyedStore, RetryPolicy, SystemClock};
use marginalia_domain::constants::{
    API_PATH_PREFIX, CACHE_KEY_PREFIX, DEFAULT_PLATFORM, IDEMPOTENCY_KEY_HEADER,
};
use marginalia_domain::{
    ErrorEnvelope, HttpMethod, MarginaliaError, RequestConfig, Result as DomainResult,
    TraceContext,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};

use super::interceptors::{
    ErrorInterceptor, RequestInterceptor, ResponseInterceptor, SessionHeadersInterceptor,
};
use super::loading::LoadingTracker;
use super::ports::{
    AuthRedirect, ErrorPresenter, LoadingIndicator, NoopLoadingIndicator, TracingAuthRedirect,
    TracingPresenter, Transport, TransportFailure, TransportRequest,
};
use super::session::{AuthSessionPolicy, DEFAULT_REDIRECT_WINDOW};
use super::trace::TraceContextFactory;
use crate::classifier::{
    Classification, ClassifierPolicy, ErrorClassifier, Handling, Outcome, Verdict,
};

/// Default per-attempt timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request pipeline with interceptors, classification and session handling
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    store: KeyedStore,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    retry_non_idempotent: bool,
    classifier: ErrorClassifier,
    loading: Arc<LoadingTracker>,
    session: AuthSessionPolicy,
    presenter: Arc<dyn ErrorPresenter>,
    traces: TraceContextFactory,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    error_interceptors: Vec<Arc<dyn ErrorInterceptor>>,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("request_interceptors", &self.request_interceptors.len())
            .finish_non_exhaustive()
    }
}

impl RequestPipeline {
    /// Start building a pipeline over `transport` and `store`
    pub fn builder(transport: Arc<dyn Transport>, store: KeyedStore) -> RequestPipelineBuilder {
        RequestPipelineBuilder::new(transport, store)
    }

    /// Base URL resolved at construction
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store the pipeline reads tokens from and caches into
    pub const fn store(&self) -> &KeyedStore {
        &self.store
    }

    /// Loading tracker shared by every call on this pipeline
    pub const fn loading(&self) -> &Arc<LoadingTracker> {
        &self.loading
    }

    /// Absolute URL for a relative resource path
    ///
    /// `http://` and `https://` URLs pass through untouched.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{API_PATH_PREFIX}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    /// GET `url` with default options
    pub async fn get(&self, url: &str) -> Result<Value, ErrorEnvelope> {
        self.request(&RequestConfig::get(url)).await
    }

    /// POST `body` to `url`; not retried unless non-idempotent retries are enabled
    pub async fn post(&self, url: &str, body: Value) -> Result<Value, ErrorEnvelope> {
        self.request(&RequestConfig::post(url, body)).await
    }

    /// PUT `body` to `url`
    pub async fn put(&self, url: &str, body: Value) -> Result<Value, ErrorEnvelope> {
        self.request(&RequestConfig::put(url, body)).await
    }

    /// DELETE `url`
    pub async fn delete(&self, url: &str) -> Result<Value, ErrorEnvelope> {
        self.request(&RequestConfig::delete(url)).await
    }

    /// Run one call and decode `data` into `T`
    ///
    /// A `data` payload that does not match `T` is reported as
    /// `malformedResponse`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        config: &RequestConfig,
    ) -> Result<T, ErrorEnvelope> {
        let data = self.request(config).await?;
        serde_json::from_value(data).map_err(|err| {
            ErrorEnvelope::malformed(format!("response data does not match expected shape: {err}"))
        })
    }

    /// Run one call through the full pipeline
    ///
    /// The caller's config is cloned first and never modified.
    pub async fn request(&self, config: &RequestConfig) -> Result<Value, ErrorEnvelope> {
        let config = config.clone();
        let trace = match config.trace_context.clone() {
            Some(trace) => trace,
            None => self.traces.next_context().map_err(|err| {
                warn!(error = %err, "Could not allocate trace context");
                ErrorEnvelope::client(format!("trace context unavailable: {err}"))
            })?,
        };

        let span = info_span!(
            "request",
            trace_id = trace.trace_id(),
            method = %config.method,
            url = %config.url
        );
        self.run(config, trace).instrument(span).await
    }

    /// Drop cached responses whose logical key starts with `prefix`
    pub fn invalidate(&self, prefix: &str) -> usize {
        match self.store.remove_prefix(&format!("{CACHE_KEY_PREFIX}{prefix}")) {
            Ok(removed) => {
                debug!(prefix, removed, "Invalidated cached responses");
                removed
            }
            Err(err) => {
                warn!(prefix, error = %err, "Cache invalidation failed");
                0
            }
        }
    }

    async fn run(
        &self,
        config: RequestConfig,
        trace: TraceContext,
    ) -> Result<Value, ErrorEnvelope> {
        let cache_key = cache_key_for(&config);
        if let Some(key) = &cache_key {
            if let Some(cached) = self.store.get::<Value>(key) {
                debug!(cache_key = %key, "Serving cached response");
                return Ok(cached);
            }
        }

        let loading = config.use_loading_indicator.then(|| self.loading.acquire());
        let result = self.execute(&config, &trace).await;
        drop(loading);

        match result {
            Ok(data) => {
                if let (Some(key), Some(policy)) = (&cache_key, &config.cache) {
                    if let Err(err) = self.store.set(key, &data, policy.ttl) {
                        warn!(cache_key = %key, error = %err, "Failed to cache response");
                    }
                }
                Ok(data)
            }
            Err(classification) => Err(self.fail(classification, &trace).await),
        }
    }

    async fn execute(
        &self,
        config: &RequestConfig,
        trace: &TraceContext,
    ) -> Result<Value, Classification> {
        let mut request = self.transport_request(config);
        for interceptor in &self.request_interceptors {
            if let Err(envelope) = interceptor.on_request(&mut request, trace).await {
                let handling =
                    ErrorClassifier::handling_for(&envelope, &config.silenced_codes, config.silent);
                return Err(Classification { envelope, handling });
            }
        }

        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            let outcome = self.attempt(request.clone(), trace).await;
            match self.classifier.classify(outcome, &config.silenced_codes, config.silent) {
                Verdict::Success(data) => {
                    debug!(attempts, "Request succeeded");
                    return Ok(data);
                }
                Verdict::Failure(classification) => {
                    if !self.should_retry(&classification, config.method, attempts) {
                        return Err(classification);
                    }
                    let delay = self.retry.delay_after(attempts);
                    warn!(
                        attempts,
                        kind = %classification.envelope.kind,
                        code = classification.envelope.code,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(&self, request: TransportRequest, trace: &TraceContext) -> Outcome {
        let timeout = request.timeout;
        match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Err(_) => Outcome::Transport(TransportFailure::Timeout(timeout)),
            Ok(Err(failure)) => Outcome::Transport(failure),
            Ok(Ok(mut response)) => {
                for interceptor in &self.response_interceptors {
                    interceptor.on_response(&mut response, trace).await;
                }
                Outcome::Http { status: response.status, body: response.body }
            }
        }
    }

    fn should_retry(
        &self,
        classification: &Classification,
        method: HttpMethod,
        attempts: u32,
    ) -> bool {
        classification.envelope.retryable
            && (method.is_idempotent() || self.retry_non_idempotent)
            && self.retry.allows_retry(attempts)
    }

    async fn fail(&self, classification: Classification, trace: &TraceContext) -> ErrorEnvelope {
        let Classification { mut envelope, handling } = classification;
        for interceptor in &self.error_interceptors {
            envelope = interceptor.on_error(envelope, trace).await;
        }

        warn!(
            trace_id = trace.trace_id(),
            user_id_hash = trace.user_id_hash(),
            platform = trace.platform(),
            kind = %envelope.kind,
            code = envelope.code,
            retryable = envelope.retryable,
            handling = handling.as_str(),
            "Request failed"
        );

        match handling {
            Handling::AuthRedirect => {
                self.session.handle(&envelope, trace);
            }
            Handling::Surface => self.presenter.present(&envelope, trace),
            Handling::Silent => {}
        }
        envelope
    }

    fn transport_request(&self, config: &RequestConfig) -> TransportRequest {
        let mut headers = config.headers.clone();
        if let Some(key) = &config.idempotency_key {
            headers.insert(IDEMPOTENCY_KEY_HEADER.to_string(), key.clone());
        }
        TransportRequest {
            method: config.method,
            url: self.resolve_url(&config.url),
            query: config.query.clone(),
            headers,
            body: config.body.clone(),
            timeout: config.timeout.unwrap_or(self.timeout),
        }
    }
}

fn cache_key_for(config: &RequestConfig) -> Option<String> {
    match (&config.cache, config.method) {
        (Some(policy), HttpMethod::Get) => Some(format!("{CACHE_KEY_PREFIX}{}", policy.key)),
        _ => None,
    }
}

/// Builder for [`RequestPipeline`]
pub struct RequestPipelineBuilder {
    transport: Arc<dyn Transport>,
    store: KeyedStore,
    base_url: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    retry_non_idempotent: bool,
    classifier: ClassifierPolicy,
    indicator: Arc<dyn LoadingIndicator>,
    presenter: Arc<dyn ErrorPresenter>,
    redirect: Arc<dyn AuthRedirect>,
    redirect_window: Duration,
    clock: Arc<dyn Clock>,
    platform: String,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    error_interceptors: Vec<Arc<dyn ErrorInterceptor>>,
}

impl RequestPipelineBuilder {
    pub fn new(transport: Arc<dyn Transport>, store: KeyedStore) -> Self {
        Self {
            transport,
            store,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::no_retry(),
            retry_non_idempotent: false,
            classifier: ClassifierPolicy::default(),
            indicator: Arc::new(NoopLoadingIndicator),
            presenter: Arc::new(TracingPresenter),
            redirect: Arc::new(TracingAuthRedirect),
            redirect_window: DEFAULT_REDIRECT_WINDOW,
            clock: Arc::new(SystemClock),
            platform: DEFAULT_PLATFORM.to_string(),
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            error_interceptors: Vec::new(),
        }
    }

    /// Host prefix for relative URLs (required)
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Default per-attempt timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attempts and backoff for retryable failures
    #[must_use]
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Allow retrying POST requests
    #[must_use]
    pub const fn retry_non_idempotent(mut self, allow: bool) -> Self {
        self.retry_non_idempotent = allow;
        self
    }

    /// Quota and transient code ranges used by the classifier
    #[must_use]
    pub fn classifier_policy(mut self, policy: ClassifierPolicy) -> Self {
        self.classifier = policy;
        self
    }

    /// Process-wide indicator shown while non-silent calls are in flight
    #[must_use]
    pub fn loading_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
        self.indicator = indicator;
        self
    }

    /// Receives failures whose handling is `Surface`
    #[must_use]
    pub fn presenter(mut self, presenter: Arc<dyn ErrorPresenter>) -> Self {
        self.presenter = presenter;
        self
    }

    /// Login redirect invoked after the session is cleared
    #[must_use]
    pub fn auth_redirect(mut self, redirect: Arc<dyn AuthRedirect>) -> Self {
        self.redirect = redirect;
        self
    }

    /// Minimum gap between two login redirects
    #[must_use]
    pub const fn redirect_window(mut self, window: Duration) -> Self {
        self.redirect_window = window;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Platform tag recorded in trace contexts
    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Append a request interceptor; it runs after the session headers
    #[must_use]
    pub fn request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    /// Append a response interceptor; they run in registration order
    #[must_use]
    pub fn response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    /// Append an error interceptor; it may rewrite but never swallow a failure
    #[must_use]
    pub fn error_interceptor(mut self, interceptor: Arc<dyn ErrorInterceptor>) -> Self {
        self.error_interceptors.push(interceptor);
        self
    }

    /// Validate settings and assemble the pipeline
    ///
    /// # Errors
    ///
    /// Returns [`MarginaliaError::Config`] for a missing base URL, an empty
    /// platform tag or an invalid retry policy.
    pub fn build(self) -> DomainResult<RequestPipeline> {
        let base_url = self
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| MarginaliaError::Config("request pipeline requires a base URL".into()))?;
        if self.platform.trim().is_empty() {
            return Err(MarginaliaError::Config("platform tag must not be empty".into()));
        }
        self.retry.validate().map_err(|err| MarginaliaError::Config(err.to_string()))?;

        let mut request_interceptors: Vec<Arc<dyn RequestInterceptor>> =
            vec![Arc::new(SessionHeadersInterceptor::new(self.store.clone()))];
        request_interceptors.extend(self.request_interceptors);

        Ok(RequestPipeline {
            session: AuthSessionPolicy::new(
                self.store.clone(),
                self.redirect,
                Arc::clone(&self.clock),
                self.redirect_window,
            ),
            traces: TraceContextFactory::new(self.store.clone(), self.clock, self.platform),
            transport: self.transport,
            store: self.store,
            base_url,
            timeout: self.timeout,
            retry: self.retry,
            retry_non_idempotent: self.retry_non_idempotent,
            classifier: ErrorClassifier::new(self.classifier),
            loading: LoadingTracker::new(self.indicator),
            presenter: self.presenter,
            request_interceptors,
            response_interceptors: self.response_interceptors,
            error_interceptors: self.error_interceptors,
        })
    }
}
