//! Client context - dependency injection container
//!
//! Wires the keyed store, request pipeline and offline queue from a
//! [`Config`]. UI-facing ports (loading indicator, presenter, login redirect,
//! connectivity) come from the embedding application through
//! [`ClientPorts`]; anything left unset falls back to a tracing-only default.

use std::sync::Arc;
use std::time::Duration;

use marginalia_common::{KeyedStore, MemoryBackend, RetryPolicy, StorageBackend};
use marginalia_core::pipeline::{
    AuthRedirect, ErrorPresenter, LoadingIndicator, RequestPipeline, Transport,
};
use marginalia_core::sync::{Connectivity, PipelineDispatcher, SyncEngine};
use marginalia_core::ClassifierPolicy;
use marginalia_domain::{Config, MarginaliaError, Result};
use tracing::info;

use crate::http::ReqwestTransport;
use crate::storage::FileBackend;

/// Cap for the exponential retry delay
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Platform adapters supplied by the host application
#[derive(Default, Clone)]
pub struct ClientPorts {
    pub transport: Option<Arc<dyn Transport>>,
    pub storage: Option<Arc<dyn StorageBackend>>,
    pub loading_indicator: Option<Arc<dyn LoadingIndicator>>,
    pub presenter: Option<Arc<dyn ErrorPresenter>>,
    pub auth_redirect: Option<Arc<dyn AuthRedirect>>,
    pub connectivity: Option<Arc<dyn Connectivity>>,
}

/// Client context - holds every resilience service
pub struct ClientContext {
    pub config: Config,
    pub store: KeyedStore,
    pub pipeline: Arc<RequestPipeline>,
    pub sync: Arc<SyncEngine>,
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl ClientContext {
    /// Load configuration and build a context with default ports
    ///
    /// # Errors
    /// Returns an error if configuration loading or wiring fails.
    pub fn new() -> Result<Self> {
        let config = crate::config::load()?;
        Self::from_config(config, ClientPorts::default())
    }

    /// Build a context from an explicit configuration
    ///
    /// # Errors
    /// Returns `MarginaliaError::Config` for invalid settings and
    /// `MarginaliaError::Storage` when the storage file cannot be opened.
    pub fn from_config(config: Config, ports: ClientPorts) -> Result<Self> {
        crate::config::validate(&config)?;

        let backend: Arc<dyn StorageBackend> = match (ports.storage, &config.storage.path) {
            (Some(backend), _) => backend,
            (None, Some(path)) => Arc::new(
                FileBackend::open(path)
                    .map_err(|err| MarginaliaError::Storage(err.to_string()))?,
            ),
            (None, None) => Arc::new(MemoryBackend::new()),
        };
        let store = KeyedStore::new(backend, config.storage.namespace.clone());

        let transport: Arc<dyn Transport> = match ports.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let retry = RetryPolicy::builder()
            .max_attempts(config.api.max_attempts)
            .exponential_backoff(config.api.retry_backoff(), 2.0, MAX_RETRY_BACKOFF)
            .build()
            .map_err(|err| MarginaliaError::Config(err.to_string()))?;

        let mut builder = RequestPipeline::builder(transport, store.clone())
            .base_url(config.api.resolved_base_url())
            .timeout(config.api.timeout())
            .retry_policy(retry)
            .retry_non_idempotent(config.api.retry_non_idempotent)
            .classifier_policy(ClassifierPolicy::from(&config.classifier))
            .redirect_window(config.auth.redirect_window())
            .platform(config.api.platform.clone());
        if let Some(indicator) = ports.loading_indicator {
            builder = builder.loading_indicator(indicator);
        }
        if let Some(presenter) = ports.presenter {
            builder = builder.presenter(presenter);
        }
        if let Some(redirect) = ports.auth_redirect {
            builder = builder.auth_redirect(redirect);
        }
        let pipeline = Arc::new(builder.build()?);

        let dispatcher = PipelineDispatcher::new(Arc::clone(&pipeline))
            .with_idempotency_key(config.sync.attach_idempotency_key);
        let mut sync = SyncEngine::new(store.clone(), Arc::new(dispatcher));
        if let Some(connectivity) = ports.connectivity {
            sync = sync.with_connectivity(connectivity);
        }

        info!(
            base_url = pipeline.base_url(),
            namespace = store.namespace(),
            pending_mutations = sync.len(),
            "Client context ready"
        );

        Ok(Self { config, store, pipeline, sync: Arc::new(sync) })
    }
}
