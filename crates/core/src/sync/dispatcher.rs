//! Mutation delivery over the request pipeline

use std::sync::Arc;

use async_trait::async_trait;
use marginalia_domain::{ErrorEnvelope, HttpMethod, QueuedMutation, RequestConfig};
use serde_json::Value;
use tracing::debug;

use super::ports::{Delivery, MutationDispatcher};
use super::routes::route;
use crate::pipeline::RequestPipeline;

/// Sends mutations through a [`RequestPipeline`]
///
/// Replays are silent and skip the loading indicator. A committed write
/// invalidates the cached responses of its resource.
#[derive(Debug, Clone)]
pub struct PipelineDispatcher {
    pipeline: Arc<RequestPipeline>,
    attach_idempotency_key: bool,
}

impl PipelineDispatcher {
    pub const fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline, attach_idempotency_key: false }
    }

    /// Send the mutation id as `Idempotency-Key`
    ///
    /// Off by default: without server support the header is ignored and a
    /// replay after a lost acknowledgement still duplicates the write.
    #[must_use]
    pub const fn with_idempotency_key(mut self, enabled: bool) -> Self {
        self.attach_idempotency_key = enabled;
        self
    }
}

#[async_trait]
impl MutationDispatcher for PipelineDispatcher {
    async fn dispatch(
        &self,
        mutation: &QueuedMutation,
        delivery: Delivery,
    ) -> Result<Value, ErrorEnvelope> {
        let route = route(mutation).map_err(|err| ErrorEnvelope::client(err.to_string()))?;

        let mut config = RequestConfig::new(route.method, route.path);
        if route.method != HttpMethod::Delete {
            config = config.with_body(mutation.payload.clone());
        }
        if delivery == Delivery::Replay {
            config = config.silent();
        }
        if self.attach_idempotency_key {
            config = config.with_idempotency_key(mutation.id.clone());
        }

        let data = self.pipeline.request(&config).await?;
        let removed = self.pipeline.invalidate(mutation.domain.resource());
        debug!(
            mutation_id = %mutation.id,
            domain = %mutation.domain,
            action = %mutation.action,
            invalidated = removed,
            "Mutation acknowledged"
        );
        Ok(data)
    }
}
