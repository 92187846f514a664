//! Port interfaces for offline sync

use async_trait::async_trait;
use marginalia_domain::{ErrorEnvelope, QueuedMutation};
use serde_json::Value;

/// How a mutation is being delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// User-initiated write: loading indicator and surfaced errors
    Interactive,
    /// Background replay from the queue: silent
    Replay,
}

/// Sends a mutation to the server
#[async_trait]
pub trait MutationDispatcher: Send + Sync {
    /// Deliver `mutation`, returning the envelope `data` on acknowledgement
    async fn dispatch(
        &self,
        mutation: &QueuedMutation,
        delivery: Delivery,
    ) -> Result<Value, ErrorEnvelope>;
}

/// Device reachability hint
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Connectivity for environments without a reachability signal
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}
