//! Trace context allocation

use std::sync::Arc;

use marginalia_common::{Clock, KeyedStore};
use marginalia_domain::constants::USER_ID_KEY;
use marginalia_domain::{TraceContext, TraceContextError};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hash recorded when no user is signed in
pub const ANONYMOUS_USER_HASH: &str = "anonymous";

/// Hex characters of the SHA-256 digest kept in trace contexts
const USER_HASH_LEN: usize = 16;

/// Builds a fresh [`TraceContext`] per logical request
#[derive(Clone)]
pub struct TraceContextFactory {
    store: KeyedStore,
    clock: Arc<dyn Clock>,
    platform: String,
}

impl std::fmt::Debug for TraceContextFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceContextFactory")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl TraceContextFactory {
    pub fn new(store: KeyedStore, clock: Arc<dyn Clock>, platform: impl Into<String>) -> Self {
        Self { store, clock, platform: platform.into() }
    }

    /// Allocate a context for the next call
    pub fn next_context(&self) -> Result<TraceContext, TraceContextError> {
        let user_id_hash = self
            .store
            .get::<String>(USER_ID_KEY)
            .filter(|id| !id.is_empty())
            .map_or_else(|| ANONYMOUS_USER_HASH.to_string(), |id| hash_user_id(&id));

        TraceContext::new(
            Uuid::new_v4().simple().to_string(),
            user_id_hash,
            self.clock.epoch_millis(),
            self.platform.clone(),
        )
    }
}

/// Truncated SHA-256 of the user id; raw ids never reach logs or headers
pub fn hash_user_id(user_id: &str) -> String {
    let digest = Sha256::digest(user_id.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(USER_HASH_LEN);
    encoded
}
