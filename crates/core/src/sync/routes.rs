//! Endpoint routing for queued mutations
//!
//! `create → POST /{resource}`, `update → PUT /{resource}/{id}`,
//! `delete → DELETE /{resource}/{id}`.

use marginalia_domain::{HttpMethod, QueuedMutation};

use super::errors::SyncError;

/// Resolved endpoint for one mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    /// Path relative to the API prefix
    pub path: String,
}

/// Route a mutation to its REST endpoint
///
/// # Errors
///
/// Update and delete mutations whose payload carries no `id` cannot be
/// routed and are rejected with [`SyncError::InvalidMutation`].
pub fn route(mutation: &QueuedMutation) -> Result<Route, SyncError> {
    let resource = mutation.domain.resource();
    let path = if mutation.action.targets_existing() {
        let id = mutation.target_id().ok_or_else(|| {
            SyncError::InvalidMutation(format!(
                "{} {} payload is missing an id",
                mutation.domain, mutation.action
            ))
        })?;
        format!("{resource}/{id}")
    } else {
        resource.to_string()
    };
    Ok(Route { method: mutation.action.method(), path })
}
