//! Namespaced, TTL-aware key/value store
//!
//! Every logical key is stored physically as `{namespace}{key}` so the store
//! can share a medium with unrelated data. Values are wrapped in a
//! [`CacheEntry`] carrying their write time and optional expiry.
//!
//! Expiry is lazy: an expired entry stays on the medium until the next read
//! of that key removes it. There is no background sweep.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::backend::StorageBackend;
use super::error::StorageResult;
use crate::time::{Clock, SystemClock};

/// Persisted wrapper around a stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at_ms: i64,
    pub expires_at_ms: Option<i64>,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is logically absent at `now_ms`
    ///
    /// An entry is still valid at exactly `expires_at_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_some_and(|expires| now_ms > expires)
    }
}

/// Prefixed key/value store with lazy TTL expiry
#[derive(Clone)]
pub struct KeyedStore {
    backend: Arc<dyn StorageBackend>,
    namespace: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for KeyedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedStore")
            .field("backend", &self.backend)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KeyedStore {
    /// Create a store over `backend` using the system clock
    pub fn new(backend: Arc<dyn StorageBackend>, namespace: impl Into<String>) -> Self {
        Self { backend, namespace: namespace.into(), clock: Arc::new(SystemClock) }
    }

    /// Replace the clock used for timestamps and expiry checks
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Namespace prepended to every key
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn physical(&self, key: &str) -> String {
        format!("{}{key}", self.namespace)
    }

    /// Store `value` under `key`, expiring after `ttl` when given
    ///
    /// # Errors
    ///
    /// Returns [`super::StorageError::WriteFailed`] when the backend rejects
    /// the write and [`super::StorageError::Serialization`] when the value
    /// cannot be encoded.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> StorageResult<()> {
        let now = self.clock.epoch_millis();
        let expires_at_ms =
            ttl.map(|ttl| now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)));
        let entry = CacheEntry { value, stored_at_ms: now, expires_at_ms };
        let encoded = serde_json::to_string(&entry)?;
        self.backend.write(&self.physical(key), encoded)
    }

    /// Read `key`, returning `None` when absent, expired or malformed
    ///
    /// Expired and unparseable entries are removed as a side effect. A value
    /// that parses as an entry but not as `T` is left in place.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let physical = self.physical(key);
        let raw = match self.backend.read(&physical) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "Storage read failed, treating key as absent");
                return None;
            }
        };

        let entry: CacheEntry<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "Removing malformed storage entry");
                self.purge(&physical);
                return None;
            }
        };

        if entry.is_expired(self.clock.epoch_millis()) {
            debug!(key, expires_at_ms = ?entry.expires_at_ms, "Storage entry expired");
            self.purge(&physical);
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "Stored value does not match requested type");
                None
            }
        }
    }

    /// Read `key`, telling an absent key apart from an unreadable one
    ///
    /// Nothing is removed when the entry fails to decode, so callers that
    /// rewrite the key can refuse to overwrite data they do not understand.
    /// Expired entries are purged and reported as absent.
    ///
    /// # Errors
    ///
    /// Backend read failures are passed through;
    /// [`super::StorageError::Serialization`] when the entry or its value does
    /// not decode as `T`.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let physical = self.physical(key);
        let Some(raw) = self.backend.read(&physical)? else {
            return Ok(None);
        };

        let entry: CacheEntry<serde_json::Value> = serde_json::from_str(&raw)?;
        if entry.is_expired(self.clock.epoch_millis()) {
            debug!(key, expires_at_ms = ?entry.expires_at_ms, "Storage entry expired");
            self.purge(&physical);
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(entry.value)?))
    }

    /// Read `key`, falling back to `default`
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Whether `key` currently holds a live entry
    pub fn contains(&self, key: &str) -> bool {
        self.get::<serde_json::Value>(key).is_some()
    }

    /// Remove `key`
    pub fn remove(&self, key: &str) -> StorageResult<()> {
        self.backend.delete(&self.physical(key))
    }

    /// Logical keys in this namespace starting with `prefix`
    ///
    /// Expired entries that have not been read yet are still listed.
    pub fn keys_with_prefix(&self, prefix: &str) -> BTreeSet<String> {
        let full_prefix = self.physical(prefix);
        match self.backend.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&full_prefix))
                .filter_map(|k| k.strip_prefix(self.namespace.as_str()).map(str::to_string))
                .collect(),
            Err(err) => {
                warn!(prefix, error = %err, "Failed to list storage keys");
                BTreeSet::new()
            }
        }
    }

    /// Remove every logical key starting with `prefix`, returning the count
    pub fn remove_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let keys = self.keys_with_prefix(prefix);
        for key in &keys {
            self.remove(key)?;
        }
        Ok(keys.len())
    }

    /// Remove every key in this namespace; foreign keys are untouched
    pub fn clear(&self) -> StorageResult<usize> {
        self.remove_prefix("")
    }

    fn purge(&self, physical: &str) {
        if let Err(err) = self.backend.delete(physical) {
            warn!(key = physical, error = %err, "Failed to purge storage entry");
        }
    }
}
