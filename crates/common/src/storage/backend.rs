//! Raw string storage media
//!
//! A backend knows nothing about namespaces, TTL or serialization. It moves
//! opaque strings under physical keys; [`super::KeyedStore`] layers the
//! semantics on top.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;

use super::error::{StorageError, StorageResult};

/// Platform key/value medium (device storage, file, memory).
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Read the raw value stored under `key`
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn write(&self, key: &str, value: String) -> StorageResult<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Every physical key currently stored, including foreign ones
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// In-memory backend
///
/// An optional byte quota makes writes fail the way device storage does when
/// it runs out of room.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Unbounded in-memory backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory backend rejecting writes once keys plus values exceed
    /// `bytes`
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self { entries: RwLock::new(BTreeMap::new()), quota_bytes: Some(bytes) }
    }

    /// Number of stored entries, foreign keys included
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn used_bytes_without(entries: &BTreeMap<String, String>, key: &str) -> usize {
        entries.iter().filter(|(k, _)| k.as_str() != key).map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: String) -> StorageResult<()> {
        let mut entries = self.entries.write();
        if let Some(quota) = self.quota_bytes {
            let needed = Self::used_bytes_without(&entries, key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::write_failed(
                    key,
                    format!("quota exceeded ({needed} > {quota} bytes)"),
                ));
            }
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}
