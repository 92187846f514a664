//! Keyed storage
//!
//! - **[`backend`]**: raw string media behind [`StorageBackend`]
//! - **[`keyed`]**: [`KeyedStore`], the namespaced TTL layer callers use

pub mod backend;
pub mod error;
pub mod keyed;

pub use backend::{MemoryBackend, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use keyed::{CacheEntry, KeyedStore};
