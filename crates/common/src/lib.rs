//! Foundation utilities shared across Marginalia crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification
//! - `runtime`: clock abstraction, retry policy, keyed storage (pulls in
//!   `tracing`)
//! - `observability`: tracing without the runtime modules

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod storage;
#[cfg(feature = "runtime")]
pub mod time;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{BackoffStrategy, RetryConfigError, RetryPolicy};
#[cfg(feature = "runtime")]
pub use storage::{
    CacheEntry, KeyedStore, MemoryBackend, StorageBackend, StorageError, StorageResult,
};
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
