//! Resilience primitives
//!
//! - **Retry**: bounded attempts with fixed or exponential backoff

pub mod retry;

pub use retry::{BackoffStrategy, RetryConfigError, RetryPolicy, RetryPolicyBuilder};
