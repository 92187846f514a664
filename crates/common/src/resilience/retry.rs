//! Bounded retry policy with pluggable backoff
//!
//! The policy only answers two questions: may another attempt be made, and
//! how long to wait before it. Deciding whether a failure is worth retrying
//! stays with the caller, which knows the error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while validating a retry policy
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryConfigError {
    /// The policy would never run the operation
    #[error("max_attempts must be greater than 0")]
    ZeroAttempts,

    /// Exponential growth factor below 1 would shrink delays
    #[error("exponential base must be at least 1.0, got {0}")]
    InvalidBase(String),
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: `initial_delay * base^(retry - 1)`, capped at
    /// `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before the given retry (1 = first retry after the initial
    /// attempt)
    #[must_use]
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
                #[allow(clippy::cast_precision_loss)]
                let millis = initial_delay.as_millis() as f64 * base.powi(exponent);
                #[allow(clippy::cast_precision_loss)]
                let capped = millis.min(max_delay.as_millis() as f64);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                Duration::from_millis(capped.max(0.0) as u64)
            }
        }
    }
}

/// Upper bound on attempts plus the backoff between them
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    /// Single attempt, no retries.
    fn default() -> Self {
        Self { max_attempts: 1, backoff: BackoffStrategy::Fixed(Duration::ZERO) }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default()
    }

    /// Start building a validated policy
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError::ZeroAttempts);
        }
        if let BackoffStrategy::Exponential { base, .. } = &self.backoff {
            if *base < 1.0 || base.is_nan() {
                return Err(RetryConfigError::InvalidBase(base.to_string()));
            }
        }
        Ok(())
    }

    /// Whether another attempt is allowed after `attempts_made` attempts
    #[must_use]
    pub const fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay to wait after `attempts_made` failed attempts
    #[must_use]
    pub fn delay_after(&self, attempts_made: u32) -> Duration {
        self.backoff.calculate_delay(attempts_made)
    }
}

/// Builder for [`RetryPolicy`]
#[derive(Debug)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicyBuilder {
    /// Builder seeded with the single-attempt default
    #[must_use]
    pub fn new() -> Self {
        Self { policy: RetryPolicy::default() }
    }

    /// Total attempts including the first
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    /// Constant delay between attempts
    #[must_use]
    pub const fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.policy.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    /// Exponentially growing delay between attempts
    #[must_use]
    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    ) -> Self {
        self.policy.backoff = BackoffStrategy::Exponential { initial_delay, base, max_delay };
        self
    }

    /// Validate and return the policy
    pub fn build(self) -> Result<RetryPolicy, RetryConfigError> {
        self.policy.validate()?;
        Ok(self.policy)
    }
}
