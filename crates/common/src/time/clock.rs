//! Time abstraction for testability
//!
//! TTL checks, redirect throttling and mutation timestamps all read time
//! through [`Clock`] so tests can move time without sleeping.
//!
//! ```
//! use std::time::Duration;
//!
//! use marginalia_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::at_epoch_millis(1_000);
//! clock.advance(Duration::from_millis(500));
//! assert_eq!(clock.epoch_millis(), 1_500);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic timestamp suitable for measuring windows
    fn now(&self) -> Instant;

    /// Wall clock time
    fn system_time(&self) -> SystemTime;

    /// Milliseconds since the UNIX epoch
    ///
    /// Clocks set before the epoch report `0`.
    fn epoch_millis(&self) -> i64 {
        self.system_time()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for deterministic tests
///
/// Clones share the same elapsed counter, so a clock handed to a component
/// can still be advanced from the test body.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    base_system_time: SystemTime,
}

impl MockClock {
    /// Create a mock clock anchored at the current real time
    pub fn new() -> Self {
        Self::anchored(SystemTime::now())
    }

    /// Create a mock clock whose wall time starts at `millis` after the epoch
    #[must_use]
    pub fn at_epoch_millis(millis: u64) -> Self {
        Self::anchored(UNIX_EPOCH + Duration::from_millis(millis))
    }

    fn anchored(base_system_time: SystemTime) -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            base_system_time,
        }
    }

    /// Advance the clock without waiting
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Set the total simulated elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = duration;
    }

    /// Simulated time since creation
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + self.elapsed()
    }
}
