//! Reference-counted loading indicator
//!
//! Overlapping requests share one indicator: it is shown on the 0→1
//! transition and hidden on 1→0. The count is released by [`LoadingGuard`]'s
//! `Drop`, so early returns, errors and panics cannot leave it visible.

use std::sync::Arc;

use parking_lot::Mutex;

use super::ports::LoadingIndicator;

/// Shared counter in front of a [`LoadingIndicator`]
pub struct LoadingTracker {
    indicator: Arc<dyn LoadingIndicator>,
    active: Mutex<usize>,
}

impl std::fmt::Debug for LoadingTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingTracker").field("active", &self.active()).finish_non_exhaustive()
    }
}

impl LoadingTracker {
    pub fn new(indicator: Arc<dyn LoadingIndicator>) -> Arc<Self> {
        Arc::new(Self { indicator, active: Mutex::new(0) })
    }

    /// Register one in-flight request
    pub fn acquire(self: &Arc<Self>) -> LoadingGuard {
        let mut active = self.active.lock();
        if *active == 0 {
            self.indicator.show();
        }
        *active += 1;
        LoadingGuard { tracker: Arc::clone(self) }
    }

    /// Requests currently holding the indicator
    pub fn active(&self) -> usize {
        *self.active.lock()
    }

    fn release(&self) {
        let mut active = self.active.lock();
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.indicator.hide();
        }
    }
}

/// Keeps the indicator visible while alive
#[must_use = "dropping the guard immediately hides the indicator"]
pub struct LoadingGuard {
    tracker: Arc<LoadingTracker>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tracker.release();
    }
}
