//! Auth-expired policy
//!
//! Every 401/403 clears the stored session. Redirects to login are
//! throttled: failures arriving within the window of the last redirect are
//! absorbed so a burst of concurrent requests navigates only once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use marginalia_common::{Clock, KeyedStore};
use marginalia_domain::constants::SESSION_KEYS;
use marginalia_domain::{ErrorEnvelope, TraceContext};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::ports::AuthRedirect;

/// Default window during which repeated auth failures share one redirect
pub const DEFAULT_REDIRECT_WINDOW: Duration = Duration::from_millis(1_500);

/// Clears the session and drives the throttled login redirect
pub struct AuthSessionPolicy {
    store: KeyedStore,
    redirect: Arc<dyn AuthRedirect>,
    clock: Arc<dyn Clock>,
    window: Duration,
    last_redirect: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for AuthSessionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionPolicy").field("window", &self.window).finish_non_exhaustive()
    }
}

impl AuthSessionPolicy {
    pub fn new(
        store: KeyedStore,
        redirect: Arc<dyn AuthRedirect>,
        clock: Arc<dyn Clock>,
        window: Duration,
    ) -> Self {
        Self { store, redirect, clock, window, last_redirect: Mutex::new(None) }
    }

    /// Handle an auth failure; returns whether a redirect was issued
    pub fn handle(&self, error: &ErrorEnvelope, trace: &TraceContext) -> bool {
        for key in SESSION_KEYS {
            if let Err(err) = self.store.remove(key) {
                warn!(
                    trace_id = trace.trace_id(),
                    key,
                    error = %err,
                    "Failed to clear session key"
                );
            }
        }

        let now = self.clock.now();
        {
            let mut last = self.last_redirect.lock();
            if last.is_some_and(|at| now.saturating_duration_since(at) < self.window) {
                debug!(
                    trace_id = trace.trace_id(),
                    code = error.code,
                    "Auth redirect already in progress, suppressing"
                );
                return false;
            }
            *last = Some(now);
        }

        info!(
            trace_id = trace.trace_id(),
            user_id_hash = trace.user_id_hash(),
            kind = %error.kind,
            "Session rejected, redirecting to login"
        );
        self.redirect.redirect_to_login(error);
        true
    }
}
