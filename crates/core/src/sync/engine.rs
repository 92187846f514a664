//! Offline mutation queue
//!
//! Writes that cannot reach the server are appended to a FIFO queue
//! persisted under one reserved key. `flush` replays the queue
//! sequentially: each acknowledged mutation is removed and the shrunk queue
//! persisted before the next replay starts, failures stay queued and the pass
//! continues. There is no terminal failure state.
//!
//! Delivery is at-least-once. A mutation whose acknowledgement is lost in
//! transit is replayed by the next flush. A persisted queue that no longer
//! decodes is never rewritten: writes fail until it is repaired.

use std::sync::Arc;

use marginalia_common::{Clock, ErrorClassification, KeyedStore, SystemClock};
use marginalia_domain::constants::SYNC_QUEUE_KEY;
use marginalia_domain::{FlushReport, MutationAction, MutationDomain, QueuedMutation};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::errors::SyncError;
use super::ports::{AlwaysOnline, Connectivity, Delivery, MutationDispatcher};
use super::routes::route;

/// Result of [`SyncEngine::submit_or_defer`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Server acknowledged the write; envelope `data`
    Committed(Value),
    /// Write parked in the offline queue under this id
    Deferred(String),
}

/// Persisted FIFO of pending mutations plus its replay loop
pub struct SyncEngine {
    store: KeyedStore,
    dispatcher: Arc<dyn MutationDispatcher>,
    connectivity: Arc<dyn Connectivity>,
    clock: Arc<dyn Clock>,
    /// Serializes read-modify-write of the persisted queue
    queue_lock: Mutex<()>,
    /// Serializes flush passes
    flush_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").field("store", &self.store).finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(store: KeyedStore, dispatcher: Arc<dyn MutationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            connectivity: Arc::new(AlwaysOnline),
            clock: Arc::new(SystemClock),
            queue_lock: Mutex::new(()),
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Append a mutation and persist the queue before returning its id
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidMutation`] for update/delete payloads without an
    /// `id`, [`SyncError::Storage`] when the queue cannot be read back or
    /// persisted (the mutation is then not queued and the stored queue is
    /// left untouched).
    pub fn enqueue(
        &self,
        domain: MutationDomain,
        action: MutationAction,
        payload: Value,
    ) -> Result<String, SyncError> {
        let mutation = QueuedMutation::new(domain, action, payload, self.clock.epoch_millis());
        route(&mutation)?;
        self.push(mutation)
    }

    /// Pending mutations in replay order
    ///
    /// # Errors
    ///
    /// [`SyncError::Storage`] when the persisted queue cannot be read or
    /// decoded.
    pub fn pending(&self) -> Result<Vec<QueuedMutation>, SyncError> {
        let _guard = self.queue_lock.lock();
        self.load()
    }

    /// Number of pending mutations; an unreadable queue counts as empty
    pub fn len(&self) -> usize {
        self.pending().as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replay every queued mutation once, in insertion order
    ///
    /// Concurrent calls are serialized. Mutations enqueued while a pass is
    /// running are left for the next pass.
    pub async fn flush(&self) -> FlushReport {
        let _flush = self.flush_lock.lock().await;
        let mut report = FlushReport::default();
        let snapshot = match self.pending() {
            Ok(queue) => queue,
            Err(err) => {
                error!(
                    error = %err,
                    severity = %err.severity(),
                    "Offline queue is unreadable, nothing replayed"
                );
                return report;
            }
        };
        if snapshot.is_empty() {
            return report;
        }

        info!(pending = snapshot.len(), "Flushing offline queue");
        for mutation in snapshot {
            match self.dispatcher.dispatch(&mutation, Delivery::Replay).await {
                Ok(_) => match self.commit(&mutation.id) {
                    Ok(()) => report.succeeded.push(mutation.id),
                    Err(err) => {
                        error!(
                            mutation_id = %mutation.id,
                            error = %err,
                            severity = %err.severity(),
                            retryable = err.is_retryable(),
                            "Acknowledged mutation could not be removed, it will replay again"
                        );
                        report.still_pending.push(mutation.id);
                    }
                },
                Err(envelope) => {
                    warn!(
                        mutation_id = %mutation.id,
                        domain = %mutation.domain,
                        action = %mutation.action,
                        kind = %envelope.kind,
                        code = envelope.code,
                        "Replay failed, mutation stays queued"
                    );
                    report.still_pending.push(mutation.id);
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            still_pending = report.still_pending.len(),
            "Flush finished"
        );
        report
    }

    /// Send a write now, parking it in the queue when the device is offline
    ///
    /// Only network and timeout failures are deferred. Every other failure is
    /// returned as [`SyncError::Rejected`] and nothing is queued.
    pub async fn submit_or_defer(
        &self,
        domain: MutationDomain,
        action: MutationAction,
        payload: Value,
    ) -> Result<WriteOutcome, SyncError> {
        if !self.connectivity.is_online() {
            debug!(%domain, %action, "Offline, deferring write");
            return self.enqueue(domain, action, payload).map(WriteOutcome::Deferred);
        }

        let mutation = QueuedMutation::new(domain, action, payload, self.clock.epoch_millis());
        route(&mutation)?;
        match self.dispatcher.dispatch(&mutation, Delivery::Interactive).await {
            Ok(data) => Ok(WriteOutcome::Committed(data)),
            Err(envelope) if envelope.is_deferrable() => {
                info!(
                    kind = %envelope.kind,
                    %domain,
                    %action,
                    "Write deferred after transport failure"
                );
                self.push(mutation).map(WriteOutcome::Deferred)
            }
            Err(envelope) => Err(SyncError::Rejected(envelope)),
        }
    }

    /// Append an already routed mutation, keeping its id
    fn push(&self, mutation: QueuedMutation) -> Result<String, SyncError> {
        let (id, domain, action) = (mutation.id.clone(), mutation.domain, mutation.action);
        let _guard = self.queue_lock.lock();
        let mut queue = self.load()?;
        queue.push(mutation);
        self.persist(&queue)?;
        debug!(mutation_id = %id, %domain, %action, pending = queue.len(), "Mutation queued");
        Ok(id)
    }

    /// Read the persisted queue; a missing key is an empty queue
    fn load(&self) -> Result<Vec<QueuedMutation>, SyncError> {
        Ok(self.store.try_get(SYNC_QUEUE_KEY)?.unwrap_or_default())
    }

    fn persist(&self, queue: &[QueuedMutation]) -> Result<(), SyncError> {
        self.store.set(SYNC_QUEUE_KEY, queue, None)?;
        Ok(())
    }

    fn commit(&self, id: &str) -> Result<(), SyncError> {
        let _guard = self.queue_lock.lock();
        let mut queue = self.load()?;
        queue.retain(|m| m.id != id);
        self.persist(&queue)
    }
}
