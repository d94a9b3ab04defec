//! Debounced audience estimation
//!
//! Every mutation of the active expression reschedules a single pending
//! estimate. Features:
//! - Debounce: a new schedule aborts the sleeping task and starts over
//! - Dispatched requests are never cancelled
//! - Generation counter: responses for superseded schedules are discarded
//! - Latest accepted estimate is published on a watch channel

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::data::AudienceBackend;
use crate::domain::filters::{EstimateRequest, FilterContext};

// ============================================================================
// TYPES
// ============================================================================

/// Estimate accepted for a given schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateUpdate {
    pub context: FilterContext,
    pub generation: u64,
    pub estimate: u64,
}

#[derive(Debug)]
struct PendingEstimate {
    handle: JoinHandle<()>,
    dispatched: Arc<AtomicBool>,
}

// ============================================================================
// TRIGGER
// ============================================================================

#[derive(Debug)]
pub struct EstimateTrigger {
    backend: Arc<dyn AudienceBackend>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<PendingEstimate>,
    tx: Arc<watch::Sender<Option<EstimateUpdate>>>,
}

impl EstimateTrigger {
    pub fn new(backend: Arc<dyn AudienceBackend>, debounce: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            backend,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            tx: Arc::new(tx),
        }
    }

    /// Current schedule generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Subscribe to accepted estimates
    pub fn subscribe(&self) -> watch::Receiver<Option<EstimateUpdate>> {
        self.tx.subscribe()
    }

    /// Most recent accepted estimate
    pub fn latest(&self) -> Option<EstimateUpdate> {
        *self.tx.borrow()
    }

    /// True while a schedule is sleeping or its request is in flight
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }

    /// Restart the debounce timer with a new snapshot
    pub fn schedule(&mut self, context: FilterContext, request: EstimateRequest) -> u64 {
        self.abort_sleeping();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(generation, context = %context, "Estimate scheduled");

        let dispatched = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_estimate(
            self.backend.clone(),
            self.debounce,
            generation,
            self.generation.clone(),
            dispatched.clone(),
            self.tx.clone(),
            context,
            request,
        ));
        self.pending = Some(PendingEstimate { handle, dispatched });
        generation
    }

    /// Drop any pending schedule; in-flight responses become stale
    pub fn cancel(&mut self) {
        self.abort_sleeping();
        self.pending = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Wait for the latest schedule to finish and return the latest estimate
    pub async fn settle(&mut self) -> Option<EstimateUpdate> {
        if let Some(pending) = self.pending.take()
            && let Err(e) = pending.handle.await
            && !e.is_cancelled()
        {
            tracing::warn!(error = %e, "Estimate task failed");
        }
        self.latest()
    }

    fn abort_sleeping(&mut self) {
        if let Some(pending) = self.pending.take()
            && !pending.dispatched.load(Ordering::SeqCst)
        {
            pending.handle.abort();
        }
    }
}

impl Drop for EstimateTrigger {
    fn drop(&mut self) {
        self.abort_sleeping();
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_estimate(
    backend: Arc<dyn AudienceBackend>,
    debounce: Duration,
    generation: u64,
    current: Arc<AtomicU64>,
    dispatched: Arc<AtomicBool>,
    tx: Arc<watch::Sender<Option<EstimateUpdate>>>,
    context: FilterContext,
    request: EstimateRequest,
) {
    tokio::time::sleep(debounce).await;
    if current.load(Ordering::SeqCst) != generation {
        return;
    }
    dispatched.store(true, Ordering::SeqCst);

    match backend.estimate(&request).await {
        Ok(estimate) => {
            if current.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, estimate, "Discarding stale estimate");
                return;
            }
            tracing::debug!(generation, estimate, context = %context, "Estimate received");
            tx.send_replace(Some(EstimateUpdate {
                context,
                generation,
                estimate,
            }));
        }
        Err(e) => {
            tracing::warn!(backend = backend.name(), error = %e, "Failed to fetch audience estimate");
        }
    }
}
