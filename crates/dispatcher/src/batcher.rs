//! BatchDispatcher - accumulates framed records and flushes them by size or age
//!
//! One mutex guards the pending buffer, its record count and the flush
//! generation. Serialization, callbacks and timers all run outside of it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, trace, warn};

use contracts::{BatchConfig, ContractError, FlushTrigger, FlushedBatch};

use crate::framing;
use crate::metrics::{DispatcherMetrics, DispatcherSnapshot};

/// Receives every flushed batch. Invoked on a runtime task, never while the
/// batch lock is held, so it may take its time without stalling producers.
pub type FlushCallback = Arc<dyn Fn(FlushedBatch) + Send + Sync>;

/// The batch currently being accumulated
#[derive(Default)]
struct PendingBatch {
    buf: BytesMut,
    count: usize,
    /// Bumped on every flush; an interval timer only fires for the
    /// generation it was armed under.
    generation: u64,
    timer: Option<JoinHandle<()>>,
    closed: bool,
}

impl PendingBatch {
    /// Detach buffer and count together, starting a new generation.
    fn detach(&mut self, trigger: FlushTrigger) -> Option<FlushedBatch> {
        if self.count == 0 {
            return None;
        }
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let batch = FlushedBatch {
            payload: self.buf.split().freeze(),
            records: std::mem::take(&mut self.count),
            generation: self.generation,
            trigger,
        };
        self.generation += 1;
        Some(batch)
    }
}

struct Appended {
    flushed: Option<FlushedBatch>,
    pending: usize,
}

struct Shared {
    config: BatchConfig,
    callback: FlushCallback,
    runtime: Handle,
    state: Mutex<PendingBatch>,
    in_flight: Mutex<JoinSet<()>>,
    metrics: DispatcherMetrics,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, PendingBatch> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(self: &Arc<Self>, routing_key: &str, body: &[u8]) -> Result<Appended, ContractError> {
        let mut state = self.lock_state();
        if state.closed {
            return Err(ContractError::Closed);
        }

        framing::append_unit(&mut state.buf, routing_key, body);
        state.count += 1;

        if state.count >= self.config.batch_size {
            return Ok(Appended {
                flushed: state.detach(FlushTrigger::Size),
                pending: 0,
            });
        }

        if state.count == 1 {
            let generation = state.generation;
            state.timer = Some(self.arm_timer(generation));
        }

        Ok(Appended {
            flushed: None,
            pending: state.count,
        })
    }

    fn arm_timer(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        let interval = self.config.flush_interval();
        self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            shared.flush_if_current(generation);
        })
    }

    fn flush_if_current(&self, generation: u64) {
        let batch = {
            let mut state = self.lock_state();
            if state.generation != generation {
                trace!(
                    armed = generation,
                    current = state.generation,
                    "Stale flush timer"
                );
                return;
            }
            // this task is the armed timer; detach must not abort it
            state.timer = None;
            state.detach(FlushTrigger::Interval)
        };

        if let Some(batch) = batch {
            self.dispatch(batch);
        }
    }

    fn dispatch(&self, batch: FlushedBatch) {
        self.metrics.record_flush(&batch);
        observability::record_batch_flushed(batch.trigger.as_str(), batch.records, batch.len());
        debug!(
            trigger = %batch.trigger,
            generation = batch.generation,
            records = batch.records,
            bytes = batch.len(),
            "Flushing batch"
        );

        let callback = Arc::clone(&self.callback);
        let mut in_flight = self.lock_in_flight();
        while let Some(done) = in_flight.try_join_next() {
            log_join(done);
        }
        in_flight.spawn_on(async move { callback(batch) }, &self.runtime);
    }

    fn reject(&self, routing_key: &str, err: &ContractError) {
        self.metrics.inc_rejected();
        observability::record_push_rejected(err.reason());
        warn!(routing_key, error = %err, "Record rejected");
    }

    async fn drain_in_flight(&self) {
        loop {
            let mut tasks = {
                let mut guard = self.lock_in_flight();
                std::mem::take(&mut *guard)
            };
            if tasks.is_empty() {
                break;
            }
            while let Some(done) = tasks.join_next().await {
                log_join(done);
            }
        }
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "Flush callback panicked");
        }
    }
}

/// Batches records for bulk delivery.
///
/// A batch is flushed as soon as it holds `batch_size` records, or
/// `flush_interval` after its first record, whichever comes first. Each
/// flushed batch is handed to the callback exactly once, records in push
/// order.
///
/// # Example
///
/// ```no_run
/// # async fn demo() -> Result<(), contracts::ContractError> {
/// use contracts::BatchConfig;
/// use dispatcher::BatchDispatcher;
///
/// let batcher = BatchDispatcher::with_callback(BatchConfig::default(), |batch| {
///     println!("{} records, {} bytes", batch.records, batch.len());
/// })?;
/// batcher.push("falco", &serde_json::json!({ "rule": "shell" }))?;
/// batcher.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct BatchDispatcher {
    shared: Arc<Shared>,
}

impl BatchDispatcher {
    /// Create a dispatcher bound to the current tokio runtime.
    ///
    /// # Errors
    /// - `ConfigValidation` if `batch_size` or `flush_interval` is zero
    /// - `NoRuntime` when called outside a runtime
    pub fn new(config: BatchConfig, callback: FlushCallback) -> Result<Self, ContractError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ContractError::NoRuntime)?;

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                callback,
                runtime,
                state: Mutex::new(PendingBatch::default()),
                in_flight: Mutex::new(JoinSet::new()),
                metrics: DispatcherMetrics::new(),
            }),
        })
    }

    /// Same as [`new`](Self::new) with a plain closure
    pub fn with_callback<F>(config: BatchConfig, callback: F) -> Result<Self, ContractError>
    where
        F: Fn(FlushedBatch) + Send + Sync + 'static,
    {
        Self::new(config, Arc::new(callback))
    }

    /// Frame and buffer one record under `routing_key`.
    ///
    /// Returns once the record is buffered; never waits for delivery. A
    /// rejected record leaves the pending batch untouched.
    ///
    /// # Errors
    /// - `InvalidRoutingKey` if the key contains `"`, `\` or a control character
    /// - `Serialization` if the record cannot be encoded as JSON
    /// - `Closed` after [`shutdown`](Self::shutdown)
    pub fn push<T>(&self, routing_key: &str, record: &T) -> Result<(), ContractError>
    where
        T: Serialize + ?Sized,
    {
        let appended = framing::validate_routing_key(routing_key)
            .and_then(|()| serde_json::to_vec(record).map_err(ContractError::from))
            .and_then(|body| self.shared.append(routing_key, &body))
            .inspect_err(|e| self.shared.reject(routing_key, e))?;

        self.shared.metrics.inc_accepted();
        observability::record_push_accepted();
        observability::record_pending_records(appended.pending);

        if let Some(batch) = appended.flushed {
            self.shared.dispatch(batch);
        }
        Ok(())
    }

    /// Flush whatever is pending right away. Returns false if nothing was pending.
    pub fn flush_now(&self) -> bool {
        let batch = self.shared.lock_state().detach(FlushTrigger::Manual);
        match batch {
            Some(batch) => {
                self.shared.dispatch(batch);
                true
            }
            None => false,
        }
    }

    /// Stop accepting records, flush the remainder and wait until every
    /// flush callback has returned.
    pub async fn shutdown(&self) {
        let batch = {
            let mut state = self.shared.lock_state();
            state.closed = true;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.detach(FlushTrigger::Shutdown)
        };

        if let Some(batch) = batch {
            self.shared.dispatch(batch);
        }
        self.shared.drain_in_flight().await;

        let snapshot = self.metrics();
        info!(
            accepted = snapshot.accepted,
            rejected = snapshot.rejected,
            flushes = snapshot.flushes(),
            "BatchDispatcher shutdown complete"
        );
    }

    /// Records buffered since the last flush
    pub fn pending_count(&self) -> usize {
        self.shared.lock_state().count
    }

    /// Number of flushes so far
    pub fn generation(&self) -> u64 {
        self.shared.lock_state().generation
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock_state().closed
    }

    pub fn config(&self) -> &BatchConfig {
        &self.shared.config
    }

    pub fn metrics(&self) -> DispatcherSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl Drop for BatchDispatcher {
    fn drop(&mut self) {
        let batch = {
            let mut state = self.shared.lock_state();
            state.closed = true;
            state.detach(FlushTrigger::Shutdown)
        };

        if let Some(batch) = batch {
            warn!(
                records = batch.records,
                "BatchDispatcher dropped without shutdown, flushing remainder"
            );
            self.shared.dispatch(batch);
        }
        // dropping a JoinSet aborts its tasks; let pending callbacks finish
        self.shared.lock_in_flight().detach_all();
    }
}
