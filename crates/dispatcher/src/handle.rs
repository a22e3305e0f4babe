//! SinkHandle - manages a sink with isolated queue and worker task

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{BatchSink, FlushedBatch};

use crate::batcher::FlushCallback;
use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Sink name
    name: String,
    /// Channel to send batches to worker
    tx: mpsc::Sender<FlushedBatch>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    ///
    /// # Panics
    /// If `queue_capacity` is zero.
    pub fn spawn<S: BatchSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Send a batch to the sink (non-blocking)
    ///
    /// Returns true if queued, false if the queue is full (batch dropped)
    pub fn try_send(&self, batch: FlushedBatch) -> bool {
        enqueue(&self.tx, batch, &self.name, &self.metrics)
    }

    /// Flush callback feeding this sink's queue.
    ///
    /// Each callback holds a sender, so the worker keeps running until the
    /// handle and every callback are gone. Batches flushed by a dropped
    /// batcher therefore still reach the sink.
    pub fn callback(&self) -> FlushCallback {
        let tx = self.tx.clone();
        let metrics = Arc::clone(&self.metrics);
        let name = self.name.clone();

        Arc::new(move |batch: FlushedBatch| {
            enqueue(&tx, batch, &name, &metrics);
        })
    }

    /// Shutdown the sink worker gracefully
    ///
    /// Queued batches are still written before the sink is flushed and closed.
    /// Waits for every [`callback`](Self::callback) to be dropped first.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        // Wait for worker to finish
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

fn enqueue(
    tx: &mpsc::Sender<FlushedBatch>,
    batch: FlushedBatch,
    name: &str,
    metrics: &SinkMetrics,
) -> bool {
    match tx.try_send(batch) {
        Ok(()) => {
            metrics.set_queue_len(tx.max_capacity() - tx.capacity());
            true
        }
        Err(mpsc::error::TrySendError::Full(b)) => {
            metrics.inc_dropped_count();
            observability::record_batch_dropped(name);
            warn!(
                sink = %name,
                generation = b.generation,
                records = b.records,
                "Queue full, batch dropped"
            );
            false
        }
        Err(mpsc::error::TrySendError::Closed(b)) => {
            metrics.inc_dropped_count();
            error!(
                sink = %name,
                generation = b.generation,
                "Sink worker closed unexpectedly"
            );
            false
        }
    }
}

/// Worker task that consumes batches and writes to sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: BatchSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<FlushedBatch>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(batch) = rx.recv().await {
        metrics.set_queue_len(rx.len());

        match sink.write(&batch).await {
            Ok(()) => {
                metrics.inc_write_count();
                observability::record_batch_delivered(&name, true);
            }
            Err(e) => {
                metrics.inc_failure_count();
                observability::record_batch_delivered(&name, false);
                error!(
                    sink = %name,
                    generation = batch.generation,
                    records = batch.records,
                    error = %e,
                    "Write failed"
                );
                // no retry: a failed batch is gone
            }
        }
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}
