//! In-process counters for the batcher and its sink

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::{FlushTrigger, FlushedBatch};

/// Counters for one `BatchDispatcher`
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    accepted: AtomicU64,
    rejected: AtomicU64,
    size_flushes: AtomicU64,
    interval_flushes: AtomicU64,
    manual_flushes: AtomicU64,
    shutdown_flushes: AtomicU64,
    records_flushed: AtomicU64,
    bytes_flushed: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Account for one detached batch
    pub fn record_flush(&self, batch: &FlushedBatch) {
        let counter = match batch.trigger {
            FlushTrigger::Size => &self.size_flushes,
            FlushTrigger::Interval => &self.interval_flushes,
            FlushTrigger::Manual => &self.manual_flushes,
            FlushTrigger::Shutdown => &self.shutdown_flushes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.records_flushed
            .fetch_add(batch.records as u64, Ordering::Relaxed);
        self.bytes_flushed
            .fetch_add(batch.len() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            size_flushes: self.size_flushes.load(Ordering::Relaxed),
            interval_flushes: self.interval_flushes.load(Ordering::Relaxed),
            manual_flushes: self.manual_flushes.load(Ordering::Relaxed),
            shutdown_flushes: self.shutdown_flushes.load(Ordering::Relaxed),
            records_flushed: self.records_flushed.load(Ordering::Relaxed),
            bytes_flushed: self.bytes_flushed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherSnapshot {
    pub accepted: u64,
    pub rejected: u64,
    pub size_flushes: u64,
    pub interval_flushes: u64,
    /// `flush_now` calls that found records
    pub manual_flushes: u64,
    /// Remainders flushed on shutdown or drop
    pub shutdown_flushes: u64,
    pub records_flushed: u64,
    pub bytes_flushed: u64,
}

impl DispatcherSnapshot {
    /// Total flushes regardless of trigger
    pub fn flushes(&self) -> u64 {
        self.size_flushes + self.interval_flushes + self.manual_flushes + self.shutdown_flushes
    }
}

/// Metrics for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Batches delivered successfully
    write_count: AtomicU64,
    /// Batches the sink failed to deliver
    failure_count: AtomicU64,
    /// Batches dropped before reaching the sink (queue full or closed)
    dropped_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
}
