//! BatchSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks. Delivery (HTTP, retry, auth)
//! lives behind this trait; the dispatcher only hands over flushed batches.

use crate::{ContractError, FlushedBatch};

/// Batch output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(BatchSink: Send)]
pub trait LocalBatchSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one flushed batch
    ///
    /// # Errors
    /// Returns write error (should include context). The dispatcher does
    /// not retry or roll back on failure.
    async fn write(&mut self, batch: &FlushedBatch) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
