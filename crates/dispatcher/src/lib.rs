//! # Dispatcher
//!
//! Bulk batching module.
//!
//! Responsibilities:
//! - Frame records into a line-delimited bulk payload
//! - Flush on `batch_size` records or `flush_interval` after the first one
//! - Hand flushed batches to a sink worker without blocking producers

pub mod batcher;
pub mod dispatcher;
pub mod error;
pub mod framing;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use batcher::{BatchDispatcher, FlushCallback};
pub use contracts::{BatchSink, FlushTrigger, FlushedBatch};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{DispatcherSnapshot, MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, LogSink};
