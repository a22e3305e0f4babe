//! Dispatcher - a BatchDispatcher wired to one sink worker

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use contracts::{BatchConfig, BatchSink, ContractError, DispatcherConfig, SinkConfig, SinkType};

use crate::batcher::BatchDispatcher;
use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::{DispatcherSnapshot, MetricsSnapshot};
use crate::sinks::{FileSink, LogSink};

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Create the configured sink and start batching into it
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(sink = %self.config.sink.name, batch_size = self.config.batch.batch_size)
    )]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handle = create_sink_handle(&self.config.sink).await?;
        Dispatcher::from_handle(self.config.batch, handle)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    if config.queue_capacity == 0 {
        return Err(DispatcherError::sink_creation(
            &config.name,
            "queue_capacity must be > 0",
        ));
    }

    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Batching front end for a single sink
///
/// Dropping it without [`shutdown`](Self::shutdown) still hands the pending
/// records to the sink, which then drains on its own worker task.
pub struct Dispatcher {
    batcher: BatchDispatcher,
    sink: SinkHandle,
}

impl Dispatcher {
    /// Batch into a caller-provided sink (e.g. an HTTP bulk client)
    pub fn with_sink<S: BatchSink + Send + 'static>(
        config: BatchConfig,
        sink: S,
        queue_capacity: usize,
    ) -> Result<Self, DispatcherError> {
        if queue_capacity == 0 {
            return Err(DispatcherError::sink_creation(
                sink.name(),
                "queue_capacity must be > 0",
            ));
        }
        Self::from_handle(config, SinkHandle::spawn(sink, queue_capacity))
    }

    fn from_handle(config: BatchConfig, sink: SinkHandle) -> Result<Self, DispatcherError> {
        let batcher = BatchDispatcher::new(config, sink.callback())?;
        info!(
            sink = %sink.name(),
            batch_size = config.batch_size,
            flush_interval_ms = config.flush_interval_ms,
            "Dispatcher started"
        );
        Ok(Self { batcher, sink })
    }

    /// Buffer one record, see [`BatchDispatcher::push`]
    pub fn push<T>(&self, routing_key: &str, record: &T) -> Result<(), ContractError>
    where
        T: Serialize + ?Sized,
    {
        self.batcher.push(routing_key, record)
    }

    /// Flush pending records immediately
    pub fn flush_now(&self) -> bool {
        self.batcher.flush_now()
    }

    /// The underlying batcher, e.g. to share with producers by reference
    pub fn batcher(&self) -> &BatchDispatcher {
        &self.batcher
    }

    /// Batcher and sink counters
    pub fn metrics(&self) -> (DispatcherSnapshot, MetricsSnapshot) {
        (self.batcher.metrics(), self.sink.metrics().snapshot())
    }

    /// Flush the remainder, then drain and close the sink
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(self) -> (DispatcherSnapshot, MetricsSnapshot) {
        let Self { batcher, sink } = self;
        batcher.shutdown().await;
        let batcher_metrics = batcher.metrics();
        let sink_metrics = Arc::clone(sink.metrics());

        // the batcher owns a sink callback; the worker stops once it is gone
        drop(batcher);
        sink.shutdown().await;

        let sink_snapshot = sink_metrics.snapshot();
        info!(
            records = batcher_metrics.records_flushed,
            batches = sink_snapshot.write_count,
            failed = sink_snapshot.failure_count,
            dropped = sink_snapshot.dropped_count,
            "Dispatcher shutdown complete"
        );
        (batcher_metrics, sink_snapshot)
    }
}

/// Convenience function to create a dispatcher from configuration
#[instrument(name = "dispatcher_create", skip(config))]
pub async fn create_dispatcher(config: DispatcherConfig) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(config).build().await
}
