//! LogSink - logs what each bulk batch would index, without sending it

use std::collections::BTreeMap;

use contracts::{BatchSink, ContractError, FlushedBatch};
use tracing::{info, instrument, warn};

use crate::framing;

/// Longest record body shown in the log line
const PREVIEW_BYTES: usize = 256;

/// Per-index view of one batch
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Record count per routing key
    pub per_index: BTreeMap<String, usize>,
    /// Units whose header could not be read back
    pub malformed: usize,
    /// First record body, cut at `PREVIEW_BYTES`
    pub first_record: Option<String>,
}

impl BatchSummary {
    pub fn of(batch: &FlushedBatch) -> Self {
        let mut summary = Self::default();
        for (header, body) in batch.units() {
            match framing::header_routing_key(header) {
                Some(key) => *summary.per_index.entry(key.to_string()).or_default() += 1,
                None => summary.malformed += 1,
            }
            if summary.first_record.is_none() {
                let end = body.len().min(PREVIEW_BYTES);
                summary.first_record = Some(String::from_utf8_lossy(&body[..end]).into_owned());
            }
        }
        summary
    }

    /// `index=count` pairs, sorted by index
    pub fn indices(&self) -> String {
        self.per_index
            .iter()
            .map(|(index, count)| format!("{index}={count}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Sink that logs batch summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl BatchSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, batch),
        fields(sink = %self.name, generation = batch.generation)
    )]
    async fn write(&mut self, batch: &FlushedBatch) -> Result<(), ContractError> {
        let summary = BatchSummary::of(batch);
        if summary.malformed > 0 {
            warn!(sink = %self.name, malformed = summary.malformed, "Unreadable bulk headers");
        }
        info!(
            sink = %self.name,
            trigger = %batch.trigger,
            records = batch.records,
            bytes = batch.len(),
            indices = %summary.indices(),
            first = summary.first_record.as_deref().unwrap_or(""),
            "Bulk batch"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
