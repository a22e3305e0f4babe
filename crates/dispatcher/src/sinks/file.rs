//! FileSink - appends bulk payloads to NDJSON files
//!
//! The output can be replayed as-is against a bulk ingest endpoint.

use chrono::{DateTime, Utc};
use contracts::{BatchSink, ContractError, FlushedBatch};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// How output files are split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// One file per UTC day: `<name>-YYYY.MM.DD.ndjson`
    #[default]
    Daily,
    /// A single `<name>.ndjson`
    Never,
}

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output directory
    pub base_path: PathBuf,
    /// File rotation
    pub rotation: Rotation,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        let rotation = match params.get("rotation").map(String::as_str) {
            Some("daily") | None => Rotation::Daily,
            Some("never") => Rotation::Never,
            Some(other) => return Err(format!("unknown rotation '{}'", other)),
        };

        Ok(Self {
            base_path,
            rotation,
        })
    }
}

/// Sink that appends every batch to a local file
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    current: Option<(PathBuf, File)>,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            current: None,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, config)
    }

    /// File a batch flushed at `now` goes to
    pub fn target_path(&self, now: DateTime<Utc>) -> PathBuf {
        let file_name = match self.config.rotation {
            Rotation::Daily => format!("{}-{}.ndjson", self.name, now.format("%Y.%m.%d")),
            Rotation::Never => format!("{}.ndjson", self.name),
        };
        self.config.base_path.join(file_name)
    }

    fn file_for(&mut self, path: PathBuf) -> std::io::Result<&mut File> {
        let reopen = !matches!(&self.current, Some((current, _)) if *current == path);
        if reopen {
            if let Some((old_path, mut old)) = self.current.take() {
                old.flush()?;
                debug!(sink = %self.name, path = %old_path.display(), "Rotated output file");
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            self.current = Some((path, file));
        }

        match self.current.as_mut() {
            Some((_, file)) => Ok(file),
            None => Err(std::io::Error::other("output file not open")),
        }
    }

    fn append_batch(&mut self, batch: &FlushedBatch) -> std::io::Result<()> {
        let path = self.target_path(Utc::now());
        let file = self.file_for(path)?;
        file.write_all(&batch.payload)?;
        file.flush()
    }

    fn persist_batch(&mut self, batch: &FlushedBatch) -> Result<(), ContractError> {
        self.append_batch(batch).map_err(|e| {
            error!(sink = %self.name, generation = batch.generation, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl BatchSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, batch),
        fields(sink = %self.name, generation = batch.generation)
    )]
    async fn write(&mut self, batch: &FlushedBatch) -> Result<(), ContractError> {
        self.persist_batch(batch)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some((_, file)) = self.current.as_mut() {
            file.sync_data()?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.current = None;
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}
