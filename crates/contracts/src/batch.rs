//! FlushedBatch - BatchDispatcher output
//!
//! A detached, fully serialized batch handed to the sink.

use bytes::Bytes;
use std::fmt;

/// What caused a batch to be flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushTrigger {
    /// Pending count reached `batch_size`
    Size,
    /// `flush_interval` elapsed since the first record of the batch
    Interval,
    /// Explicit `flush_now` call
    Manual,
    /// Final drain during shutdown
    Shutdown,
}

impl FlushTrigger {
    /// Label used for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Interval => "interval",
            Self::Manual => "manual",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flushed batch
///
/// `payload` is a sequence of newline-terminated framing units:
/// `{"create":{"_index":"<key>"}}\n<record json>\n`.
#[derive(Debug, Clone)]
pub struct FlushedBatch {
    /// Line-delimited bulk payload
    pub payload: Bytes,

    /// Number of records in the payload
    pub records: usize,

    /// Generation the batch was accumulated under
    pub generation: u64,

    /// Flush cause
    pub trigger: FlushTrigger,
}

impl FlushedBatch {
    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True if the payload carries no bytes
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Iterate over `(header, body)` line pairs
    pub fn units(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        let mut lines = self
            .payload
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty());
        std::iter::from_fn(move || Some((lines.next()?, lines.next()?)))
    }
}
