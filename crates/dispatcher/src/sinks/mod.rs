//! Sink implementations
//!
//! Contains LogSink and FileSink. HTTP delivery lives outside this crate,
//! behind the same `BatchSink` trait.

mod file;
mod log;

pub use self::file::{FileSink, FileSinkConfig, Rotation};
pub use self::log::{BatchSummary, LogSink};
