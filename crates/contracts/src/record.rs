//! Stamped record wrapper
//!
//! Adds an `@timestamp` field next to the flattened record fields, the shape
//! bulk-ingest endpoints use for time-based indices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record with an `@timestamp` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    /// Original record, serialized inline
    #[serde(flatten)]
    pub record: T,

    /// Event time
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl<T> Stamped<T> {
    /// Stamp a record with an explicit event time
    pub fn new(record: T, timestamp: DateTime<Utc>) -> Self {
        Self { record, timestamp }
    }

    /// Stamp a record with the current time
    pub fn now(record: T) -> Self {
        Self::new(record, Utc::now())
    }
}
