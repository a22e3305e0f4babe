//! # Contracts
//!
//! Frozen interface contracts shared by the bulk dispatcher crates.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Wire Model
//! - A flushed batch is a line-delimited bulk payload: one action header line
//!   followed by one JSON document line per record
//! - `generation` increases by one on every flush and identifies the batch

mod batch;
mod config;
mod error;
mod record;
mod sink;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use record::Stamped;
pub use sink::*;
