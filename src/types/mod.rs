//! Data types for the likes ingest pipeline
//!
//! This module contains the parsed event and the counters reported about a run.

mod entry;
mod stats;

pub use entry::{Action, Entry};
pub use stats::{format_size, Checkpoint, Stats, Summary};

/// Result type for the binaries
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
