//! Ingest pipeline
//!
//! ```text
//! line ──► parse_line ──► DurabilityScheduler.plan(n)
//!                               │ rotate / durable flag
//!                               ▼
//!                         MergeEngine (via WriteScope)
//!                               │ Applied
//!                               ▼
//!                         StatsCollector ──► Reporter (checkpoints, summary)
//! ```
//!
//! - `Driver`: owns the backend and the run
//! - `MergeEngine`: like aggregation and unlike markers
//! - `DurabilityScheduler`: checkpoint and rotation cadence
//! - `StatsCollector`: counters and elapsed time
//! - `Reporter`: result output sinks

mod driver;
mod merge;
mod report;
mod scheduler;
mod stats;

pub use driver::Driver;
pub use merge::{Applied, MergeEngine, RECORD_SEPARATOR};
pub use report::{CollectingReporter, Reporter, WriterReporter};
pub use scheduler::{
    Cadence, DurabilityScheduler, EntryPlan, DEFAULT_CHECKIN_STEP, DEFAULT_SYNC_STEP,
};
pub use stats::StatsCollector;
