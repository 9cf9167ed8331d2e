//! Ingest counters and the snapshots derived from them

use std::fmt;
use std::time::Duration;

/// Process-wide ingest counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Entries processed so far
    pub entries: u64,
    /// Create entries applied
    pub likes: u64,
    /// Delete entries applied
    pub unlikes: u64,
    /// Distinct subjects first seen by a create
    pub subjects: u64,
}

/// Periodic progress sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub entries: u64,
    /// `None` when the size sample failed
    pub size_bytes: Option<u64>,
    pub elapsed: Duration,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size_bytes {
            Some(size) => write!(
                f,
                "{}\t{}\t{:.3}",
                self.entries,
                size,
                self.elapsed.as_secs_f32()
            ),
            None => write!(f, "{}\t-\t{:.3}", self.entries, self.elapsed.as_secs_f32()),
        }
    }
}

/// Final tally of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub stats: Stats,
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "done in {:.1}s. entries: {}, likes: {}, unlikes: {}, subjects: {}",
            self.elapsed.as_secs_f32(),
            self.stats.entries,
            self.stats.likes,
            self.stats.unlikes,
            self.stats.subjects
        )
    }
}

/// Format size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
