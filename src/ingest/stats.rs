//! Ingest statistics collector

use std::time::{Duration, Instant};

use super::merge::Applied;
use crate::types::{Checkpoint, Stats, Summary};

/// Counters owned by the driver for one run
#[derive(Debug)]
pub struct StatsCollector {
    stats: Stats,
    started: Instant,
}

impl StatsCollector {
    /// Start counting; elapsed time is measured from here
    pub fn new() -> Self {
        Self {
            stats: Stats::default(),
            started: Instant::now(),
        }
    }

    /// Count one successfully applied entry
    pub fn record(&mut self, applied: Applied) {
        self.stats.entries += 1;
        match applied {
            Applied::Like { new_subject } => {
                self.stats.likes += 1;
                if new_subject {
                    self.stats.subjects += 1;
                }
            }
            Applied::Unlike => self.stats.unlikes += 1,
        }
    }

    pub fn snapshot(&self) -> Stats {
        self.stats
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn checkpoint(&self, size_bytes: Option<u64>) -> Checkpoint {
        Checkpoint {
            entries: self.stats.entries,
            size_bytes,
            elapsed: self.elapsed(),
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            stats: self.stats,
            elapsed: self.elapsed(),
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
