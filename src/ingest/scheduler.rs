//! Durability scheduler
//!
//! Two cadences run off the count of entries processed before the current
//! one (0-indexed):
//!
//! - checkpoint tick, `n % checkin_step == checkin_step - 1`: sample progress
//! - rotation tick, `n % sync_step == sync_step - 1`: bound the crash window
//!
//! How a tick turns into backend calls depends on the backend's
//! [`DurabilityModel`]; only one durability mechanism is ever used per run.

use crate::error::{ConfigError, ConfigResult};
use crate::storage::DurabilityModel;

pub const DEFAULT_CHECKIN_STEP: u64 = 10_000;
pub const DEFAULT_SYNC_STEP: u64 = 100;

/// Entry-count cadences for checkpoints and transaction rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    checkin_step: u64,
    sync_step: u64,
}

impl Cadence {
    pub fn new(checkin_step: u64, sync_step: u64) -> ConfigResult<Self> {
        if checkin_step == 0 {
            return Err(ConfigError::ZeroStep("checkin step"));
        }
        if sync_step == 0 {
            return Err(ConfigError::ZeroStep("sync step"));
        }
        Ok(Self {
            checkin_step,
            sync_step,
        })
    }

    pub fn checkin_step(&self) -> u64 {
        self.checkin_step
    }

    pub fn sync_step(&self) -> u64 {
        self.sync_step
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            checkin_step: DEFAULT_CHECKIN_STEP,
            sync_step: DEFAULT_SYNC_STEP,
        }
    }
}

/// What to do around one entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryPlan {
    /// Commit and reopen the batching transaction before writing
    pub rotate_before: bool,
    /// Durability flag for this entry's writes
    pub durable_write: bool,
    /// Emit a checkpoint after the entry is counted
    pub checkpoint: bool,
    /// Flush the backend before sampling its size
    pub flush_before_sample: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DurabilityScheduler {
    cadence: Cadence,
    model: DurabilityModel,
}

impl DurabilityScheduler {
    pub fn new(cadence: Cadence, model: DurabilityModel) -> Self {
        Self { cadence, model }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn model(&self) -> DurabilityModel {
        self.model
    }

    pub fn is_checkpoint(&self, entries: u64) -> bool {
        entries % self.cadence.checkin_step == self.cadence.checkin_step - 1
    }

    pub fn is_rotation(&self, entries: u64) -> bool {
        entries % self.cadence.sync_step == self.cadence.sync_step - 1
    }

    /// Plan for the entry processed when `entries` entries are already done
    pub fn plan(&self, entries: u64) -> EntryPlan {
        let checkpoint = self.is_checkpoint(entries);
        match self.model {
            DurabilityModel::LongLivedTransaction => EntryPlan {
                rotate_before: self.is_rotation(entries),
                checkpoint,
                ..Default::default()
            },
            DurabilityModel::PerWriteFlag => EntryPlan {
                durable_write: checkpoint,
                checkpoint,
                ..Default::default()
            },
            DurabilityModel::ImplicitCommit => EntryPlan {
                checkpoint,
                flush_before_sample: checkpoint,
                ..Default::default()
            },
        }
    }
}
