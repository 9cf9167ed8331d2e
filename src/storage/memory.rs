//! In-memory backend
//!
//! Keeps two ordered maps: the durable image (what would survive a crash)
//! and staged writes that are visible to reads but not yet durable. When a
//! staged write turns durable depends on the configured model. The handle is
//! cheap to clone and all clones share state, so a caller can keep one to
//! inspect the store after the ingest driver has closed its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{DurabilityModel, StorageBackend};
use crate::error::{StorageError, StorageResult};

type KvMap = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Default)]
struct MemoryState {
    durable: KvMap,
    staged: KvMap,
    in_transaction: bool,
    closed: bool,
    commits: u64,
    flushes: u64,
    fail_size_sampling: bool,
}

impl MemoryState {
    fn promote(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        self.durable.extend(staged);
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Shared-handle in-memory store
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    model: DurabilityModel,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new(model: DurabilityModel) -> Self {
        Self {
            model,
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Value as a reader would currently see it
    pub fn value(&self, key: &[u8]) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state
            .staged
            .get(key)
            .or_else(|| state.durable.get(key))
            .cloned()
    }

    /// Everything visible to readers
    pub fn contents(&self) -> KvMap {
        let state = self.state.lock();
        let mut all = state.durable.clone();
        all.extend(state.staged.iter().map(|(k, v)| (k.clone(), v.clone())));
        all
    }

    /// Only what would survive a crash right now
    pub fn durable_contents(&self) -> KvMap {
        self.state.lock().durable.clone()
    }

    /// Number of committed transactions
    pub fn commits(&self) -> u64 {
        self.state.lock().commits
    }

    /// Number of explicit flushes and durable writes
    pub fn flushes(&self) -> u64 {
        self.state.lock().flushes
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Make `on_disk_size` fail, to exercise the size-sampling error path
    pub fn fail_size_sampling(&self, fail: bool) {
        self.state.lock().fail_size_sampling = fail;
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn durability_model(&self) -> DurabilityModel {
        self.model
    }

    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let state = self.state.lock();
        state.check_open()?;
        Ok(state
            .staged
            .get(key)
            .or_else(|| state.durable.get(key))
            .cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8], durable: bool) -> StorageResult<()> {
        let mut state = self.state.lock();
        state.check_open()?;
        state.staged.insert(key.to_vec(), value.to_vec());
        if durable && self.model == DurabilityModel::PerWriteFlag {
            state.promote();
            state.flushes += 1;
        }
        Ok(())
    }

    fn begin_transaction(&mut self) -> StorageResult<()> {
        let mut state = self.state.lock();
        state.check_open()?;
        if self.model == DurabilityModel::LongLivedTransaction {
            state.in_transaction = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        let mut state = self.state.lock();
        state.check_open()?;
        if self.model == DurabilityModel::LongLivedTransaction && state.in_transaction {
            state.promote();
            state.in_transaction = false;
            state.commits += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let mut state = self.state.lock();
        state.check_open()?;
        // an open transaction stays uncommitted; only its committed past is flushed
        if self.model != DurabilityModel::LongLivedTransaction {
            state.promote();
        }
        state.flushes += 1;
        Ok(())
    }

    fn on_disk_size(&self) -> StorageResult<u64> {
        let state = self.state.lock();
        if state.fail_size_sampling {
            return Err(StorageError::backend("memory", "size sampling disabled"));
        }
        Ok(state
            .durable
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum())
    }

    fn count_prefix(&mut self, prefix: &[u8]) -> StorageResult<u64> {
        let state = self.state.lock();
        state.check_open()?;
        let staged = state.staged.keys().filter(|k| k.starts_with(prefix)).count();
        let durable_only = state
            .durable
            .keys()
            .filter(|k| k.starts_with(prefix) && !state.staged.contains_key(*k))
            .count();
        Ok((staged + durable_only) as u64)
    }

    fn close(&mut self) -> StorageResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        if state.in_transaction {
            state.staged.clear();
            state.in_transaction = false;
        }
        state.closed = true;
        Ok(())
    }
}
