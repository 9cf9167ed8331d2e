//! sled backend
//!
//! Every insert is its own committed write, visible immediately. Nothing is
//! crash-safe until `flush`, so the scheduler flushes on checkpoint ticks and
//! the driver flushes once more at the end of the stream.

use std::path::Path;

use super::{DurabilityModel, StorageBackend};
use crate::error::{StorageError, StorageResult};

const NAME: &str = "sled";

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::backend(NAME, err)
    }
}

pub struct SledBackend {
    db: Option<sled::Db>,
}

impl SledBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), recovered = db.was_recovered(), "sled ready");
        Ok(Self { db: Some(db) })
    }

    fn db(&self) -> StorageResult<&sled::Db> {
        self.db.as_ref().ok_or(StorageError::Closed)
    }
}

impl StorageBackend for SledBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn durability_model(&self) -> DurabilityModel {
        DurabilityModel::ImplicitCommit
    }

    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.db()?.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&mut self, key: &[u8], value: &[u8], _durable: bool) -> StorageResult<()> {
        self.db()?.insert(key, value)?;
        Ok(())
    }

    fn begin_transaction(&mut self) -> StorageResult<()> {
        self.db()?;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.db()?;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let bytes = self.db()?.flush()?;
        tracing::debug!(bytes, "sled flushed");
        Ok(())
    }

    fn on_disk_size(&self) -> StorageResult<u64> {
        Ok(self.db()?.size_on_disk()?)
    }

    fn count_prefix(&mut self, prefix: &[u8]) -> StorageResult<u64> {
        let mut count = 0;
        for item in self.db()?.scan_prefix(prefix) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn close(&mut self) -> StorageResult<()> {
        // dropping the last handle flushes and releases the directory lock
        if let Some(db) = self.db.take() {
            db.flush()?;
        }
        Ok(())
    }
}
