//! RocksDB backend
//!
//! Durability is chosen per write. Every put goes through the WAL; a buffered
//! put leaves it in the OS page cache, a durable put fsyncs the log. The WAL
//! is sequential, so syncing it also persists every buffered write before
//! it, and a crash loses at most the writes after the last durable one.

use std::path::{Path, PathBuf};

use rocksdb::{Direction, IteratorMode, Options, WriteOptions, DB};

use super::{disk, DurabilityModel, StorageBackend};
use crate::error::{StorageError, StorageResult};

const NAME: &str = "rocksdb";

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::backend(NAME, err)
    }
}

pub struct RocksBackend {
    path: PathBuf,
    db: Option<DB>,
    sync_opts: WriteOptions,
    buffered_opts: WriteOptions,
}

impl RocksBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, &path)?;

        let mut sync_opts = WriteOptions::default();
        sync_opts.set_sync(true);

        let mut buffered_opts = WriteOptions::default();
        buffered_opts.set_sync(false);

        Ok(Self {
            path,
            db: Some(db),
            sync_opts,
            buffered_opts,
        })
    }

    fn db(&self) -> StorageResult<&DB> {
        self.db.as_ref().ok_or(StorageError::Closed)
    }
}

impl StorageBackend for RocksBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn durability_model(&self) -> DurabilityModel {
        DurabilityModel::PerWriteFlag
    }

    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.db()?.get(key)?)
    }

    fn put(&mut self, key: &[u8], value: &[u8], durable: bool) -> StorageResult<()> {
        let opts = if durable {
            &self.sync_opts
        } else {
            &self.buffered_opts
        };
        self.db()?.put_opt(key, value, opts)?;
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
        Ok(self.db()?.flush()?)
    }

    fn on_disk_size(&self) -> StorageResult<u64> {
        Ok(disk::dir_size(&self.path)?)
    }

    fn count_prefix(&mut self, prefix: &[u8]) -> StorageResult<u64> {
        let mut count = 0;
        for item in self.db()?.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    fn close(&mut self) -> StorageResult<()> {
        if let Some(db) = self.db.take() {
            db.flush()?;
        }
        Ok(())
    }
}
