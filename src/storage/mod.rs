//! Storage backends
//!
//! Every engine is reduced to the same capability contract: point reads,
//! writes carrying a durability flag, begin/commit of a batching
//! transaction, an explicit flush, and a best-effort on-disk size.
//!
//! Engines disagree on how durability is expressed, captured by
//! [`DurabilityModel`]:
//!
//! ```text
//! PerWriteFlag          every put says "sync now" or "buffer"      (rocksdb)
//! ImplicitCommit        every put commits, flush() makes durable   (sled)
//! LongLivedTransaction  puts batch inside begin..commit            (sqlite)
//! ```
//!
//! The ingest scheduler reads the model and drives the backend accordingly.
//! Backends whose model does not batch treat `begin_transaction`/`commit`
//! as no-ops.

mod disk;
mod memory;
#[cfg(feature = "rocksdb")]
mod rocks;
#[cfg(feature = "sled")]
mod sled_db;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, StorageError, StorageResult};

#[cfg(feature = "rocksdb")]
pub use disk::dir_size;
pub use disk::file_size;
pub use memory::MemoryBackend;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksBackend;
#[cfg(feature = "sled")]
pub use sled_db::SledBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;

/// How a backend turns writes into crash-safe state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurabilityModel {
    /// Each write carries its own sync flag
    PerWriteFlag,
    /// Each write commits on its own; durability needs an explicit flush
    ImplicitCommit,
    /// Writes accumulate in a transaction that is committed periodically
    LongLivedTransaction,
}

/// The capability contract every engine adapter implements
pub trait StorageBackend {
    /// Short engine name for logs and errors
    fn name(&self) -> &'static str;

    fn durability_model(&self) -> DurabilityModel;

    /// Read a value; `Ok(None)` means not found
    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Write a value. `durable` asks for the write (and everything before
    /// it) to be crash-safe on return; models other than
    /// [`DurabilityModel::PerWriteFlag`] ignore it.
    fn put(&mut self, key: &[u8], value: &[u8], durable: bool) -> StorageResult<()>;

    fn begin_transaction(&mut self) -> StorageResult<()>;

    fn commit(&mut self) -> StorageResult<()>;

    /// Force everything written so far to be crash-safe
    fn flush(&mut self) -> StorageResult<()>;

    /// Bytes the store currently occupies on disk
    fn on_disk_size(&self) -> StorageResult<u64>;

    /// Number of stored keys starting with `prefix`
    fn count_prefix(&mut self, prefix: &[u8]) -> StorageResult<u64>;

    /// Release the engine. Uncommitted transactional writes are discarded.
    /// Calling it again is a no-op; any other call afterwards fails with
    /// [`StorageError::Closed`].
    fn close(&mut self) -> StorageResult<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn durability_model(&self) -> DurabilityModel {
        (**self).durability_model()
    }

    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8], durable: bool) -> StorageResult<()> {
        (**self).put(key, value, durable)
    }

    fn begin_transaction(&mut self) -> StorageResult<()> {
        (**self).begin_transaction()
    }

    fn commit(&mut self) -> StorageResult<()> {
        (**self).commit()
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }

    fn on_disk_size(&self) -> StorageResult<u64> {
        (**self).on_disk_size()
    }

    fn count_prefix(&mut self, prefix: &[u8]) -> StorageResult<u64> {
        (**self).count_prefix(prefix)
    }

    fn close(&mut self) -> StorageResult<()> {
        (**self).close()
    }
}

/// Transaction handle for one entry.
///
/// Borrows the backend for the duration of a merge and stamps every put
/// with the durability flag the scheduler picked for this entry.
pub struct WriteScope<'a, B: StorageBackend + ?Sized> {
    backend: &'a mut B,
    durable: bool,
}

impl<'a, B: StorageBackend + ?Sized> WriteScope<'a, B> {
    pub fn new(backend: &'a mut B, durable: bool) -> Self {
        Self { backend, durable }
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.backend.get(key)
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.backend.put(key, value, self.durable)
    }
}

/// Engines selectable at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Sqlite,
    Sled,
    Rocksdb,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Sqlite => "sqlite",
            BackendKind::Sled => "sled",
            BackendKind::Rocksdb => "rocksdb",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "sqlite" | "rusqlite" => Ok(BackendKind::Sqlite),
            "sled" => Ok(BackendKind::Sled),
            "rocksdb" | "rocks" => Ok(BackendKind::Rocksdb),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

/// Open the engine selected by `kind` at `path`.
///
/// The memory engine ignores `path` and batches like a transactional store.
pub fn open_backend(kind: BackendKind, path: &Path) -> StorageResult<Box<dyn StorageBackend>> {
    let backend: Box<dyn StorageBackend> = match kind {
        BackendKind::Memory => Box::new(MemoryBackend::new(DurabilityModel::LongLivedTransaction)),
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => Box::new(SqliteBackend::open(path)?),
        #[cfg(feature = "sled")]
        BackendKind::Sled => Box::new(SledBackend::open(path)?),
        #[cfg(feature = "rocksdb")]
        BackendKind::Rocksdb => Box::new(RocksBackend::open(path)?),
        #[allow(unreachable_patterns)]
        other => {
            return Err(StorageError::Unsupported(other.as_str()));
        }
    };
    tracing::info!(
        backend = backend.name(),
        model = ?backend.durability_model(),
        path = %path.display(),
        "opened storage backend"
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("SQLite".parse::<BackendKind>().unwrap(), BackendKind::Sqlite);
        assert_eq!("rocks".parse::<BackendKind>().unwrap(), BackendKind::Rocksdb);
        assert!(matches!(
            "lmdb".parse::<BackendKind>(),
            Err(ConfigError::UnknownBackend(name)) if name == "lmdb"
        ));
    }

    #[test]
    fn test_open_memory_backend() {
        let backend = open_backend(BackendKind::Memory, Path::new("unused")).unwrap();
        assert_eq!(backend.name(), "memory");
        assert_eq!(backend.durability_model(), DurabilityModel::LongLivedTransaction);
    }

    #[test]
    fn test_write_scope_stamps_durability() {
        let mut backend = MemoryBackend::new(DurabilityModel::PerWriteFlag);
        let handle = backend.clone();

        let mut scope = WriteScope::new(&mut backend, false);
        scope.put(b"k1", b"v1").unwrap();
        assert!(handle.durable_contents().is_empty());

        let mut scope = WriteScope::new(&mut backend, true);
        assert!(scope.is_durable());
        scope.put(b"k2", b"v2").unwrap();
        assert_eq!(handle.durable_contents().len(), 2);
    }

    #[test]
    fn test_boxed_backend_delegates() {
        let memory = MemoryBackend::new(DurabilityModel::ImplicitCommit);
        let handle = memory.clone();
        let mut boxed: Box<dyn StorageBackend> = Box::new(memory);

        boxed.put(b"k", b"v", false).unwrap();
        assert_eq!(boxed.get(b"k").unwrap(), Some(b"v".to_vec()));
        boxed.flush().unwrap();
        assert_eq!(handle.durable_contents().get(b"k".as_slice()), Some(&b"v".to_vec()));
    }
}
