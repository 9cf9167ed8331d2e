//! SQLite backend
//!
//! One `kv` table holds both namespaces. Writes batch inside a long-lived
//! `BEGIN IMMEDIATE` transaction that the scheduler rotates; with WAL and
//! `synchronous=NORMAL` a commit is the durability point and `flush`
//! checkpoints the WAL back into the main file.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use super::{disk, DurabilityModel, StorageBackend};
use crate::error::{StorageError, StorageResult};

const NAME: &str = "sqlite";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS kv (
    key   BLOB PRIMARY KEY,
    value BLOB NOT NULL
) WITHOUT ROWID";
const GET_STATEMENT: &str = "SELECT value FROM kv WHERE key = ?1";
const PUT_STATEMENT: &str = "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)";
const COUNT_PREFIX_STATEMENT: &str = "SELECT COUNT(*) FROM kv WHERE substr(key, 1, ?1) = ?2";

/// Page cache size in KiB (negative `cache_size` pragma value)
const WRITE_CACHE_KIB: i64 = 64 * 1024;

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::backend(NAME, err)
    }
}

pub struct SqliteBackend {
    path: PathBuf,
    conn: Option<Connection>,
    in_transaction: bool,
}

impl SqliteBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", -WRITE_CACHE_KIB)?;
        conn.execute(CREATE_TABLE, [])?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "sqlite ready");

        Ok(Self {
            path,
            conn: Some(conn),
            in_transaction: false,
        })
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    fn wal_path(&self) -> PathBuf {
        let mut wal = self.path.clone().into_os_string();
        wal.push("-wal");
        PathBuf::from(wal)
    }
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn durability_model(&self) -> DurabilityModel {
        DurabilityModel::LongLivedTransaction
    }

    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let value = self
            .conn()?
            .prepare_cached(GET_STATEMENT)?
            .query_row(params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put(&mut self, key: &[u8], value: &[u8], _durable: bool) -> StorageResult<()> {
        self.conn()?
            .prepare_cached(PUT_STATEMENT)?
            .execute(params![key, value])?;
        Ok(())
    }

    fn begin_transaction(&mut self) -> StorageResult<()> {
        if !self.in_transaction {
            self.conn()?.execute_batch("BEGIN IMMEDIATE")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if self.in_transaction {
            self.conn()?.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.in_transaction {
            // uncommitted work has nothing to flush yet
            return Ok(());
        }
        self.conn()?
            .query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        Ok(())
    }

    fn on_disk_size(&self) -> StorageResult<u64> {
        let main = disk::file_size(&self.path)?;
        let wal = disk::file_size(&self.wal_path())?;
        Ok(main + wal)
    }

    fn count_prefix(&mut self, prefix: &[u8]) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .prepare_cached(COUNT_PREFIX_STATEMENT)?
            .query_row(params![prefix.len() as i64, prefix], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn close(&mut self) -> StorageResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if self.in_transaction {
            self.in_transaction = false;
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback on close failed");
            }
        }
        conn.close().map_err(|(_, e)| StorageError::from(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_backend() -> (SqliteBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(temp_dir.path().join("likes.sqlite")).unwrap();
        (backend, temp_dir)
    }

    #[test]
    fn test_put_get_inside_transaction() {
        let (mut backend, _temp_dir) = create_test_backend();
        backend.begin_transaction().unwrap();
        assert_eq!(backend.get(b"like:x").unwrap(), None);
        backend.put(b"like:x", b"3k!did:A", false).unwrap();
        assert_eq!(backend.get(b"like:x").unwrap(), Some(b"3k!did:A".to_vec()));
        backend.commit().unwrap();
        assert_eq!(backend.get(b"like:x").unwrap(), Some(b"3k!did:A".to_vec()));
    }

    #[test]
    fn test_empty_value_round_trips() {
        let (mut backend, _temp_dir) = create_test_backend();
        backend.put(b"unlike:3k!did:A", b"", false).unwrap();
        assert_eq!(backend.get(b"unlike:3k!did:A").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_close_rolls_back_open_transaction() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("likes.sqlite");

        let mut backend = SqliteBackend::open(&path).unwrap();
        backend.begin_transaction().unwrap();
        backend.put(b"committed", b"1", false).unwrap();
        backend.commit().unwrap();
        backend.begin_transaction().unwrap();
        backend.put(b"pending", b"2", false).unwrap();
        backend.close().unwrap();
        backend.close().unwrap();
        assert!(matches!(backend.get(b"committed"), Err(StorageError::Closed)));

        let mut reopened = SqliteBackend::open(&path).unwrap();
        assert_eq!(reopened.get(b"committed").unwrap(), Some(b"1".to_vec()));
        assert_eq!(reopened.get(b"pending").unwrap(), None);
    }

    #[test]
    fn test_count_prefix() {
        let (mut backend, _temp_dir) = create_test_backend();
        backend.put(b"like:a", b"3k!did:A", false).unwrap();
        backend.put(b"like:b", b"9x!did:C", false).unwrap();
        backend.put(b"unlike:3k!did:A", b"", false).unwrap();

        assert_eq!(backend.count_prefix(b"like:").unwrap(), 2);
        assert_eq!(backend.count_prefix(b"unlike:").unwrap(), 1);
    }

    #[test]
    fn test_on_disk_size_grows() {
        let (mut backend, _temp_dir) = create_test_backend();
        let before = backend.on_disk_size().unwrap();
        backend.begin_transaction().unwrap();
        for i in 0..200 {
            backend
                .put(format!("like:{i}").as_bytes(), &[b'x'; 256], false)
                .unwrap();
        }
        backend.commit().unwrap();
        assert!(backend.on_disk_size().unwrap() > before);
    }
}
