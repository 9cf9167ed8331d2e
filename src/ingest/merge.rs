//! Read-modify-write merge of like events into aggregated subject records

use crate::error::StorageResult;
use crate::keys::{record_token, KeyCodec};
use crate::storage::{StorageBackend, WriteScope};

/// Separator between tokens of an aggregated record
pub const RECORD_SEPARATOR: char = ';';

/// What applying one entry did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Like { new_subject: bool },
    Unlike,
}

/// Applies creates and deletes through a caller-supplied write scope
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeEngine {
    codec: KeyCodec,
}

impl MergeEngine {
    pub fn new(codec: KeyCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Append `recordKey!actorID` to the subject's record.
    ///
    /// Returns whether this was the first like ever seen for the subject.
    /// The existing value is decoded as text before appending; bytes that
    /// are not valid UTF-8 come back replaced.
    pub fn apply_create<B: StorageBackend + ?Sized>(
        &self,
        txn: &mut WriteScope<'_, B>,
        subject_uri: &str,
        record_key: &str,
        actor_id: &str,
    ) -> StorageResult<bool> {
        let key = self.codec.subject_key(subject_uri);
        let token = record_token(record_key, actor_id);

        let (value, new_subject) = match txn.get(&key)? {
            None => (token, true),
            Some(existing) => {
                let existing = String::from_utf8_lossy(&existing);
                (format!("{existing}{RECORD_SEPARATOR}{token}"), false)
            }
        };

        txn.put(&key, value.as_bytes())?;
        Ok(new_subject)
    }

    /// Write the empty unlike marker. Idempotent.
    pub fn apply_delete<B: StorageBackend + ?Sized>(
        &self,
        txn: &mut WriteScope<'_, B>,
        record_key: &str,
        actor_id: &str,
    ) -> StorageResult<()> {
        txn.put(&self.codec.action_key(record_key, actor_id), b"")
    }
}
