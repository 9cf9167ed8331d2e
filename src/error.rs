//! Error types
//!
//! Parse and storage failures are fatal for an ingest run. Size sampling
//! failures never surface here: they are logged and the affected checkpoint
//! loses its size field.

use std::io;

use thiserror::Error;

/// Result type for line parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for backend operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for a whole ingest run
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for read-back verification
pub type VerifyResult<T> = Result<T, VerifyError>;

/// A single input line could not be turned into an entry
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed record: {0}")]
    MalformedRecord(#[source] serde_json::Error),
    #[error("wrong arity: expected 4 elements, found {0}")]
    WrongArity(usize),
    #[error("missing action")]
    MissingAction,
    #[error("unknown action '{0}', expected 'c' or 'd'")]
    UnknownAction(String),
    #[error("missing actor")]
    MissingActor,
    #[error("missing record key")]
    MissingRecordKey,
    #[error("missing subject uri on create")]
    MissingSubject,
}

/// A backend get/put/commit/flush failed
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{backend} error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("backend is closed")]
    Closed,
    #[error("backend '{0}' was not compiled into this build")]
    Unsupported(&'static str),
}

impl StorageError {
    pub(crate) fn backend(backend: &'static str, err: impl std::fmt::Display) -> Self {
        StorageError::Backend {
            backend,
            message: err.to_string(),
        }
    }
}

/// Invalid environment configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown backend '{0}', expected one of memory, sqlite, sled, rocksdb")]
    UnknownBackend(String),
    #[error("unknown key layout '{0}', expected direct or reversed")]
    UnknownKeyLayout(String),
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    ZeroStep(&'static str),
}

/// Fatal outcome of an ingest run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("line {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("reading input: {0}")]
    Input(#[source] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fatal outcome of a read-back verification
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("subject {uri} has no stored likes")]
    Missing { uri: String },
    #[error("subject {uri}: expected '{expected}', found '{found}'")]
    Mismatch {
        uri: String,
        expected: String,
        found: String,
    },
    #[error("lost writes: expected {expected} {namespace} keys, found {found}")]
    LostRecords {
        namespace: &'static str,
        expected: u64,
        found: u64,
    },
    #[error("line {line}: expected '<uri>|<likers>'")]
    BadSubjectLine { line: u64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
