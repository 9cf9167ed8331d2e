//! Likes Ingest
//!
//! Replays a stream of like/unlike events into an embedded key-value store,
//! aggregating every like of a subject into one `;`-delimited record, and
//! reports throughput and on-disk growth as it goes.
//!
//! # Features
//!
//! - **One pipeline, many engines**: sqlite, sled and rocksdb behind a single
//!   capability contract
//! - **Durability cadence**: transaction rotation or per-write sync flags,
//!   chosen from the backend's model
//! - **Checkpoints**: `entries\tbytes\tseconds` lines at a fixed entry cadence
//! - **Read-back verification**: check and time stored records afterwards
//!
//! # Modules
//!
//! - `types`: Entry, Action, Stats, Checkpoint, Summary
//! - `parser`: line decoding
//! - `keys`: subject and unlike key layout
//! - `storage`: backend contract and engine adapters
//! - `ingest`: merge engine, scheduler, stats, reporters and driver
//! - `verify`: read-back benchmark
//! - `config`: environment configuration
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use likes_ingest::ingest::{Cadence, CollectingReporter, Driver};
//! use likes_ingest::keys::KeyCodec;
//! use likes_ingest::storage::{DurabilityModel, MemoryBackend};
//!
//! let backend = MemoryBackend::new(DurabilityModel::LongLivedTransaction);
//! let store = backend.clone();
//! let driver = Driver::new(backend, KeyCodec::default(), Cadence::default());
//!
//! let input = "[\"c\",\"did:A\",\"3k\",\"at://did:B/app.bsky.feed.post/x\"]\n";
//! let mut reporter = CollectingReporter::default();
//! let summary = driver.run(Cursor::new(input), &mut reporter).unwrap();
//!
//! assert_eq!(summary.stats.likes, 1);
//! assert_eq!(
//!     store.value(b"like:at://did:B/app.bsky.feed.post/x"),
//!     Some(b"3k!did:A".to_vec())
//! );
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod keys;
pub mod logging;
pub mod parser;
pub mod storage;
pub mod types;
pub mod verify;

// Re-export commonly used items at crate root
pub use config::{IngestConfig, VerifyConfig};
pub use error::{IngestError, ParseError, StorageError};
pub use ingest::{Driver, MergeEngine};
pub use keys::{KeyCodec, KeyLayout};
pub use storage::{open_backend, BackendKind, DurabilityModel, StorageBackend};
pub use types::{Action, AppResult, Checkpoint, Entry, Stats, Summary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
