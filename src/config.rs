//! Runtime configuration
//!
//! Everything is read from `LIKES_*` environment variables; unset variables
//! fall back to the defaults below.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::ingest::{Cadence, DEFAULT_CHECKIN_STEP, DEFAULT_SYNC_STEP};
use crate::keys::KeyLayout;
use crate::storage::BackendKind;

pub const INPUT_PATH_VAR: &str = "LIKES_INPUT_PATH";
pub const DB_PATH_VAR: &str = "LIKES_DB_PATH";
pub const BACKEND_VAR: &str = "LIKES_BACKEND";
pub const KEY_LAYOUT_VAR: &str = "LIKES_KEY_LAYOUT";
pub const CHECKIN_STEP_VAR: &str = "LIKES_CHECKIN_STEP";
pub const SYNC_STEP_VAR: &str = "LIKES_SYNC_STEP";
pub const SUBJECTS_PATH_VAR: &str = "LIKES_SUBJECTS_PATH";
pub const VERIFY_LOOPS_VAR: &str = "LIKES_VERIFY_LOOPS";
pub const EXPECT_SUBJECTS_VAR: &str = "LIKES_EXPECT_SUBJECTS";
pub const EXPECT_UNLIKES_VAR: &str = "LIKES_EXPECT_UNLIKES";

/// Configuration for an ingest run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Line-delimited JSON event stream
    pub input_path: PathBuf,
    /// Where the backend keeps its files
    pub db_path: PathBuf,
    pub backend: BackendKind,
    pub key_layout: KeyLayout,
    pub cadence: Cadence,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("likes.jsonl"),
            db_path: PathBuf::from("likes.db"),
            backend: BackendKind::Sqlite,
            key_layout: KeyLayout::Direct,
            cadence: Cadence::default(),
        }
    }
}

impl IngestConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let checkin_step = parse_var(&lookup, CHECKIN_STEP_VAR, DEFAULT_CHECKIN_STEP)?;
        let sync_step = parse_var(&lookup, SYNC_STEP_VAR, DEFAULT_SYNC_STEP)?;

        Ok(Self {
            input_path: lookup(INPUT_PATH_VAR).map(PathBuf::from).unwrap_or(defaults.input_path),
            db_path: lookup(DB_PATH_VAR).map(PathBuf::from).unwrap_or(defaults.db_path),
            backend: lookup(BACKEND_VAR)
                .map(|v| v.parse::<BackendKind>())
                .transpose()?
                .unwrap_or(defaults.backend),
            key_layout: lookup(KEY_LAYOUT_VAR)
                .map(|v| v.parse::<KeyLayout>())
                .transpose()?
                .unwrap_or(defaults.key_layout),
            cadence: Cadence::new(checkin_step, sync_step)?,
        })
    }
}

/// Configuration for a read-back verification
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub subjects_path: PathBuf,
    pub db_path: PathBuf,
    pub backend: BackendKind,
    pub key_layout: KeyLayout,
    pub loops: usize,
    /// Subjects count from the ingest summary, checked against stored keys
    pub expect_subjects: Option<u64>,
    /// Unlikes count from the ingest summary
    pub expect_unlikes: Option<u64>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            subjects_path: PathBuf::from("subjects.txt"),
            db_path: PathBuf::from("likes.db"),
            backend: BackendKind::Sqlite,
            key_layout: KeyLayout::Direct,
            loops: 3,
            expect_subjects: None,
            expect_unlikes: None,
        }
    }
}

impl VerifyConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ingest = IngestConfig::from_lookup(&lookup)?;
        let defaults = Self::default();
        Ok(Self {
            subjects_path: lookup(SUBJECTS_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.subjects_path),
            db_path: ingest.db_path,
            backend: ingest.backend,
            key_layout: ingest.key_layout,
            loops: parse_var(&lookup, VERIFY_LOOPS_VAR, defaults.loops)?,
            expect_subjects: parse_opt_var(&lookup, EXPECT_SUBJECTS_VAR)?,
            expect_unlikes: parse_opt_var(&lookup, EXPECT_UNLIKES_VAR)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_opt_var(lookup, var)?.unwrap_or(default))
}

fn parse_opt_var<F, T>(lookup: &F, var: &'static str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = IngestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.key_layout, KeyLayout::Direct);
        assert_eq!(config.cadence.checkin_step(), 10_000);
        assert_eq!(config.cadence.sync_step(), 100);
        assert_eq!(config.input_path, PathBuf::from("likes.jsonl"));
    }

    #[test]
    fn test_overrides() {
        let config = IngestConfig::from_lookup(lookup(&[
            (BACKEND_VAR, "sled"),
            (KEY_LAYOUT_VAR, "reversed"),
            (CHECKIN_STEP_VAR, "500"),
            (SYNC_STEP_VAR, " 10 "),
            (DB_PATH_VAR, "/tmp/likes.sled"),
        ]))
        .unwrap();
        assert_eq!(config.backend, BackendKind::Sled);
        assert_eq!(config.key_layout, KeyLayout::Reversed);
        assert_eq!(config.cadence, Cadence::new(500, 10).unwrap());
        assert_eq!(config.db_path, PathBuf::from("/tmp/likes.sled"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            IngestConfig::from_lookup(lookup(&[(BACKEND_VAR, "lmdb")])),
            Err(ConfigError::UnknownBackend(_))
        ));
        assert!(matches!(
            IngestConfig::from_lookup(lookup(&[(SYNC_STEP_VAR, "often")])),
            Err(ConfigError::InvalidNumber { var: SYNC_STEP_VAR, .. })
        ));
        assert!(matches!(
            IngestConfig::from_lookup(lookup(&[(CHECKIN_STEP_VAR, "0")])),
            Err(ConfigError::ZeroStep(_))
        ));
    }

    #[test]
    fn test_verify_config() {
        let config = VerifyConfig::from_lookup(lookup(&[
            (SUBJECTS_PATH_VAR, "sampled.txt"),
            (VERIFY_LOOPS_VAR, "1"),
            (BACKEND_VAR, "memory"),
        ]))
        .unwrap();
        assert_eq!(config.subjects_path, PathBuf::from("sampled.txt"));
        assert_eq!(config.loops, 1);
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.expect_subjects, None);
    }

    #[test]
    fn test_verify_expected_counts() {
        let config = VerifyConfig::from_lookup(lookup(&[
            (EXPECT_SUBJECTS_VAR, "42"),
            (EXPECT_UNLIKES_VAR, "7"),
        ]))
        .unwrap();
        assert_eq!(config.expect_subjects, Some(42));
        assert_eq!(config.expect_unlikes, Some(7));

        assert!(matches!(
            VerifyConfig::from_lookup(lookup(&[(EXPECT_UNLIKES_VAR, "-1")])),
            Err(ConfigError::InvalidNumber { var: EXPECT_UNLIKES_VAR, .. })
        ));
    }
}
