//! Ingest driver
//!
//! Owns the backend for the whole run and processes the event stream one
//! line at a time: parse, plan, merge, count, report. The first parse or
//! storage error stops the run; the backend is closed on every exit path.

use std::io::BufRead;

use tracing::{debug, info, warn};

use super::merge::{Applied, MergeEngine};
use super::report::Reporter;
use super::scheduler::{Cadence, DurabilityScheduler, EntryPlan};
use super::stats::StatsCollector;
use crate::error::{IngestError, IngestResult, StorageResult};
use crate::keys::KeyCodec;
use crate::parser::parse_line;
use crate::storage::{StorageBackend, WriteScope};
use crate::types::{format_size, Action, Entry, Stats, Summary};

pub struct Driver<B: StorageBackend> {
    backend: B,
    merge: MergeEngine,
    scheduler: DurabilityScheduler,
    stats: StatsCollector,
}

impl<B: StorageBackend> Driver<B> {
    pub fn new(backend: B, codec: KeyCodec, cadence: Cadence) -> Self {
        let scheduler = DurabilityScheduler::new(cadence, backend.durability_model());
        Self {
            backend,
            merge: MergeEngine::new(codec),
            scheduler,
            stats: StatsCollector::new(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats.snapshot()
    }

    /// Ingest every line of `input`, then commit, flush and close.
    pub fn run<R: BufRead>(mut self, input: R, reporter: &mut dyn Reporter) -> IngestResult<Summary> {
        info!(
            backend = self.backend.name(),
            model = ?self.scheduler.model(),
            checkin_step = self.scheduler.cadence().checkin_step(),
            sync_step = self.scheduler.cadence().sync_step(),
            layout = %self.merge.codec().layout(),
            "starting ingest"
        );

        match self.ingest(input, reporter) {
            Ok(summary) => {
                self.backend.close()?;
                Ok(summary)
            }
            Err(err) => {
                if let Err(close_err) = self.backend.close() {
                    warn!(error = %close_err, "closing backend after failure");
                }
                Err(err)
            }
        }
    }

    fn ingest<R: BufRead>(&mut self, input: R, reporter: &mut dyn Reporter) -> IngestResult<Summary> {
        self.backend.begin_transaction()?;

        // raw bytes so invalid UTF-8 is reported by the parser with its line
        for (idx, line) in input.split(b'\n').enumerate() {
            let mut line = line.map_err(IngestError::Input)?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let entry = parse_line(&line).map_err(|source| IngestError::Parse {
                line: idx as u64 + 1,
                source,
            })?;
            self.process(&entry, reporter).map_err(|err| match err {
                IngestError::Parse { source, .. } => IngestError::Parse {
                    line: idx as u64 + 1,
                    source,
                },
                other => other,
            })?;
        }

        self.backend.commit()?;
        self.backend.flush()?;

        let summary = self.stats.summary();
        match self.backend.on_disk_size() {
            Ok(size) => info!(size = %format_size(size), "final store size"),
            Err(e) => warn!(error = %e, "could not sample final store size"),
        }
        reporter.summary(&summary);
        Ok(summary)
    }

    /// Apply one parsed entry.
    ///
    /// A create without a subject is rejected before the backend is touched,
    /// so a bad entry never changes counters or stored keys. Parse errors
    /// raised here carry line 0; `run` fills in the real line number.
    pub fn process(&mut self, entry: &Entry, reporter: &mut dyn Reporter) -> IngestResult<Applied> {
        let subject = match entry.action {
            Action::Create => Some(
                entry
                    .require_subject()
                    .map_err(|source| IngestError::Parse { line: 0, source })?,
            ),
            Action::Delete => None,
        };

        let plan = self.scheduler.plan(self.stats.snapshot().entries);
        if plan.rotate_before {
            self.rotate()?;
        }

        let mut txn = WriteScope::new(&mut self.backend, plan.durable_write);
        let applied = match subject {
            Some(subject) => Applied::Like {
                new_subject: self.merge.apply_create(
                    &mut txn,
                    subject,
                    &entry.record_key,
                    &entry.actor_id,
                )?,
            },
            None => {
                self.merge
                    .apply_delete(&mut txn, &entry.record_key, &entry.actor_id)?;
                Applied::Unlike
            }
        };
        self.stats.record(applied);

        if plan.checkpoint {
            self.checkpoint(plan, reporter)?;
        }
        Ok(applied)
    }

    fn rotate(&mut self) -> StorageResult<()> {
        self.backend.commit()?;
        self.backend.begin_transaction()?;
        debug!(entries = self.stats.snapshot().entries, "rotated transaction");
        Ok(())
    }

    fn checkpoint(&mut self, plan: EntryPlan, reporter: &mut dyn Reporter) -> StorageResult<()> {
        if plan.flush_before_sample {
            self.backend.flush()?;
        }
        let size = match self.backend.on_disk_size() {
            Ok(size) => Some(size),
            Err(e) => {
                warn!(
                    entries = self.stats.snapshot().entries,
                    error = %e,
                    "size sample failed, skipping checkpoint size"
                );
                None
            }
        };
        reporter.checkpoint(&self.stats.checkpoint(size));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::ingest::CollectingReporter;
    use crate::storage::{DurabilityModel, MemoryBackend};
    use std::io::Cursor;

    fn driver(model: DurabilityModel, cadence: Cadence) -> (Driver<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new(model);
        let handle = backend.clone();
        (Driver::new(backend, KeyCodec::default(), cadence), handle)
    }

    #[test]
    fn test_process_counts_and_merges() {
        let (mut driver, handle) = driver(DurabilityModel::ImplicitCommit, Cadence::default());
        let mut reporter = CollectingReporter::default();

        let applied = driver
            .process(&Entry::create("did:A", "3k", "at://did:B/p/x"), &mut reporter)
            .unwrap();
        assert_eq!(applied, Applied::Like { new_subject: true });
        let applied = driver
            .process(&Entry::delete("did:A", "3k"), &mut reporter)
            .unwrap();
        assert_eq!(applied, Applied::Unlike);

        assert_eq!(driver.stats().entries, 2);
        assert_eq!(handle.value(b"like:at://did:B/p/x"), Some(b"3k!did:A".to_vec()));
    }

    #[test]
    fn test_create_without_subject_touches_nothing() {
        let (mut driver, handle) = driver(DurabilityModel::ImplicitCommit, Cadence::default());
        let mut reporter = CollectingReporter::default();
        let mut entry = Entry::create("did:A", "3k", "at://did:B/p/x");
        entry.subject_uri = None;

        let err = driver.process(&entry, &mut reporter).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Parse {
                source: ParseError::MissingSubject,
                ..
            }
        ));
        assert_eq!(driver.stats(), Stats::default());
        assert!(handle.contents().is_empty());
    }

    #[test]
    fn test_run_reports_line_number_of_bad_entry() {
        let (driver, handle) = driver(DurabilityModel::LongLivedTransaction, Cadence::default());
        let mut reporter = CollectingReporter::default();
        let input = "[\"d\",\"did:A\",\"3k\",null]\n[\"c\",\"did:A\",\"4k\",null]\n";

        let err = driver.run(Cursor::new(input), &mut reporter).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Parse {
                line: 2,
                source: ParseError::MissingSubject
            }
        ));
        assert!(handle.is_closed());
        assert!(reporter.summary.is_none());
    }

    #[test]
    fn test_rotation_commits_before_the_entry() {
        let (mut driver, handle) = driver(
            DurabilityModel::LongLivedTransaction,
            Cadence::new(1_000, 2).unwrap(),
        );
        let mut reporter = CollectingReporter::default();
        driver.backend.begin_transaction().unwrap();

        driver.process(&Entry::delete("did:A", "1"), &mut reporter).unwrap();
        assert_eq!(handle.commits(), 0);
        // second entry (n = 1) rotates before it is written
        driver.process(&Entry::delete("did:A", "2"), &mut reporter).unwrap();
        assert_eq!(handle.commits(), 1);
        assert_eq!(handle.durable_contents().len(), 1);
    }

    #[test]
    fn test_checkpoint_survives_size_failure() {
        let (mut driver, handle) = driver(DurabilityModel::ImplicitCommit, Cadence::new(1, 1).unwrap());
        handle.fail_size_sampling(true);
        let mut reporter = CollectingReporter::default();

        driver.process(&Entry::delete("did:A", "1"), &mut reporter).unwrap();
        assert_eq!(reporter.checkpoints.len(), 1);
        assert_eq!(reporter.checkpoints[0].size_bytes, None);
        assert_eq!(driver.stats().entries, 1);
    }

    #[test]
    fn test_invalid_utf8_is_a_malformed_record_on_its_line() {
        let (driver, handle) = driver(DurabilityModel::ImplicitCommit, Cadence::default());
        let mut reporter = CollectingReporter::default();
        let input: &[u8] = b"[\"d\",\"did:A\",\"3k\",null]\n[\"c\",\"did:\xff\",\"3k\",\"at://x\"]\n";

        let err = driver.run(Cursor::new(input), &mut reporter).unwrap_err();
        assert!(
            matches!(
                err,
                IngestError::Parse {
                    line: 2,
                    source: ParseError::MalformedRecord(_)
                }
            ),
            "{err}"
        );
        assert_eq!(handle.contents().len(), 1);
    }

    #[test]
    fn test_crlf_line_endings() {
        let (driver, _handle) = driver(DurabilityModel::ImplicitCommit, Cadence::default());
        let mut reporter = CollectingReporter::default();
        let input = "[\"d\",\"did:A\",\"3k\",null]\r\n[\"d\",\"did:A\",\"4k\",null]\r\n";

        let summary = driver.run(Cursor::new(input), &mut reporter).unwrap();
        assert_eq!(summary.stats.unlikes, 2);
    }

    #[test]
    fn test_implicit_commit_flushes_only_on_checkpoint_ticks() {
        let (mut driver, handle) = driver(DurabilityModel::ImplicitCommit, Cadence::new(2, 100).unwrap());
        let mut reporter = CollectingReporter::default();

        let mut flushes = Vec::new();
        let mut durable = Vec::new();
        for rk in ["1", "2", "3", "4", "5"] {
            driver.process(&Entry::delete("did:A", rk), &mut reporter).unwrap();
            flushes.push(handle.flushes());
            durable.push(handle.durable_contents().len());
        }

        assert_eq!(flushes, vec![0, 1, 1, 2, 2]);
        assert_eq!(durable, vec![0, 2, 2, 4, 4]);
        assert_eq!(handle.commits(), 0);
        // the size is sampled after the flush, so it covers the whole tick
        let sizes: Vec<Option<u64>> = reporter.checkpoints.iter().map(|c| c.size_bytes).collect();
        assert_eq!(sizes, vec![Some(2 * 14), Some(4 * 14)]);
    }

    #[test]
    fn test_per_write_flag_marks_only_the_tick_write_durable() {
        let (mut driver, handle) = driver(DurabilityModel::PerWriteFlag, Cadence::new(2, 100).unwrap());
        let mut reporter = CollectingReporter::default();

        let mut durable = Vec::new();
        for rk in ["1", "2", "3", "4", "5"] {
            driver.process(&Entry::delete("did:A", rk), &mut reporter).unwrap();
            durable.push(handle.durable_contents().len());
        }

        assert_eq!(durable, vec![0, 2, 2, 4, 4]);
        // one durable put per tick, no explicit flushes or commits
        assert_eq!(handle.flushes(), 2);
        assert_eq!(handle.commits(), 0);
        assert_eq!(reporter.checkpoints.len(), 2);
    }
}
