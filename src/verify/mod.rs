//! Read-back verification
//!
//! Reads the aggregated record of known subjects from an ingested store,
//! checks it against the expected likers and measures read latency. The
//! subjects file has one `<uri>|<likers>` line per subject, where `likers`
//! is the record exactly as ingest should have produced it.
//!
//! [`RecordCounts`] counts the keys of each namespace after reopening, to
//! catch writes the engine acknowledged but did not keep.

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::error::{VerifyError, VerifyResult};
use crate::ingest::RECORD_SEPARATOR;
use crate::keys::{KeyCodec, LIKE_NAMESPACE, UNLIKE_NAMESPACE};
use crate::storage::StorageBackend;

/// One expected subject record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectLine {
    pub uri: String,
    pub likers: String,
}

impl SubjectLine {
    /// Number of likes in the expected record
    pub fn like_count(&self) -> usize {
        self.likers.split(RECORD_SEPARATOR).count()
    }
}

impl FromStr for SubjectLine {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (uri, likers) = s.split_once('|').ok_or(())?;
        Ok(SubjectLine {
            uri: uri.to_string(),
            likers: likers.to_string(),
        })
    }
}

/// Load every subject line from `input`
pub fn load_subjects<R: BufRead>(input: R) -> VerifyResult<Vec<SubjectLine>> {
    let mut subjects = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let subject = line
            .parse()
            .map_err(|_| VerifyError::BadSubjectLine { line: idx as u64 + 1 })?;
        subjects.push(subject);
    }
    Ok(subjects)
}

/// Timing of one pass over all subjects
#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub index: usize,
    pub total: Duration,
    /// Mean read latency in microseconds, keyed by like count, ascending
    pub mean_micros_by_likes: Vec<(usize, f64)>,
}

/// Results of all passes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadReport {
    pub loops: Vec<LoopReport>,
    pub subjects: usize,
}

impl fmt::Display for ReadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "loop\tduration")?;
        for report in &self.loops {
            writeln!(f, "{}\t{:.3}", report.index, report.total.as_secs_f32())?;
            for (likes, micros) in &report.mean_micros_by_likes {
                writeln!(f, "{likes}\t{micros:.3}")?;
            }
        }
        Ok(())
    }
}

/// Keys stored per namespace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    /// `like:` keys, one per distinct subject
    pub subjects: u64,
    /// `unlike:` markers
    pub unlikes: u64,
}

impl RecordCounts {
    pub fn read<B: StorageBackend + ?Sized>(backend: &mut B) -> VerifyResult<Self> {
        Ok(Self {
            subjects: backend.count_prefix(LIKE_NAMESPACE.as_bytes())?,
            unlikes: backend.count_prefix(UNLIKE_NAMESPACE.as_bytes())?,
        })
    }

    /// Compare with the counts an ingest summary reported
    pub fn check(&self, expected_subjects: Option<u64>, expected_unlikes: Option<u64>) -> VerifyResult<()> {
        let checks = [
            ("subject", expected_subjects, self.subjects),
            ("unlike", expected_unlikes, self.unlikes),
        ];
        for (namespace, expected, found) in checks {
            match expected {
                Some(expected) if expected != found => {
                    return Err(VerifyError::LostRecords {
                        namespace,
                        expected,
                        found,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for RecordCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stored subjects: {}, unlikes: {}", self.subjects, self.unlikes)
    }
}

/// Reads subjects back through any backend
pub struct ReadBenchmark<'a, B: StorageBackend + ?Sized> {
    backend: &'a mut B,
    codec: KeyCodec,
}

impl<'a, B: StorageBackend + ?Sized> ReadBenchmark<'a, B> {
    pub fn new(backend: &'a mut B, codec: KeyCodec) -> Self {
        Self { backend, codec }
    }

    /// Check one subject and return how long the read took
    pub fn check(&mut self, subject: &SubjectLine) -> VerifyResult<Duration> {
        let key = self.codec.subject_key(&subject.uri);
        let t0 = Instant::now();
        let stored = self.backend.get(&key)?;
        let elapsed = t0.elapsed();

        let stored = stored.ok_or_else(|| VerifyError::Missing {
            uri: subject.uri.clone(),
        })?;
        if stored != subject.likers.as_bytes() {
            return Err(VerifyError::Mismatch {
                uri: subject.uri.clone(),
                expected: subject.likers.clone(),
                found: String::from_utf8_lossy(&stored).into_owned(),
            });
        }
        Ok(elapsed)
    }

    /// Verify every subject `loops` times
    pub fn run(&mut self, subjects: &[SubjectLine], loops: usize) -> VerifyResult<ReadReport> {
        let mut report = ReadReport {
            loops: Vec::with_capacity(loops),
            subjects: subjects.len(),
        };

        for index in 0..loops {
            let mut total = Duration::ZERO;
            let mut times: BTreeMap<usize, Vec<f64>> = BTreeMap::new();

            for subject in subjects {
                let d = self.check(subject)?;
                total += d;
                times
                    .entry(subject.like_count())
                    .or_default()
                    .push(d.as_nanos() as f64);
            }

            let mean_micros_by_likes = times
                .into_iter()
                .map(|(likes, group)| {
                    let mean = group.iter().sum::<f64>() / group.len() as f64 / 1000.0;
                    (likes, mean)
                })
                .collect();

            tracing::debug!(loop_index = index, total_ms = total.as_millis() as u64, "verify pass done");
            report.loops.push(LoopReport {
                index,
                total,
                mean_micros_by_likes,
            });
        }

        Ok(report)
    }
}
