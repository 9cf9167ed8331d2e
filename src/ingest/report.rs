//! Reporting sinks for checkpoints and the final summary
//!
//! This is the tool's result output, separate from diagnostic logging.

use std::io::{self, Write};

use crate::types::{Checkpoint, Summary};

pub trait Reporter {
    fn checkpoint(&mut self, checkpoint: &Checkpoint);
    fn summary(&mut self, summary: &Summary);
}

/// Writes tab-separated checkpoint lines and the summary line
pub struct WriterReporter<W: Write> {
    out: W,
}

impl<W: Write> WriterReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &dyn std::fmt::Display) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write report line");
        }
    }
}

impl WriterReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter for WriterReporter<W> {
    fn checkpoint(&mut self, checkpoint: &Checkpoint) {
        // a checkpoint without a size sample is not worth a line
        if checkpoint.size_bytes.is_none() {
            return;
        }
        self.emit(checkpoint);
    }

    fn summary(&mut self, summary: &Summary) {
        self.emit(summary);
    }
}

/// Keeps everything it is given, for embedding and tests
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub checkpoints: Vec<Checkpoint>,
    pub summary: Option<Summary>,
}

impl Reporter for CollectingReporter {
    fn checkpoint(&mut self, checkpoint: &Checkpoint) {
        self.checkpoints.push(*checkpoint);
    }

    fn summary(&mut self, summary: &Summary) {
        self.summary = Some(*summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stats;
    use std::time::Duration;

    #[test]
    fn test_writer_reporter_lines() {
        let mut reporter = WriterReporter::new(Vec::new());
        reporter.checkpoint(&Checkpoint {
            entries: 10_000,
            size_bytes: Some(123),
            elapsed: Duration::from_secs(2),
        });
        reporter.checkpoint(&Checkpoint {
            entries: 20_000,
            size_bytes: None,
            elapsed: Duration::from_secs(3),
        });
        reporter.summary(&Summary {
            stats: Stats {
                entries: 20_000,
                likes: 15_000,
                unlikes: 5_000,
                subjects: 42,
            },
            elapsed: Duration::from_secs(4),
        });

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            out,
            "10000\t123\t2.000\n\
             done in 4.0s. entries: 20000, likes: 15000, unlikes: 5000, subjects: 42\n"
        );
    }
}
