//! Likes Verify - reads subjects back from an ingested store
//!
//! Compares each stored record with the expected likers and prints per-loop
//! timings grouped by like count, then counts the stored keys and checks
//! them against the ingest summary when `LIKES_EXPECT_*` is set.

use std::fs::File;
use std::io::BufReader;

use likes_ingest::verify::{load_subjects, ReadBenchmark, RecordCounts};
use likes_ingest::{logging, open_backend, AppResult, KeyCodec, StorageBackend, VerifyConfig};

fn main() -> AppResult<()> {
    logging::init();

    let config = VerifyConfig::from_env()?;
    let subjects = load_subjects(BufReader::new(File::open(&config.subjects_path)?))?;
    let mut backend = open_backend(config.backend, &config.db_path)?;

    let report = ReadBenchmark::new(&mut backend, KeyCodec::new(config.key_layout))
        .run(&subjects, config.loops);
    let outcome = match report {
        Ok(report) => RecordCounts::read(&mut backend).map(|counts| (report, counts)),
        Err(e) => Err(e),
    };
    backend.close()?;

    let (report, counts) = outcome?;
    print!("{report}{counts}");
    counts.check(config.expect_subjects, config.expect_unlikes)?;
    Ok(())
}
