//! Likes Ingest - Binary Entry Point
//!
//! Replays the configured event file into the configured backend and prints
//! checkpoint lines and a final summary on stdout.

use std::fs::File;
use std::io::BufReader;

use likes_ingest::ingest::{Driver, WriterReporter};
use likes_ingest::{logging, open_backend, AppResult, IngestConfig, KeyCodec};

fn main() -> AppResult<()> {
    logging::init();

    let config = IngestConfig::from_env()?;
    let input = BufReader::new(File::open(&config.input_path)?);
    let backend = open_backend(config.backend, &config.db_path)?;

    let driver = Driver::new(backend, KeyCodec::new(config.key_layout), config.cadence);
    let mut reporter = WriterReporter::stdout();
    driver.run(input, &mut reporter)?;

    Ok(())
}
