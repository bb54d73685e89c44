//! `nbbctl ingest`: stream an NDJSON file of records into the database.
//!
//! Each record is its own transaction. Malformed lines, dropped records
//! and failed records are counted and reported; none of them stops the
//! run. An unreadable input does. Records that failed on a connectivity
//! problem can be retried with `--retries`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::{future, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use nbbctl_core::{AsyncRecordReader, CoreError, Record};
use nbbctl_store::{IngestError, IngestStats, Ingestor, Report};

use super::load_db_config;
use crate::ui;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// NDJSON input file (`-` reads standard input)
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: PathBuf,

    /// Records in flight at once (defaults to the number of CPUs)
    #[arg(long, short = 'c', env = "NBB_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Retry a record up to N times when it failed on a transient store error
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub retries: u32,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Totals for one `ingest` run.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct IngestSummary {
    #[serde(flatten)]
    pub stats: IngestStats,
    /// Lines that did not parse as a record
    pub malformed: usize,
    /// Extra attempts spent on transient failures
    pub retries: u32,
}

impl IngestSummary {
    fn lines(&self) -> usize {
        self.stats.total() + self.malformed
    }

    fn render(&self) -> String {
        format!(
            "{} lines: {} persisted, {} skipped, {} dropped, {} failed, {} malformed",
            self.lines(),
            self.stats.persisted,
            self.stats.skipped,
            self.stats.dropped,
            self.stats.failed,
            self.malformed
        )
    }
}

/// Tallies what the input stream itself produced, before ingestion.
#[derive(Debug, Default)]
struct LineTally {
    read: usize,
    malformed: usize,
    read_error: Option<CoreError>,
}

impl LineTally {
    /// Keep records, count malformed lines, remember the read error that
    /// ended the stream.
    fn accept(&mut self, line: usize, parsed: nbbctl_core::Result<Record>) -> Option<Record> {
        self.read += 1;
        match parsed {
            Ok(record) => Some(record),
            Err(err @ CoreError::MalformedRecord { .. }) => {
                warn!(line, error = %err, "skipping malformed line");
                self.malformed += 1;
                None
            }
            Err(err) => {
                self.read_error = Some(err);
                None
            }
        }
    }
}

pub async fn run_ingest(args: IngestArgs) -> Result<()> {
    let config = load_db_config()?;
    let concurrency = args.concurrency.unwrap_or_else(num_cpus::get).max(1);

    let reader = AsyncRecordReader::open(&args.input)
        .await
        .with_context(|| format!("Failed to open {}", args.input.display()))?;

    let ingestor = Ingestor::connect(&config)
        .await
        .context("Failed to prepare the database")?;

    info!(
        input = %args.input.display(),
        concurrency,
        retries = args.retries,
        "ingestion started"
    );

    let pb = ui::spinner("Ingesting records");
    let retried = AtomicU32::new(0);
    let max_retries = args.retries;
    let mut tally = LineTally::default();

    let records = reader.into_stream().filter_map(|(line, parsed)| {
        let record = tally.accept(line, parsed);
        ui::update(&pb, format!("Ingesting records ({} read)", tally.read));
        future::ready(record)
    });
    let stats = ingestor
        .ingest_stream_with(records, concurrency, |ingestor, record| {
            ingest_with_retry(ingestor, record, max_retries, &retried)
        })
        .await;

    ingestor.close().await;

    let summary = IngestSummary {
        stats,
        malformed: tally.malformed,
        retries: retried.into_inner(),
    };

    if let Some(err) = tally.read_error {
        ui::finish_error(pb, format!("Read error after {} lines", tally.read));
        return Err(err)
            .with_context(|| format!("Failed to read {}", args.input.display()));
    }

    if summary.stats.failed > 0 {
        ui::finish_error(pb, summary.render());
    } else {
        ui::finish_success(pb, summary.render());
    }
    info!(
        persisted = summary.stats.persisted,
        skipped = summary.stats.skipped,
        dropped = summary.stats.dropped,
        failed = summary.stats.failed,
        malformed = summary.malformed,
        "ingestion finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.render());
    }

    if summary.stats.failed > 0 {
        bail!("{} record(s) failed to persist", summary.stats.failed);
    }
    Ok(())
}

/// Ingest one record, retrying transient store failures with exponential
/// backoff. Every retry is counted in `retried`.
async fn ingest_with_retry(
    ingestor: &Ingestor,
    record: Record,
    max_retries: u32,
    retried: &AtomicU32,
) -> Result<Report, IngestError> {
    let mut attempt = 0;
    loop {
        let outcome = ingestor.ingest(record.clone()).await;
        match &outcome {
            Err(err) if err.is_transient() && attempt < max_retries => {
                let delay = backoff(attempt);
                attempt += 1;
                retried.fetch_add(1, Ordering::Relaxed);
                warn!(
                    record = %record.describe(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            _ => return outcome,
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2u32.pow(attempt.min(5))
}
