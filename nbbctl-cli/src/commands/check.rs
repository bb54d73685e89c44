//! `nbbctl check`: validate a record file without a database.
//!
//! Every record goes through the same preparation step as `ingest`
//! (team id derivation, drop rules). Records that survive can be written
//! back out, with derived keys filled in.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, warn};

use nbbctl_core::{CoreError, Record, RecordReader, RecordWriter};
use nbbctl_store::dispatch;

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// NDJSON input file (`-` reads standard input)
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: PathBuf,

    /// Write the records that would be ingested, with derived keys, to FILE
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// What `ingest` would do with a file, decided offline.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Records that would be written in full
    pub valid: usize,
    /// Records with at least one repository operation that would be skipped
    pub incomplete: usize,
    /// Records rejected before reaching the store
    pub dropped: usize,
    /// Lines that did not parse
    pub malformed: usize,
}

impl CheckReport {
    fn render(&self) -> String {
        format!(
            "{} valid, {} incomplete, {} dropped, {} malformed",
            self.valid, self.incomplete, self.dropped, self.malformed
        )
    }
}

pub fn run_check(args: CheckArgs) -> Result<()> {
    let source = open_input(&args.input)?;
    let mut writer = args
        .output
        .as_ref()
        .map(|path| {
            RecordWriter::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))
        })
        .transpose()?;

    let report = check_records(RecordReader::new(source), |record| match writer.as_mut() {
        Some(writer) => writer.write_record(record).map_err(anyhow::Error::from),
        None => Ok(()),
    })?;

    if let Some(writer) = writer.as_mut() {
        writer.flush()?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render());
    }
    Ok(())
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Classify every line, handing each surviving record to `keep`.
fn check_records<I>(lines: I, mut keep: impl FnMut(&Record) -> Result<()>) -> Result<CheckReport>
where
    I: Iterator<Item = nbbctl_core::NumberedRecord>,
{
    let mut report = CheckReport::default();

    for (line, parsed) in lines {
        let record = match parsed {
            Ok(record) => record,
            Err(err @ CoreError::MalformedRecord { .. }) => {
                warn!(line, error = %err, "malformed line");
                report.malformed += 1;
                continue;
            }
            Err(err) => return Err(err).with_context(|| format!("Failed to read line {line}")),
        };

        let record = match dispatch::prepare(record) {
            Ok(record) => record,
            Err(err) => {
                warn!(line, "{err}");
                report.dropped += 1;
                continue;
            }
        };

        let missing = record.missing_keys();
        if missing.is_empty() {
            report.valid += 1;
        } else {
            debug!(
                line,
                missing = %missing.join(", "),
                record = %record.describe(),
                "incomplete record"
            );
            report.incomplete += 1;
        }
        keep(&record)?;
    }

    Ok(report)
}
