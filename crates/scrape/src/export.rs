use backscroll_core::{Error, Result, ScrapeResult};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Header row, in `MessageRecord` field order.
pub const COLUMNS: [&str; 6] = [
    "image_link",
    "sender_id",
    "sender_name",
    "timestamp",
    "information",
    "had_extraction_error",
];

/// `scraped_file_<YYYYmmdd_HHMMSS>.csv`
pub fn output_file_name(now: NaiveDateTime) -> String {
    format!("scraped_file_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Write one row per record into a timestamped file under `dir`, creating the
/// directory if needed. The header is written even when there are no rows.
pub fn write_csv(result: &ScrapeResult, dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(output_file_name(now));

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .map_err(|e| Error::Export(format!("CSV open error: {}", e)))?;
    wtr.write_record(COLUMNS)
        .map_err(|e| Error::Export(format!("CSV header write error: {}", e)))?;
    for record in &result.records {
        wtr.serialize(record)
            .map_err(|e| Error::Export(format!("CSV row write error: {}", e)))?;
    }
    wtr.flush()
        .map_err(|e| Error::Export(format!("CSV flush error: {}", e)))?;

    info!(path = %path.display(), rows = result.len(), "Results exported");
    Ok(path)
}

/// Export the outcome of a controller run and build its report.
///
/// A run stopped by the cycle guard still writes what it collected; the
/// guard's error is returned after the file is written.
pub fn export_run(outcome: Result<ScrapeResult>, dir: &Path, now: NaiveDateTime) -> Result<RunReport> {
    match outcome {
        Ok(result) => {
            let output = write_csv(&result, dir, now)?;
            Ok(RunReport::new(&result, output))
        }
        Err(Error::ScrapeTimeout { cycles, partial }) => {
            let output = write_csv(&partial, dir, now)?;
            warn!(
                cycles,
                rows = partial.len(),
                path = %output.display(),
                "Cutoff not reached, partial results exported"
            );
            Err(Error::ScrapeTimeout { cycles, partial })
        }
        Err(e) => Err(e),
    }
}

/// Number of distinct sender names, the sentinel included.
pub fn distinct_senders(result: &ScrapeResult) -> usize {
    result
        .records
        .iter()
        .map(|r| r.sender_name.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// End-of-run summary printed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub profiles: usize,
    pub failures: u32,
    pub output: PathBuf,
}

impl RunReport {
    pub fn new(result: &ScrapeResult, output: PathBuf) -> Self {
        Self {
            profiles: distinct_senders(result),
            failures: result.failure_count,
            output,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scraped Profiles: {}", self.profiles)?;
        writeln!(f, "Failures: {}", self.failures)?;
        write!(f, "Output: {}", self.output.display())
    }
}
