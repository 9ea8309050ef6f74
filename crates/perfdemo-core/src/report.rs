//! Console rendering and the JSON-lines result log.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::measurement::{CaseStatus, MeasurementResult};

/// Format `value` with comma thousands separators: `1000000` -> `1,000,000`.
#[must_use]
pub fn group_thousands(value: u64) -> String {
    let digits: Vec<char> = value.to_string().chars().collect();
    digits
        .rchunks(3)
        .rev()
        .map(|group| group.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
}

/// Human-readable byte count: `B`, `KB`, `MB`, `GB` (base 1024).
#[must_use]
#[allow(clippy::cast_precision_loss)] // Display only
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in ["KB", "MB", "GB"] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.2} {unit}")
}

/// One report line for the result at 1-based `position`.
///
/// ```text
/// 1. String Concatenation (1,000 iterations): 0.143 ms [3 runs, mean 0.048 ms] | 12.50 KB/op
/// 4. Broken: FAILED (measuring, iteration 2): workload failed: value not found
/// ```
#[must_use]
pub fn format_line(position: usize, result: &MeasurementResult) -> String {
    let mut line = format!("{position}. {}", result.name());
    if let Some(workload) = result.workload() {
        line.push_str(&format!(" ({workload})"));
    }

    match result.status() {
        CaseStatus::Completed => {
            line.push_str(&format!(": {:.3} ms", result.elapsed_ms()));
            if result.iterations() > 1 {
                line.push_str(&format!(
                    " [{} runs, mean {:.3} ms]",
                    result.iterations(),
                    result.mean_ms()
                ));
            }
            if let Some(per_op) = result.allocated_per_iteration() {
                line.push_str(&format!(" | {}/op", format_bytes(per_op)));
            }
        }
        CaseStatus::Failed {
            phase,
            iteration,
            reason,
        } => {
            let at = iteration.map_or_else(String::new, |i| format!(", iteration {i}"));
            line.push_str(&format!(": FAILED ({phase}{at}): {reason}"));
        }
    }
    line
}

/// Totals over a finished catalogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    completed: usize,
    failed: usize,
    measured: Duration,
}

impl RunSummary {
    /// Summarize a set of results.
    #[must_use]
    pub fn from_results(results: &[MeasurementResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.record(result);
            summary
        })
    }

    /// Fold one more result into the totals.
    pub fn record(&mut self, result: &MeasurementResult) {
        if result.is_success() {
            self.completed = self.completed.saturating_add(1);
            self.measured = self.measured.saturating_add(result.elapsed());
        } else {
            self.failed = self.failed.saturating_add(1);
        }
    }

    #[must_use]
    pub const fn completed(&self) -> usize {
        self.completed
    }

    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Sum of measured time over completed cases.
    #[must_use]
    pub const fn measured(&self) -> Duration {
        self.measured
    }
}

/// A result stamped with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    timestamp: DateTime<Utc>,
    result: MeasurementResult,
}

impl ResultSnapshot {
    #[must_use]
    pub fn new(result: MeasurementResult) -> Self {
        Self {
            timestamp: Utc::now(),
            result,
        }
    }

    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    #[must_use]
    pub const fn result(&self) -> &MeasurementResult {
        &self.result
    }
}

/// Appends results to a file, one JSON object per line.
pub struct ResultLogger {
    output_path: PathBuf,
}

impl ResultLogger {
    #[must_use]
    pub const fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Append a result as a timestamped snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written or serialization fails.
    pub fn log(&self, result: &MeasurementResult) -> Result<()> {
        self.log_snapshot(&ResultSnapshot::new(result.clone()))
    }

    /// Append a snapshot to the log file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written or serialization fails.
    pub fn log_snapshot(&self, snapshot: &ResultSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .map_err(|e| Error::log_write_failed(&self.output_path, e.to_string()))?;

        writeln!(file, "{json}")
            .map_err(|e| Error::log_write_failed(&self.output_path, e.to_string()))
    }

    /// Read every snapshot back from the log file.
    ///
    /// A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a line is not valid JSON.
    pub fn read_snapshots(&self) -> Result<Vec<ResultSnapshot>> {
        if !self.output_path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.output_path)?);
        reader
            .lines()
            .map(|line| -> Result<ResultSnapshot> {
                let line = line?;
                serde_json::from_str(&line).map_err(Into::into)
            })
            .collect()
    }
}
