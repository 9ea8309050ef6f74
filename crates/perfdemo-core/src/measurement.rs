//! Measurement results produced by the runner.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a single case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    SettingUp,
    Warmup,
    Measuring,
    Reporting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::SettingUp => "setting-up",
            Self::Warmup => "warmup",
            Self::Measuring => "measuring",
            Self::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Outcome of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CaseStatus {
    Completed,
    Failed {
        /// Phase the failure happened in
        phase: Phase,
        /// Zero-based invocation index within that phase (none for setup)
        iteration: Option<u64>,
        reason: String,
    },
}

/// Timing (and optionally allocation) result for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementResult {
    name: String,
    workload: Option<String>,

    /// Measured invocations that completed
    iterations: u64,

    /// Total time across measured invocations
    elapsed: Duration,

    /// Bytes allocated inside the timed window, when a counter is installed
    allocated_bytes: Option<u64>,

    /// Last value returned by the body
    checksum: Option<u64>,

    status: CaseStatus,
}

impl MeasurementResult {
    /// Result for a case that ran every measured invocation.
    #[must_use]
    pub const fn completed(
        name: String,
        workload: Option<String>,
        iterations: u64,
        elapsed: Duration,
        allocated_bytes: Option<u64>,
        checksum: u64,
    ) -> Self {
        Self {
            name,
            workload,
            iterations,
            elapsed,
            allocated_bytes,
            checksum: Some(checksum),
            status: CaseStatus::Completed,
        }
    }

    /// Result for a case that was abandoned.
    #[must_use]
    pub fn failed(
        name: String,
        workload: Option<String>,
        phase: Phase,
        iteration: Option<u64>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name,
            workload,
            iterations: 0,
            elapsed: Duration::ZERO,
            allocated_bytes: None,
            checksum: None,
            status: CaseStatus::Failed {
                phase,
                iteration,
                reason: reason.into(),
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn workload(&self) -> Option<&str> {
        self.workload.as_deref()
    }

    #[must_use]
    pub const fn iterations(&self) -> u64 {
        self.iterations
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Total elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Mean time per measured invocation in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Display only
    pub fn mean_ms(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.elapsed_ms() / self.iterations as f64
        }
    }

    #[must_use]
    pub const fn allocated_bytes(&self) -> Option<u64> {
        self.allocated_bytes
    }

    /// Bytes allocated per measured invocation.
    #[must_use]
    pub fn allocated_per_iteration(&self) -> Option<u64> {
        self.allocated_bytes
            .and_then(|bytes| bytes.checked_div(self.iterations))
    }

    #[must_use]
    pub const fn checksum(&self) -> Option<u64> {
        self.checksum
    }

    #[must_use]
    pub const fn status(&self) -> &CaseStatus {
        &self.status
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, CaseStatus::Completed)
    }

    /// Failure reason, if the case failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            CaseStatus::Completed => None,
            CaseStatus::Failed { reason, .. } => Some(reason),
        }
    }
}
