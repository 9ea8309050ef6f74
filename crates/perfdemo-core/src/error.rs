//! Error types for benchmark setup, execution, configuration and reporting.
//!
//! Case failures are contained by the runner and turned into a failed
//! [`crate::MeasurementResult`]; everything else is returned to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for perfdemo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for perfdemo operations.
#[derive(Debug, Error)]
pub enum Error {
    // Case execution
    #[error("workload failed: {reason}")]
    WorkloadFailed { reason: String },

    #[error("case body invoked before its setup ran")]
    NotPrepared,

    #[error("panicked: {message}")]
    Panicked { message: String },

    #[error("worker task failed: {reason}")]
    TaskJoinFailed { reason: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    // Configuration
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("unknown profile '{name}' (expected 'scaled' or 'fixed')")]
    UnknownProfile { name: String },

    #[error("failed to read config file '{path}': {reason}")]
    ConfigReadFailed { path: PathBuf, reason: String },

    #[error("TOML parse error: {reason}")]
    TomlParseFailed { reason: String },

    // Reporting
    #[error("failed to write results to '{path}': {reason}")]
    LogWriteFailed { path: PathBuf, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a workload failure.
    pub fn workload_failed(reason: impl Into<String>) -> Self {
        Self::WorkloadFailed {
            reason: reason.into(),
        }
    }

    /// Create a panic error from a caught payload message.
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }

    /// Create a task join failure.
    pub fn task_join_failed(reason: impl Into<String>) -> Self {
        Self::TaskJoinFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a config file read error.
    pub fn config_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a result log write error.
    pub fn log_write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::LogWriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
