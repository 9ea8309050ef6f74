#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::arithmetic_side_effects)]
#![deny(clippy::indexing_slicing)]

//! # perfdemo-core
//!
//! Catalogue-driven micro-benchmark runner.
//!
//! A [`Catalogue`] holds [`BenchmarkCase`]s in registration order. The
//! [`BenchmarkRunner`] walks it once: each case's setup runs untimed, an
//! optional warm-up pass is discarded, and the measured invocations produce a
//! [`MeasurementResult`]. A failing or panicking case is reported as failed and
//! the runner carries on with the next one.
//!
//! ```
//! use perfdemo_core::{BenchmarkCase, Catalogue, run_all};
//!
//! let mut catalogue = Catalogue::new()
//!     .with(BenchmarkCase::new("sum", || Ok((0..1_000_u64).sum())))
//!     .with(BenchmarkCase::with_setup(
//!         "lookup",
//!         || Ok(vec![1_u64, 2, 3]),
//!         |values: &mut Vec<u64>| Ok(values.iter().filter(|v| **v > 1).count() as u64),
//!     ));
//!
//! let results = run_all(catalogue.cases_mut(), true);
//! assert_eq!(results.len(), 2);
//! assert!(results.iter().all(|r| r.is_success()));
//! assert_eq!(results[1].checksum(), Some(2));
//! ```

pub mod alloc;
pub mod case;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod measurement;
pub mod report;
pub mod runner;
pub mod workloads;

pub use alloc::{AllocationCounter, CountingAllocator};
pub use case::{BenchmarkCase, CaseRoutine, PreparedRoutine};
pub use catalogue::Catalogue;
pub use config::{BenchConfig, Profile, RunnerConfig, SizeOverrides, WorkloadSizes};
pub use error::{Error, Result};
pub use measurement::{CaseStatus, MeasurementResult, Phase};
pub use report::{ResultLogger, ResultSnapshot, RunSummary};
pub use runner::{BenchmarkRunner, run_all};
