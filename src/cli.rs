//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use perfdemo_core::{BenchConfig, Profile, SizeOverrides};

/// perfdemo - micro-benchmark runner
#[derive(Parser, Debug)]
#[command(name = "perfdemo")]
#[command(version)]
#[command(about = "Times string, collection, iterator, sort, slice, task and regex micro-operations")]
#[command(
    long_about = "Runs a fixed catalogue of micro-benchmarks in order, each with untimed setup and an optional warm-up pass, and prints elapsed time and bytes allocated per case. A failing case is reported and the rest still run."
)]
pub struct Cli {
    /// Sizing profile (scaled, fixed)
    #[arg(long)]
    pub profile: Option<Profile>,

    /// Base count for the scaled profile
    #[arg(long)]
    pub scale: Option<u64>,

    /// Measured invocations per case
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Skip the warm-up pass
    #[arg(long, default_value_t = false)]
    pub no_warmup: bool,

    /// Discarded warm-up invocations per case (0 disables warm-up)
    #[arg(long)]
    pub warmup_iterations: Option<u64>,

    /// Do not report allocated bytes
    #[arg(long, default_value_t = false)]
    pub no_memory: bool,

    /// Only run cases whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Append results to this file as JSON lines
    #[arg(long)]
    pub json_out: Option<PathBuf>,

    /// List the catalogue and exit
    #[arg(long, default_value_t = false)]
    pub list: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Settings given on the command line, as a config layer over the file.
    #[must_use]
    pub fn overrides(&self) -> BenchConfig {
        BenchConfig {
            profile: self.profile,
            scale: self.scale,
            warmup: self.no_warmup.then_some(false),
            warmup_iterations: self.warmup_iterations,
            track_allocations: self.no_memory.then_some(false),
            sizes: SizeOverrides {
                iterations: self.iterations,
                ..SizeOverrides::default()
            },
        }
    }

    /// Default log filter for the requested verbosity.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
