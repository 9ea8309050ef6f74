//! # perfdemo
//!
//! Runs the standard benchmark catalogue and prints one line per case.
//!
//! Configuration is layered: profile defaults, then the optional TOML file,
//! then command-line flags. A failing case is reported in the output and does
//! not change the exit status; only startup errors (bad flags or config) exit
//! non-zero.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::arithmetic_side_effects)]

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use perfdemo_core::report::{self, ResultLogger, RunSummary};
use perfdemo_core::{BenchConfig, BenchmarkRunner, Catalogue, CountingAllocator, Profile};

use crate::cli::Cli;

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator::new();

const RULE: &str = "===========================================";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => BenchConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => BenchConfig::default(),
    };
    let config = file_config.merge(cli.overrides());
    let (runner_config, sizes) = config
        .resolve()
        .context("Invalid benchmark configuration")?;
    info!(profile = %config.effective_profile(), ?sizes, "Configuration resolved");

    let mut catalogue = Catalogue::standard(&sizes);
    if let Some(filter) = &cli.filter {
        catalogue.retain_matching(filter);
    }

    if cli.list {
        for (position, name) in (1..).zip(catalogue.names()) {
            println!("{position}. {name}");
        }
        return Ok(());
    }

    let profile = config.effective_profile();
    let mut runner =
        BenchmarkRunner::new(runner_config.clone()).with_allocation_counter(&ALLOCATOR);
    print_banner(profile, &runner);

    if catalogue.is_empty() {
        warn!(filter = ?cli.filter, "No benchmark matches the filter");
        println!("No benchmarks to run.");
        return Ok(());
    }

    let warmup_iterations = runner.config().warmup_iterations();
    if warmup_iterations > 0 && profile.reduced_warmup() {
        println!("Warming up (reduced-size pass)...");
        let mut warmup = Catalogue::standard(&sizes.warmup());
        if let Some(filter) = &cli.filter {
            warmup.retain_matching(filter);
        }
        runner.warm_up(warmup.cases_mut());
        runner = BenchmarkRunner::new(runner_config.with_warmup(false))
            .with_allocation_counter(&ALLOCATOR);
    } else if warmup_iterations > 0 {
        println!("Warming up ({warmup_iterations} discarded run(s) per case)...");
    }
    println!("Running benchmarks...\n");

    let logger = cli.json_out.clone().map(ResultLogger::new);
    let mut summary = RunSummary::default();
    let mut position = 0_usize;
    runner.run_all_with(catalogue.cases_mut(), |result| {
        position = position.saturating_add(1);
        println!("{}", report::format_line(position, result));
        summary.record(result);

        if let Some(logger) = &logger {
            if let Err(e) = logger.log(result) {
                warn!(path = %logger.output_path().display(), error = %e, "Failed to append result");
            }
        }
    });

    print_footer(&summary);
    if let Some(logger) = &logger {
        println!("Results appended to: {}", logger.output_path().display());
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter, logging to stderr.
fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_banner(profile: Profile, runner: &BenchmarkRunner) {
    println!("{RULE}");
    println!("  Performance Demo - perfdemo {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Rust on {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!(
        "  Profile: {profile} | allocation tracking: {}",
        if runner.tracks_allocations() { "on" } else { "off" }
    );
    println!("{RULE}\n");
}

fn print_footer(summary: &RunSummary) {
    println!();
    println!("{RULE}");
    println!(
        "  Benchmark Complete! {} completed, {} failed",
        summary.completed(),
        summary.failed()
    );
    println!(
        "  Total measured time: {:.3} ms",
        summary.measured().as_secs_f64() * 1000.0
    );
    println!("{RULE}");
}
