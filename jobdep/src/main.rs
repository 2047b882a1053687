/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use jobdep::analysis::run_analysis;
use jobdep::config::WorkloadConfig;
use jobdep::dependency::OverlapRule;
use jobdep::graph::ParentRule;
use jobdep::job::Horizon;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Derive job-level dependencies for a periodic task set.
///
/// Example:
///   jobdep --workload demos/workload.yaml --horizon 60 --parent-rule latest_release
#[derive(Debug, Parser)]
#[command(
    name = "jobdep",
    about = "Job-level dependency model for periodic real-time task sets",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML workload file.
    #[arg(short = 'w', long = "workload")]
    workload: PathBuf,

    /// Fixed horizon in ticks (default: one hyperperiod).
    #[arg(short = 'H', long = "horizon")]
    horizon: Option<u64>,

    /// Tree parent rule: earliest_release, latest_release or strict.
    #[arg(short = 'p', long = "parent-rule")]
    parent_rule: Option<ParentRule>,

    /// Producer/consumer overlap rule: data_at_release or any_overlap.
    #[arg(short = 'o', long = "overlap-rule")]
    overlap_rule: Option<OverlapRule>,

    /// Length of one tick in µs, for display.
    #[arg(short = 't', long = "time-base-us")]
    time_base_us: Option<u64>,

    /// Maximum number of jobs to generate.
    #[arg(short = 'j', long = "job-limit")]
    job_limit: Option<u64>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        workload = %cli.workload.display(),
        horizon = ?cli.horizon,
        parent_rule = ?cli.parent_rule,
        overlap_rule = ?cli.overlap_rule,
        time_base_us = ?cli.time_base_us,
        job_limit = ?cli.job_limit,
        "Configuration"
    );

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut workload = WorkloadConfig::load_from_file(&cli.workload)?;

    // ── Command-line overrides ────────────────────────────────────────────────
    let config = workload.analysis_config_mut();
    if let Some(ticks) = cli.horizon {
        config.horizon = Horizon::Fixed(ticks);
    }
    if let Some(rule) = cli.parent_rule {
        config.parent_rule = rule;
    }
    if let Some(rule) = cli.overlap_rule {
        config.overlap_rule = rule;
    }
    if let Some(base) = cli.time_base_us {
        anyhow::ensure!(base > 0, "--time-base-us must be positive");
        config.time_base_us = base;
    }
    if let Some(limit) = cli.job_limit {
        config.job_limit = limit;
    }

    let tasks = workload.task_set().context("Invalid task set")?;
    let snapshot = run_analysis(&tasks, workload.declarations(), workload.analysis_config())?;
    let base = snapshot.time_base_us();

    // ── Report ────────────────────────────────────────────────────────────────
    println!("Tasks:");
    for task in tasks.by_priority() {
        println!("  {task}");
    }

    match snapshot.hyperperiod() {
        Some(h) => println!("\nHyperperiod: {h} ticks, horizon: {}", snapshot.horizon()),
        None => println!("\nHyperperiod: overflow, horizon: {}", snapshot.horizon()),
    }

    println!("\nJobs:");
    for job in snapshot.jobs().iter() {
        println!("  {}", job.display_with(base));
    }

    println!("\nJob-level dependencies:");
    for jld in snapshot.jlds() {
        println!("  {jld}");
    }

    if !snapshot.warnings().is_empty() {
        println!("\nWarnings:");
        for w in snapshot.warnings() {
            println!("  {w}");
        }
    }

    let forest = snapshot.tree()?;
    println!("\nDependency forest ({:?}):", forest.rule());
    print!("{forest}");

    Ok(())
}
