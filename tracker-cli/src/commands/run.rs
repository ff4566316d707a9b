//! `chart-tracker run`: reconcile repositories against the catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use tracker_core::config::TrackerConfig;
use tracker_sync::{
    pipeline::{self, RunReport, RunScope},
    GeneratorOutcome, GeneratorStatus,
};

/// Arguments for `chart-tracker run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only reconcile the repository with this name.
    #[arg(long = "repo", value_name = "NAME")]
    pub repo: Option<String>,

    /// Compute jobs and log them without touching the catalog.
    #[arg(long)]
    pub dry_run: bool,

    /// Number of workers applying jobs (overrides config).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Repository admissions per second (overrides config).
    #[arg(long)]
    pub rate: Option<u32>,

    /// Admission burst size (overrides config).
    #[arg(long)]
    pub burst: Option<u32>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let mut config = TrackerConfig::load_at(&home).context("failed to load tracker config")?;
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(rate) = self.rate {
            config.admission_rate = rate;
        }
        if let Some(burst) = self.burst {
            config.admission_burst = burst;
        }
        config.validate().context("invalid run options")?;

        let scope = match self.repo.clone() {
            Some(name) => RunScope::Repository(name),
            None => RunScope::All,
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let cancel = CancellationToken::new();
        let report = runtime
            .block_on(async {
                let signal_handle = {
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            tracing::warn!("received ctrl-c, cancelling run");
                            cancel.cancel();
                        }
                    })
                };
                let result =
                    pipeline::run(&home, &config, scope.clone(), self.dry_run, cancel.clone()).await;
                signal_handle.abort();
                result
            })
            .with_context(|| match &scope {
                RunScope::All => "run failed".to_string(),
                RunScope::Repository(name) => format!("run failed for '{name}'"),
            })?;

        print_report(&report, &scope, self.dry_run);
        Ok(())
    }
}

fn print_report(report: &RunReport, scope: &RunScope, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    if report.dispatch.admitted == 0 && report.dispatch.skipped == 0 {
        if *scope == RunScope::All {
            println!("No repositories registered. Run `chart-tracker repo add <name> <url>` first.");
        }
        return;
    }

    for outcome in &report.dispatch.outcomes {
        print_outcome(prefix, outcome);
    }

    let workers = &report.workers;
    println!(
        "{prefix}{} repositories, {} jobs ({} registered, {} unregistered, {} logos, {} failed)",
        report.dispatch.admitted,
        report.dispatch.jobs(),
        workers.registered,
        workers.unregistered,
        workers.logos_requested,
        workers.failed,
    );
    if report.dispatch.skipped > 0 {
        println!(
            "{} run cancelled: {} repositories skipped",
            "!".yellow().bold(),
            report.dispatch.skipped
        );
    }

    if !report.failures.is_empty() {
        println!("Failures:");
        for failure in &report.failures {
            println!("  {} {failure}", "✗".red());
        }
    }
}

fn print_outcome(prefix: &str, outcome: &GeneratorOutcome) {
    let name = &outcome.repository_name;
    match outcome.status {
        GeneratorStatus::Completed if outcome.jobs() == 0 => {
            println!("{prefix}{} '{name}' — up to date", "✓".green());
        }
        GeneratorStatus::Completed => println!(
            "{prefix}{} '{name}' — {} register, {} unregister",
            "✓".green(),
            outcome.registered,
            outcome.unregistered
        ),
        GeneratorStatus::LoadFailed => {
            println!("{prefix}{} '{name}' — index could not be loaded", "✗".red())
        }
        GeneratorStatus::LookupFailed => {
            println!("{prefix}{} '{name}' — catalog could not be read", "✗".red())
        }
        GeneratorStatus::Cancelled => println!(
            "{prefix}{} '{name}' — cancelled after {} jobs",
            "…".yellow(),
            outcome.jobs()
        ),
    }
}
