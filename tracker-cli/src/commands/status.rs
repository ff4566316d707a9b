//! `chart-tracker status`: tracked repositories and catalog state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tracker_core::{registry, types::RepositoryDescriptor};
use tracker_sync::catalog;

/// Arguments for `chart-tracker status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let list = registry::load_at(&home).context("failed to load repository list")?;
        let rows = list
            .repositories
            .iter()
            .map(|repo| repository_status(&home, repo))
            .collect::<Result<Vec<_>>>()?;

        if self.json {
            return print_json(rows);
        }
        print_table(rows);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
struct RepositoryStatus {
    name: String,
    id: String,
    kind: String,
    url: String,
    packages: usize,
    logos_requested: usize,
    last_sync_at: Option<DateTime<Utc>>,
    last_sync_age: String,
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    repositories: Vec<RepositoryStatus>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    repositories: usize,
    packages: usize,
    never_synced: usize,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "repository")]
    name: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "packages")]
    packages: usize,
    #[tabled(rename = "last sync")]
    last_sync: String,
    #[tabled(rename = "url")]
    url: String,
}

fn repository_status(home: &Path, repo: &RepositoryDescriptor) -> Result<RepositoryStatus> {
    let file = catalog::load_at(home, &repo.id)
        .with_context(|| format!("failed to load catalog for '{}'", repo.name))?;
    Ok(RepositoryStatus {
        name: repo.name.clone(),
        id: repo.id.to_string(),
        kind: repo.kind.to_string(),
        url: repo.url.clone(),
        packages: file.packages.len(),
        logos_requested: file
            .packages
            .iter()
            .filter(|p| p.logo_requested_at.is_some())
            .count(),
        last_sync_at: file.synced_at,
        last_sync_age: file
            .synced_at
            .map(format_age)
            .unwrap_or_else(|| "never".to_string()),
    })
}

fn print_json(rows: Vec<RepositoryStatus>) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            repositories: rows.len(),
            packages: rows.iter().map(|r| r.packages).sum(),
            never_synced: rows.iter().filter(|r| r.last_sync_at.is_none()).count(),
        },
        repositories: rows,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(rows: Vec<RepositoryStatus>) {
    let packages: usize = rows.iter().map(|r| r.packages).sum();
    println!(
        "chart-tracker v{} | {} repositories | {} packages",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        packages,
    );

    if rows.is_empty() {
        println!("No repositories registered.");
        return;
    }

    let never_synced = rows.iter().filter(|r| r.last_sync_at.is_none()).count();
    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            name: row.name,
            kind: row.kind,
            packages: row.packages,
            last_sync: row.last_sync_age,
            url: row.url,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if never_synced > 0 {
        println!(
            "{} {never_synced} never synced. Run 'chart-tracker run' to populate the catalog.",
            "■".yellow().bold()
        );
    }
}

fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    if seconds < 60 * 60 {
        return format!("{}m ago", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h ago", seconds / (60 * 60));
    }
    format!("{}d ago", seconds / (60 * 60 * 24))
}
