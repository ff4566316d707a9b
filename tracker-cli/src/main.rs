//! Chart tracker: keeps a package catalog in sync with chart repositories.
//!
//! # Usage
//!
//! ```text
//! chart-tracker run [--repo <name>] [--dry-run] [--workers N] [--rate N] [--burst N]
//! chart-tracker repo add <name> <url> [--kind helm|falco|opa]
//! chart-tracker repo list
//! chart-tracker repo remove <name>
//! chart-tracker status [--json]
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{repo::RepoCommand, run::RunArgs, status::StatusArgs};
use tracker_core::types::RepositoryKind;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "chart-tracker",
    version,
    about = "Track chart repositories and keep the package catalog in sync",
    long_about = None,
)]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile registered repositories against the catalog.
    Run(RunArgs),

    /// Manage the list of tracked repositories.
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Show tracked repositories and their catalog state.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Shared RepositoryKind argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `RepositoryKind` from CLI args.
#[derive(Debug, Clone, Default)]
pub struct KindArg(pub RepositoryKind);

impl FromStr for KindArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "helm" => Ok(Self(RepositoryKind::Helm)),
            "falco" => Ok(Self(RepositoryKind::Falco)),
            "opa" => Ok(Self(RepositoryKind::Opa)),
            other => Err(format!(
                "unknown repository kind '{other}'; expected: helm, falco, opa"
            )),
        }
    }
}

impl fmt::Display for KindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<KindArg> for RepositoryKind {
    fn from(k: KindArg) -> Self {
        k.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Repo { command } => commands::repo::run(command),
        Commands::Status(args) => args.run(),
    }
}
