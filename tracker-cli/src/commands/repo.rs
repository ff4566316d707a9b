//! `chart-tracker repo add|list|remove`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use tracker_core::registry;
use tracker_sync::catalog;

use super::super::KindArg;

/// Manage the list of tracked repositories.
#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Track a new repository.
    Add(AddArgs),

    /// List tracked repositories.
    List,

    /// Stop tracking a repository and drop its catalog.
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Repository name (e.g. "stable", "bitnami").
    pub name: String,

    /// Base URL (`https://…`, `file://…`) or local directory of the index.
    pub url: String,

    /// Repository kind: helm | falco | opa. Defaults to helm.
    #[arg(long = "kind", short = 'k', value_name = "KIND")]
    pub kind: Option<KindArg>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Name of the repository to remove.
    pub name: String,
}

pub fn run(cmd: RepoCommand) -> Result<()> {
    match cmd {
        RepoCommand::Add(args) => add(args),
        RepoCommand::List => list(),
        RepoCommand::Remove(args) => remove(args),
    }
}

fn add(args: AddArgs) -> Result<()> {
    let kind = args.kind.unwrap_or_default().into();
    let repo = registry::add(&args.name, &args.url, kind)
        .with_context(|| format!("failed to add repository '{}'", args.name))?;
    println!("✓ Added repository '{}' ({}) {}", repo.name, repo.kind, repo.url);
    Ok(())
}

fn list() -> Result<()> {
    let list = registry::load().context("failed to load repository list")?;
    if list.repositories.is_empty() {
        println!("No repositories registered.");
        println!("Run: chart-tracker repo add <name> <url>");
        return Ok(());
    }
    for repo in &list.repositories {
        println!("  {} [{}] {}", repo.name, repo.kind, repo.url);
    }
    Ok(())
}

fn remove(args: RemoveArgs) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let repo = registry::remove_at(&home, &args.name)
        .with_context(|| format!("failed to remove repository '{}'", args.name))?;
    let dropped = catalog::remove_at(&home, &repo.id)
        .with_context(|| format!("failed to delete catalog for '{}'", repo.name))?;
    if dropped {
        println!("✓ Removed repository '{}' and its catalog", repo.name);
    } else {
        println!("✓ Removed repository '{}'", repo.name);
    }
    Ok(())
}
