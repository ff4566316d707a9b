//! Shared run entrypoint used by the CLI.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tracker_core::config::TrackerConfig;
use tracker_core::registry;
use tracker_core::types::RepositoryDescriptor;

use crate::catalog::FileCatalog;
use crate::collector::{ErrorCollector, RepositoryFailure};
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::error::SyncError;
use crate::index::ManifestIndexLoader;
use crate::limiter::AdmissionGate;
use crate::source::IndexLoader;
use crate::worker::{DryRunHandler, JobHandler, WorkerPool, WorkerReport};

/// Which repositories a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    /// Every registered repository.
    All,
    /// A single repository, by name.
    Repository(String),
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dispatch: DispatchReport,
    pub workers: WorkerReport,
    /// Index load and catalog lookup failures, in the order they happened.
    /// Keep only [`LoadIndex`] entries to ignore lookup failures.
    ///
    /// [`LoadIndex`]: crate::collector::FailureKind::LoadIndex
    pub failures: Vec<RepositoryFailure>,
    /// Catalog files written at the end of the run.
    pub catalogs_written: usize,
}

/// Run one reconciliation over `scope`.
///
/// Fails only on setup problems (unreadable repository list, unknown
/// repository name) or when the catalog cannot be saved afterwards.
pub async fn run(
    home: &Path,
    config: &TrackerConfig,
    scope: RunScope,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<RunReport, SyncError> {
    let repositories = match scope {
        RunScope::All => registry::load_at(home)?.repositories,
        RunScope::Repository(name) => vec![registry::find_at(home, &name)?],
    };
    let loader = Arc::new(ManifestIndexLoader::new(config.http_timeout()));
    run_with(home, config, repositories, loader, dry_run, cancel).await
}

/// [`run`] with an explicit repository list and index loader.
pub async fn run_with(
    home: &Path,
    config: &TrackerConfig,
    repositories: Vec<RepositoryDescriptor>,
    loader: Arc<dyn IndexLoader>,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<RunReport, SyncError> {
    tracing::info!(
        repositories = repositories.len(),
        dry_run,
        rate = config.admission_rate,
        burst = config.admission_burst,
        workers = config.workers,
        "starting run",
    );

    let catalog = Arc::new(FileCatalog::new(home));
    let dispatcher = Dispatcher::new(
        loader,
        catalog.clone(),
        ErrorCollector::new(),
        AdmissionGate::new(config.rate(), config.burst()),
        cancel,
    );
    let handler: Arc<dyn JobHandler> = if dry_run {
        Arc::new(DryRunHandler)
    } else {
        catalog.clone()
    };
    let pool = WorkerPool::new(config.workers);

    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let (dispatch, workers) = tokio::join!(dispatcher.run(repositories, tx), pool.run(rx, handler));
    let workers = workers?;

    let catalogs_written = if dry_run { 0 } else { catalog.flush().await? };

    Ok(RunReport {
        dispatch,
        workers,
        failures: dispatcher.errors().snapshot(),
        catalogs_written,
    })
}
