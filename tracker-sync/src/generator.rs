//! Per-repository sync-job generation.
//!
//! A generator loads one repository's index, reads what the catalog has on
//! record for it, and emits:
//!
//! 1. `Register` for every index entry whose digest differs from the recorded
//!    one (or that is not recorded at all), in index order;
//! 2. `Unregister` for every recorded release missing from the index, in key
//!    order.
//!
//! Cancellation is observed before every item and raced against every
//! suspension point. Jobs already sent stay valid.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tracker_core::types::{Job, PackageKey, RepositoryDescriptor, RepositoryId};

use crate::collector::{ErrorCollector, FailureKind};
use crate::error::SyncError;
use crate::source::{CatalogLookup, IndexLoader};

/// How a generator run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorStatus {
    Completed,
    LoadFailed,
    LookupFailed,
    Cancelled,
}

/// Per-repository result of one generator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorOutcome {
    pub repository_id: RepositoryId,
    pub repository_name: String,
    pub status: GeneratorStatus,
    pub registered: usize,
    pub unregistered: usize,
}

impl GeneratorOutcome {
    fn new(repository: &RepositoryDescriptor) -> Self {
        Self {
            repository_id: repository.id.clone(),
            repository_name: repository.name.clone(),
            status: GeneratorStatus::Completed,
            registered: 0,
            unregistered: 0,
        }
    }

    fn finish(mut self, status: GeneratorStatus) -> Self {
        self.status = status;
        self
    }

    pub fn jobs(&self) -> usize {
        self.registered + self.unregistered
    }
}

/// Everything a generator task needs. Cheap to clone: one clone per task.
///
/// Each clone holds a queue sender; the queue closes once the last clone is
/// dropped.
#[derive(Clone)]
pub struct SyncJobGenerator {
    loader: Arc<dyn IndexLoader>,
    catalog: Arc<dyn CatalogLookup>,
    errors: ErrorCollector,
    queue: mpsc::Sender<Job>,
    cancel: CancellationToken,
}

impl SyncJobGenerator {
    pub fn new(
        loader: Arc<dyn IndexLoader>,
        catalog: Arc<dyn CatalogLookup>,
        errors: ErrorCollector,
        queue: mpsc::Sender<Job>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            loader,
            catalog,
            errors,
            queue,
            cancel,
        }
    }

    /// Generate the jobs needed to bring `repository` in sync.
    pub async fn run(&self, repository: Arc<RepositoryDescriptor>) -> GeneratorOutcome {
        let mut outcome = GeneratorOutcome::new(&repository);

        tracing::info!(repo = %repository.name, "loading repository index file");
        let loaded = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return outcome.finish(GeneratorStatus::Cancelled),
            loaded = self.loader.load(&repository) => loaded,
        };
        let index = match loaded {
            Ok(index) => index,
            Err(err) => {
                tracing::error!(repo = %repository.name, error = %err, "error loading repository index file");
                self.errors.append(&repository, FailureKind::LoadIndex, &err);
                return outcome.finish(GeneratorStatus::LoadFailed);
            }
        };

        tracing::info!(repo = %repository.name, "loading registered packages digest");
        let looked_up = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return outcome.finish(GeneratorStatus::Cancelled),
            looked_up = self.catalog.registered_digests(&repository.id) => looked_up,
        };
        let registered = match looked_up {
            Ok(registered) => registered,
            Err(err) => {
                tracing::error!(repo = %repository.name, error = %err, "error getting repository packages digest");
                self.errors.append(&repository, FailureKind::CatalogLookup, &err);
                return outcome.finish(GeneratorStatus::LookupFailed);
            }
        };

        // Register new or updated releases
        let mut available: HashSet<PackageKey> = HashSet::with_capacity(index.version_count());
        for (package, versions) in index.entries {
            for (i, mut version) in versions.into_iter().enumerate() {
                if self.cancel.is_cancelled() {
                    return outcome.finish(GeneratorStatus::Cancelled);
                }
                if version.name.is_empty() {
                    version.name = package.clone();
                }
                let key = version.key();
                let changed = registered.get(&key) != Some(&version.digest);
                available.insert(key);
                if !changed {
                    continue;
                }
                tracing::debug!(repo = %repository.name, package = %version.key(), "register");
                let job = Job::register(repository.clone(), version, i == 0);
                if let Err(err) = self.emit(job).await {
                    tracing::warn!(repo = %repository.name, error = %err, "stopping generator");
                    return outcome.finish(GeneratorStatus::Cancelled);
                }
                outcome.registered += 1;
            }
        }

        // Unregister releases no longer available in the repository
        for key in registered.into_keys() {
            if self.cancel.is_cancelled() {
                return outcome.finish(GeneratorStatus::Cancelled);
            }
            if available.contains(&key) {
                continue;
            }
            tracing::debug!(repo = %repository.name, package = %key, "unregister");
            if let Err(err) = self.emit(Job::unregister(repository.clone(), key)).await {
                tracing::warn!(repo = %repository.name, error = %err, "stopping generator");
                return outcome.finish(GeneratorStatus::Cancelled);
            }
            outcome.unregistered += 1;
        }

        tracing::info!(
            repo = %repository.name,
            registered = outcome.registered,
            unregistered = outcome.unregistered,
            "sync jobs generated",
        );
        outcome.finish(GeneratorStatus::Completed)
    }

    /// Send one job, unless the run is cancelled or the consumer is gone.
    async fn emit(&self, job: Job) -> Result<(), SyncError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            sent = self.queue.send(job) => sent.map_err(|_| SyncError::ChannelClosed("job queue")),
        }
    }
}
