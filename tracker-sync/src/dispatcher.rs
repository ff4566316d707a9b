//! Reconciliation dispatcher.
//!
//! Admits repositories one at a time through the [`AdmissionGate`], spawns one
//! [`SyncJobGenerator`] task per admitted repository, waits for all of them,
//! and only then closes the job queue.
//!
//! ```text
//! Idle ──▶ Admitting ──▶ Draining ──▶ Closed
//!              │  (cancelled)  ▲
//!              └───────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use tracker_core::types::{Job, RepositoryDescriptor};

use crate::collector::ErrorCollector;
use crate::generator::{GeneratorOutcome, GeneratorStatus, SyncJobGenerator};
use crate::limiter::AdmissionGate;
use crate::source::{CatalogLookup, IndexLoader};

/// Lifecycle of one dispatcher run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPhase {
    Idle,
    Admitting,
    Draining,
    Closed,
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchPhase::Idle => write!(f, "idle"),
            DispatchPhase::Admitting => write!(f, "admitting"),
            DispatchPhase::Draining => write!(f, "draining"),
            DispatchPhase::Closed => write!(f, "closed"),
        }
    }
}

/// Summary of a finished dispatcher run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub phase: DispatchPhase,
    /// Repositories whose generator was started.
    pub admitted: usize,
    /// Repositories never started because the run was cancelled.
    pub skipped: usize,
    /// Generator tasks that panicked.
    pub panicked: usize,
    /// One entry per finished generator, in admission order.
    pub outcomes: Vec<GeneratorOutcome>,
}

impl DispatchReport {
    pub fn jobs(&self) -> usize {
        self.outcomes.iter().map(GeneratorOutcome::jobs).sum()
    }

    pub fn count(&self, status: GeneratorStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Drives one reconciliation run across many repositories.
pub struct Dispatcher {
    loader: Arc<dyn IndexLoader>,
    catalog: Arc<dyn CatalogLookup>,
    errors: ErrorCollector,
    gate: AdmissionGate,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        loader: Arc<dyn IndexLoader>,
        catalog: Arc<dyn CatalogLookup>,
        errors: ErrorCollector,
        gate: AdmissionGate,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            loader,
            catalog,
            errors,
            gate,
            cancel,
        }
    }

    /// Failures recorded by this dispatcher's generators.
    pub fn errors(&self) -> &ErrorCollector {
        &self.errors
    }

    /// Process `repositories` in order, writing jobs into `queue`.
    ///
    /// `queue` must be the only sender the caller hands out: the receiver sees
    /// the channel close exactly when this method drops it, after every
    /// admitted generator has finished. Never fails; per-repository problems
    /// end up in [`Self::errors`].
    pub async fn run(
        &self,
        repositories: Vec<RepositoryDescriptor>,
        queue: mpsc::Sender<Job>,
    ) -> DispatchReport {
        let total = repositories.len();
        let mut phase = DispatchPhase::Idle;
        let generator = SyncJobGenerator::new(
            self.loader.clone(),
            self.catalog.clone(),
            self.errors.clone(),
            queue,
            self.cancel.clone(),
        );

        advance(&mut phase, DispatchPhase::Admitting);
        let mut tasks = JoinSet::new();
        let mut admitted = 0usize;
        for repository in repositories {
            if let Err(err) = self.gate.admit(&self.cancel).await {
                tracing::warn!(
                    error = %err,
                    admitted,
                    skipped = total - admitted,
                    "stopped admitting repositories",
                );
                break;
            }
            let generator = generator.clone();
            let repository = Arc::new(repository);
            let position = admitted;
            tasks.spawn(async move { (position, generator.run(repository).await) });
            admitted += 1;
        }

        advance(&mut phase, DispatchPhase::Draining);
        let mut outcomes = Vec::with_capacity(admitted);
        let mut panicked = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(finished) => outcomes.push(finished),
                Err(err) => {
                    tracing::error!(error = %err, "sync job generator task failed");
                    panicked += 1;
                }
            }
        }
        outcomes.sort_by_key(|(position, _)| *position);

        // Last sender: dropping it closes the queue for the worker pool.
        drop(generator);
        advance(&mut phase, DispatchPhase::Closed);

        let report = DispatchReport {
            phase,
            admitted,
            skipped: total - admitted,
            panicked,
            outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        };
        tracing::info!(
            admitted = report.admitted,
            skipped = report.skipped,
            jobs = report.jobs(),
            failures = self.errors.len(),
            "dispatcher finished",
        );
        report
    }
}

fn advance(phase: &mut DispatchPhase, next: DispatchPhase) {
    tracing::debug!(from = %phase, to = %next, "dispatcher phase");
    *phase = next;
}
