//! # tracker-sync
//!
//! Rate-limited reconciliation of chart repositories against the catalog.
//!
//! A run admits repositories through an [`AdmissionGate`], spawns one
//! [`SyncJobGenerator`] per repository, and streams the resulting [`Job`]s to
//! a [`WorkerPool`]. Call [`pipeline::run`] for the whole thing.
//!
//! [`Job`]: tracker_core::types::Job

pub mod catalog;
pub mod collector;
pub mod dispatcher;
pub mod error;
pub mod generator;
pub mod index;
pub mod limiter;
pub mod pipeline;
pub mod source;
pub mod worker;

#[cfg(test)]
mod testing;

pub use catalog::FileCatalog;
pub use collector::{ErrorCollector, FailureKind, RepositoryFailure};
pub use dispatcher::{DispatchPhase, DispatchReport, Dispatcher};
pub use error::SyncError;
pub use generator::{GeneratorOutcome, GeneratorStatus, SyncJobGenerator};
pub use index::ManifestIndexLoader;
pub use limiter::AdmissionGate;
pub use pipeline::{RunReport, RunScope};
pub use source::{CatalogLookup, IndexLoader};
pub use worker::{DryRunHandler, JobHandler, WorkerPool, WorkerReport};
