//! Append-only, per-repository failure log shared by all generators of a run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use tracker_core::types::{RepositoryDescriptor, RepositoryId};

/// Which step of a repository's sync failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The repository index could not be fetched or parsed.
    LoadIndex,
    /// The catalog's registered digests could not be read.
    CatalogLookup,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::LoadIndex => write!(f, "error loading repository index file"),
            FailureKind::CatalogLookup => write!(f, "error getting repository packages digest"),
        }
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryFailure {
    pub repository_id: RepositoryId,
    pub repository_name: String,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for RepositoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.repository_name, self.kind, self.message)
    }
}

/// Cloneable handle; every clone appends to the same list.
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    inner: Arc<Mutex<Vec<RepositoryFailure>>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &self,
        repository: &RepositoryDescriptor,
        kind: FailureKind,
        err: &impl fmt::Display,
    ) {
        self.lock().push(RepositoryFailure {
            repository_id: repository.id.clone(),
            repository_name: repository.name.clone(),
            kind,
            message: err.to_string(),
        });
    }

    /// Copy of everything recorded so far, in append order.
    pub fn snapshot(&self) -> Vec<RepositoryFailure> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Failures grouped by repository id.
    pub fn by_repository(&self) -> BTreeMap<RepositoryId, Vec<RepositoryFailure>> {
        let mut grouped: BTreeMap<RepositoryId, Vec<RepositoryFailure>> = BTreeMap::new();
        for failure in self.lock().iter() {
            grouped
                .entry(failure.repository_id.clone())
                .or_default()
                .push(failure.clone());
        }
        grouped
    }

    // A panic while holding the lock cannot leave a half-pushed entry, so a
    // poisoned list is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<RepositoryFailure>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
