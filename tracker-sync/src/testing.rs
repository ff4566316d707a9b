//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use tracker_core::types::{
    Index, PackageVersion, RegisteredDigests, RepositoryDescriptor, RepositoryId, RepositoryKind,
};

use crate::error::SyncError;
use crate::source::{CatalogLookup, IndexLoader};

pub fn repository(id: &str) -> Arc<RepositoryDescriptor> {
    Arc::new(RepositoryDescriptor {
        id: RepositoryId::from(id),
        name: format!("repo-{id}"),
        url: format!("/srv/charts/{id}"),
        kind: RepositoryKind::Helm,
        created_at: Utc::now(),
    })
}

pub fn version(name: &str, version: &str, digest: &str) -> PackageVersion {
    PackageVersion {
        digest: digest.to_string(),
        ..PackageVersion::bare(name, version)
    }
}

pub fn index(entries: &[(&str, Vec<PackageVersion>)]) -> Index {
    Index {
        api_version: "v1".to_string(),
        entries: entries
            .iter()
            .map(|(name, versions)| (name.to_string(), versions.clone()))
            .collect(),
        generated: None,
    }
}

/// Serves fixed indexes (or failures) keyed by repository id.
#[derive(Default)]
pub struct StaticLoader {
    indexes: HashMap<RepositoryId, Result<Index, String>>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, repository: &RepositoryDescriptor, index: Index) -> Self {
        self.indexes.insert(repository.id.clone(), Ok(index));
        self
    }

    pub fn with_failure(mut self, repository: &RepositoryDescriptor, message: &str) -> Self {
        self.indexes
            .insert(repository.id.clone(), Err(message.to_string()));
        self
    }

    /// Sleep this long inside every `load`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl IndexLoader for StaticLoader {
    async fn load(&self, repository: &RepositoryDescriptor) -> Result<Index, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.indexes.get(&repository.id) {
            Some(Ok(index)) => Ok(index.clone()),
            Some(Err(message)) => Err(SyncError::Http {
                url: repository.url.clone(),
                message: message.clone(),
            }),
            None => Ok(Index::default()),
        }
    }
}

/// Serves fixed digest snapshots; unknown repositories have nothing registered.
#[derive(Default)]
pub struct MemoryCatalog {
    digests: HashMap<RepositoryId, RegisteredDigests>,
    failing: Vec<RepositoryId>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, repository: &RepositoryDescriptor, digests: RegisteredDigests) -> Self {
        self.digests.insert(repository.id.clone(), digests);
        self
    }

    pub fn with_failure(mut self, repository: &RepositoryDescriptor) -> Self {
        self.failing.push(repository.id.clone());
        self
    }
}

#[async_trait]
impl CatalogLookup for MemoryCatalog {
    async fn registered_digests(
        &self,
        repository: &RepositoryId,
    ) -> Result<RegisteredDigests, SyncError> {
        if self.failing.contains(repository) {
            return Err(SyncError::Io {
                path: format!("catalog/{repository}.json").into(),
                source: std::io::Error::other("catalog unavailable"),
            });
        }
        Ok(self.digests.get(repository).cloned().unwrap_or_default())
    }
}
