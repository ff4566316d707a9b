//! Collaborators the dispatcher reads from.

use async_trait::async_trait;

use tracker_core::types::{Index, RegisteredDigests, RepositoryDescriptor, RepositoryId};

use crate::error::SyncError;

/// Fetches and parses a repository's current manifest.
///
/// Called concurrently for different repositories.
#[async_trait]
pub trait IndexLoader: Send + Sync {
    async fn load(&self, repository: &RepositoryDescriptor) -> Result<Index, SyncError>;
}

/// Read-only view of what the catalog has registered for a repository.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn registered_digests(
        &self,
        repository: &RepositoryId,
    ) -> Result<RegisteredDigests, SyncError>;
}
