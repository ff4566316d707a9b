//! File-backed catalog: what has been registered for each repository.
//!
//! Persists a `CatalogFile` JSON document at
//! `<home>/.tracker/catalog/<repository_id>.json`.
//! Writes use an atomic `.tmp` + rename, like the repository list.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use tracker_core::paths;
use tracker_core::types::{Job, JobKind, PackageKey, RegisteredDigests, RepositoryId};

use crate::error::{io_err, SyncError};
use crate::source::CatalogLookup;
use crate::worker::JobHandler;

/// One registered package release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisteredPackage {
    pub name: String,
    pub version: String,
    pub digest: String,
    pub registered_at: DateTime<Utc>,
    /// Set when a register job asked for the package logo to be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_requested_at: Option<DateTime<Utc>>,
}

impl RegisteredPackage {
    pub fn key(&self) -> PackageKey {
        PackageKey::new(self.name.clone(), self.version.clone())
    }
}

/// On-disk catalog payload for one repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogFile {
    pub synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub packages: Vec<RegisteredPackage>,
}

impl CatalogFile {
    fn empty() -> Self {
        Self {
            synced_at: None,
            packages: Vec::new(),
        }
    }

    pub fn digests(&self) -> RegisteredDigests {
        self.packages
            .iter()
            .map(|p| (p.key(), p.digest.clone()))
            .collect()
    }
}

/// Load the catalog for `id`.
///
/// Returns an empty catalog if the file does not yet exist.
pub fn load_at(home: &Path, id: &RepositoryId) -> Result<CatalogFile, SyncError> {
    let path = paths::catalog_path(home, id);
    if !path.exists() {
        return Ok(CatalogFile::empty());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the catalog for `id` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, id: &RepositoryId, catalog: &CatalogFile) -> Result<(), SyncError> {
    let path = paths::catalog_path(home, id);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid catalog path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(catalog)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Delete the catalog for `id`. Returns whether a file existed.
pub fn remove_at(home: &Path, id: &RepositoryId) -> Result<bool, SyncError> {
    let path = paths::catalog_path(home, id);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err(&path, e)),
    }
}

#[derive(Debug)]
struct CachedCatalog {
    synced_at: Option<DateTime<Utc>>,
    packages: BTreeMap<PackageKey, RegisteredPackage>,
    dirty: bool,
}

impl From<CatalogFile> for CachedCatalog {
    fn from(file: CatalogFile) -> Self {
        Self {
            synced_at: file.synced_at,
            packages: file.packages.into_iter().map(|p| (p.key(), p)).collect(),
            dirty: false,
        }
    }
}

/// Catalog store shared by the generators (read side) and the workers
/// (write side) of a run.
///
/// Jobs are applied in memory; [`FileCatalog::flush`] persists every
/// repository that changed.
#[derive(Debug)]
pub struct FileCatalog {
    home: PathBuf,
    cache: Mutex<HashMap<RepositoryId, CachedCatalog>>,
}

impl FileCatalog {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn read_file(&self, id: &RepositoryId) -> Result<CatalogFile, SyncError> {
        let home = self.home.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || load_at(&home, &id))
            .await
            .map_err(|err| SyncError::Join(err.to_string()))?
    }

    /// Record the effect of one job.
    pub async fn apply(&self, job: &Job) -> Result<(), SyncError> {
        let id = &job.repository.id;
        let loaded = if self.cache.lock().await.contains_key(id) {
            None
        } else {
            Some(self.read_file(id).await?)
        };

        let mut cache = self.cache.lock().await;
        let entry = cache
            .entry(id.clone())
            .or_insert_with(|| CachedCatalog::from(loaded.unwrap_or_else(CatalogFile::empty)));
        let key = job.key();
        match job.kind {
            JobKind::Register => {
                let now = Utc::now();
                let previous_logo = entry
                    .packages
                    .get(&key)
                    .and_then(|p| p.logo_requested_at);
                entry.packages.insert(
                    key,
                    RegisteredPackage {
                        name: job.package.name.clone(),
                        version: job.package.version.clone(),
                        digest: job.package.digest.clone(),
                        registered_at: now,
                        logo_requested_at: if job.fetch_logo {
                            Some(now)
                        } else {
                            previous_logo
                        },
                    },
                );
            }
            JobKind::Unregister => {
                entry.packages.remove(&key);
            }
        }
        entry.dirty = true;
        Ok(())
    }

    /// Persist every repository touched since the last flush.
    ///
    /// Snapshots are taken under the cache lock and written on a blocking
    /// thread after it is released. On failure every snapshot is marked dirty
    /// again so the next flush retries it. Returns the number of catalog files
    /// written.
    pub async fn flush(&self) -> Result<usize, SyncError> {
        let now = Utc::now();
        let pending: Vec<(RepositoryId, CatalogFile)> = {
            let mut cache = self.cache.lock().await;
            cache
                .iter_mut()
                .filter(|(_, c)| c.dirty)
                .map(|(id, catalog)| {
                    catalog.synced_at = Some(now);
                    catalog.dirty = false;
                    let file = CatalogFile {
                        synced_at: catalog.synced_at,
                        packages: catalog.packages.values().cloned().collect(),
                    };
                    (id.clone(), file)
                })
                .collect()
        };
        if pending.is_empty() {
            return Ok(0);
        }

        let ids: Vec<RepositoryId> = pending.iter().map(|(id, _)| id.clone()).collect();
        let home = self.home.clone();
        let saved = tokio::task::spawn_blocking(move || {
            for (id, file) in &pending {
                save_at(&home, id, file)?;
                tracing::debug!(repository = %id, packages = file.packages.len(), "catalog saved");
            }
            Ok::<_, SyncError>(pending.len())
        })
        .await
        .map_err(|err| SyncError::Join(err.to_string()))
        .and_then(|saved| saved);

        if saved.is_err() {
            let mut cache = self.cache.lock().await;
            for id in &ids {
                if let Some(catalog) = cache.get_mut(id) {
                    catalog.dirty = true;
                }
            }
        }
        saved
    }
}

#[async_trait]
impl CatalogLookup for FileCatalog {
    async fn registered_digests(
        &self,
        repository: &RepositoryId,
    ) -> Result<RegisteredDigests, SyncError> {
        if let Some(cached) = self.cache.lock().await.get(repository) {
            return Ok(cached
                .packages
                .iter()
                .map(|(key, p)| (key.clone(), p.digest.clone()))
                .collect());
        }
        Ok(self.read_file(repository).await?.digests())
    }
}

#[async_trait]
impl JobHandler for FileCatalog {
    async fn handle(&self, job: &Job) -> Result<(), SyncError> {
        self.apply(job).await
    }
}
