//! Domain types for the chart tracker.
//!
//! A repository's [`Index`] is diffed against the catalog's
//! [`RegisteredDigests`] using [`PackageKey`] as the join key. The key is always
//! a structured `(name, version)` pair; its `name@version` rendering exists for
//! logs only.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a tracked repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(pub String);

impl RepositoryId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepositoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepositoryId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identity of one package release inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageKey {
    pub name: String,
    pub version: String,
}

impl PackageKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Kind of an external repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    #[default]
    Helm,
    Falco,
    Opa,
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryKind::Helm => write!(f, "helm"),
            RepositoryKind::Falco => write!(f, "falco"),
            RepositoryKind::Opa => write!(f, "opa"),
        }
    }
}

/// Whether a job adds/refreshes a release or removes it from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Register,
    Unregister,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Register => write!(f, "register"),
            JobKind::Unregister => write!(f, "unregister"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// An external package repository tracked by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub id: RepositoryId,
    pub name: String,
    /// Base URL (`https://…`, `file://…`) or local directory of the repository.
    pub url: String,
    #[serde(default)]
    pub kind: RepositoryKind,
    pub created_at: DateTime<Utc>,
}

/// One version entry of a package as published in a repository index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersion {
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl PackageVersion {
    /// Entry carrying only a name and version (used for removals).
    pub fn bare(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> PackageKey {
        PackageKey::new(self.name.clone(), self.version.clone())
    }
}

/// Parsed repository manifest: package name to its version entries.
///
/// Version order inside each group is the manifest's own order (most recent
/// first for Helm indexes) and is never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<PackageVersion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<DateTime<Utc>>,
}

impl Index {
    /// Total number of version entries across all packages.
    pub fn version_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Snapshot of the digests the catalog holds for one repository.
pub type RegisteredDigests = BTreeMap<PackageKey, String>;

/// A unit of register/unregister work for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub kind: JobKind,
    pub repository: Arc<RepositoryDescriptor>,
    pub package: PackageVersion,
    pub fetch_logo: bool,
}

impl Job {
    pub fn register(
        repository: Arc<RepositoryDescriptor>,
        package: PackageVersion,
        fetch_logo: bool,
    ) -> Self {
        Self {
            kind: JobKind::Register,
            repository,
            package,
            fetch_logo,
        }
    }

    pub fn unregister(repository: Arc<RepositoryDescriptor>, key: PackageKey) -> Self {
        Self {
            kind: JobKind::Unregister,
            repository,
            package: PackageVersion::bare(key.name, key.version),
            fetch_logo: false,
        }
    }

    pub fn key(&self) -> PackageKey {
        self.package.key()
    }

    /// Content digest carried by the job, `None` for removals.
    pub fn digest(&self) -> Option<&str> {
        match self.kind {
            JobKind::Register if !self.package.digest.is_empty() => Some(&self.package.digest),
            _ => None,
        }
    }
}

/// Root of the repository list YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RepositoryList {
    pub version: u32,
    #[serde(default)]
    pub repositories: Vec<RepositoryDescriptor>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
