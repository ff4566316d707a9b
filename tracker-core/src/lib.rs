//! Chart tracker core library: domain types, repository list, config, errors.
//!
//! - [`types`]: newtypes, index and job structs
//! - [`error`]: [`RegistryError`], [`ConfigError`]
//! - [`registry`]: load / save / add / remove tracked repositories
//! - [`config`]: [`TrackerConfig`]
//! - [`paths`]: on-disk layout under `~/.tracker/`

pub mod config;
pub mod error;
pub mod paths;
pub mod registry;
pub mod types;

pub use config::TrackerConfig;
pub use error::{ConfigError, RegistryError};
pub use types::{
    Index, Job, JobKind, PackageKey, PackageVersion, RegisteredDigests, RepositoryDescriptor,
    RepositoryId, RepositoryKind, RepositoryList,
};
