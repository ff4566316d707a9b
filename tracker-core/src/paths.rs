//! On-disk layout under `<home>/.tracker/`.

use std::path::{Path, PathBuf};

use crate::types::RepositoryId;

pub const REPOSITORIES_FILE: &str = "repositories.yaml";
pub const CONFIG_FILE: &str = "config.yaml";

pub fn tracker_root(home: &Path) -> PathBuf {
    home.join(".tracker")
}

pub fn repositories_path(home: &Path) -> PathBuf {
    tracker_root(home).join(REPOSITORIES_FILE)
}

pub fn config_path(home: &Path) -> PathBuf {
    tracker_root(home).join(CONFIG_FILE)
}

pub fn catalog_dir(home: &Path) -> PathBuf {
    tracker_root(home).join("catalog")
}

/// `<home>/.tracker/catalog/<repository_id>.json`
pub fn catalog_path(home: &Path, id: &RepositoryId) -> PathBuf {
    catalog_dir(home).join(format!("{}.json", id.0))
}
