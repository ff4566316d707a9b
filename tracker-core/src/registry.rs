//! Tracked repository list.
//!
//! # Storage layout
//!
//! ```text
//! ~/.tracker/
//!   repositories.yaml   (mode 0600)
//!   config.yaml         (optional)
//!   catalog/<id>.json   (written by tracker-sync)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::RegistryError;
use crate::paths;
use crate::types::{RepositoryDescriptor, RepositoryId, RepositoryKind, RepositoryList};

const LIST_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.tracker/repositories.yaml`.
///
/// Returns an empty list if the file does not exist yet,
/// `RegistryError::Parse` (with path) if malformed YAML.
pub fn load_at(home: &Path) -> Result<RepositoryList, RegistryError> {
    let path = paths::repositories_path(home);
    if !path.exists() {
        return Ok(RepositoryList {
            version: LIST_VERSION,
            repositories: vec![],
        });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<RepositoryList, RegistryError> {
    load_at(&home()?)
}

/// Look up a repository by name.
pub fn find_at(home: &Path, name: &str) -> Result<RepositoryDescriptor, RegistryError> {
    load_at(home)?
        .repositories
        .into_iter()
        .find(|r| r.name == name)
        .ok_or_else(|| RegistryError::RepositoryNotFound {
            name: name.to_string(),
        })
}

// ---------------------------------------------------------------------------
// 2. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the repository list.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, list: &RepositoryList) -> Result<(), RegistryError> {
    let root = paths::tracker_root(home);
    if !root.exists() {
        std::fs::create_dir_all(&root)?;
        set_dir_permissions(&root)?;
    }
    let path = paths::repositories_path(home);
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(list)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(list: &RepositoryList) -> Result<(), RegistryError> {
    save_at(&home()?, list)
}

// ---------------------------------------------------------------------------
// 3. Add / remove
// ---------------------------------------------------------------------------

/// Register a new repository under a fresh id.
///
/// Names are unique; adding an existing name is an error.
pub fn add_at(
    home: &Path,
    name: &str,
    url: &str,
    kind: RepositoryKind,
) -> Result<RepositoryDescriptor, RegistryError> {
    let mut list = load_at(home)?;
    if list.repositories.iter().any(|r| r.name == name) {
        return Err(RegistryError::DuplicateRepository {
            name: name.to_string(),
        });
    }

    let repository = RepositoryDescriptor {
        id: RepositoryId::generate(),
        name: name.to_string(),
        url: url.trim_end_matches('/').to_string(),
        kind,
        created_at: Utc::now(),
    };
    list.version = LIST_VERSION;
    list.repositories.push(repository.clone());
    save_at(home, &list)?;
    Ok(repository)
}

/// `add_at` convenience wrapper.
pub fn add(name: &str, url: &str, kind: RepositoryKind) -> Result<RepositoryDescriptor, RegistryError> {
    add_at(&home()?, name, url, kind)
}

/// Remove a repository by name, returning the removed descriptor.
pub fn remove_at(home: &Path, name: &str) -> Result<RepositoryDescriptor, RegistryError> {
    let mut list = load_at(home)?;
    let Some(pos) = list.repositories.iter().position(|r| r.name == name) else {
        return Err(RegistryError::RepositoryNotFound {
            name: name.to_string(),
        });
    };
    let removed = list.repositories.remove(pos);
    save_at(home, &list)?;
    Ok(removed)
}

/// `remove_at` convenience wrapper.
pub fn remove(name: &str) -> Result<RepositoryDescriptor, RegistryError> {
    remove_at(&home()?, name)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    #[test]
    fn load_missing_list_is_empty() {
        let home = make_home();
        let list = load_at(home.path()).expect("load");
        assert!(list.repositories.is_empty());
    }

    #[test]
    fn add_then_find_roundtrip() {
        let home = make_home();
        let added = add_at(
            home.path(),
            "stable",
            "https://charts.example.com/",
            RepositoryKind::Helm,
        )
        .expect("add");
        assert_eq!(added.url, "https://charts.example.com");

        let found = find_at(home.path(), "stable").expect("find");
        assert_eq!(found, added);
    }

    #[test]
    fn ids_are_unique() {
        let home = make_home();
        let a = add_at(home.path(), "a", "/tmp/a", RepositoryKind::Helm).expect("add a");
        let b = add_at(home.path(), "b", "/tmp/b", RepositoryKind::Helm).expect("add b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let home = make_home();
        add_at(home.path(), "stable", "/tmp/stable", RepositoryKind::Helm).expect("add");
        let tmp = paths::repositories_path(home.path()).with_extension("yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn remove_missing_returns_not_found() {
        let home = make_home();
        let err = remove_at(home.path(), "ghost").unwrap_err();
        assert!(matches!(err, RegistryError::RepositoryNotFound { .. }));
    }

    #[test]
    fn list_file_has_owner_only_permissions() {
        let home = make_home();
        add_at(home.path(), "stable", "/tmp/stable", RepositoryKind::Helm).expect("add");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(paths::repositories_path(home.path()))
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(RegistryError::HomeNotFound.to_string().contains("home directory"));
    }
}
