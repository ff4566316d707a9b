//! Tracker configuration, read from `<home>/.tracker/config.yaml`.
//!
//! Every field has a default, so a missing file or a partial document is
//! valid. CLI flags override individual values after loading.

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Runtime settings for a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Repository admissions per second.
    #[serde(default = "default_admission_rate")]
    pub admission_rate: u32,

    /// Admissions allowed back to back before the rate applies.
    #[serde(default = "default_admission_burst")]
    pub admission_burst: u32,

    /// Number of workers draining the job queue.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the job queue between generators and workers.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Timeout for fetching a remote index.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

const fn default_admission_rate() -> u32 {
    25
}

const fn default_admission_burst() -> u32 {
    25
}

const fn default_workers() -> usize {
    4
}

const fn default_queue_capacity() -> usize {
    1
}

const fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            admission_rate: default_admission_rate(),
            admission_burst: default_admission_burst(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl TrackerConfig {
    /// Load the config under `home`, falling back to defaults when absent.
    pub fn load_at(home: &Path) -> Result<Self, ConfigError> {
        let path = paths::config_path(home);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// `load_at` convenience wrapper.
    pub fn load() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Self::load_at(&home)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admission_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "admission_rate",
            });
        }
        if self.admission_burst == 0 {
            return Err(ConfigError::Invalid {
                field: "admission_burst",
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid { field: "workers" });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "queue_capacity",
            });
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "http_timeout_secs",
            });
        }
        Ok(())
    }

    pub fn rate(&self) -> NonZeroU32 {
        NonZeroU32::new(self.admission_rate).unwrap_or(NonZeroU32::MIN)
    }

    pub fn burst(&self) -> NonZeroU32 {
        NonZeroU32::new(self.admission_burst).unwrap_or(NonZeroU32::MIN)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_file_missing() {
        let home = TempDir::new().unwrap();
        let config = TrackerConfig::load_at(home.path()).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.admission_rate, 25);
        assert_eq!(config.admission_burst, 25);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let home = TempDir::new().unwrap();
        let path = paths::config_path(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "workers: 8\nadmission_rate: 5\n").unwrap();

        let config = TrackerConfig::load_at(home.path()).unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.admission_rate, 5);
        assert_eq!(config.admission_burst, 25);
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn zero_values_are_rejected() {
        let home = TempDir::new().unwrap();
        let path = paths::config_path(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "admission_burst: 0\n").unwrap();

        let err = TrackerConfig::load_at(home.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "admission_burst"
            }
        ));

        std::fs::write(&path, "http_timeout_secs: 0\n").unwrap();
        let err = TrackerConfig::load_at(home.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "http_timeout_secs"
            }
        ));
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let home = TempDir::new().unwrap();
        let path = paths::config_path(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "workers: [unclosed").unwrap();

        let err = TrackerConfig::load_at(home.path()).unwrap_err();
        assert!(err.to_string().contains("config.yaml"), "got: {err}");
    }
}
