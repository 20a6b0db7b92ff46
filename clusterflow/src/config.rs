//! Deployment configuration.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`DeploymentConfig::inventory_path`].
pub const ENV_INVENTORY: &str = "CLUSTERFLOW_INVENTORY";
/// Environment variable overriding [`DeploymentConfig::playbooks_dir`].
pub const ENV_PLAYBOOKS_DIR: &str = "CLUSTERFLOW_PLAYBOOKS_DIR";
/// Environment variable overriding [`DeploymentConfig::timeout_minutes`].
pub const ENV_TIMEOUT_MINUTES: &str = "CLUSTERFLOW_TIMEOUT_MINUTES";
/// Environment variable overriding [`DeploymentConfig::auto_start`].
pub const ENV_AUTO_START: &str = "CLUSTERFLOW_AUTO_START";

/// Configuration for one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Path to the Ansible inventory file.
    #[serde(default = "default_inventory_path")]
    pub inventory_path: PathBuf,
    /// Directory containing the playbooks; also the working directory.
    #[serde(default = "default_playbooks_dir")]
    pub playbooks_dir: PathBuf,
    /// Per-stage timeout in minutes.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    /// Start as soon as the actors are up instead of waiting for a trigger.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
    /// Where collected diagnostics are written on failure.
    #[serde(default = "default_diagnostics_path")]
    pub diagnostics_path: PathBuf,
    /// Restricts the standard catalogue to these stage ids, in this order.
    #[serde(default)]
    pub stages: Option<Vec<String>>,
    /// Extra environment variables passed to every stage.
    #[serde(default)]
    pub extra_env: BTreeMap<String, String>,
}

fn default_inventory_path() -> PathBuf {
    PathBuf::from("inventory.ini")
}

fn default_playbooks_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_timeout_minutes() -> u64 {
    30
}

fn default_auto_start() -> bool {
    true
}

fn default_diagnostics_path() -> PathBuf {
    PathBuf::from("diagnostic-logs.txt")
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            inventory_path: default_inventory_path(),
            playbooks_dir: default_playbooks_dir(),
            timeout_minutes: default_timeout_minutes(),
            auto_start: default_auto_start(),
            diagnostics_path: default_diagnostics_path(),
            stages: None,
            extra_env: BTreeMap::new(),
        }
    }
}

impl DeploymentConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `CLUSTERFLOW_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean override does not parse.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Applies overrides from an arbitrary lookup; used by
    /// [`apply_env_overrides`](Self::apply_env_overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean override does not parse.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_INVENTORY) {
            self.inventory_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_PLAYBOOKS_DIR) {
            self.playbooks_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MINUTES) {
            self.timeout_minutes = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_TIMEOUT_MINUTES.to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_AUTO_START) {
            self.auto_start = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: ENV_AUTO_START.to_string(),
                        value,
                    })
                }
            };
        }
        Ok(self)
    }

    /// Sets the inventory path.
    #[must_use]
    pub fn with_inventory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory_path = path.into();
        self
    }

    /// Sets the playbooks directory.
    #[must_use]
    pub fn with_playbooks_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.playbooks_dir = dir.into();
        self
    }

    /// Sets the per-stage timeout.
    #[must_use]
    pub fn with_timeout_minutes(mut self, minutes: u64) -> Self {
        self.timeout_minutes = minutes;
        self
    }

    /// Restricts the plan to the given stage ids.
    #[must_use]
    pub fn with_stages(mut self, stages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stages = Some(stages.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the diagnostics output path.
    #[must_use]
    pub fn with_diagnostics_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.diagnostics_path = path.into();
        self
    }

    /// Returns the per-stage timeout as a duration.
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes.saturating_mul(60))
    }

    /// Checks that the inventory, playbooks directory and every named
    /// playbook exist, and that the timeout is positive.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate<'a>(&self, playbooks: impl IntoIterator<Item = &'a str>) -> Result<(), ConfigError> {
        if self.timeout_minutes == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if !self.inventory_path.is_file() {
            return Err(ConfigError::MissingPath {
                what: "Inventory file",
                path: self.inventory_path.clone(),
            });
        }
        if !self.playbooks_dir.is_dir() {
            return Err(ConfigError::MissingPath {
                what: "Working directory",
                path: self.playbooks_dir.clone(),
            });
        }
        for playbook in playbooks {
            let path = self.playbooks_dir.join(playbook);
            if !path.is_file() {
                return Err(ConfigError::MissingPath {
                    what: "Playbook",
                    path,
                });
            }
        }
        Ok(())
    }
}
