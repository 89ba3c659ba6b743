//! Project configuration loading and discovery
//!
//! Handles parsing of `.teamlog.toml` files. The directory holding the file
//! is the project root; the shared storage folder is resolved relative to it.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::StoragePathProvider;

/// File name of the project configuration
pub const CONFIG_FILE: &str = ".teamlog.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Display name of the project
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Planned working hours per day for the project, `0..=24`. Recorded by
    /// `teamlog init`; reports do not cap elapsed time with it.
    #[serde(default = "default_max_hours_per_day")]
    pub max_hours_per_day: u32,

    /// Planned start, `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_start: Option<NaiveDate>,

    /// Planned end, `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_end: Option<NaiveDate>,

    /// Shared storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            max_hours_per_day: default_max_hours_per_day(),
            project_start: None,
            project_end: None,
            storage: StorageConfig::default(),
        }
    }
}

fn default_max_hours_per_day() -> u32 {
    8
}

/// Storage-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Folder holding the per-developer logs. Relative paths are resolved
    /// against the project root.
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String {
    "timework".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            folder: default_folder(),
        }
    }
}

impl Config {
    /// Configuration for a new project called `name`
    pub fn named(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from a `.teamlog.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig("name cannot be empty".to_string()));
        }
        if self.storage.folder.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "storage.folder cannot be empty".to_string(),
            ));
        }
        if self.max_hours_per_day > 24 {
            return Err(Error::InvalidConfig(format!(
                "max_hours_per_day must be <= 24 (got {})",
                self.max_hours_per_day
            )));
        }
        if let (Some(start), Some(end)) = (self.project_start, self.project_end) {
            if end < start {
                return Err(Error::InvalidConfig(format!(
                    "project_end {end} is before project_start {start}"
                )));
            }
        }
        Ok(())
    }
}

/// A discovered project: its root directory and configuration.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
}

impl Project {
    /// Locate the project containing `start` (or the working directory).
    ///
    /// `start` may point at the config file itself or at any directory below
    /// the project root.
    pub fn discover(start: Option<&Path>) -> Result<Self> {
        let start = match start {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let config_path = find_config(&start).ok_or_else(|| Error::ProjectNotFound(start.clone()))?;
        Self::load(&config_path)
    }

    /// Load the project whose configuration lives at `config_path`
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)?;
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tracing::debug!(root = %root.display(), name = %config.name, "loaded project");
        Ok(Self { root, config })
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Absolute storage folder for this project
    pub fn storage_path(&self) -> PathBuf {
        let folder = Path::new(self.config.storage.folder.trim());
        if folder.is_absolute() {
            folder.to_path_buf()
        } else {
            self.root.join(folder)
        }
    }
}

impl StoragePathProvider for Project {
    fn storage_dir(&self) -> Result<PathBuf> {
        Ok(self.storage_path())
    }
}

/// Walk up from `start` looking for `.teamlog.toml`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    if start.is_file() {
        return Some(start.to_path_buf());
    }
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
