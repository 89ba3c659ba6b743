//! Developer identity management.
//!
//! Developer resolution order:
//! 1) CLI --developer (explicit)
//! 2) TEAMLOG_DEVELOPER environment variable
//! 3) Persisted profile in `developer.toml`
//!
//! The profile lives in the platform config directory, or in `TEAMLOG_HOME`
//! when that variable is set.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const PROFILE_FILENAME: &str = "developer.toml";

/// Environment variable naming the current developer
pub const DEVELOPER_ENV: &str = "TEAMLOG_DEVELOPER";

/// Environment variable overriding the profile directory
pub const HOME_ENV: &str = "TEAMLOG_HOME";

/// Supplies the identity of whoever is running the command.
pub trait DeveloperIdentity {
    fn current_developer(&self) -> String;
}

impl DeveloperIdentity for String {
    fn current_developer(&self) -> String {
        self.clone()
    }
}

impl DeveloperIdentity for &str {
    fn current_developer(&self) -> String {
        (*self).to_string()
    }
}

/// Per-machine developer profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperProfile {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default = "default_hours_per_day")]
    pub hours_per_day: u32,
}

fn default_hours_per_day() -> u32 {
    8
}

impl DeveloperProfile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: None,
            hours_per_day: default_hours_per_day(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "developer name cannot be empty".to_string(),
            ));
        }
        if self.hours_per_day > 24 {
            return Err(Error::InvalidArgument(format!(
                "hours per day must be <= 24 (got {})",
                self.hours_per_day
            )));
        }
        Ok(())
    }

    /// Load the profile stored in `dir`, if present.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = profile_path(dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let profile: DeveloperProfile = toml::from_str(&content)?;
        if profile.name.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(profile))
    }

    /// Persist the profile into `dir`, returning the file written.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        self.validate()?;
        std::fs::create_dir_all(dir)?;
        let path = profile_path(dir);
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

/// Directory holding `developer.toml`.
pub fn profile_dir() -> Result<PathBuf> {
    if let Some(home) = non_empty(std::env::var(HOME_ENV).ok().as_deref()) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("", "", "teamlog")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            Error::OperationFailed("could not determine a home directory".to_string())
        })
}

pub fn profile_path(dir: &Path) -> PathBuf {
    dir.join(PROFILE_FILENAME)
}

/// Where the resolved developer identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    Flag,
    Environment,
    Profile,
}

/// A developer identity resolved from flag, environment or profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeveloper {
    pub name: String,
    pub source: IdentitySource,
    pub profile: Option<DeveloperProfile>,
}

impl ResolvedDeveloper {
    /// Resolve using the CLI value, the environment and the profile in `dir`.
    pub fn resolve(cli_developer: Option<&str>, dir: Option<&Path>) -> Result<Self> {
        let profile = match dir {
            Some(dir) => DeveloperProfile::load(dir)?,
            None => None,
        };

        if let Some(name) = non_empty(cli_developer) {
            return Ok(Self {
                name: name.to_string(),
                source: IdentitySource::Flag,
                profile,
            });
        }

        if let Ok(env_developer) = std::env::var(DEVELOPER_ENV) {
            if let Some(name) = non_empty(Some(env_developer.as_str())) {
                return Ok(Self {
                    name: name.to_string(),
                    source: IdentitySource::Environment,
                    profile,
                });
            }
        }

        match profile {
            Some(profile) => Ok(Self {
                name: profile.name.trim().to_string(),
                source: IdentitySource::Profile,
                profile: Some(profile),
            }),
            None => Err(Error::DeveloperNotConfigured),
        }
    }
}

impl DeveloperIdentity for ResolvedDeveloper {
    fn current_developer(&self) -> String {
        self.name.clone()
    }
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut profile = DeveloperProfile::new(" Alice ");
        profile.email = Some("alice@example.com".to_string());
        profile.hours_per_day = 6;
        let path = profile.save(dir.path()).expect("save");
        assert_eq!(path, dir.path().join("developer.toml"));

        let loaded = DeveloperProfile::load(dir.path()).expect("load");
        assert_eq!(loaded, Some(profile));
    }

    #[test]
    fn missing_profile_loads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(DeveloperProfile::load(dir.path()).expect("load"), None);
    }

    #[test]
    fn invalid_profile_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut profile = DeveloperProfile::new("alice");
        profile.hours_per_day = 30;
        assert!(matches!(
            profile.save(dir.path()),
            Err(Error::InvalidArgument(_))
        ));
        assert!(DeveloperProfile::new("  ").validate().is_err());
    }

    #[test]
    fn flag_wins_over_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        DeveloperProfile::new("alice").save(dir.path()).expect("save");

        let resolved = ResolvedDeveloper::resolve(Some(" bob "), Some(dir.path())).expect("resolve");
        assert_eq!(resolved.name, "bob");
        assert_eq!(resolved.source, IdentitySource::Flag);
        assert_eq!(resolved.current_developer(), "bob");
        assert_eq!(resolved.profile.map(|p| p.name), Some("alice".to_string()));
    }

    #[test]
    fn profile_is_last_resort() {
        let dir = tempfile::tempdir().expect("tempdir");
        if std::env::var(DEVELOPER_ENV).is_ok() {
            return;
        }
        assert!(matches!(
            ResolvedDeveloper::resolve(None, Some(dir.path())),
            Err(Error::DeveloperNotConfigured)
        ));

        DeveloperProfile::new("alice").save(dir.path()).expect("save");
        let resolved = ResolvedDeveloper::resolve(Some("  "), Some(dir.path())).expect("resolve");
        assert_eq!(resolved.name, "alice");
        assert_eq!(resolved.source, IdentitySource::Profile);
    }
}
