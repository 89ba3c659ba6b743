//! Storage layer for teamlog
//!
//! All state lives in one shared folder (often on a network share). Every
//! developer owns exactly two files in it and never writes anyone else's.
//!
//! # Directory Structure
//!
//! ```text
//! <storage>/                       # Shared time tracking folder
//!   README.txt                     # Written by `teamlog init`
//!   running.<developer>.json       # Running tasks, one file per developer
//!   finished.<developer>.json      # Finished tasks, one file per developer
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::task::TaskState;

/// Extension shared by all developer log files
pub const LOG_EXTENSION: &str = "json";

/// Slug used when a developer identity has no usable characters
pub const UNKNOWN_DEVELOPER: &str = "unknown";

/// Supplies the directory that holds the per-developer logs.
pub trait StoragePathProvider {
    fn storage_dir(&self) -> Result<PathBuf>;
}

impl StoragePathProvider for PathBuf {
    fn storage_dir(&self) -> Result<PathBuf> {
        Ok(self.clone())
    }
}

/// Storage manager for one shared folder
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn from_provider(provider: &dyn StoragePathProvider) -> Result<Self> {
        Ok(Self::new(provider.storage_dir()?))
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn readme_file(&self) -> PathBuf {
        self.root.join("README.txt")
    }

    /// Path of `developer`'s log for `state`
    pub fn developer_file(&self, state: TaskState, developer: &str) -> PathBuf {
        self.root.join(developer_file_name(state, developer))
    }

    /// Glob pattern matching every developer's log for `state`
    pub fn state_pattern(&self, state: TaskState) -> String {
        let escaped = glob::Pattern::escape(&self.root.to_string_lossy());
        format!("{}/{}.*.{}", escaped, state.as_str(), LOG_EXTENSION)
    }

    /// Every developer log for `state`, in no guaranteed order.
    ///
    /// A missing storage folder simply yields no files.
    pub fn state_files(&self, state: TaskState) -> Result<Vec<PathBuf>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let pattern = self.state_pattern(state);
        let entries = glob::glob(&pattern).map_err(|err| {
            Error::OperationFailed(format!("invalid storage pattern '{pattern}': {err}"))
        })?;
        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable storage entry");
                }
            }
        }
        Ok(files)
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    /// Create the storage folder if it does not exist yet
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    // =========================================================================
    // File I/O helpers (atomic writes for safety)
    // =========================================================================

    /// Write JSON data atomically (write to temp, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        write_atomic(path, json.as_bytes())
    }
}

/// Write data atomically using a temp file in the same directory plus rename.
///
/// Readers on other machines never see a half-written log.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut temp = NamedTempFile::new_in(&parent)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| Error::Io(err.error))?;
    Ok(())
}

/// File name of `developer`'s log for `state`
pub fn developer_file_name(state: TaskState, developer: &str) -> String {
    format!(
        "{}.{}.{}",
        state.as_str(),
        developer_slug(developer),
        LOG_EXTENSION
    )
}

/// Filesystem-safe, lower-cased form of a developer identity.
///
/// Letters and digits of any script are kept; whitespace, dots, path
/// separators and glob metacharacters become `_`.
pub fn developer_slug(developer: &str) -> String {
    let mut slug = String::new();
    for ch in developer.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            slug.push(ch);
        } else {
            slug.push('_');
        }
    }
    if slug.is_empty() {
        UNKNOWN_DEVELOPER.to_string()
    } else {
        slug
    }
}

/// Whether `identity` maps to the file owned by `owner_slug`.
pub fn owned_by(identity: &str, owner_slug: &str) -> bool {
    developer_slug(identity) == owner_slug
}

/// Recover the developer slug from a log file name such as
/// `running.alice.json`.
pub fn slug_from_file(path: &Path, state: TaskState) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix(state.as_str())?.strip_prefix('.')?;
    let slug = rest.strip_suffix(LOG_EXTENSION)?.strip_suffix('.')?;
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}
