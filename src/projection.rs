//! Developer projection: the slice of a merged task one developer persists.
//!
//! Fields split into two groups:
//! - owned: `developerWorkTimes` and `comments`. A file carries only its
//!   owner's entries, so the summing merge never sees a value twice.
//! - replicated: everything else. Their merge functions are idempotent, so
//!   every developer may carry a full copy.
//!
//! [`DeveloperProjection`] can only be built by [`DeveloperProjection::project`]
//! and [`ProjectionWriter::persist`] only accepts a projection, which keeps
//! foreign minutes and comments out of a developer's file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::log::load_log;
use crate::storage::{developer_slug, owned_by, Storage};
use crate::task::{TaskRecord, TaskState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperProjection {
    developer: String,
    id: String,
    record: TaskRecord,
}

impl DeveloperProjection {
    /// Derive the slice of `record` that `developer` is authoritative for.
    pub fn project(record: &TaskRecord, developer: &str) -> Self {
        let owner = developer_slug(developer);
        let mut slice = record.clone();
        slice.origin = None;
        slice.comments.retain(|comment| owned_by(&comment.developer, &owner));
        slice
            .developer_work_times
            .retain(|name, _| owned_by(name, &owner));
        if slice.is_participating(developer)
            && !slice
                .developer_work_times
                .keys()
                .any(|name| owned_by(name, &owner))
        {
            slice.ensure_work_entry(developer);
        }
        Self {
            developer: developer.to_string(),
            id: record.id(),
            record: slice,
        }
    }

    pub fn developer(&self) -> &str {
        &self.developer
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn record(&self) -> &TaskRecord {
        &self.record
    }
}

/// Writes projections into the current developer's own files.
///
/// Two processes acting as the same developer race on that developer's file
/// and the last writer wins; there is no locking. A file that exists but
/// cannot be read back is left untouched and the write fails.
#[derive(Debug, Clone)]
pub struct ProjectionWriter<'a> {
    storage: &'a Storage,
}

impl<'a> ProjectionWriter<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Read-modify-write of the developer's `state` file with the projection.
    pub fn persist(&self, projection: &DeveloperProjection, state: TaskState) -> Result<PathBuf> {
        let path = self.storage.developer_file(state, projection.developer());
        self.storage.ensure_dir()?;

        let mut tasks: BTreeMap<String, TaskRecord> = load_log(&path)?;
        tasks.insert(projection.id().to_string(), projection.record().clone());
        self.storage.write_json(&path, &tasks)?;

        tracing::debug!(
            task = projection.id(),
            developer = projection.developer(),
            state = %state,
            path = %path.display(),
            "persisted developer projection"
        );
        Ok(path)
    }

    /// Drop `id` from the developer's `state` file. Returns whether it was there.
    pub fn remove(&self, developer: &str, id: &str, state: TaskState) -> Result<bool> {
        let path = self.storage.developer_file(state, developer);
        if !path.exists() {
            return Ok(false);
        }

        let mut tasks = load_log(&path)?;
        if tasks.remove(id).is_none() {
            return Ok(false);
        }
        self.storage.write_json(&path, &tasks)?;

        tracing::debug!(
            task = id,
            developer,
            state = %state,
            path = %path.display(),
            "removed task from developer log"
        );
        Ok(true)
    }
}
