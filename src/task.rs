//! Task records shared by every developer log.
//!
//! A task is identified by its normalized id (trimmed, lower-cased name).
//! Records live in one of two logical collections, running or finished, and
//! each developer persists their own slice of a record in their own file.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for a single comment body, in characters.
pub const MAX_COMMENT_LEN: usize = 1000;

/// Normalize a task name into the id used for storage and lookup.
pub fn normalize_id(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Logical collection a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Running,
    Finished,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Running => "running",
            TaskState::Finished => "finished",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComment {
    pub created: DateTime<Utc>,
    pub developer: String,
    pub comment: String,
}

impl TaskComment {
    /// Identity used to suppress duplicates when the same comment shows up in
    /// several files. Timestamps are compared at second precision.
    pub fn dedup_key(&self) -> (i64, String, String) {
        (
            self.created.timestamp(),
            self.developer.clone(),
            self.comment.clone(),
        )
    }

    pub fn is_authored_by(&self, developer: &str) -> bool {
        same_developer(&self.developer, developer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub developer_start_times: BTreeMap<String, DateTime<Utc>>,
    pub developer_work_times: BTreeMap<String, u32>,
    pub active_developers: BTreeSet<String>,
    pub comments: Vec<TaskComment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_by: Option<String>,
    /// Ledger instance and cache generation this record was handed out
    /// from. Never persisted.
    #[serde(skip)]
    pub(crate) origin: Option<Origin>,
}

/// Where a record handed out by a ledger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Origin {
    pub ledger: u64,
    pub generation: u64,
}

impl TaskRecord {
    /// Fresh record created by `developer` at `now`.
    pub fn new(
        name: &str,
        description: Option<String>,
        developer: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = TaskRecord {
            name: name.trim().to_string(),
            description: description.filter(|text| !text.trim().is_empty()),
            created: Some(now),
            created_by: Some(developer.to_string()),
            ..TaskRecord::default()
        };
        record.add_participant(developer, now);
        record
    }

    pub fn id(&self) -> String {
        normalize_id(&self.name)
    }

    pub fn state(&self) -> TaskState {
        if self.finished.is_some() {
            TaskState::Finished
        } else {
            TaskState::Running
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn is_participating(&self, developer: &str) -> bool {
        self.developer_start_times
            .keys()
            .any(|known| same_developer(known, developer))
    }

    pub fn is_active(&self, developer: &str) -> bool {
        self.active_developers
            .iter()
            .any(|known| same_developer(known, developer))
    }

    pub fn start_time_of(&self, developer: &str) -> Option<DateTime<Utc>> {
        self.developer_start_times
            .iter()
            .find(|(known, _)| same_developer(known, developer))
            .map(|(_, started)| *started)
    }

    /// Register `developer` as a participant. Existing start times are kept.
    pub fn add_participant(&mut self, developer: &str, now: DateTime<Utc>) {
        self.developer_start_times
            .entry(developer.to_string())
            .or_insert(now);
        self.ensure_work_entry(developer);
        self.active_developers.insert(developer.to_string());
    }

    pub fn ensure_work_entry(&mut self, developer: &str) {
        self.developer_work_times
            .entry(developer.to_string())
            .or_insert(0);
    }

    pub fn add_work_minutes(&mut self, developer: &str, minutes: u32) {
        let entry = self
            .developer_work_times
            .entry(developer.to_string())
            .or_insert(0);
        *entry = entry.saturating_add(minutes);
    }

    pub fn total_work_minutes(&self) -> u64 {
        self.developer_work_times
            .values()
            .map(|minutes| u64::from(*minutes))
            .sum()
    }

    pub fn add_comment(&mut self, comment: TaskComment) {
        self.comments.push(comment);
    }

    /// Mark the task finished by `developer` and drop them from the active set.
    pub fn finish(&mut self, developer: &str, now: DateTime<Utc>) {
        self.finished = Some(now);
        self.finished_by = Some(developer.to_string());
        self.active_developers
            .retain(|known| !same_developer(known, developer));
    }

    pub(crate) fn origin(&self) -> Option<Origin> {
        self.origin
    }

    pub(crate) fn stamp(&mut self, origin: Origin) {
        self.origin = Some(origin);
    }
}

/// Developer identities compare case-insensitively.
pub fn same_developer(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// Trim a comment body and cap its length. `None` for blank input.
pub fn clean_comment(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_COMMENT_LEN).collect())
}
