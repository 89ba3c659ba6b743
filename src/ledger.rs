//! Task ledger: the aggregate view over every developer log plus the
//! operations that mutate the current developer's slice.
//!
//! Both views are loaded together on first read and kept until a local
//! mutation bumps the generation counter. There is no background refresh;
//! [`TaskLedger::get_global_running_by_id`] is the only read that always goes
//! back to disk.
//!
//! Records handed out by the ledger remember the ledger instance and the
//! generation they were read at. [`TaskLedger::end_task`] and
//! [`TaskLedger::update`] refuse records from another instance or from an
//! older generation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};

use crate::developer::DeveloperIdentity;
use crate::error::{Error, Result};
use crate::log::ReadOptions;
use crate::projection::{DeveloperProjection, ProjectionWriter};
use crate::reconcile::{merge_state, reconcile_views};
use crate::storage::{Storage, StoragePathProvider};
use crate::task::{clean_comment, normalize_id, Origin, TaskComment, TaskRecord, TaskState};

static NEXT_LEDGER_ID: AtomicU64 = AtomicU64::new(1);

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Result of [`TaskLedger::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Created(TaskRecord),
    Joined(TaskRecord),
    /// The developer already takes part; nothing was written.
    AlreadyParticipating(TaskRecord),
    /// A task with this id has already been finished; nothing was written.
    AlreadyFinished(TaskRecord),
}

impl StartOutcome {
    pub fn record(&self) -> &TaskRecord {
        match self {
            StartOutcome::Created(record)
            | StartOutcome::Joined(record)
            | StartOutcome::AlreadyParticipating(record)
            | StartOutcome::AlreadyFinished(record) => record,
        }
    }
}

/// Result of [`TaskLedger::end`] and [`TaskLedger::end_task`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndOutcome {
    NotFound,
    /// The developer is not among the task's active developers.
    NotActive(TaskRecord),
    Ended {
        record: TaskRecord,
        /// Time since the developer's own start, when one is recorded
        elapsed: Option<Duration>,
    },
}

#[derive(Debug, Default)]
struct AggregateViews {
    running: BTreeMap<String, TaskRecord>,
    finished: BTreeMap<String, TaskRecord>,
}

pub struct TaskLedger {
    id: u64,
    storage: Storage,
    identity: Box<dyn DeveloperIdentity>,
    clock: Box<dyn Clock>,
    options: ReadOptions,
    generation: u64,
    views: Option<AggregateViews>,
}

impl TaskLedger {
    pub fn new(
        paths: &dyn StoragePathProvider,
        identity: Box<dyn DeveloperIdentity>,
        clock: Box<dyn Clock>,
        options: ReadOptions,
    ) -> Result<Self> {
        Ok(Self {
            id: NEXT_LEDGER_ID.fetch_add(1, Ordering::Relaxed),
            storage: Storage::from_provider(paths)?,
            identity,
            clock,
            options,
            generation: 0,
            views: None,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The developer every mutation is attributed to
    pub fn developer(&self) -> Result<String> {
        let developer = self.identity.current_developer();
        if developer.trim().is_empty() {
            return Err(Error::DeveloperNotConfigured);
        }
        Ok(developer.trim().to_string())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn list_running(&mut self) -> Result<Vec<TaskRecord>> {
        Ok(self.views()?.running.values().cloned().collect())
    }

    pub fn list_finished(&mut self) -> Result<Vec<TaskRecord>> {
        Ok(self.views()?.finished.values().cloned().collect())
    }

    /// Running tasks the current developer takes part in
    pub fn list_running_for_developer(&mut self) -> Result<Vec<TaskRecord>> {
        let developer = self.developer()?;
        Ok(self
            .views()?
            .running
            .values()
            .filter(|record| record.is_participating(&developer))
            .cloned()
            .collect())
    }

    /// Look `id` up in the running view, then in the finished view.
    pub fn get_by_id(&mut self, id: &str) -> Result<Option<TaskRecord>> {
        let id = normalize_id(id);
        let views = self.views()?;
        Ok(views
            .running
            .get(&id)
            .or_else(|| views.finished.get(&id))
            .cloned())
    }

    /// Fresh merge of every running log, ignoring the cached views and any
    /// developer scoping.
    pub fn get_global_running_by_id(&self, id: &str) -> Result<Option<TaskRecord>> {
        let id = normalize_id(id);
        let mut views = self.load_views()?;
        Ok(views.running.remove(&id))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a task, or join it when someone else already started it.
    pub fn start(&mut self, name: &str, description: Option<&str>) -> Result<StartOutcome> {
        let id = normalize_id(name);
        if id.is_empty() {
            return Err(Error::InvalidArgument(
                "task name cannot be empty".to_string(),
            ));
        }
        let developer = self.developer()?;
        let now = self.now();

        let views = self.views()?;
        if let Some(finished) = views.finished.get(&id) {
            return Ok(StartOutcome::AlreadyFinished(finished.clone()));
        }
        let existing = views.running.get(&id).cloned();

        match existing {
            Some(record) if record.is_participating(&developer) => {
                tracing::warn!(task = %id, developer = %developer, "already participating");
                Ok(StartOutcome::AlreadyParticipating(record))
            }
            Some(mut record) => {
                record.add_participant(&developer, now);
                if record.description.is_none() {
                    record.description = description
                        .map(str::trim)
                        .filter(|text| !text.is_empty())
                        .map(str::to_string);
                }
                self.commit(&mut record, &developer, TaskState::Running)?;
                tracing::debug!(task = %id, developer = %developer, "joined task");
                Ok(StartOutcome::Joined(record))
            }
            None => {
                let mut record =
                    TaskRecord::new(name, description.map(str::to_string), &developer, now);
                self.commit(&mut record, &developer, TaskState::Running)?;
                tracing::debug!(task = %id, developer = %developer, "created task");
                Ok(StartOutcome::Created(record))
            }
        }
    }

    /// End the running task `id` for the current developer.
    pub fn end(&mut self, id: &str) -> Result<EndOutcome> {
        let id = normalize_id(id);
        let Some(record) = self.views()?.running.get(&id).cloned() else {
            return Ok(EndOutcome::NotFound);
        };
        self.finish_record(record)
    }

    /// End a task the caller already holds. The record must come from this
    /// ledger's current generation.
    pub fn end_task(&mut self, record: &TaskRecord) -> Result<EndOutcome> {
        self.check_origin(record)?;
        if !self.views()?.running.contains_key(&record.id()) {
            return Ok(EndOutcome::NotFound);
        }
        self.finish_record(record.clone())
    }

    /// Book `minutes` of focus time on a running task.
    pub fn add_focus_time(&mut self, id: &str, minutes: u32) -> Result<Option<TaskRecord>> {
        if minutes == 0 {
            return Err(Error::InvalidArgument(
                "focus time must be at least one minute".to_string(),
            ));
        }
        let developer = self.developer()?;
        let Some(mut record) = self.get_global_running_by_id(id)? else {
            return Ok(None);
        };
        record.add_work_minutes(&developer, minutes);
        self.commit(&mut record, &developer, TaskState::Running)?;
        Ok(Some(record))
    }

    /// Attach a comment to a running or finished task.
    pub fn add_comment(&mut self, id: &str, text: &str) -> Result<Option<TaskRecord>> {
        let Some(text) = clean_comment(text) else {
            return Err(Error::InvalidArgument(
                "comment cannot be empty".to_string(),
            ));
        };
        let developer = self.developer()?;
        let now = self.now();
        let Some(mut record) = self.get_by_id(id)? else {
            return Ok(None);
        };
        record.add_comment(TaskComment {
            created: now,
            developer: developer.clone(),
            comment: text,
        });
        let state = record.state();
        self.commit(&mut record, &developer, state)?;
        Ok(Some(record))
    }

    /// Re-persist a caller-held record into the current developer's file for
    /// the record's state.
    pub fn update(&mut self, record: &TaskRecord) -> Result<PathBuf> {
        self.check_origin(record)?;
        let developer = self.developer()?;
        let mut record = record.clone();
        let state = record.state();
        self.commit(&mut record, &developer, state)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn finish_record(&mut self, mut record: TaskRecord) -> Result<EndOutcome> {
        let developer = self.developer()?;
        if !record.is_active(&developer) {
            return Ok(EndOutcome::NotActive(record));
        }
        let now = self.now();
        let elapsed = record.start_time_of(&developer).map(|started| now - started);
        record.finish(&developer, now);

        self.commit(&mut record, &developer, TaskState::Finished)?;
        self.writer()
            .remove(&developer, &record.id(), TaskState::Running)?;
        tracing::debug!(task = %record.id(), developer = %developer, "ended task");
        Ok(EndOutcome::Ended { record, elapsed })
    }

    /// Persist the developer's projection of `record`, drop the cached views
    /// and stamp `record` with the generation the next load will carry.
    fn commit(
        &mut self,
        record: &mut TaskRecord,
        developer: &str,
        state: TaskState,
    ) -> Result<PathBuf> {
        let projection = DeveloperProjection::project(record, developer);
        let path = self.writer().persist(&projection, state)?;
        self.invalidate();
        record.stamp(self.origin());
        Ok(path)
    }

    fn origin(&self) -> Origin {
        Origin {
            ledger: self.id,
            generation: self.generation,
        }
    }

    fn check_origin(&self, record: &TaskRecord) -> Result<()> {
        match record.origin().filter(|origin| origin.ledger == self.id) {
            None => Err(Error::InvariantViolation(format!(
                "task '{}' was not read from this ledger",
                record.id()
            ))),
            Some(origin) if origin.generation != self.generation => {
                Err(Error::InvariantViolation(format!(
                    "task '{}' is stale (read at generation {}, ledger is at {})",
                    record.id(),
                    origin.generation,
                    self.generation
                )))
            }
            Some(_) => Ok(()),
        }
    }

    fn writer(&self) -> ProjectionWriter<'_> {
        ProjectionWriter::new(&self.storage)
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.views = None;
    }

    fn views(&mut self) -> Result<&AggregateViews> {
        if self.views.is_none() {
            self.views = Some(self.load_views()?);
        }
        match &self.views {
            Some(views) => Ok(views),
            None => Err(Error::OperationFailed(
                "task views unavailable after load".to_string(),
            )),
        }
    }

    fn load_views(&self) -> Result<AggregateViews> {
        let mut running = merge_state(&self.storage, TaskState::Running, self.options)?;
        let mut finished = merge_state(&self.storage, TaskState::Finished, self.options)?;
        reconcile_views(&mut running, &mut finished);
        let origin = self.origin();
        for record in running.values_mut().chain(finished.values_mut()) {
            record.stamp(origin);
        }
        tracing::debug!(
            running = running.len(),
            finished = finished.len(),
            generation = self.generation,
            "loaded task views"
        );
        Ok(AggregateViews { running, finished })
    }
}
