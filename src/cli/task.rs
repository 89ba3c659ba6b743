//! teamlog task command implementations.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Project;
use crate::developer::{profile_dir, DeveloperIdentity, ResolvedDeveloper};
use crate::error::{Error, Result};
use crate::ledger::{EndOutcome, StartOutcome, SystemClock, TaskLedger};
use crate::log::ReadOptions;
use crate::output::{emit, OutputMode, Report};
use crate::stats::{self, human_duration, human_elapsed};
use crate::task::TaskRecord;

/// Flags shared by every task command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub project: Option<PathBuf>,
    pub developer: Option<String>,
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

impl GlobalOptions {
    fn output(&self) -> OutputMode {
        OutputMode::from_flags(self.json, self.quiet)
    }
}

pub struct StartOptions {
    pub name: String,
    pub description: Option<String>,
    pub global: GlobalOptions,
}

pub struct EndOptions {
    pub name: String,
    pub global: GlobalOptions,
}

pub struct FocusOptions {
    pub name: String,
    pub minutes: u32,
    pub global: GlobalOptions,
}

pub struct CommentOptions {
    pub name: String,
    pub text: String,
    pub global: GlobalOptions,
}

pub struct ListOptions {
    pub finished: bool,
    pub mine: bool,
    pub global: GlobalOptions,
}

pub struct ShowOptions {
    pub name: String,
    pub global: GlobalOptions,
}

pub struct StatsOptions {
    pub global: GlobalOptions,
}

struct TaskContext {
    project: Project,
    ledger: TaskLedger,
}

#[derive(Serialize)]
struct TaskOutput<'a> {
    id: String,
    state: &'static str,
    task: &'a TaskRecord,
}

impl<'a> TaskOutput<'a> {
    fn new(task: &'a TaskRecord) -> Self {
        Self {
            id: task.id(),
            state: task.state().as_str(),
            task,
        }
    }
}

#[derive(Serialize)]
struct StartOutput<'a> {
    outcome: &'static str,
    #[serde(flatten)]
    task: TaskOutput<'a>,
}

#[derive(Serialize)]
struct EndOutput<'a> {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_minutes: Option<i64>,
    #[serde(flatten)]
    task: TaskOutput<'a>,
}

#[derive(Serialize)]
struct FocusOutput<'a> {
    added_minutes: u32,
    developer_minutes: u32,
    #[serde(flatten)]
    task: TaskOutput<'a>,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    state: &'static str,
    total: usize,
    tasks: Vec<TaskOutput<'a>>,
}

pub fn run_start(options: StartOptions) -> Result<()> {
    let mut ctx = load_context(&options.global, true)?;
    let developer = ctx.ledger.developer()?;
    let outcome = ctx
        .ledger
        .start(&options.name, options.description.as_deref())?;

    let record = outcome.record();
    let (label, header) = match &outcome {
        StartOutcome::Created(_) => ("created", "Task started"),
        StartOutcome::Joined(_) => ("joined", "Joined task"),
        StartOutcome::AlreadyParticipating(_) => ("already_participating", "Task already running"),
        StartOutcome::AlreadyFinished(_) => ("already_finished", "Task already finished"),
    };

    let mut human = Report::new(header);
    human.task(record);
    match &outcome {
        StartOutcome::AlreadyParticipating(_) => {
            human.warn(format!("{developer} already works on '{}'", record.name));
        }
        StartOutcome::AlreadyFinished(_) => {
            human.warn(format!("'{}' was finished; pick another name", record.name));
        }
        StartOutcome::Created(_) | StartOutcome::Joined(_) => {
            human
                .hint(format!("teamlog focus \"{}\" --minutes 25", record.name))
                .hint(format!("teamlog end \"{}\"", record.name));
        }
    }

    emit(
        options.global.output(),
        "start",
        &StartOutput {
            outcome: label,
            task: TaskOutput::new(record),
        },
        &human,
    )
}

pub fn run_end(options: EndOptions) -> Result<()> {
    let mut ctx = load_context(&options.global, true)?;
    let developer = ctx.ledger.developer()?;

    match ctx.ledger.end(&options.name)? {
        EndOutcome::NotFound => Err(Error::TaskNotFound(options.name)),
        EndOutcome::NotActive(record) => {
            let mut human = Report::new("Task not ended");
            human
                .task(&record)
                .warn(format!("{developer} is not active on '{}'", record.name));
            emit(
                options.global.output(),
                "end",
                &EndOutput {
                    outcome: "not_active",
                    elapsed_minutes: None,
                    task: TaskOutput::new(&record),
                },
                &human,
            )
        }
        EndOutcome::Ended { record, elapsed } => {
            let mut human = Report::new("Task ended");
            human.task(&record);
            if let Some(elapsed) = elapsed {
                human.field("Your time", human_elapsed(elapsed));
            }
            emit(
                options.global.output(),
                "end",
                &EndOutput {
                    outcome: "ended",
                    elapsed_minutes: elapsed.map(|elapsed| elapsed.num_minutes()),
                    task: TaskOutput::new(&record),
                },
                &human,
            )
        }
    }
}

pub fn run_focus(options: FocusOptions) -> Result<()> {
    let mut ctx = load_context(&options.global, true)?;
    let developer = ctx.ledger.developer()?;
    let record = ctx
        .ledger
        .add_focus_time(&options.name, options.minutes)?
        .ok_or_else(|| Error::TaskNotFound(options.name.clone()))?;

    let developer_minutes = record
        .developer_work_times
        .get(&developer)
        .copied()
        .unwrap_or_default();

    let mut human = Report::new("Focus time booked");
    human
        .task(&record)
        .field("Added", human_duration(i64::from(options.minutes)))
        .field("Yours", human_duration(i64::from(developer_minutes)));

    emit(
        options.global.output(),
        "focus",
        &FocusOutput {
            added_minutes: options.minutes,
            developer_minutes,
            task: TaskOutput::new(&record),
        },
        &human,
    )
}

pub fn run_comment(options: CommentOptions) -> Result<()> {
    let mut ctx = load_context(&options.global, true)?;
    let record = ctx
        .ledger
        .add_comment(&options.name, &options.text)?
        .ok_or_else(|| Error::TaskNotFound(options.name.clone()))?;

    let mut human = Report::new("Comment added");
    human.task(&record);
    if let Some(comment) = record.comments.last() {
        human.field("Comment", comment.comment.clone());
    }

    emit(
        options.global.output(),
        "comment",
        &TaskOutput::new(&record),
        &human,
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let mut ctx = load_context(&options.global, options.mine)?;
    let (state, tasks) = if options.finished {
        ("finished", ctx.ledger.list_finished()?)
    } else if options.mine {
        ("running", ctx.ledger.list_running_for_developer()?)
    } else {
        ("running", ctx.ledger.list_running()?)
    };
    let now = ctx.ledger.now();

    let mut human = Report::new(format!("Tasks ({state})"));
    human
        .field("Project", ctx.project.config.name.clone())
        .field("Total", tasks.len().to_string());
    for task in &tasks {
        human.line(format_task_line(task, now));
    }
    if tasks.is_empty() && !options.finished {
        human.hint("teamlog start <name>");
    }

    emit(
        options.global.output(),
        "list",
        &TaskListOutput {
            state,
            total: tasks.len(),
            tasks: tasks.iter().map(TaskOutput::new).collect(),
        },
        &human,
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let mut ctx = load_context(&options.global, false)?;
    let record = ctx
        .ledger
        .get_by_id(&options.name)?
        .ok_or_else(|| Error::TaskNotFound(options.name.clone()))?;
    let now = ctx.ledger.now();

    let mut human = Report::new(format!("Task {}", record.name));
    human.task(&record);
    if let Some(description) = record.description.as_deref() {
        human.field("Description", description);
    }
    if let Some(created) = record.created {
        let by = record.created_by.as_deref().unwrap_or("unknown");
        human.field("Created", format!("{} by {by}", format_time(created)));
    }
    if let Some(finished) = record.finished {
        let by = record.finished_by.as_deref().unwrap_or("unknown");
        human.field("Finished", format!("{} by {by}", format_time(finished)));
    }

    let mut starts: Vec<_> = record.developer_start_times.iter().collect();
    starts.sort_by_key(|(_, started)| **started);
    for (developer, started) in starts {
        let until = record.finished.unwrap_or(now);
        let focus = record
            .developer_work_times
            .get(developer)
            .copied()
            .unwrap_or_default();
        human.line(format!(
            "{developer}: started {}, working {}, focus {}{}",
            format_time(*started),
            human_elapsed(until - *started),
            human_duration(i64::from(focus)),
            if record.is_active(developer) { " (active)" } else { "" }
        ));
    }
    for comment in &record.comments {
        human.line(format!(
            "[{}] {}: {}",
            format_time(comment.created),
            comment.developer,
            comment.comment
        ));
    }

    emit(
        options.global.output(),
        "show",
        &TaskOutput::new(&record),
        &human,
    )
}

pub fn run_stats(options: StatsOptions) -> Result<()> {
    let mut ctx = load_context(&options.global, false)?;
    let running = ctx.ledger.list_running()?;
    let finished = ctx.ledger.list_finished()?;
    let summary = stats::compute(&running, &finished, ctx.ledger.now());

    let mut human = Report::new(format!("Work stats: {}", ctx.project.config.name));
    human
        .field("Running tasks", summary.running_tasks.to_string())
        .field("Finished tasks", summary.finished_tasks.to_string())
        .field("Focus time", human_duration(summary.total_focus_minutes as i64))
        .field(
            "Time on finished tasks",
            human_duration(summary.finished_elapsed_minutes),
        )
        .field(
            "Time on running tasks",
            human_duration(summary.running_elapsed_minutes),
        );
    if let Some(span) = summary.working_span_minutes {
        human.field("Working span", human_duration(span));
    }
    for developer in &summary.developers {
        human.line(format!(
            "{}: {} task(s), focus {}",
            developer.developer,
            developer.tasks,
            human_duration(developer.focus_minutes as i64)
        ));
    }

    emit(options.global.output(), "stats", &summary, &human)
}

fn load_context(global: &GlobalOptions, require_developer: bool) -> Result<TaskContext> {
    let project = Project::discover(global.project.as_deref())?;
    let profile_dir = match profile_dir() {
        Ok(dir) => Some(dir),
        Err(err) => {
            tracing::debug!(error = %err, "no developer profile directory");
            None
        }
    };

    let identity: Box<dyn DeveloperIdentity> =
        match ResolvedDeveloper::resolve(global.developer.as_deref(), profile_dir.as_deref()) {
            Ok(resolved) => Box::new(resolved),
            Err(Error::DeveloperNotConfigured) if !require_developer => Box::new(String::new()),
            Err(err) => return Err(err),
        };

    let ledger = TaskLedger::new(
        &project,
        identity,
        Box::new(SystemClock),
        ReadOptions {
            verbose: global.verbose,
        },
    )?;
    Ok(TaskContext { project, ledger })
}

fn format_task_line(task: &TaskRecord, now: DateTime<Utc>) -> String {
    let started = task.developer_start_times.values().min().copied();
    let until = task.finished.unwrap_or(now);
    let working = started
        .map(|started| human_elapsed(until - started))
        .unwrap_or_else(|| "-".to_string());
    let developers: Vec<&str> = task
        .developer_start_times
        .keys()
        .map(String::as_str)
        .collect();
    format!(
        "{} | working {} | focus {} | {}",
        task.name,
        working,
        human_duration(task.total_work_minutes() as i64),
        developers.join(", ")
    )
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}
