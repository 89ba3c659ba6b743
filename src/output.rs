//! Command output for teamlog.
//!
//! A command describes its result twice: a serializable payload and a
//! [`Report`] for people. [`emit`] prints one of them depending on the
//! [`OutputMode`]. With `--json` the payload goes out inside a versioned
//! envelope:
//!
//! ```text
//! { "schema_version": "teamlog.v1", "command": "start", "status": "success",
//!   "data": { ... }, "warnings": [ ... ] }
//! ```
//!
//! Errors use the same envelope with `status: "error"` and an `error` object
//! in place of `data`.

use serde::Serialize;

use crate::error::{Error, JsonError, Result};
use crate::stats::human_duration;
use crate::task::TaskRecord;

pub const SCHEMA_VERSION: &str = "teamlog.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    /// Nothing on success; errors still go to stderr
    Quiet,
    Json,
}

impl OutputMode {
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Human
        }
    }
}

/// What a person sees after a command.
///
/// ```text
/// Task started
///   Task: Foo
///   State: running
///
///   alice: started 2025-03-01 09:00:00
/// warning: ...
/// next: teamlog end "Foo"
/// ```
#[derive(Debug, Clone, Default)]
pub struct Report {
    headline: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    hints: Vec<String>,
}

impl Report {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, label: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push((label.into(), value.into()));
        self
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Also carried in the JSON envelope.
    pub fn warn(&mut self, warning: impl Into<String>) -> &mut Self {
        self.warnings.push(warning.into());
        self
    }

    /// A command worth running next. Human output only.
    pub fn hint(&mut self, command: impl Into<String>) -> &mut Self {
        self.hints.push(command.into());
        self
    }

    /// Name, state, active developers and booked focus time of `record`.
    pub fn task(&mut self, record: &TaskRecord) -> &mut Self {
        self.field("Task", record.name.clone());
        self.field("State", record.state().to_string());
        if !record.active_developers.is_empty() {
            let active: Vec<&str> = record.active_developers.iter().map(String::as_str).collect();
            self.field("Active", active.join(", "));
        }
        let focus = record.total_work_minutes();
        if focus > 0 {
            self.field("Focus", human_duration(focus as i64));
        }
        self
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn render(&self) -> String {
        let mut out = vec![self.headline.clone()];
        for (label, value) in &self.fields {
            out.push(format!("  {label}: {value}"));
        }
        if !self.lines.is_empty() {
            out.push(String::new());
            out.extend(self.lines.iter().map(|line| format!("  {line}")));
        }
        out.extend(self.warnings.iter().map(|warning| format!("warning: {warning}")));
        out.extend(self.hints.iter().map(|hint| format!("next: {hint}")));
        out.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Serialize)]
struct Envelope<'a, D: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonError>,
    #[serde(skip_serializing_if = "no_warnings")]
    warnings: &'a [String],
}

fn no_warnings(warnings: &&[String]) -> bool {
    warnings.is_empty()
}

/// Print the result of a successful `command`.
pub fn emit<D: Serialize>(mode: OutputMode, command: &str, data: &D, report: &Report) -> Result<()> {
    match mode {
        OutputMode::Json => print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Success,
            data: Some(data),
            error: None,
            warnings: report.warnings(),
        }),
        OutputMode::Quiet => Ok(()),
        OutputMode::Human => {
            println!("{}", report.render());
            Ok(())
        }
    }
}

/// Report a failed `command`: an error envelope on stdout with `--json`,
/// otherwise `error:` and `hint:` lines on stderr.
pub fn emit_error(mode: OutputMode, command: &str, err: &Error) -> Result<()> {
    if mode == OutputMode::Json {
        return print_envelope::<()>(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: Status::Error,
            data: None,
            error: Some(JsonError::from(err)),
            warnings: &[],
        });
    }

    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn print_envelope<D: Serialize>(envelope: &Envelope<'_, D>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}
