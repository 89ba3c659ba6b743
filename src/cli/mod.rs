//! Command-line interface for teamlog
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand group is defined in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::output::OutputMode;

mod developer;
mod init;
mod task;

/// teamlog - shared-folder time tracking
///
/// Every developer writes only their own task logs in a shared folder;
/// reads merge everybody's logs into one view.
#[derive(Parser, Debug)]
#[command(name = "teamlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project directory or `.teamlog.toml` (defaults to searching upwards
    /// from the current directory)
    #[arg(long, global = true, env = "TEAMLOG_PROJECT")]
    pub project: Option<PathBuf>,

    /// Developer identity for this invocation
    #[arg(long, global = true, env = "TEAMLOG_DEVELOPER")]
    pub developer: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug tracing, unreadable logs reported)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create `.teamlog.toml` and the shared storage folder
    Init {
        /// Project name
        name: String,

        /// Project description
        #[arg(long)]
        description: Option<String>,

        /// Storage folder, relative to the project root unless absolute
        #[arg(long)]
        folder: Option<String>,

        /// Maximum working hours per day
        #[arg(long)]
        max_hours: Option<u32>,

        /// Planned start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Planned end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Start a task, or join one a teammate already started
    Start {
        /// Task name
        name: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// End a running task
    End {
        /// Task name
        name: String,
    },

    /// Book focus time on a running task
    Focus {
        /// Task name
        name: String,

        /// Minutes of focused work
        #[arg(short, long)]
        minutes: u32,
    },

    /// Comment on a running or finished task
    Comment {
        /// Task name
        name: String,

        /// Comment text
        text: String,
    },

    /// List tasks
    List {
        /// List finished tasks instead of running ones
        #[arg(long)]
        finished: bool,

        /// Only running tasks you take part in
        #[arg(long, conflicts_with = "finished")]
        mine: bool,
    },

    /// Show one task
    Show {
        /// Task name
        name: String,
    },

    /// Working time statistics across all tasks
    Stats,

    /// Set or show developer identity
    #[command(subcommand)]
    Developer(DeveloperCommands),
}

/// Developer subcommands
#[derive(Subcommand, Debug)]
pub enum DeveloperCommands {
    /// Persist the developer profile for this machine
    Set {
        /// Developer name
        name: String,

        /// Contact email
        #[arg(long)]
        email: Option<String>,

        /// Working hours per day
        #[arg(long)]
        hours_per_day: Option<u32>,
    },

    /// Show the resolved developer identity
    Show,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from_flags(self.json, self.quiet)
    }

    /// Name reported in the JSON envelope, e.g. `start` or `developer set`
    pub fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Init { .. } => "init",
            Commands::Start { .. } => "start",
            Commands::End { .. } => "end",
            Commands::Focus { .. } => "focus",
            Commands::Comment { .. } => "comment",
            Commands::List { .. } => "list",
            Commands::Show { .. } => "show",
            Commands::Stats => "stats",
            Commands::Developer(DeveloperCommands::Set { .. }) => "developer set",
            Commands::Developer(DeveloperCommands::Show) => "developer show",
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = self.output_mode();
        let global = task::GlobalOptions {
            project: self.project,
            developer: self.developer,
            json: self.json,
            quiet: self.quiet,
            verbose: self.verbose,
        };

        match self.command {
            Commands::Init {
                name,
                description,
                folder,
                max_hours,
                start,
                end,
            } => init::run(init::InitOptions {
                name,
                description,
                folder,
                max_hours,
                start,
                end,
                dir: global.project,
                output,
            }),
            Commands::Start { name, description } => task::run_start(task::StartOptions {
                name,
                description,
                global,
            }),
            Commands::End { name } => task::run_end(task::EndOptions { name, global }),
            Commands::Focus { name, minutes } => task::run_focus(task::FocusOptions {
                name,
                minutes,
                global,
            }),
            Commands::Comment { name, text } => task::run_comment(task::CommentOptions {
                name,
                text,
                global,
            }),
            Commands::List { finished, mine } => task::run_list(task::ListOptions {
                finished,
                mine,
                global,
            }),
            Commands::Show { name } => task::run_show(task::ShowOptions { name, global }),
            Commands::Stats => task::run_stats(task::StatsOptions { global }),
            Commands::Developer(cmd) => match cmd {
                DeveloperCommands::Set {
                    name,
                    email,
                    hours_per_day,
                } => developer::run_set(developer::SetOptions {
                    name,
                    email,
                    hours_per_day,
                    output,
                }),
                DeveloperCommands::Show => developer::run_show(developer::ShowOptions {
                    developer: global.developer,
                    output,
                }),
            },
        }
    }
}
