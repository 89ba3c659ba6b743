//! teamlog - Team Worklog Library
//!
//! This library provides the core functionality for the teamlog CLI tool:
//! time tracking for a team that shares nothing but a folder.
//!
//! # Core Concepts
//!
//! - **Developer logs**: every developer owns `running.<dev>.json` and
//!   `finished.<dev>.json` and never writes anyone else's file
//! - **Merge**: reads fold every log of a state into one view, field by field
//! - **Projection**: writes persist only the slice of a task the developer is
//!   authoritative for
//! - **Ledger**: cached aggregate views plus start/join/end/focus/comment
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Project configuration from `.teamlog.toml`
//! - `developer`: Developer identity and profile
//! - `error`: Error types and result aliases
//! - `task`: Task records and ids
//! - `storage`: Shared folder layout and atomic writes
//! - `log`: Reading one developer log
//! - `reconcile`: Merge engine
//! - `projection`: Developer projection writer
//! - `ledger`: Aggregate cache and task operations
//! - `stats`: Working time statistics
//! - `output`: Human and JSON output

pub mod cli;
pub mod config;
pub mod developer;
pub mod error;
pub mod ledger;
pub mod log;
pub mod output;
pub mod projection;
pub mod reconcile;
pub mod stats;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
