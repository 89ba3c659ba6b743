//! Error types for teamlog
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, missing project or task, no developer identity)
//! - 3: Blocked by an engine invariant (foreign or stale task record)
//! - 4: Operation failed (io, serialization)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the teamlog CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const INVARIANT_VIOLATION: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for teamlog operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Project not found from {0}")]
    ProjectNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Developer identity not configured")]
    DeveloperNotConfigured,

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    // Engine invariants (exit code 3)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ProjectNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::DeveloperNotConfigured
            | Error::TaskNotFound(_) => exit_codes::USER_ERROR,

            Error::InvariantViolation(_) => exit_codes::INVARIANT_VIOLATION,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Stable label for the exit code class
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            exit_codes::INVARIANT_VIOLATION => "invariant_violation",
            _ => "operation_failed",
        }
    }

    /// Command to run next, when there is an obvious one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::ProjectNotFound(_) => Some("teamlog init <name>"),
            Error::DeveloperNotConfigured => Some("teamlog developer set <name>"),
            Error::InvalidConfig(_) => Some("fix .teamlog.toml then retry"),
            Error::TaskNotFound(_) | Error::InvariantViolation(_) => Some("teamlog list"),
            _ => None,
        }
    }

    /// Structured details for JSON error output, when the variant carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::ProjectNotFound(path) => Some(serde_json::json!({
                "searched_from": path.display().to_string(),
            })),
            Error::TaskNotFound(name) => Some(serde_json::json!({
                "task": name,
            })),
            _ => None,
        }
    }
}

/// Result type alias for teamlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            hint: err.hint(),
            details: err.details(),
        }
    }
}
