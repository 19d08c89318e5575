//! Error types for batchlimit
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//! - Separate types for executor preconditions and run failures

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for application operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Execution errors (5xx)
    ExecutionFailed = 500,
    MalformedTask = 501,
    ExecutionAborted = 502,

    // Manifest errors (6xx)
    ManifestNotFound = 600,
    ManifestParseError = 601,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            500..=599 => 50, // Execution errors
            600..=699 => 60, // Manifest errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────
// Executor Errors
// ─────────────────────────────────────────────────────────────────

/// Precondition violation detected before a run starts.
///
/// These are returned synchronously by [`crate::executor::run_limited`] and
/// [`crate::executor::LimitedRunBuilder::build`], never through the run future.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required argument was never supplied
    #[error("{param} can not be null or undefined")]
    Missing { param: &'static str },

    /// A numeric argument was given as something that does not parse as a number
    #[error("{param} must be a number, not {found}")]
    NotANumber { param: &'static str, found: &'static str },

    /// A numeric argument has a fractional part
    #[error("{param} must be a whole number")]
    NotAWholeNumber { param: &'static str },

    /// A numeric argument is below its lower bound
    #[error("{param} must be greater or equal to {min}")]
    BelowMinimum { param: &'static str, min: usize },

    /// A numeric argument does not fit the target integer type
    #[error("{param} must be less or equal to {max}")]
    AboveMaximum { param: &'static str, max: usize },
}

impl ConfigError {
    /// Name of the offending parameter
    pub fn param(&self) -> &'static str {
        match self {
            ConfigError::Missing { param }
            | ConfigError::NotANumber { param, .. }
            | ConfigError::NotAWholeNumber { param }
            | ConfigError::BelowMinimum { param, .. }
            | ConfigError::AboveMaximum { param, .. } => param,
        }
    }
}

/// Failure of a run that passed validation.
///
/// `E` is the error type produced by the task futures. Task errors are carried
/// unchanged so callers can recover the original value.
#[derive(Error, Debug)]
pub enum RunError<E> {
    /// A task future resolved with an error
    #[error("{0}")]
    Task(E),

    /// A queue entry could not be invoked
    #[error("task at position {position} is not runnable: {reason}")]
    MalformedTask { position: usize, reason: String },

    /// Every worker exited without settling the run
    #[error("run aborted: all workers exited before the run settled")]
    Aborted,
}

impl<E> RunError<E> {
    /// Return the task's own error, if that is what ended the run
    pub fn into_task_error(self) -> Option<E> {
        match self {
            RunError::Task(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the run ended on a task error rather than a malformed entry
    pub fn is_task_error(&self) -> bool {
        matches!(self, RunError::Task(_))
    }
}

// ─────────────────────────────────────────────────────────────────
// Application Error
// ─────────────────────────────────────────────────────────────────

/// Main error type for the binary and the job layer
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Executor precondition violated
    #[error("Invalid run parameters: {0}")]
    RunParameters(#[from] ConfigError),

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────

    /// A job failed
    #[error("Job '{job}' failed: {message}")]
    JobFailed { job: String, message: String },

    /// A job entry in the manifest had no runnable action
    #[error("Job at position {position} is not runnable: {reason}")]
    MalformedJob { position: usize, reason: String },

    /// The run ended without a result
    #[error("Run aborted before completion")]
    RunAborted,

    // ─────────────────────────────────────────────────────────────
    // Manifest Errors
    // ─────────────────────────────────────────────────────────────

    /// Manifest file not found
    #[error("Job manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    /// Manifest parse error
    #[error("Failed to parse job manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RunError<Error>> for Error {
    fn from(err: RunError<Error>) -> Self {
        match err {
            RunError::Task(e) => e,
            RunError::MalformedTask { position, reason } => Error::MalformedJob { position, reason },
            RunError::Aborted => Error::RunAborted,
        }
    }
}

/// Refine a file error code by what the OS reported
fn io_code(source: &std::io::Error, fallback: ErrorCode) -> ErrorCode {
    match source.kind() {
        std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
        std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
        _ => fallback,
    }
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::RunParameters(_) => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { source, .. } => io_code(source, ErrorCode::IoRead),
            Error::IoWrite { source, .. } => io_code(source, ErrorCode::IoWrite),
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::InternalError,

            Error::JobFailed { .. } => ErrorCode::ExecutionFailed,
            Error::MalformedJob { .. } => ErrorCode::MalformedTask,
            Error::RunAborted => ErrorCode::ExecutionAborted,

            Error::ManifestNotFound { .. } => ErrorCode::ManifestNotFound,
            Error::ManifestParse { .. } => ErrorCode::ManifestParseError,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'batchlimit config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'batchlimit config validate' to see details."
            ),
            Error::ConfigValidation { .. } | Error::RunParameters(_) => Some(
                "The concurrency limit must be a whole number of at least 1 (config 'runner.limit', BATCHLIMIT_LIMIT or --limit)."
            ),
            Error::MalformedJob { .. } => Some(
                "Each [[job]] needs exactly one of 'command', 'sleep_ms' or 'fail'."
            ),
            Error::ManifestNotFound { .. } => Some(
                "Check the manifest path passed to 'batchlimit run'."
            ),
            Error::ManifestParse { .. } => Some(
                "The manifest must be TOML with one [[job]] table per job."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a job failure
    pub fn job_failed(job: impl Into<String>, message: impl Into<String>) -> Self {
        Error::JobFailed {
            job: job.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::MalformedTask.as_str(), "E501");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigNotFound.exit_code(), 10);
        assert_eq!(ErrorCode::IoRead.exit_code(), 20);
        assert_eq!(ErrorCode::ExecutionFailed.exit_code(), 50);
        assert_eq!(ErrorCode::ManifestParseError.exit_code(), 60);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_config_error_messages_name_the_parameter() {
        assert_eq!(
            ConfigError::Missing { param: "tasks" }.to_string(),
            "tasks can not be null or undefined"
        );
        assert_eq!(
            ConfigError::NotANumber { param: "limit", found: "string" }.to_string(),
            "limit must be a number, not string"
        );
        assert_eq!(
            ConfigError::BelowMinimum { param: "limit", min: 1 }.to_string(),
            "limit must be greater or equal to 1"
        );
        assert_eq!(ConfigError::Missing { param: "limit" }.param(), "limit");
    }

    #[test]
    fn test_run_error_keeps_task_error() {
        let err: RunError<String> = RunError::Task("test-rejected".to_string());
        assert!(err.is_task_error());
        assert_eq!(err.to_string(), "test-rejected");
        assert_eq!(err.into_task_error().as_deref(), Some("test-rejected"));

        let err: RunError<String> = RunError::MalformedTask {
            position: 2,
            reason: "no action".to_string(),
        };
        assert!(!err.is_task_error());
        assert!(err.into_task_error().is_none());
    }

    #[test]
    fn test_run_error_into_app_error() {
        let err: Error = RunError::Task(Error::job_failed("build", "exit status 2")).into();
        assert_eq!(err.code(), ErrorCode::ExecutionFailed);

        let err: Error = RunError::<Error>::MalformedTask {
            position: 0,
            reason: "empty".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::MalformedTask);

        let err: Error = RunError::<Error>::Aborted.into();
        assert_eq!(err.code(), ErrorCode::ExecutionAborted);
    }

    #[test]
    fn test_run_parameters_from_config_error() {
        let err: Error = ConfigError::BelowMinimum { param: "limit", min: 1 }.into();
        assert_eq!(err.code(), ErrorCode::ConfigValidation);
        assert!(err.to_string().contains("limit must be greater or equal to 1"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::config_not_found("/test/config.toml");
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E100"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let err = Error::job_failed("lint", "exit status 1");
        let formatted = err.format_for_log();

        assert!(formatted.contains("[E500]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_io_code_follows_error_kind() {
        let denied = Error::IoWrite {
            path: PathBuf::from("/etc/batchlimit.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(denied.code(), ErrorCode::IoPermission);
        assert_eq!(denied.exit_code(), 20);

        let other = Error::IoRead {
            path: PathBuf::from("jobs.toml"),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "bad utf-8"),
        };
        assert_eq!(other.code(), ErrorCode::IoRead);
    }
}
