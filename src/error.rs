//! Error types for cistep
//!
//! Retry and timeout runners never surface these: they fold every failure
//! into an [`Outcome`](crate::executor::Outcome). Errors only escape from
//! construction (policies, invocations, patterns), configuration, and the
//! capture executor used by checks.

use thiserror::Error;

/// Exit code reported when a deadline elapses (same convention as coreutils `timeout`)
pub const TIMED_OUT_CODE: i32 = 124;

/// Exit code reported when a program exists but cannot be executed
pub const NOT_EXECUTABLE_CODE: i32 = 126;

/// Exit code reported when a program cannot be found
pub const NOT_FOUND_CODE: i32 = 127;

/// Main error type for step operations
#[derive(Error, Debug)]
pub enum StepError {
    /// Failed to spawn the command
    #[error("Failed to spawn command: {command}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Captured command did not finish in time
    #[error("Command timed out after {timeout_secs}s: {command}")]
    Timeout { command: String, timeout_secs: u64 },

    /// An invocation needs at least a program name
    #[error("Empty command: a program name is required")]
    EmptyCommand,

    /// Retry or timeout policy out of range
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// Regular expression given to an output check does not compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    /// Exit code a shell would report for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            StepError::SpawnFailed { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => NOT_FOUND_CODE,
                std::io::ErrorKind::PermissionDenied => NOT_EXECUTABLE_CODE,
                _ => 1,
            },
            StepError::Timeout { .. } => TIMED_OUT_CODE,
            _ => 1,
        }
    }

    /// Human-readable hint for fixing the failure, if one applies
    pub fn suggestion(&self) -> Option<String> {
        match self {
            StepError::SpawnFailed { command, source } => Some(format!(
                "Check that '{}' exists and is executable: {}",
                command.split_whitespace().next().unwrap_or(command),
                source
            )),
            StepError::Timeout { .. } => suggest_fix(TIMED_OUT_CODE),
            StepError::EmptyCommand => {
                Some("Pass the command after '--', e.g. `cistep retry -- make test`".to_string())
            }
            StepError::InvalidPattern { .. } => Some(
                "Patterns use Rust regex syntax (no look-around or backreferences)".to_string(),
            ),
            StepError::Config(_) => Some("Check your cistep configuration file".to_string()),
            StepError::InvalidPolicy(_) | StepError::Io(_) => None,
        }
    }
}

/// Suggest fixes for well-known exit codes
pub fn suggest_fix(exit_code: i32) -> Option<String> {
    match exit_code {
        TIMED_OUT_CODE => Some(
            "Command hit its deadline. Increase the timeout or check whether it hangs.".to_string(),
        ),
        NOT_EXECUTABLE_CODE => Some(
            "Command is not executable. Check file permissions (chmod +x).".to_string(),
        ),
        NOT_FOUND_CODE => {
            Some("Command not found. Check PATH and that the tool is installed.".to_string())
        }
        // SIGKILL from outside, commonly the OOM killer on CI runners
        137 => Some("Command was killed (SIGKILL). Check runner memory limits.".to_string()),
        _ => None,
    }
}
