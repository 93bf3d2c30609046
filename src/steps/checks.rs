//! Predicate checks for CI steps
//!
//! Each check answers yes/no and logs an error line when the answer is no,
//! so a pipeline step can gate on it directly.
//!
//! Output checks run the command with captured stdout+stderr (see
//! [`exec_captured`]) and inspect the combined text.

use std::path::Path;

use regex::RegexBuilder;
use tracing::{debug, error};

use crate::error::StepError;
use crate::executor::{exec_captured, ExecOptions, ExecResult, Invocation};

/// Path exists and is a regular file (symlinks followed)
pub fn file_exists(path: &Path) -> bool {
    if path.is_file() {
        debug!("File exists: {}", path.display());
        true
    } else {
        error!("File not found: {}", path.display());
        false
    }
}

/// Path exists and is a directory (symlinks followed)
pub fn dir_exists(path: &Path) -> bool {
    if path.is_dir() {
        debug!("Directory exists: {}", path.display());
        true
    } else {
        error!("Directory not found: {}", path.display());
        false
    }
}

/// Program resolves on `PATH` (or is an executable path)
pub fn command_available(name: &str) -> bool {
    match which::which(name) {
        Ok(path) => {
            debug!("Command {} found at {}", name, path.display());
            true
        }
        Err(e) => {
            error!("Command not available: {} ({})", name, e);
            false
        }
    }
}

/// Command exits with exactly `expected`
pub async fn expect_exit_code(
    invocation: &Invocation,
    expected: i32,
    options: &ExecOptions,
) -> bool {
    let Some(result) = run_for_check(invocation, options).await else {
        return false;
    };

    let actual = result.outcome.code();
    if actual == expected {
        true
    } else {
        error!(
            "Expected exit code {} but got {}: {}",
            expected, actual, invocation
        );
        false
    }
}

/// Combined output contains `needle` as a plain substring
pub async fn output_contains(
    invocation: &Invocation,
    needle: &str,
    options: &ExecOptions,
) -> bool {
    let Some(result) = run_for_check(invocation, options).await else {
        return false;
    };

    if result.combined_output().contains(needle) {
        true
    } else {
        error!("Output of {} does not contain '{}'", invocation, needle);
        false
    }
}

/// Combined output matches the regular expression `pattern`
///
/// `^` and `$` anchor at line boundaries, the way grep applies a pattern.
///
/// # Errors
/// * `StepError::InvalidPattern` - If `pattern` does not compile; the
///   command is not run in that case
pub async fn output_matches(
    invocation: &Invocation,
    pattern: &str,
    options: &ExecOptions,
) -> Result<bool, StepError> {
    let re = RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|source| StepError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

    let Some(result) = run_for_check(invocation, options).await else {
        return Ok(false);
    };

    if re.is_match(&result.combined_output()) {
        Ok(true)
    } else {
        error!("Output of {} does not match /{}/", invocation, pattern);
        Ok(false)
    }
}

/// Run for a check; the command's own exit code does not fail the check
async fn run_for_check(invocation: &Invocation, options: &ExecOptions) -> Option<ExecResult> {
    match exec_captured(invocation, options).await {
        Ok(result) => {
            if result.stdout_truncated || result.stderr_truncated {
                debug!("Output of {} was truncated before matching", invocation);
            }
            Some(result)
        }
        Err(e) => {
            match e.suggestion() {
                Some(hint) => error!("{}. {}", e, hint),
                None => error!("{}", e),
            }
            None
        }
    }
}
