//! Outcome of running a command once

use std::fmt;
use std::process::ExitStatus;

use crate::error::{StepError, TIMED_OUT_CODE};

/// Result code of a single run, retry sequence, or timed run
///
/// `TimedOut` is a separate variant even though its numeric code (124) can
/// also be produced by an ordinary command exiting with 124.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(i32),
    TimedOut,
}

impl Outcome {
    /// Map a raw exit code; zero is success
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Outcome::Success
        } else {
            Outcome::Failed(code)
        }
    }

    /// Map an exit status; death by signal `n` becomes `128 + n`
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::from_code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Outcome::Failed(128 + signal);
            }
        }

        Outcome::Failed(1)
    }

    /// Fold an error into the code a shell would report for it
    pub fn from_error(err: &StepError) -> Self {
        match err {
            StepError::Timeout { .. } => Outcome::TimedOut,
            other => Self::from_code(other.exit_code()),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed(code) => *code,
            Outcome::TimedOut => TIMED_OUT_CODE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failed(code) => write!(f, "exit code {}", code),
            Outcome::TimedOut => write!(f, "timed out"),
        }
    }
}
