//! cistep - Retry, timeout and check helpers for CI pipeline steps
//!
//! Wraps a command invocation with the behaviours a flaky CI step needs:
//! - **Retry** - re-run with a fixed delay until success or attempts run out
//! - **Timeout** - run in a fresh process group, killing the whole group at a
//!   deadline (graceful signal, grace period, then forceful)
//! - **Checks** - file/dir existence, command availability, exit-code and
//!   output predicates
//!
//! ## Features
//!
//! - Outcomes carry shell exit codes (124 on timeout, 127 on missing program)
//! - Explicit initialisation through [`CiSteps`], no ambient environment state
//! - XDG-compliant layered configuration for CLI defaults
//! - Process spawning behind a [`ProcessHost`] seam for testing
//!
//! ## Example
//!
//! ```no_run
//! use cistep::{CiSteps, Config, Invocation, RetryPolicy};
//! use std::time::Duration;
//!
//! let steps = CiSteps::init(&Config::default()).unwrap();
//! let policy = RetryPolicy::new(3, Duration::from_secs(2)).unwrap();
//! let outcome = steps
//!     .retry_blocking(&policy, &Invocation::new("make").arg("test"))
//!     .unwrap();
//! std::process::exit(outcome.code());
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod process;
pub mod steps;
pub mod toolkit;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{suggest_fix, StepError};
pub use executor::{
    exec_captured, CommandRunner, ExecOptions, ExecResult, Invocation, Outcome, SystemRunner,
};
pub use process::{GroupChild, ProcessHost, SystemHost, Termination};
pub use steps::{retry, run_with_timeout, RetryPolicy, TimeoutPolicy, TimeoutRunner};
pub use toolkit::CiSteps;
