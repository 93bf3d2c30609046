//! CLI command definitions using clap
//!
//! Defines all CLI subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Retry, timeout and check helpers for CI pipeline steps.
///
/// The process exit code is the step's outcome: the last attempt's code for
/// `retry`, 124 when `timeout` hits its deadline, 0/1 for checks.
#[derive(Parser, Debug)]
#[command(name = "cistep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Re-run a command with a fixed delay until it succeeds
    Retry(RetryArgs),

    /// Run a command in its own process group, killing the group at a deadline
    Timeout(TimeoutArgs),

    /// Check a precondition and exit 0 (pass) or 1 (fail)
    #[command(subcommand)]
    Check(CheckCommand),

    /// Show resolved configuration
    Config,
}

/// Program and arguments, taken verbatim after `--`
#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Command to run (program followed by its arguments)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Arguments for the `retry` subcommand
#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Total attempts including the first (default from config)
    #[arg(short = 'n', long)]
    pub attempts: Option<u32>,

    /// Seconds to wait between attempts, fractions allowed (default from config)
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Deadline in seconds applied to each attempt
    #[arg(short, long)]
    pub timeout: Option<u64>,

    #[command(flatten)]
    pub cmd: CommandArgs,
}

/// Arguments for the `timeout` subcommand
#[derive(Args, Debug)]
pub struct TimeoutArgs {
    /// Deadline in seconds (default from config)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Seconds between graceful and forceful termination (default from config)
    #[arg(long)]
    pub grace: Option<u64>,

    #[command(flatten)]
    pub cmd: CommandArgs,
}

/// Available checks
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Path exists and is a regular file
    File { path: PathBuf },

    /// Path exists and is a directory
    Dir { path: PathBuf },

    /// Program is available on PATH
    Command { name: String },

    /// Command exits with the expected code
    ExitCode {
        /// Expected exit code
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        expect: i32,

        #[command(flatten)]
        cmd: CommandArgs,
    },

    /// Command output (stdout + stderr) contains a substring
    Contains {
        /// Literal text to look for
        needle: String,

        #[command(flatten)]
        cmd: CommandArgs,
    },

    /// Command output (stdout + stderr) matches a regular expression
    Matches {
        /// Regular expression; ^ and $ anchor at line boundaries
        pattern: String,

        #[command(flatten)]
        cmd: CommandArgs,
    },
}
