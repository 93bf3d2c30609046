//! CLI module for cistep
//!
//! Provides command-line interface with the following subcommands:
//! - `retry` - Re-run a command until it succeeds
//! - `timeout` - Run a command under a deadline
//! - `check` - File, directory, command, exit-code and output checks
//! - `config` - Show configuration

pub mod commands;

pub use commands::{CheckCommand, Cli, Commands};
