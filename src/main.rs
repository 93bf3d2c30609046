//! cistep CLI entry point
//!
//! Usage:
//!   cistep retry [-n N] [-d SECS] [-t SECS] -- <cmd..>   Retry until success
//!   cistep timeout [-t SECS] [--grace SECS] -- <cmd..>   Run under a deadline
//!   cistep check <kind> ...                              Precondition checks
//!   cistep config                                        Show configuration

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cistep::cli::{
    commands::{RetryArgs, TimeoutArgs},
    CheckCommand, Cli, Commands,
};
use cistep::config::{load_config, Config};
use cistep::executor::{Invocation, Outcome};
use cistep::steps::{RetryPolicy, TimeoutPolicy};
use cistep::{logging, CiSteps};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    logging::init(&config.logging.level, cli.verbose);

    match cli.command {
        Commands::Retry(args) => run_retry(args, &config).await,
        Commands::Timeout(args) => run_timeout(args, &config).await,
        Commands::Check(check) => run_check(check, &config).await,
        Commands::Config => {
            show_config(&config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Retry a command, optionally bounding each attempt with a deadline
async fn run_retry(args: RetryArgs, config: &Config) -> Result<ExitCode> {
    let steps = CiSteps::init(config).context("Invalid configuration")?;
    let invocation = Invocation::from_argv(args.cmd.command)?;

    let policy = RetryPolicy::from_secs(
        args.attempts.unwrap_or(config.retry.max_attempts),
        args.delay.unwrap_or(config.retry.delay_secs),
    )?;

    let outcome = match args.timeout {
        Some(secs) => {
            let timeout =
                TimeoutPolicy::from_secs(secs)?.with_grace(steps.timeout_policy().grace());
            steps.retry_with_timeout(&policy, &timeout, &invocation).await
        }
        None => steps.retry(&policy, &invocation).await,
    };

    Ok(exit_with(outcome))
}

/// Run a command once under a deadline
async fn run_timeout(args: TimeoutArgs, config: &Config) -> Result<ExitCode> {
    let steps = CiSteps::init(config).context("Invalid configuration")?;
    let invocation = Invocation::from_argv(args.cmd.command)?;

    let mut policy = match args.timeout {
        Some(secs) => TimeoutPolicy::from_secs(secs)?.with_grace(steps.timeout_policy().grace()),
        None => steps.timeout_policy(),
    };
    if let Some(grace) = args.grace {
        policy = policy.with_grace(Duration::from_secs(grace));
    }

    let outcome = steps.run_with_timeout(&policy, &invocation).await;

    Ok(exit_with(outcome))
}

/// Evaluate a check and map pass/fail onto 0/1
async fn run_check(check: CheckCommand, config: &Config) -> Result<ExitCode> {
    let steps = CiSteps::init(config).context("Invalid configuration")?;

    let passed = match check {
        CheckCommand::File { path } => steps.file_exists(&path),
        CheckCommand::Dir { path } => steps.dir_exists(&path),
        CheckCommand::Command { name } => steps.command_available(&name),
        CheckCommand::ExitCode { expect, cmd } => {
            let invocation = Invocation::from_argv(cmd.command)?;
            steps.expect_exit_code(&invocation, expect).await
        }
        CheckCommand::Contains { needle, cmd } => {
            let invocation = Invocation::from_argv(cmd.command)?;
            steps.output_contains(&invocation, &needle).await
        }
        CheckCommand::Matches { pattern, cmd } => {
            let invocation = Invocation::from_argv(cmd.command)?;
            steps.output_matches(&invocation, &pattern).await?
        }
    };

    tracing::debug!("Check {}", if passed { "passed" } else { "failed" });

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print resolved configuration as TOML
fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

/// Process exit code carrying the step's outcome
fn exit_with(outcome: Outcome) -> ExitCode {
    ExitCode::from(exit_byte(outcome.code()))
}

fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
