//! Explicitly initialised handle over the step operations
//!
//! A consuming process calls [`CiSteps::init`] once and keeps the handle;
//! nothing is inherited through the environment.

use std::path::Path;

use crate::config::Config;
use crate::error::StepError;
use crate::executor::{block_on, ExecOptions, Invocation, Outcome, SystemRunner};
use crate::process::{ProcessHost, SystemHost};
use crate::steps::{
    checks, retry, run_with_timeout, RetryPolicy, TimeoutPolicy, TimeoutRunner,
};

/// Step operations bound to a process host and configured defaults
pub struct CiSteps<H = SystemHost> {
    host: H,
    retry_policy: RetryPolicy,
    timeout_policy: TimeoutPolicy,
    exec_options: ExecOptions,
}

impl CiSteps<SystemHost> {
    /// Build a handle over the local host
    ///
    /// # Errors
    /// * `StepError::InvalidPolicy` - If the configured defaults are out of range
    pub fn init(config: &Config) -> Result<Self, StepError> {
        Self::with_host(SystemHost, config)
    }
}

impl<H: ProcessHost> CiSteps<H> {
    /// Build a handle over a custom process host
    ///
    /// # Errors
    /// * `StepError::InvalidPolicy` - If the configured defaults are out of range
    pub fn with_host(host: H, config: &Config) -> Result<Self, StepError> {
        Ok(Self {
            host,
            retry_policy: config.retry.policy()?,
            timeout_policy: config.timeout.policy()?,
            exec_options: config.checks.exec_options(),
        })
    }

    /// Retry policy from configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Timeout policy from configuration
    pub fn timeout_policy(&self) -> TimeoutPolicy {
        self.timeout_policy
    }

    pub fn exec_options(&self) -> &ExecOptions {
        &self.exec_options
    }

    /// Retry with inherited stdio and no per-attempt deadline
    pub async fn retry(&self, policy: &RetryPolicy, invocation: &Invocation) -> Outcome {
        retry(policy, &SystemRunner, invocation).await
    }

    /// Run once under a deadline, in a fresh process group
    pub async fn run_with_timeout(
        &self,
        policy: &TimeoutPolicy,
        invocation: &Invocation,
    ) -> Outcome {
        run_with_timeout(&self.host, policy, invocation).await
    }

    /// Retry where every attempt runs under its own deadline
    pub async fn retry_with_timeout(
        &self,
        retry_policy: &RetryPolicy,
        timeout_policy: &TimeoutPolicy,
        invocation: &Invocation,
    ) -> Outcome {
        let runner = TimeoutRunner::new(&self.host, *timeout_policy);
        retry(retry_policy, &runner, invocation).await
    }

    /// Blocking form of [`CiSteps::retry`] for non-async callers
    pub fn retry_blocking(
        &self,
        policy: &RetryPolicy,
        invocation: &Invocation,
    ) -> Result<Outcome, StepError> {
        block_on(self.retry(policy, invocation))
    }

    /// Blocking form of [`CiSteps::run_with_timeout`] for non-async callers
    pub fn run_with_timeout_blocking(
        &self,
        policy: &TimeoutPolicy,
        invocation: &Invocation,
    ) -> Result<Outcome, StepError> {
        block_on(self.run_with_timeout(policy, invocation))
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        checks::file_exists(path)
    }

    pub fn dir_exists(&self, path: &Path) -> bool {
        checks::dir_exists(path)
    }

    pub fn command_available(&self, name: &str) -> bool {
        checks::command_available(name)
    }

    pub async fn expect_exit_code(&self, invocation: &Invocation, expected: i32) -> bool {
        checks::expect_exit_code(invocation, expected, &self.exec_options).await
    }

    pub async fn output_contains(&self, invocation: &Invocation, needle: &str) -> bool {
        checks::output_contains(invocation, needle, &self.exec_options).await
    }

    /// # Errors
    /// * `StepError::InvalidPattern` - If `pattern` does not compile
    pub async fn output_matches(
        &self,
        invocation: &Invocation,
        pattern: &str,
    ) -> Result<bool, StepError> {
        checks::output_matches(invocation, pattern, &self.exec_options).await
    }
}
