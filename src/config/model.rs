//! Configuration model for cistep
//!
//! Supplies defaults for the CLI. Library calls always take explicit
//! policies; nothing here is consulted behind the caller's back.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::executor::ExecOptions;
use crate::steps::{RetryPolicy, TimeoutPolicy};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Retry defaults
    #[serde(default)]
    pub retry: RetryConfig,

    /// Timeout defaults
    #[serde(default)]
    pub timeout: TimeoutConfig,

    /// Output/exit-code check settings
    #[serde(default)]
    pub checks: ChecksConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retry defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_secs() -> f64 {
    5.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RetryConfig {
    /// Validated policy from these settings
    pub fn policy(&self) -> Result<RetryPolicy, StepError> {
        RetryPolicy::from_secs(self.max_attempts, self.delay_secs)
    }
}

/// Timeout defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    /// Deadline in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Seconds between graceful and forceful termination
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

fn default_deadline_secs() -> u64 {
    300
}

fn default_grace_secs() -> u64 {
    2
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline_secs(),
            grace_secs: default_grace_secs(),
        }
    }
}

impl TimeoutConfig {
    /// Validated policy from these settings
    pub fn policy(&self) -> Result<TimeoutPolicy, StepError> {
        Ok(TimeoutPolicy::from_secs(self.deadline_secs)?
            .with_grace(Duration::from_secs(self.grace_secs)))
    }
}

/// Settings for checks that run a command
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChecksConfig {
    /// Capture timeout in seconds (0 = none)
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,
}

fn default_capture_timeout_secs() -> u64 {
    60
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            capture_timeout_secs: default_capture_timeout_secs(),
        }
    }
}

impl ChecksConfig {
    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions::default().with_timeout_secs(self.capture_timeout_secs)
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default level filter (overridden by `-v` and `CISTEP_LOG`)
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}
