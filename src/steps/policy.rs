//! Per-call retry and timeout policies

use std::time::Duration;

use crate::error::StepError;

/// Grace period between the graceful and forceful termination signals
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// # Errors
    /// * `StepError::InvalidPolicy` - If `max_attempts` is zero
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, StepError> {
        if max_attempts == 0 {
            return Err(StepError::InvalidPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    /// Build from a delay in (possibly fractional) seconds
    ///
    /// # Errors
    /// * `StepError::InvalidPolicy` - If `max_attempts` is zero or the delay is
    ///   negative, NaN, or too large
    pub fn from_secs(max_attempts: u32, delay_secs: f64) -> Result<Self, StepError> {
        let delay = Duration::try_from_secs_f64(delay_secs).map_err(|_| {
            StepError::InvalidPolicy(format!(
                "delay must be a non-negative number of seconds, got {}",
                delay_secs
            ))
        })?;
        Self::new(max_attempts, delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Deadline policy for the timeout runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    deadline: Duration,
    grace: Duration,
}

impl TimeoutPolicy {
    /// Deadline with the default 2 second grace period
    ///
    /// # Errors
    /// * `StepError::InvalidPolicy` - If `deadline` is zero
    pub fn new(deadline: Duration) -> Result<Self, StepError> {
        if deadline.is_zero() {
            return Err(StepError::InvalidPolicy(
                "deadline must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            deadline,
            grace: DEFAULT_GRACE_PERIOD,
        })
    }

    /// # Errors
    /// * `StepError::InvalidPolicy` - If `deadline_secs` is zero
    pub fn from_secs(deadline_secs: u64) -> Result<Self, StepError> {
        Self::new(Duration::from_secs(deadline_secs))
    }

    /// Override the grace period between graceful and forceful termination
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }
}
