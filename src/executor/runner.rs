//! Command execution backends
//!
//! Two ways to run an [`Invocation`]:
//! - [`SystemRunner`] inherits stdio so a CI log shows the child's output live
//! - [`exec_captured`] captures stdout/stderr (with truncation) for checks

use std::future::Future;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use super::invocation::Invocation;
use super::outcome::Outcome;
use super::traits::CommandRunner;
use crate::error::StepError;
#[cfg(unix)]
use crate::process::group::signal_process_group;
#[cfg(unix)]
use crate::process::Termination;

/// Maximum output size before truncation (in bytes)
const MAX_OUTPUT_SIZE: usize = 100_000; // 100KB

/// Bytes requested from a pipe per read
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Truncation marker for large outputs
const TRUNCATION_MARKER: &str = "\n... [output truncated] ...\n";

/// Options for captured execution
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Timeout duration (None = no timeout)
    pub timeout: Option<Duration>,
    /// Maximum output size before truncation
    pub max_output_size: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_output_size: MAX_OUTPUT_SIZE,
        }
    }
}

impl ExecOptions {
    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set timeout in seconds; zero disables it
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        if secs == 0 {
            self
        } else {
            self.with_timeout(Duration::from_secs(secs))
        }
    }

    /// Set maximum output size
    pub fn with_max_output(mut self, size: usize) -> Self {
        self.max_output_size = size;
        self
    }
}

/// Result of captured execution
#[derive(Debug)]
pub struct ExecResult {
    /// How the command ended
    pub outcome: Outcome,
    /// Standard output (may be truncated)
    pub stdout: String,
    /// Whether stdout was truncated
    pub stdout_truncated: bool,
    /// Standard error
    pub stderr: String,
    /// Whether stderr was truncated
    pub stderr_truncated: bool,
    /// Duration of execution
    pub duration: Duration,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Stdout followed by stderr, the way `cmd 2>&1` would be grepped
    pub fn combined_output(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }
}

/// Execute an invocation with captured output
///
/// # Errors
/// * `StepError::SpawnFailed` - If the command couldn't be spawned
/// * `StepError::Timeout` - If the command outlived `options.timeout`
pub async fn exec_captured(
    invocation: &Invocation,
    options: &ExecOptions,
) -> Result<ExecResult, StepError> {
    let start = Instant::now();

    let mut cmd = invocation.to_command();
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true); // Kill process if future is dropped
    // Own group, so a timeout also reaches background grandchildren
    #[cfg(unix)]
    cmd.process_group(0);

    tracing::debug!("Executing captured: {}", invocation);

    let child = cmd.spawn().map_err(|e| StepError::SpawnFailed {
        command: invocation.to_string(),
        source: e,
    })?;
    let pgid = child.id();

    let result = if let Some(timeout_duration) = options.timeout {
        match timeout(timeout_duration, wait_for_output(child, options.max_output_size)).await {
            Ok(result) => result?,
            Err(_) => {
                kill_group(pgid);
                return Err(StepError::Timeout {
                    command: invocation.to_string(),
                    timeout_secs: timeout_duration.as_secs(),
                });
            }
        }
    } else {
        wait_for_output(child, options.max_output_size).await?
    };

    Ok(ExecResult {
        outcome: result.outcome,
        stdout: result.stdout,
        stdout_truncated: result.stdout_truncated,
        stderr: result.stderr,
        stderr_truncated: result.stderr_truncated,
        duration: start.elapsed(),
    })
}

/// Internal result from waiting for process output
struct WaitResult {
    outcome: Outcome,
    stdout: String,
    stderr: String,
    stdout_truncated: bool,
    stderr_truncated: bool,
}

/// Wait for a child process and capture its output
async fn wait_for_output(
    mut child: tokio::process::Child,
    max_output_size: usize,
) -> Result<WaitResult, StepError> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // Read stdout and stderr concurrently
    let stdout_handle = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            read_and_truncate(stdout, max_output_size).await
        } else {
            (String::new(), false)
        }
    });

    let stderr_handle = tokio::spawn(async move {
        if let Some(stderr) = stderr {
            read_and_truncate(stderr, max_output_size).await
        } else {
            (String::new(), false)
        }
    });

    let status = child.wait().await?;

    let (stdout, stdout_truncated) = stdout_handle
        .await
        .map_err(|e| StepError::Io(std::io::Error::other(format!("stdout task failed: {}", e))))?;

    let (stderr, stderr_truncated) = stderr_handle
        .await
        .map_err(|e| StepError::Io(std::io::Error::other(format!("stderr task failed: {}", e))))?;

    Ok(WaitResult {
        outcome: Outcome::from_status(status),
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    })
}

/// Kill every member of a timed-out capture's process group
#[cfg(unix)]
fn kill_group(pgid: Option<u32>) {
    let Some(pgid) = pgid else {
        return;
    };
    if let Err(e) = signal_process_group(pgid, Termination::Forceful) {
        tracing::debug!(error = %e, "Failed to kill process group {}", pgid);
    }
}

/// Without process groups only the direct child is killed, on drop
#[cfg(not(unix))]
fn kill_group(_pgid: Option<u32>) {}

/// Read raw bytes from an async reader, keeping at most `max_size`
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the read,
/// and the reader is drained past the limit so a chatty child never blocks
/// on a full pipe.
async fn read_and_truncate<R: AsyncRead + Unpin>(mut reader: R, max_size: usize) -> (String, bool) {
    let mut output = Vec::with_capacity(max_size.min(64 * 1024));
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    let mut truncated = false;

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break, // EOF
            Ok(n) => {
                let room = max_size.saturating_sub(output.len());
                if n > room {
                    output.extend_from_slice(&chunk[..room]);
                    truncated = true;
                } else {
                    output.extend_from_slice(&chunk[..n]);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("Error reading output: {}", e);
                break;
            }
        }
    }

    let mut text = String::from_utf8_lossy(&output).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    (text, truncated)
}

/// Drive a future to completion from synchronous code
///
/// Builds a fresh current-thread runtime, so it must not be called from
/// inside another runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, StepError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(StepError::Io)?;

    Ok(rt.block_on(future))
}

/// Runs commands with inherited stdio and no deadline
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Outcome {
        tracing::debug!("Executing: {}", invocation);

        let mut child = match invocation.to_command().kill_on_drop(true).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to spawn {}: {}", invocation, e);
                return Outcome::from_error(&StepError::SpawnFailed {
                    command: invocation.to_string(),
                    source: e,
                });
            }
        };

        match child.wait().await {
            Ok(status) => Outcome::from_status(status),
            Err(e) => {
                tracing::error!("Failed to wait for {}: {}", invocation, e);
                Outcome::Failed(1)
            }
        }
    }
}
