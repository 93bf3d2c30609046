//! Deadline-enforcing runner
//!
//! The command runs as the leader of its own process group. If it is still
//! running at the deadline, the whole group gets a graceful termination
//! signal, then a forceful one if any member survives the grace period.
//! Killing only the direct child would leave grandchildren behind.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, warn};

use super::policy::TimeoutPolicy;
use crate::executor::{CommandRunner, Invocation, Outcome};
use crate::process::{GroupChild, ProcessHost, Termination};

/// Step between liveness checks during the grace period
const GROUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on reaping the leader after the forceful signal
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `invocation` on `host`, terminating its process group at the deadline
///
/// Returns the child's own outcome if it exits in time, `Outcome::TimedOut`
/// otherwise. Spawn failures are reported as their shell exit code.
pub async fn run_with_timeout<H: ProcessHost + ?Sized>(
    host: &H,
    policy: &TimeoutPolicy,
    invocation: &Invocation,
) -> Outcome {
    let mut child = match host.spawn_group(invocation) {
        Ok(child) => child,
        Err(e) => {
            error!("{}", e);
            return Outcome::from_error(&e);
        }
    };

    tokio::select! {
        result = child.wait() => {
            return match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Failed to wait for {}: {}", invocation, e);
                    Outcome::Failed(1)
                }
            };
        }
        // `sleep` saturates to a far-future instant on overflow
        _ = sleep(policy.deadline()) => {}
    }

    error!(
        pid = ?child.id(),
        "{}; terminating process group",
        timed_out_message(policy, invocation)
    );
    terminate_group(&mut *child, policy.grace()).await;

    Outcome::TimedOut
}

fn timed_out_message(policy: &TimeoutPolicy, invocation: &Invocation) -> String {
    format!("Command timed out after {:?}: {}", policy.deadline(), invocation)
}

/// Escalate graceful -> forceful termination of the whole group
///
/// Delivery failures are logged and otherwise ignored.
async fn terminate_group(child: &mut dyn GroupChild, grace: Duration) {
    if let Err(e) = child.signal_group(Termination::Graceful) {
        debug!(error = %e, "Graceful signal to process group failed");
    }

    // None: the grace period runs past the end of the clock
    let grace_deadline = Instant::now().checked_add(grace);
    let mut alive = child.group_alive();
    while alive {
        let step = match grace_deadline {
            Some(end) => end.saturating_duration_since(Instant::now()),
            None => GROUP_POLL_INTERVAL,
        };
        if step.is_zero() {
            break;
        }
        sleep(GROUP_POLL_INTERVAL.min(step)).await;
        alive = child.group_alive();
    }

    if alive {
        warn!(
            pid = ?child.id(),
            "Process group still alive after {:?} grace period; sending forceful kill",
            grace
        );
        if let Err(e) = child.signal_group(Termination::Forceful) {
            debug!(error = %e, "Forceful signal to process group failed");
        }
    }

    match tokio::time::timeout(REAP_TIMEOUT, child.wait()).await {
        Ok(Ok(outcome)) => debug!("Timed-out leader exited with {}", outcome),
        Ok(Err(e)) => debug!(error = %e, "Failed to reap timed-out leader"),
        Err(_) => warn!(pid = ?child.id(), "Timed-out leader was not reaped"),
    }
}

/// [`CommandRunner`] that applies a deadline to every run
///
/// Lets the retry runner bound each attempt.
pub struct TimeoutRunner<H> {
    host: H,
    policy: TimeoutPolicy,
}

impl<H: ProcessHost> TimeoutRunner<H> {
    pub fn new(host: H, policy: TimeoutPolicy) -> Self {
        Self { host, policy }
    }

    pub fn policy(&self) -> &TimeoutPolicy {
        &self.policy
    }
}

#[async_trait]
impl<H: ProcessHost> CommandRunner for TimeoutRunner<H> {
    async fn run(&self, invocation: &Invocation) -> Outcome {
        run_with_timeout(&self.host, &self.policy, invocation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tokio::time::sleep_until;

    /// Signals delivered to a fake group, with the time since spawn
    type SignalLog = Arc<Mutex<Vec<(Termination, Duration)>>>;

    /// Scripted child: exits on its own after `runs_for`, or when a signal
    /// it does not ignore arrives
    struct FakeChild {
        spawned_at: Instant,
        runs_for: Duration,
        exit_code: i32,
        ignores_graceful: bool,
        killed_by: Option<Termination>,
        signals: SignalLog,
    }

    impl FakeChild {
        fn exit_at(&self) -> Instant {
            self.spawned_at + self.runs_for
        }

        fn finished(&self) -> Option<Outcome> {
            match self.killed_by {
                Some(Termination::Graceful) => Some(Outcome::Failed(143)),
                Some(Termination::Forceful) => Some(Outcome::Failed(137)),
                None if Instant::now() >= self.exit_at() => {
                    Some(Outcome::from_code(self.exit_code))
                }
                None => None,
            }
        }
    }

    #[async_trait]
    impl GroupChild for FakeChild {
        fn id(&self) -> Option<u32> {
            Some(4242)
        }

        fn try_wait(&mut self) -> io::Result<Option<Outcome>> {
            Ok(self.finished())
        }

        async fn wait(&mut self) -> io::Result<Outcome> {
            if let Some(outcome) = self.finished() {
                return Ok(outcome);
            }
            sleep_until(self.exit_at()).await;
            Ok(self.finished().unwrap_or(Outcome::from_code(self.exit_code)))
        }

        fn signal_group(&mut self, severity: Termination) -> io::Result<()> {
            self.signals
                .lock()
                .unwrap()
                .push((severity, self.spawned_at.elapsed()));
            if self.finished().is_some() {
                return Ok(());
            }
            if severity == Termination::Forceful || !self.ignores_graceful {
                self.killed_by = Some(severity);
            }
            Ok(())
        }

        fn group_alive(&mut self) -> bool {
            self.finished().is_none()
        }
    }

    struct FakeHost {
        runs_for: Duration,
        exit_code: i32,
        ignores_graceful: bool,
        signals: SignalLog,
    }

    impl FakeHost {
        fn new(runs_for: Duration, exit_code: i32) -> Self {
            Self {
                runs_for,
                exit_code,
                ignores_graceful: false,
                signals: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn ignoring_graceful(mut self) -> Self {
            self.ignores_graceful = true;
            self
        }

        fn signals(&self) -> Vec<(Termination, Duration)> {
            self.signals.lock().unwrap().clone()
        }
    }

    impl ProcessHost for FakeHost {
        fn spawn_group(&self, _invocation: &Invocation) -> Result<Box<dyn GroupChild>, StepError> {
            Ok(Box::new(FakeChild {
                spawned_at: Instant::now(),
                runs_for: self.runs_for,
                exit_code: self.exit_code,
                ignores_graceful: self.ignores_graceful,
                killed_by: None,
                signals: Arc::clone(&self.signals),
            }))
        }
    }

    struct BrokenHost;

    impl ProcessHost for BrokenHost {
        fn spawn_group(&self, invocation: &Invocation) -> Result<Box<dyn GroupChild>, StepError> {
            Err(StepError::SpawnFailed {
                command: invocation.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            })
        }
    }

    fn cmd() -> Invocation {
        Invocation::from_argv(["integration-tests", "--all"]).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_before_deadline_returns_own_outcome() {
        let host = FakeHost::new(Duration::from_millis(1500), 0);
        let policy = TimeoutPolicy::from_secs(5).unwrap();

        let start = Instant::now();
        let outcome = run_with_timeout(&host, &policy, &cmd()).await;

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
        assert!(host.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_before_deadline_is_transparent() {
        let host = FakeHost::new(Duration::from_secs(1), 3);
        let policy = TimeoutPolicy::from_secs(5).unwrap();

        let outcome = run_with_timeout(&host, &policy, &cmd()).await;

        assert_eq!(outcome, Outcome::Failed(3));
        assert!(host.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_signal_is_enough() {
        let host = FakeHost::new(Duration::from_secs(60), 0);
        let policy = TimeoutPolicy::from_secs(2).unwrap();

        let start = Instant::now();
        let outcome = run_with_timeout(&host, &policy, &cmd()).await;

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(
            host.signals(),
            vec![(Termination::Graceful, Duration::from_secs(2))]
        );
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalates_to_forceful_after_grace() {
        let host = FakeHost::new(Duration::from_secs(60), 0).ignoring_graceful();
        let policy = TimeoutPolicy::from_secs(2).unwrap();

        let start = Instant::now();
        let outcome = run_with_timeout(&host, &policy, &cmd()).await;

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(
            host.signals(),
            vec![
                (Termination::Graceful, Duration::from_secs(2)),
                (Termination::Forceful, Duration::from_secs(4)),
            ]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_grace_period() {
        let host = FakeHost::new(Duration::from_secs(60), 0).ignoring_graceful();
        let policy = TimeoutPolicy::from_secs(1)
            .unwrap()
            .with_grace(Duration::from_millis(500));

        let outcome = run_with_timeout(&host, &policy, &cmd()).await;

        assert_eq!(outcome, Outcome::TimedOut);
        let signals = host.signals();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[1], (Termination::Forceful, Duration::from_millis(1500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_deadline_waits_for_exit() {
        let host = FakeHost::new(Duration::from_secs(3), 0);
        let policy = TimeoutPolicy::from_secs(u64::MAX).unwrap();

        let start = Instant::now();
        let outcome = run_with_timeout(&host, &policy, &cmd()).await;

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert!(host.signals().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_grace_stops_once_group_exits() {
        let host = FakeHost::new(Duration::from_secs(60), 0);
        let policy = TimeoutPolicy::from_secs(1)
            .unwrap()
            .with_grace(Duration::MAX);

        let outcome = run_with_timeout(&host, &policy, &cmd()).await;

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(
            host.signals(),
            vec![(Termination::Graceful, Duration::from_secs(1))]
        );
    }

    #[test]
    fn test_timed_out_message_keeps_sub_second_deadline() {
        let policy = TimeoutPolicy::new(Duration::from_millis(500)).unwrap();
        assert_eq!(
            timed_out_message(&policy, &cmd()),
            "Command timed out after 500ms: integration-tests --all"
        );

        let policy = TimeoutPolicy::from_secs(2).unwrap();
        assert!(timed_out_message(&policy, &cmd()).contains("after 2s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_failure_maps_to_exit_code() {
        let policy = TimeoutPolicy::from_secs(5).unwrap();

        let outcome = run_with_timeout(&BrokenHost, &policy, &cmd()).await;

        assert_eq!(outcome, Outcome::Failed(127));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_runner_as_command_runner() {
        let runner = TimeoutRunner::new(
            FakeHost::new(Duration::from_secs(30), 0),
            TimeoutPolicy::from_secs(1).unwrap(),
        );
        assert_eq!(runner.policy().deadline(), Duration::from_secs(1));

        let outcome = runner.run(&cmd()).await;
        assert_eq!(outcome, Outcome::TimedOut);
    }
}
