//! Process-group capability used by the timeout runner
//!
//! Signal numbers and delivery targets differ between hosts, so the timeout
//! runner only speaks in terms of [`Termination`] severities and leaves the
//! mapping to the [`ProcessHost`] implementation.

use async_trait::async_trait;

use crate::error::StepError;
use crate::executor::{Invocation, Outcome};

/// Severity of a termination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Ask the group to exit (SIGTERM on Unix)
    Graceful,
    /// Kill unconditionally (SIGKILL on Unix)
    Forceful,
}

/// A spawned child that leads its own process group
#[async_trait]
pub trait GroupChild: Send {
    /// OS identifier of the leader, if it is still known
    fn id(&self) -> Option<u32>;

    /// Poll the leader without blocking; reaps it if it has exited
    fn try_wait(&mut self) -> std::io::Result<Option<Outcome>>;

    /// Wait for the leader to exit
    ///
    /// Must be cancel-safe: the timeout runner races it against a deadline.
    async fn wait(&mut self) -> std::io::Result<Outcome>;

    /// Deliver a termination signal to every member of the group
    fn signal_group(&mut self, severity: Termination) -> std::io::Result<()>;

    /// Whether any member of the group (leader or descendant) is still running
    fn group_alive(&mut self) -> bool;
}

/// Host facility able to spawn children into fresh process groups
pub trait ProcessHost: Send + Sync {
    /// Spawn `invocation` as the leader of a new process group
    ///
    /// # Errors
    /// * `StepError::SpawnFailed` - If the program could not be started
    fn spawn_group(&self, invocation: &Invocation) -> Result<Box<dyn GroupChild>, StepError>;
}

impl<H: ProcessHost + ?Sized> ProcessHost for &H {
    fn spawn_group(&self, invocation: &Invocation) -> Result<Box<dyn GroupChild>, StepError> {
        (**self).spawn_group(invocation)
    }
}
