//! Process groups on the local host
//!
//! On Unix every child is placed in a new process group (`setpgid(0, 0)`)
//! whose id equals the child's pid, and termination signals go to the whole
//! group with `killpg`. Elsewhere there are no process groups, so only the
//! direct child can be killed.

use std::io;

use async_trait::async_trait;
use tokio::process::Child;

use super::traits::{GroupChild, ProcessHost, Termination};
use crate::error::StepError;
use crate::executor::{Invocation, Outcome};

/// Spawns children through `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl ProcessHost for SystemHost {
    fn spawn_group(&self, invocation: &Invocation) -> Result<Box<dyn GroupChild>, StepError> {
        let mut cmd = invocation.to_command();
        #[cfg(unix)]
        cmd.process_group(0);
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| StepError::SpawnFailed {
            command: invocation.to_string(),
            source: e,
        })?;

        let pgid = child.id();
        tracing::debug!(pid = ?pgid, "Spawned {} in new process group", invocation);

        Ok(Box::new(SystemGroupChild { child, pgid }))
    }
}

/// Send a termination signal to every member of process group `pgid`
///
/// A group that no longer exists is not an error.
#[cfg(unix)]
pub fn signal_process_group(pgid: u32, severity: Termination) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let signal = match severity {
        Termination::Graceful => Signal::SIGTERM,
        Termination::Forceful => Signal::SIGKILL,
    };

    match killpg(Pid::from_raw(pgid as i32), signal) {
        // Group already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

/// Leader of a process group spawned by [`SystemHost`]
struct SystemGroupChild {
    child: Child,
    /// Captured at spawn time; tokio forgets the pid once the leader is reaped,
    /// but descendants can keep the group alive after that
    pgid: Option<u32>,
}

#[async_trait]
impl GroupChild for SystemGroupChild {
    fn id(&self) -> Option<u32> {
        self.pgid
    }

    fn try_wait(&mut self) -> io::Result<Option<Outcome>> {
        Ok(self.child.try_wait()?.map(Outcome::from_status))
    }

    async fn wait(&mut self) -> io::Result<Outcome> {
        Ok(Outcome::from_status(self.child.wait().await?))
    }

    #[cfg(unix)]
    fn signal_group(&mut self, severity: Termination) -> io::Result<()> {
        match self.pgid {
            Some(pgid) => signal_process_group(pgid, severity),
            None => Ok(()),
        }
    }

    #[cfg(not(unix))]
    fn signal_group(&mut self, _severity: Termination) -> io::Result<()> {
        match self.child.start_kill() {
            Err(e) if e.kind() != io::ErrorKind::InvalidInput => Err(e),
            _ => Ok(()),
        }
    }

    #[cfg(unix)]
    fn group_alive(&mut self) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        // A zombie leader still counts as a group member until reaped
        let _ = self.child.try_wait();

        let Some(pgid) = self.pgid else {
            return false;
        };
        match killpg(Pid::from_raw(pgid as i32), None::<Signal>) {
            Ok(()) => true,
            Err(Errno::ESRCH) => false,
            // EPERM: members exist but belong to someone else
            Err(_) => true,
        }
    }

    #[cfg(not(unix))]
    fn group_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_group_leader_owns_its_group() {
        let host = SystemHost;
        let mut child = host
            .spawn_group(&Invocation::new("sleep").arg("5"))
            .expect("spawn sleep");

        let pid = child.id().expect("pid");
        let pgid = nix::unistd::getpgid(Some(nix::unistd::Pid::from_raw(pid as i32)))
            .expect("getpgid");
        assert_eq!(pgid.as_raw(), pid as i32);
        assert_ne!(pgid, nix::unistd::getpgrp());

        child.signal_group(Termination::Forceful).unwrap();
        let outcome = child.wait().await.unwrap();
        assert_eq!(outcome, Outcome::Failed(137));
        assert!(!child.group_alive());
    }

    #[tokio::test]
    async fn test_signal_after_exit_is_swallowed() {
        let host = SystemHost;
        let mut child = host.spawn_group(&Invocation::new("true")).expect("spawn true");

        assert_eq!(child.wait().await.unwrap(), Outcome::Success);
        assert!(!child.group_alive());
        assert!(child.signal_group(Termination::Graceful).is_ok());
        assert!(child.signal_group(Termination::Forceful).is_ok());
    }

    #[tokio::test]
    async fn test_try_wait_after_exit_returns_cached_outcome() {
        let host = SystemHost;
        let mut child = host
            .spawn_group(&Invocation::new("sh").arg("-c").arg("exit 4"))
            .expect("spawn sh");

        assert_eq!(child.wait().await.unwrap(), Outcome::Failed(4));
        assert_eq!(child.try_wait().unwrap(), Some(Outcome::Failed(4)));
    }

    #[test]
    fn test_spawn_missing_program() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let _guard = rt.enter();

        match SystemHost.spawn_group(&Invocation::new("nonexistent_command_12345")) {
            Err(err @ StepError::SpawnFailed { .. }) => assert_eq!(err.exit_code(), 127),
            Err(e) => panic!("Unexpected error: {:?}", e),
            Ok(_) => panic!("Expected SpawnFailed error"),
        }
    }
}
