//! Common test utilities for cistep integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use tempfile::TempDir;

/// `cistep` binary run from an empty directory, isolated from ambient config
///
/// The `./.cistep.toml` layer resolves against the working directory, so each
/// command runs inside its own temp dir.
pub fn cistep(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cistep").expect("cistep binary should be built");
    cmd.current_dir(dir)
        .env_remove("CISTEP_LOG")
        .env_remove("CISTEP_RETRY__MAX_ATTEMPTS")
        .env_remove("CISTEP_RETRY__DELAY_SECS")
        .env_remove("CISTEP_TIMEOUT__DEADLINE_SECS")
        .env_remove("CISTEP_TIMEOUT__GRACE_SECS");
    cmd
}

/// Creates an empty temporary working directory
pub fn workdir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().to_path_buf();
    (dir, path)
}

/// Creates a temporary directory holding a `.cistep.toml`
pub fn workdir_with_config(content: &str) -> (TempDir, PathBuf) {
    let (dir, path) = workdir();
    std::fs::write(path.join(".cistep.toml"), content).expect("Failed to write config");
    (dir, path)
}

/// Whether `pid` names a process that has not yet exited
///
/// Zombies count as dead: they have exited and only wait to be reaped by
/// their parent.
#[cfg(target_os = "linux")]
pub fn pid_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // Format: "pid (comm) state ..."; comm may contain spaces
        Ok(stat) => match stat.rfind(')') {
            Some(idx) => !stat[idx + 1..].trim_start().starts_with('Z'),
            None => false,
        },
        Err(_) => false,
    }
}

/// Poll for a file to appear, returning its trimmed contents
pub fn wait_for_file(path: &Path, timeout: Duration) -> Option<String> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Ok(content) = std::fs::read_to_string(path) {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    None
}

/// Poll until `pid` has gone, giving up after `timeout`
#[cfg(target_os = "linux")]
pub fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !pid_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    !pid_alive(pid)
}
