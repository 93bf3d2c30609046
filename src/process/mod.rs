//! Process-group management
//!
//! Provides the capability the timeout runner needs from the host:
//! - Spawn a command as the leader of a new process group
//! - Poll and wait for the leader
//! - Signal the whole group (graceful, then forceful)

pub mod group;
pub mod traits;

pub use group::SystemHost;
pub use traits::{GroupChild, ProcessHost, Termination};
