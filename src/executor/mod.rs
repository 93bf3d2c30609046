//! Command execution module
//!
//! Provides:
//! - Typed invocations (program + argument vector, no shell)
//! - Outcome codes shared by every runner
//! - Inherited-stdio and captured-output execution

pub mod invocation;
pub mod outcome;
pub mod runner;
pub mod traits;

pub use invocation::Invocation;
pub use outcome::Outcome;
pub use runner::{block_on, exec_captured, ExecOptions, ExecResult, SystemRunner};
pub use traits::CommandRunner;
