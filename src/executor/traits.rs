//! Runner seam shared by the retry loop and its backends

use async_trait::async_trait;

use super::invocation::Invocation;
use super::outcome::Outcome;

/// Runs an invocation once and reports how it ended
///
/// Implementations never fail: spawn errors and deadlines are folded into
/// the returned [`Outcome`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion
    async fn run(&self, invocation: &Invocation) -> Outcome;
}
