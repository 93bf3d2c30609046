//! Fixed-delay retry runner
//!
//! One attempt is in flight at a time. Between failed attempts the runner
//! sleeps for the policy delay; it never sleeps after the last attempt.

use tracing::{error, info, warn};

use super::policy::RetryPolicy;
use crate::error::suggest_fix;
use crate::executor::{CommandRunner, Invocation, Outcome};

/// Run `invocation` through `runner` until it succeeds or attempts run out
///
/// Returns `Outcome::Success` from the first successful attempt, otherwise
/// the outcome of the last attempt.
pub async fn retry<R: CommandRunner + ?Sized>(
    policy: &RetryPolicy,
    runner: &R,
    invocation: &Invocation,
) -> Outcome {
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        let outcome = runner.run(invocation).await;

        if outcome.is_success() {
            if attempt > 1 {
                info!("Succeeded on attempt {}/{}: {}", attempt, max_attempts, invocation);
            }
            return outcome;
        }

        if attempt >= max_attempts {
            match suggest_fix(outcome.code()) {
                Some(hint) => error!(
                    "Command failed after {} attempt(s) ({}): {}. {}",
                    max_attempts, outcome, invocation, hint
                ),
                None => error!(
                    "Command failed after {} attempt(s) ({}): {}",
                    max_attempts, outcome, invocation
                ),
            }
            return outcome;
        }

        warn!(
            "Attempt {}/{} failed ({}): {}; retrying in {:?}",
            attempt,
            max_attempts,
            outcome,
            invocation,
            policy.delay()
        );
        tokio::time::sleep(policy.delay()).await;
        attempt += 1;
    }
}
