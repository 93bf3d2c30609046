//! CI step operations
//!
//! - **Retry** - fixed-delay re-runs until success or exhaustion
//! - **Timeout** - deadline with process-group termination
//! - **Checks** - existence, availability, exit-code and output predicates

pub mod checks;
pub mod policy;
pub mod retry;
pub mod timeout;

pub use policy::{RetryPolicy, TimeoutPolicy, DEFAULT_GRACE_PERIOD};
pub use retry::retry;
pub use timeout::{run_with_timeout, TimeoutRunner};
