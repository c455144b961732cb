//! Retry policy for AWS API sessions.
//!
//! [`RetryStrategy`] decides whether a failed attempt is retried and how long
//! to wait. [`ConnectionRetryPolicy`] is the strategy every session uses;
//! [`execute`] drives an operation through a strategy with cancellation.

mod executor;
mod policy;

pub use executor::execute;
pub use policy::{
    ConnectionRetryPolicy, CONNECTION_RESET_MARKER, MAX_RETRY_DELAY, METADATA_RETRY_LIMIT,
};

use crate::error::SessionError;
use std::fmt::Debug;
use std::time::Duration;

/// Decides retries and backoff for failed attempts.
///
/// `attempt` is the number of retries already made for the operation, so
/// the first failure is seen with `attempt == 0`.
pub trait RetryStrategy: Send + Sync + Debug {
    /// Whether the failure should be retried.
    fn should_retry(&self, error: &SessionError, attempt: u32) -> bool;

    /// Delay before the next attempt.
    fn next_delay(&self, attempt: u32) -> Duration;

    /// Maximum number of retries.
    fn max_retries(&self) -> u32;
}
