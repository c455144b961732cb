//! Exponential backoff with jitter and connection-error short-circuiting.

use super::RetryStrategy;
use crate::config::RetrySettings;
use crate::error::SessionError;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Upper bound on a single backoff.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

/// Error text that is always retried.
pub const CONNECTION_RESET_MARKER: &str = "connection reset by peer";

/// Retries allowed for failures against the instance metadata service.
pub const METADATA_RETRY_LIMIT: u32 = 3;

const BACKOFF_BASE: f64 = 3.0;
const JITTER_MIN: f64 = 0.8;
const JITTER_MAX: f64 = 1.2;

/// Retry policy attached to every session.
///
/// * Errors whose text contains `connection reset by peer` are always
///   retried.
/// * Errors from an unreachable instance metadata endpoint stop once more
///   than [`METADATA_RETRY_LIMIT`] retries have been made.
/// * Everything else follows [`SessionError::is_retryable`].
///
/// The delay before retry `n` is `min_delay * 3^n` scaled by a jitter
/// factor in `[0.8, 1.2]` and capped at [`MAX_RETRY_DELAY`].
pub struct ConnectionRetryPolicy {
    max_retries: u32,
    min_delay: Duration,
    rng: Mutex<StdRng>,
}

impl ConnectionRetryPolicy {
    /// Policy whose jitter is seeded from the clock.
    pub fn new(settings: RetrySettings) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(settings, seed)
    }

    /// Policy with a fixed jitter seed.
    pub fn with_seed(settings: RetrySettings, seed: u64) -> Self {
        Self {
            max_retries: settings.max_retries,
            min_delay: settings.min_delay,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Minimum delay the curve starts from.
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Un-jittered, uncapped delay for `attempt`, in seconds.
    pub fn base_delay_secs(&self, attempt: u32) -> f64 {
        self.min_delay.as_secs_f64() * BACKOFF_BASE.powi(attempt.min(64) as i32)
    }

    fn jitter(&self) -> f64 {
        self.rng.lock().gen_range(JITTER_MIN..=JITTER_MAX)
    }
}

impl RetryStrategy for ConnectionRetryPolicy {
    fn should_retry(&self, error: &SessionError, attempt: u32) -> bool {
        if error.to_string().contains(CONNECTION_RESET_MARKER) {
            return true;
        }

        if error.is_metadata_unreachable() && attempt > METADATA_RETRY_LIMIT {
            return false;
        }

        error.is_retryable()
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let secs = (self.base_delay_secs(attempt) * self.jitter()).min(MAX_RETRY_DELAY.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl std::fmt::Debug for ConnectionRetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("min_delay", &self.min_delay)
            .finish_non_exhaustive()
    }
}
