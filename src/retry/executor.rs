//! Cancellable retry loop.

use super::{RetryStrategy, MAX_RETRY_DELAY};
use crate::error::SessionError;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Run `operation` until it succeeds, the strategy gives up, or `cancel`
/// fires.
///
/// Fatal errors and errors the strategy declines are returned unchanged.
/// When the retry budget runs out the last error is wrapped in
/// [`SessionError::RetriesExhausted`]. A `retry_after` hint can lengthen
/// the backoff but never past [`MAX_RETRY_DELAY`]. Cancellation aborts an in-flight
/// attempt or backoff and returns [`SessionError::Cancelled`]; no attempt
/// starts after the token has fired.
pub async fn execute<S, F, Fut, T>(
    strategy: &S,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, SessionError>
where
    S: RetryStrategy + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = operation() => result,
        };

        let error = match result {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if error.is_fatal() || !strategy.should_retry(&error, attempt) {
            if attempt > 0 {
                warn!(attempt = attempt, error = %error, "Giving up on non-retryable error");
            }
            return Err(error);
        }

        if attempt >= strategy.max_retries() {
            warn!(
                attempt = attempt,
                max_retries = strategy.max_retries(),
                error = %error,
                "Operation failed after all retries"
            );
            return Err(SessionError::RetriesExhausted {
                attempts: attempt + 1,
                source: Box::new(error),
            });
        }

        let mut backoff = strategy.next_delay(attempt);
        if let Some(hint) = error.retry_after() {
            backoff = backoff.max(hint).min(MAX_RETRY_DELAY);
        }
        debug!(
            attempt = attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %error,
            "Retrying operation after backoff"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            _ = tokio::time::sleep(backoff) => {}
        }

        attempt += 1;
    }
}
