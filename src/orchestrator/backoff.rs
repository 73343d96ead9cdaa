//! Retry with exponential backoff for remote calls
//!
//! Transient errors (network, rate-limit) are retried up to a bounded
//! attempt count with doubling delays. Rate-limit responses carry a
//! server-provided wait hint; the delay honors whichever is longer, so a
//! throttled run backs off harder than one riding out a flaky connection.
//! Auth and not-found errors are never retried.

use crate::remote::{RemoteError, retry_after_hint};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Bounded retry policy for remote operations.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given (1-based) failed attempt: doubling from
    /// `initial_backoff`, capped at `max_backoff`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Run `op` under the retry policy.
///
/// Returns the first success, the first non-transient error, or the last
/// transient error once attempts are exhausted. Cancellation is observed
/// before every attempt and during every backoff sleep.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut op: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }

        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => e,
            Err(e) => return Err(e),
        };

        let mut delay = policy.backoff_for(attempt);
        if let Some(hint) = retry_after_hint(&error) {
            delay = delay.max(hint);
        }
        warn!(
            operation = what,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "transient remote error, will retry"
        );

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = cancel.cancelled() => return Err(RemoteError::Cancelled),
        }
    }
}
