use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry schedule for transport failures against the explorer.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before retry `n` is `n² × backoff_unit`.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the zero-based `attempt`; the first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt.saturating_mul(attempt)
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; holds the last error and how many attempts ran.
    Exhausted { attempts: u32, last: E },
    Cancelled,
}

/// Run `operation` until it succeeds or the policy's attempts run out.
/// Cancellation is observed during backoff sleeps.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_before(attempt);
            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < max_attempts => {
                warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                    attempt + 1,
                    max_attempts,
                    e,
                    policy.delay_before(attempt + 1)
                );
                attempt += 1;
            }
            Err(e) => {
                return Err(RetryError::Exhausted {
                    attempts: attempt + 1,
                    last: e,
                })
            }
        }
    }
}
