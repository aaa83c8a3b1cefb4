//! Retry policy for provider requests.
//!
//! Only 429 responses and transport failures are retried. Every other error
//! (404, other statuses, malformed bodies) reaches the caller on first sight.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Exponential backoff: attempt `n` waits `backoff_base_secs * 2^n` seconds,
/// or the server's `Retry-After` hint when that is longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Attempts after the first one; `3` means at most 4 requests.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl RetryPolicy {
    fn should_retry(self, attempt: u32, err: &ScraperError) -> bool {
        attempt < self.max_retries
            && matches!(
                err,
                ScraperError::RateLimited { .. } | ScraperError::Http(_)
            )
    }

    fn delay(self, attempt: u32, err: &ScraperError) -> Duration {
        let backoff = self
            .backoff_base_secs
            .saturating_mul(1u64 << attempt.min(62));
        let hinted = match err {
            ScraperError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => 0,
        };
        Duration::from_secs(backoff.max(hinted))
    }

    /// Runs `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent. The last error is returned in the latter two cases.
    pub(crate) async fn run<T, F, Fut>(self, mut operation: F) -> Result<T, ScraperError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let mut attempt = 0u32;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(attempt, &err) => err,
                Err(err) => return Err(err),
            };

            let delay = self.delay(attempt, &err);
            tracing::warn!(
                attempt,
                max_retries = self.max_retries,
                delay_secs = delay.as_secs(),
                error = %err,
                "transient source error, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
