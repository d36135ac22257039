use crate::error::SourceError;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff for source fetches.
///
/// Only retryable errors (rate limits, transport hiccups) are retried; a
/// rate-limit response carrying a suggested wait overrides the computed
/// backoff, capped at `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, mut op: F) -> std::result::Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, SourceError>>,
    {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt, &e);
                    log::warn!(
                        "source fetch attempt {attempt}/{} failed ({e}), retrying in {}ms",
                        self.max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn delay_for(&self, attempt: usize, error: &SourceError) -> Duration {
        let suggested = match error {
            SourceError::RateLimited {
                retry_after_ms: Some(ms),
            } => Duration::from_millis(*ms),
            _ => self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1) as u32),
        };
        suggested.min(self.max_delay)
    }
}
