//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{ResolverConfig, Result};

/// Wraps a fallible network operation with timeout retries.
///
/// Only timeouts are retried; any other failure propagates immediately.
/// If every attempt times out, the last timeout propagates.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Creates a policy from the resolver configuration.
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            initial_delay: config.initial_retry_delay(),
            backoff_multiplier: config.backoff_multiplier,
        }
    }

    /// Runs `op` until it succeeds, fails non-transiently, or exhausts the
    /// attempt budget.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.initial_delay;

        for attempt in 1..=self.max_retries {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_timeout() => {
                    if attempt == self.max_retries {
                        return Err(err);
                    }

                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "attempt timed out, retrying"
                    );

                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.backoff_multiplier);
                }
                Err(err) => return Err(err),
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }
}
