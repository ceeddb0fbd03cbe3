//! Bounded retry with exponential backoff for upstream fetches

use rand::Rng;
use std::time::Duration;
use tracing::warn;

use super::{FetchError, MarketDataProvider};
use crate::types::DailyBar;

/// Retry budget for rate-limited or transient fetch failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based): base × 2^(attempt−1),
    /// capped at 60 s, plus up to 250 ms of jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(6);
        let backoff = self
            .base_delay
            .saturating_mul(1 << exponent)
            .min(Duration::from_secs(60));
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
        backoff + jitter
    }
}

/// Fetch one ticker's latest bar, retrying retryable failures within the
/// policy's budget. Non-retryable errors surface immediately.
pub async fn fetch_with_retry(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    policy: &RetryPolicy,
) -> Result<DailyBar, FetchError> {
    let mut attempt = 1;
    loop {
        match provider.fetch_latest_daily(ticker).await {
            Ok(bar) => return Ok(bar),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(ticker, attempt, error = %e, "Fetch failed, retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
