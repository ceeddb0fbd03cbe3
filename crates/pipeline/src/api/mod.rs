//! Upstream market data API
//!
//! The ingestion job talks to the upstream through [`MarketDataProvider`]
//! so it can run against a stub in tests.

pub mod alpha_vantage;
pub mod retry;

pub use alpha_vantage::AlphaVantageClient;
pub use retry::{fetch_with_retry, RetryPolicy};

use crate::types::DailyBar;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a market data fetch
#[derive(Error, Debug)]
pub enum FetchError {
    /// Upstream throttled the request (HTTP 429 or an API-limit note)
    #[error("Rate limited by upstream API")]
    RateLimited,

    /// Transport failure, timeout, or non-2xx status
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The upstream does not recognize the symbol
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// The response body could not be interpreted as a daily series
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Only rate limits and transport failures are worth retrying;
    /// a bad symbol or a garbled body will not improve on a second attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Network(_))
    }
}

/// A source of daily OHLCV observations
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the most recent daily bar for one ticker
    async fn fetch_latest_daily(&self, ticker: &str) -> Result<DailyBar, FetchError>;
}
