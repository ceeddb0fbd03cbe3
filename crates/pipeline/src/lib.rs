//! Stock pipeline — daily OHLC ingestion and return analytics
//!
//! Provides:
//! - Alpha Vantage market data client with bounded retry/backoff
//! - Ingestion job: fetch, validate, and store one bar per tracked ticker
//! - Analytics job: daily/cumulative returns and the $100-per-stock
//!   portfolio aggregate

pub mod analytics;
pub mod api;
pub mod config;
pub mod ingest;
pub mod types;

// Re-exports for convenience
pub use analytics::{run_analytics, AnalyticsOutcome};
pub use api::{fetch_with_retry, AlphaVantageClient, FetchError, MarketDataProvider, RetryPolicy};
pub use config::PipelineConfig;
pub use ingest::run_ingestion;
pub use types::{DailyBar, RunSummary, TickerOutcome};
