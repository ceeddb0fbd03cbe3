//! Pipeline configuration
//!
//! Loaded from the environment in the binary (after dotenvy); tests
//! construct the struct directly.

use crate::api::RetryPolicy;
use persistence::repository::StockInfoRecord;
use std::time::Duration;

/// The ten tracked tickers, in the order they are processed
pub const DEFAULT_TICKERS: [&str; 10] = [
    "NVDA", "GOOG", "AAPL", "MSFT", "AMZN", "META", "TSM", "NFLX", "TSLA", "AVGO",
];

/// Default delay between upstream calls — the free tier allows 5/min
pub const DEFAULT_PACING: Duration = Duration::from_secs(12);

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Alpha Vantage API credential
    pub api_key: String,
    /// SQLite database file path
    pub db_path: String,
    /// Tickers processed each run
    pub tickers: Vec<String>,
    /// Retry budget for rate-limit / transient failures
    pub retry: RetryPolicy,
    /// Delay between per-ticker upstream calls
    pub pacing: Duration,
    /// HTTP request timeout for the upstream API
    pub request_timeout: Duration,
}

impl PipelineConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            db_path: "data/stocks.db".to_string(),
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            retry: RetryPolicy::default(),
            pacing: DEFAULT_PACING,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Read configuration from the environment.
    ///
    /// Recognized variables: `ALPHA_VANTAGE_API_KEY` (required),
    /// `STOCK_PIPELINE_DB_PATH`, `STOCK_TICKERS` (comma-separated).
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("ALPHA_VANTAGE_API_KEY")
            .map_err(|_| anyhow::anyhow!("ALPHA_VANTAGE_API_KEY not set"))?;

        let mut config = Self::new(api_key);

        if let Ok(path) = std::env::var("STOCK_PIPELINE_DB_PATH") {
            config.db_path = path;
        }
        if let Ok(list) = std::env::var("STOCK_TICKERS") {
            let tickers: Vec<String> = list
                .split(',')
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect();
            if !tickers.is_empty() {
                config.tickers = tickers;
            }
        }

        Ok(config)
    }
}

/// Seed rows for stock_info: company metadata and a market-cap snapshot
/// (whole dollars) for the default ticker list
pub fn default_stock_info() -> Vec<StockInfoRecord> {
    let rows: [(&str, &str, &str, i64); 10] = [
        ("NVDA", "NVIDIA Corporation", "Technology", 4_500_000_000_000),
        ("GOOG", "Alphabet Inc.", "Communication Services", 2_400_000_000_000),
        ("AAPL", "Apple Inc.", "Technology", 3_400_000_000_000),
        ("MSFT", "Microsoft Corporation", "Technology", 3_700_000_000_000),
        ("AMZN", "Amazon.com, Inc.", "Consumer Discretionary", 2_300_000_000_000),
        ("META", "Meta Platforms, Inc.", "Communication Services", 1_800_000_000_000),
        ("TSM", "Taiwan Semiconductor Manufacturing", "Technology", 1_200_000_000_000),
        ("NFLX", "Netflix, Inc.", "Communication Services", 500_000_000_000),
        ("TSLA", "Tesla, Inc.", "Consumer Discretionary", 1_100_000_000_000),
        ("AVGO", "Broadcom Inc.", "Technology", 1_300_000_000_000),
    ];

    rows.iter()
        .map(|(ticker, name, sector, cap)| StockInfoRecord {
            ticker: ticker.to_string(),
            company_name: name.to_string(),
            sector: sector.to_string(),
            market_cap: *cap,
        })
        .collect()
}
