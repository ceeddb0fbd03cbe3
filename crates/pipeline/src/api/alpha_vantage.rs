//! Alpha Vantage client for daily equity data
//!
//! Uses the TIME_SERIES_DAILY endpoint. The free tier allows 5 calls per
//! minute; the Note/Information fields in an otherwise-200 response signal
//! that the limit was hit.

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, MarketDataProvider};
use crate::types::DailyBar;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Alpha Vantage market data client
#[derive(Clone)]
pub struct AlphaVantageClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// TIME_SERIES_DAILY response envelope
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, RawDailyBar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the endpoint base URL (used against a local stub)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the daily series and return the bar for the most recent date
    pub async fn fetch_latest_daily(&self, ticker: &str) -> Result<DailyBar, FetchError> {
        let url = format!("{}/query", self.base_url);

        debug!(ticker, "Fetching daily series");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", ticker),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        let response = response.error_for_status()?;

        let body = response.text().await?;
        let parsed: TimeSeriesResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::MalformedResponse(format!("{ticker}: invalid JSON: {e}")))?;

        let bar = parse_series(ticker, parsed)?;
        debug!(ticker, date = %bar.date, close = %bar.close, "Fetched daily bar");
        Ok(bar)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for AlphaVantageClient {
    async fn fetch_latest_daily(&self, ticker: &str) -> Result<DailyBar, FetchError> {
        AlphaVantageClient::fetch_latest_daily(self, ticker).await
    }
}

/// Classify the response envelope and extract the most recent bar
fn parse_series(ticker: &str, response: TimeSeriesResponse) -> Result<DailyBar, FetchError> {
    if let Some(msg) = response.error_message {
        return Err(FetchError::InvalidTicker(format!("{ticker}: {msg}")));
    }
    // A 200 with a Note/Information body means the call budget is exhausted
    if response.note.is_some() || response.information.is_some() {
        return Err(FetchError::RateLimited);
    }

    let series = response
        .time_series
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            FetchError::MalformedResponse(format!("{ticker}: missing daily time series"))
        })?;

    // ISO dates sort lexicographically, so max() is the latest trading day
    let latest = series.keys().max().cloned().expect("series is non-empty");
    let date = NaiveDate::parse_from_str(&latest, "%Y-%m-%d").map_err(|_| {
        FetchError::MalformedResponse(format!("{ticker}: unparseable date key '{latest}'"))
    })?;
    let raw = &series[&latest];

    let price = |field: &str, value: &str| {
        Decimal::from_str(value).map_err(|_| {
            FetchError::MalformedResponse(format!("{ticker}: bad {field} value '{value}'"))
        })
    };

    Ok(DailyBar {
        ticker: ticker.to_string(),
        date,
        open: price("open", &raw.open)?,
        high: price("high", &raw.high)?,
        low: price("low", &raw.low)?,
        close: price("close", &raw.close)?,
        volume: raw.volume.parse().map_err(|_| {
            FetchError::MalformedResponse(format!("{ticker}: bad volume value '{}'", raw.volume))
        })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(json: &str) -> Result<DailyBar, FetchError> {
        let response: TimeSeriesResponse = serde_json::from_str(json).unwrap();
        parse_series("AAPL", response)
    }

    #[test]
    fn test_parses_latest_bar() {
        let json = r#"{
            "Meta Data": {"2. Symbol": "AAPL"},
            "Time Series (Daily)": {
                "2026-02-05": {
                    "1. open": "149.10",
                    "2. high": "151.00",
                    "3. low": "148.50",
                    "4. close": "150.00",
                    "5. volume": "41000000"
                },
                "2026-02-06": {
                    "1. open": "150.20",
                    "2. high": "153.75",
                    "3. low": "150.00",
                    "4. close": "153.00",
                    "5. volume": "44500000"
                }
            }
        }"#;

        let bar = parse(json).unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2026, 2, 6).unwrap());
        assert_eq!(bar.close, dec!(153.00));
        assert_eq!(bar.open, dec!(150.20));
        assert_eq!(bar.volume, 44_500_000);
    }

    #[test]
    fn test_error_message_maps_to_invalid_ticker() {
        let json = r#"{"Error Message": "Invalid API call."}"#;
        assert!(matches!(parse(json), Err(FetchError::InvalidTicker(_))));
    }

    #[test]
    fn test_note_maps_to_rate_limited() {
        let json = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;
        assert!(matches!(parse(json), Err(FetchError::RateLimited)));
    }

    #[test]
    fn test_information_maps_to_rate_limited() {
        let json = r#"{"Information": "API rate limit reached."}"#;
        assert!(matches!(parse(json), Err(FetchError::RateLimited)));
    }

    #[test]
    fn test_missing_series_is_malformed() {
        let json = r#"{"Meta Data": {"2. Symbol": "AAPL"}}"#;
        assert!(matches!(parse(json), Err(FetchError::MalformedResponse(_))));

        let json = r#"{"Time Series (Daily)": {}}"#;
        assert!(matches!(parse(json), Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn test_bad_decimal_is_malformed() {
        let json = r#"{
            "Time Series (Daily)": {
                "2026-02-06": {
                    "1. open": "150.20",
                    "2. high": "153.75",
                    "3. low": "150.00",
                    "4. close": "not-a-number",
                    "5. volume": "44500000"
                }
            }
        }"#;
        assert!(matches!(parse(json), Err(FetchError::MalformedResponse(_))));
    }
}
