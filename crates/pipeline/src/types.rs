//! Types shared by the ingestion and analytics jobs

use chrono::NaiveDate;
use persistence::repository::StockPriceRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One daily OHLCV observation for a ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl DailyBar {
    /// Check the bar is internally consistent before it is persisted
    pub fn validate(&self) -> Result<(), String> {
        if self.open <= Decimal::ZERO
            || self.high <= Decimal::ZERO
            || self.low <= Decimal::ZERO
            || self.close <= Decimal::ZERO
        {
            return Err("non-positive price".to_string());
        }
        if self.low > self.high {
            return Err(format!("low {} above high {}", self.low, self.high));
        }
        if self.open > self.high || self.close > self.high {
            return Err("open/close above high".to_string());
        }
        if self.open < self.low || self.close < self.low {
            return Err("open/close below low".to_string());
        }
        if self.volume < 0 {
            return Err("negative volume".to_string());
        }
        Ok(())
    }

    /// Convert to the stored row shape (decimals as TEXT, date as ISO-8601)
    pub fn to_record(&self) -> StockPriceRecord {
        StockPriceRecord {
            id: None,
            ticker: self.ticker.clone(),
            date: self.date.format("%Y-%m-%d").to_string(),
            open_price: self.open.to_string(),
            high_price: self.high.to_string(),
            low_price: self.low.to_string(),
            close_price: self.close.to_string(),
            volume: self.volume,
        }
    }
}

/// Outcome of processing one ticker during ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickerOutcome {
    /// A new price row was written
    Ingested,
    /// The (ticker, date) row already existed — benign no-op
    AlreadyIngested,
    /// Fetch, validation, or insert failed; the run continued
    Failed(String),
}

/// Per-ticker outcome summary for one ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcomes: Vec<(String, TickerOutcome)>,
}

impl RunSummary {
    pub fn ingested(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TickerOutcome::Ingested))
            .count()
    }

    pub fn already_ingested(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TickerOutcome::AlreadyIngested))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TickerOutcome::Failed(_)))
            .count()
    }

    /// Exit status for the scheduler: 0 = every ticker stored (or already
    /// present), 1 = every ticker failed, 2 = partial failure
    pub fn exit_code(&self) -> i32 {
        let failed = self.failed();
        if failed == 0 {
            0
        } else if failed == self.outcomes.len() {
            1
        } else {
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar() -> DailyBar {
        DailyBar {
            ticker: "AAPL".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
            open: dec!(151.00),
            high: dec!(154.50),
            low: dec!(149.75),
            close: dec!(153.00),
            volume: 48_200_000,
        }
    }

    #[test]
    fn test_valid_bar_passes() {
        assert!(bar().validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut b = bar();
        b.low = dec!(160.00);
        b.high = dec!(150.00);
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_close_outside_range_rejected() {
        let mut b = bar();
        b.close = dec!(200.00);
        assert!(b.validate().is_err());

        let mut b = bar();
        b.close = dec!(1.00);
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_zero_price_rejected() {
        let mut b = bar();
        b.open = Decimal::ZERO;
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_to_record_preserves_scale() {
        let record = bar().to_record();
        assert_eq!(record.date, "2026-02-05");
        assert_eq!(record.close_price, "153.00");
        assert_eq!(record.volume, 48_200_000);
    }

    #[test]
    fn test_exit_codes() {
        let ok = TickerOutcome::Ingested;
        let dup = TickerOutcome::AlreadyIngested;
        let bad = TickerOutcome::Failed("boom".to_string());

        let summary = RunSummary {
            outcomes: vec![("A".into(), ok.clone()), ("B".into(), dup.clone())],
        };
        assert_eq!(summary.exit_code(), 0);

        let summary = RunSummary {
            outcomes: vec![("A".into(), ok), ("B".into(), bad.clone())],
        };
        assert_eq!(summary.exit_code(), 2);

        let summary = RunSummary {
            outcomes: vec![("A".into(), bad)],
        };
        assert_eq!(summary.exit_code(), 1);
    }
}
