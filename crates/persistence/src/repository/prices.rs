//! Stock prices repository — the append-only OHLCV fact table

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// A single OHLCV row as stored (decimals kept as TEXT)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockPriceRecord {
    pub id: Option<i64>,
    pub ticker: String,
    /// ISO-8601 trading date (YYYY-MM-DD)
    pub date: String,
    pub open_price: String,
    pub high_price: String,
    pub low_price: String,
    pub close_price: String,
    pub volume: i64,
}

/// Latest close per ticker joined with company name and that date's returns
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LatestPriceRow {
    pub ticker: String,
    pub company_name: String,
    pub date: String,
    pub close_price: String,
    pub volume: i64,
    pub daily_return_percent: Option<String>,
    pub cumulative_return_percent: Option<String>,
}

/// Repository for the stock_prices table
pub struct PriceRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PriceRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a price row (INSERT OR IGNORE — the UNIQUE(ticker, date)
    /// constraint makes re-runs idempotent). Returns false when the row
    /// already existed.
    pub async fn insert(&self, record: &StockPriceRecord) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO stock_prices (
                ticker, date, open_price, high_price, low_price, close_price, volume
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.ticker)
        .bind(&record.date)
        .bind(&record.open_price)
        .bind(&record.high_price)
        .bind(&record.low_price)
        .bind(&record.close_price)
        .bind(record.volume)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tickers that have at least one price row, ordered by symbol
    pub async fn tickers_with_prices(&self) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT ticker FROM stock_prices ORDER BY ticker")
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    /// (date, close_price) series for one ticker, oldest first
    pub async fn closes_for_ticker(&self, ticker: &str) -> DbResult<Vec<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT date, close_price FROM stock_prices WHERE ticker = ? ORDER BY date ASC",
        )
        .bind(ticker)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Most recent trading date with any price row
    pub async fn latest_date(&self) -> DbResult<Option<String>> {
        // MAX() over an empty table yields a single NULL row
        let row: (Option<String>,) = sqlx::query_as("SELECT MAX(date) FROM stock_prices")
            .fetch_one(self.pool)
            .await?;

        Ok(row.0)
    }

    /// Count of price rows for a (ticker, date) pair
    pub async fn count_for(&self, ticker: &str, date: &str) -> DbResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stock_prices WHERE ticker = ? AND date = ?")
                .bind(ticker)
                .bind(date)
                .fetch_one(self.pool)
                .await?;

        Ok(row.0)
    }

    /// Recent OHLCV history for one ticker, oldest first (chart order)
    pub async fn history(&self, ticker: &str, limit: i64) -> DbResult<Vec<StockPriceRecord>> {
        let mut records = sqlx::query_as::<_, StockPriceRecord>(
            r#"
            SELECT id, ticker, date, open_price, high_price, low_price, close_price, volume
            FROM stock_prices
            WHERE ticker = ?
            ORDER BY date DESC
            LIMIT ?
            "#,
        )
        .bind(ticker)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        records.reverse();
        Ok(records)
    }

    /// The most recent close per ticker with company name and the matching
    /// daily_returns row (if the analytics job has produced one)
    pub async fn latest_with_returns(&self) -> DbResult<Vec<LatestPriceRow>> {
        let rows = sqlx::query_as::<_, LatestPriceRow>(
            r#"
            SELECT
                sp.ticker,
                si.company_name,
                sp.date,
                sp.close_price,
                sp.volume,
                dr.daily_return_percent,
                dr.cumulative_return_percent
            FROM stock_prices sp
            JOIN stock_info si ON sp.ticker = si.ticker
            LEFT JOIN daily_returns dr ON sp.ticker = dr.ticker AND sp.date = dr.date
            WHERE sp.date = (SELECT MAX(date) FROM stock_prices)
            ORDER BY sp.ticker
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{StockInfoRecord, StockInfoRepository};
    use crate::Database;

    async fn seeded_db() -> Database {
        let db = Database::in_memory().await.unwrap();
        let info = StockInfoRepository::new(db.pool());
        info.seed(&StockInfoRecord {
            ticker: "AAPL".to_string(),
            company_name: "Apple Inc.".to_string(),
            sector: "Technology".to_string(),
            market_cap: 0,
        })
        .await
        .unwrap();
        db
    }

    fn bar(ticker: &str, date: &str, close: &str) -> StockPriceRecord {
        StockPriceRecord {
            id: None,
            ticker: ticker.to_string(),
            date: date.to_string(),
            open_price: close.to_string(),
            high_price: close.to_string(),
            low_price: close.to_string(),
            close_price: close.to_string(),
            volume: 1000,
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_noop() {
        let db = seeded_db().await;
        let repo = PriceRepository::new(db.pool());

        assert!(repo.insert(&bar("AAPL", "2026-02-05", "150.00")).await.unwrap());
        assert!(!repo.insert(&bar("AAPL", "2026-02-05", "999.00")).await.unwrap());

        assert_eq!(repo.count_for("AAPL", "2026-02-05").await.unwrap(), 1);

        // First write wins: the ignored duplicate must not overwrite
        let closes = repo.closes_for_ticker("AAPL").await.unwrap();
        assert_eq!(closes, vec![("2026-02-05".to_string(), "150.00".to_string())]);
    }

    #[tokio::test]
    async fn test_unknown_ticker_rejected_by_foreign_key() {
        let db = seeded_db().await;
        let repo = PriceRepository::new(db.pool());

        let result = repo.insert(&bar("ZZZZ", "2026-02-05", "1.00")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_closes_ordered_ascending() {
        let db = seeded_db().await;
        let repo = PriceRepository::new(db.pool());

        repo.insert(&bar("AAPL", "2026-02-06", "153.00")).await.unwrap();
        repo.insert(&bar("AAPL", "2026-02-05", "150.00")).await.unwrap();

        let closes = repo.closes_for_ticker("AAPL").await.unwrap();
        assert_eq!(closes[0].0, "2026-02-05");
        assert_eq!(closes[1].0, "2026-02-06");
        assert_eq!(repo.latest_date().await.unwrap().as_deref(), Some("2026-02-06"));
    }
}
