//! Static reference data for the tracked tickers

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// One tracked ticker with its company metadata
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockInfoRecord {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    /// Market capitalization snapshot in whole dollars
    pub market_cap: i64,
}

/// Repository for the stock_info table
pub struct StockInfoRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StockInfoRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Seed a ticker (INSERT OR IGNORE — existing rows are left untouched)
    pub async fn seed(&self, record: &StockInfoRecord) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO stock_info (ticker, company_name, sector, market_cap)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&record.ticker)
        .bind(&record.company_name)
        .bind(&record.sector)
        .bind(record.market_cap)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All tracked tickers ordered by symbol
    pub async fn get_all(&self) -> DbResult<Vec<StockInfoRecord>> {
        let records = sqlx::query_as::<_, StockInfoRecord>(
            "SELECT ticker, company_name, sector, market_cap FROM stock_info ORDER BY ticker",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stock_info")
            .fetch_one(self.pool)
            .await?;

        Ok(row.0)
    }
}
