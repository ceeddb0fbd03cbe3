//! Daily returns repository — derived per-ticker return metrics

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Daily and cumulative return percentages for one (ticker, date)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyReturnRecord {
    pub id: Option<i64>,
    pub ticker: String,
    pub date: String,
    pub daily_return_percent: String,
    pub cumulative_return_percent: String,
}

/// Repository for the daily_returns table
pub struct ReturnsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReturnsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert keyed by (ticker, date) — analytics re-runs overwrite
    pub async fn upsert(&self, record: &DailyReturnRecord) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_returns (ticker, date, daily_return_percent, cumulative_return_percent)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (ticker, date) DO UPDATE SET
                daily_return_percent = excluded.daily_return_percent,
                cumulative_return_percent = excluded.cumulative_return_percent
            "#,
        )
        .bind(&record.ticker)
        .bind(&record.date)
        .bind(&record.daily_return_percent)
        .bind(&record.cumulative_return_percent)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, ticker: &str, date: &str) -> DbResult<Option<DailyReturnRecord>> {
        let record = sqlx::query_as::<_, DailyReturnRecord>(
            r#"
            SELECT id, ticker, date, daily_return_percent, cumulative_return_percent
            FROM daily_returns
            WHERE ticker = ? AND date = ?
            "#,
        )
        .bind(ticker)
        .bind(date)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Return history, newest first, optionally filtered by ticker
    pub async fn history(
        &self,
        ticker: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<DailyReturnRecord>> {
        let records = if let Some(t) = ticker {
            sqlx::query_as::<_, DailyReturnRecord>(
                r#"
                SELECT id, ticker, date, daily_return_percent, cumulative_return_percent
                FROM daily_returns
                WHERE ticker = ?
                ORDER BY date DESC
                LIMIT ?
                "#,
            )
            .bind(t)
            .bind(limit)
            .fetch_all(self.pool)
            .await?
        } else {
            sqlx::query_as::<_, DailyReturnRecord>(
                r#"
                SELECT id, ticker, date, daily_return_percent, cumulative_return_percent
                FROM daily_returns
                ORDER BY date DESC, ticker ASC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(self.pool)
            .await?
        };

        Ok(records)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM daily_returns")
            .fetch_one(self.pool)
            .await?;

        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{StockInfoRecord, StockInfoRepository};
    use crate::Database;

    #[tokio::test]
    async fn test_upsert_overwrites_existing_row() {
        let db = Database::in_memory().await.unwrap();
        StockInfoRepository::new(db.pool())
            .seed(&StockInfoRecord {
                ticker: "MSFT".to_string(),
                company_name: "Microsoft Corporation".to_string(),
                sector: "Technology".to_string(),
                market_cap: 0,
            })
            .await
            .unwrap();

        let repo = ReturnsRepository::new(db.pool());
        let mut record = DailyReturnRecord {
            id: None,
            ticker: "MSFT".to_string(),
            date: "2026-02-06".to_string(),
            daily_return_percent: "1.5000".to_string(),
            cumulative_return_percent: "3.0000".to_string(),
        };
        repo.upsert(&record).await.unwrap();

        record.daily_return_percent = "2.0000".to_string();
        repo.upsert(&record).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.get("MSFT", "2026-02-06").await.unwrap().unwrap();
        assert_eq!(stored.daily_return_percent, "2.0000");
        assert_eq!(stored.cumulative_return_percent, "3.0000");
    }
}
