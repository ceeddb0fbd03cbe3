//! Portfolio performance repository — per-date aggregate of all positions

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Aggregate portfolio state for one trading date.
/// best/worst are NULL when no ticker has a daily return that day
/// (e.g. the first recorded date).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioPerformanceRecord {
    pub id: Option<i64>,
    pub date: String,
    pub total_portfolio_value: String,
    pub best_performer: Option<String>,
    pub worst_performer: Option<String>,
    pub daily_return_percent: String,
}

/// Repository for the portfolio_performance table
pub struct PortfolioRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PortfolioRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert keyed by date
    pub async fn upsert(&self, record: &PortfolioPerformanceRecord) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO portfolio_performance
                (date, total_portfolio_value, best_performer, worst_performer, daily_return_percent)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (date) DO UPDATE SET
                total_portfolio_value = excluded.total_portfolio_value,
                best_performer = excluded.best_performer,
                worst_performer = excluded.worst_performer,
                daily_return_percent = excluded.daily_return_percent
            "#,
        )
        .bind(&record.date)
        .bind(&record.total_portfolio_value)
        .bind(&record.best_performer)
        .bind(&record.worst_performer)
        .bind(&record.daily_return_percent)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_date(&self, date: &str) -> DbResult<Option<PortfolioPerformanceRecord>> {
        let record = sqlx::query_as::<_, PortfolioPerformanceRecord>(
            r#"
            SELECT id, date, total_portfolio_value, best_performer, worst_performer,
                   daily_return_percent
            FROM portfolio_performance
            WHERE date = ?
            "#,
        )
        .bind(date)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Portfolio history, newest first
    pub async fn history(&self, limit: i64) -> DbResult<Vec<PortfolioPerformanceRecord>> {
        let records = sqlx::query_as::<_, PortfolioPerformanceRecord>(
            r#"
            SELECT id, date, total_portfolio_value, best_performer, worst_performer,
                   daily_return_percent
            FROM portfolio_performance
            ORDER BY date DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }
}
