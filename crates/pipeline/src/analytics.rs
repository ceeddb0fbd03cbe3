//! Analytics job — per-ticker returns and the notional portfolio
//!
//! Both derived tables are recomputed from stock_prices on every run, so a
//! backfilled or re-ingested day corrects the downstream rows too. All math
//! is Decimal; percentages carry 4 decimal places, dollar values 2.

use persistence::repository::{
    DailyReturnRecord, PortfolioPerformanceRecord, PortfolioRepository, PriceRepository,
    ReturnsRepository,
};
use persistence::{DbResult, SqlitePool};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::{info, warn};

/// Counts reported after an analytics run
#[derive(Debug, Clone, Default)]
pub struct AnalyticsOutcome {
    pub tickers: usize,
    pub return_rows: usize,
    pub portfolio_rows: usize,
}

/// Fixed scale for stored percentages
fn pct(value: Decimal) -> Decimal {
    let mut v = value.round_dp(4);
    v.rescale(4);
    v
}

/// Fixed scale for stored dollar values
fn money(value: Decimal) -> Decimal {
    let mut v = value.round_dp(2);
    v.rescale(2);
    v
}

/// Recompute daily_returns and portfolio_performance from stored prices.
pub async fn run_analytics(pool: &SqlitePool) -> DbResult<AnalyticsOutcome> {
    let prices = PriceRepository::new(pool);
    let returns = ReturnsRepository::new(pool);
    let portfolio = PortfolioRepository::new(pool);

    let tickers = prices.tickers_with_prices().await?;
    let mut outcome = AnalyticsOutcome {
        tickers: tickers.len(),
        ..Default::default()
    };

    info!(tickers = tickers.len(), "Starting analytics run");

    // ticker → date → close, both levels ascending
    let mut series: BTreeMap<String, BTreeMap<String, Decimal>> = BTreeMap::new();
    for ticker in &tickers {
        let mut closes = BTreeMap::new();
        for (date, close) in prices.closes_for_ticker(ticker).await? {
            match Decimal::from_str(&close) {
                Ok(c) => {
                    closes.insert(date, c);
                }
                Err(_) => warn!(ticker, date, close, "Unparseable close, skipping row"),
            }
        }
        series.insert(ticker.clone(), closes);
    }

    // Daily and cumulative returns per ticker. The first recorded date has
    // no prior close and gets no row.
    let mut daily_by_date: BTreeMap<String, Vec<(String, Decimal)>> = BTreeMap::new();
    for (ticker, closes) in &series {
        let Some(start) = closes.values().next().copied() else {
            continue;
        };
        let mut prev: Option<Decimal> = None;
        for (date, &close) in closes {
            if let Some(prev_close) = prev {
                if prev_close.is_zero() || start.is_zero() {
                    warn!(ticker, date, "Zero prior or start close, skipping return");
                } else {
                    let daily = pct((close - prev_close) / prev_close * Decimal::ONE_HUNDRED);
                    let cumulative = pct((close - start) / start * Decimal::ONE_HUNDRED);

                    returns
                        .upsert(&DailyReturnRecord {
                            id: None,
                            ticker: ticker.clone(),
                            date: date.clone(),
                            daily_return_percent: daily.to_string(),
                            cumulative_return_percent: cumulative.to_string(),
                        })
                        .await?;
                    outcome.return_rows += 1;

                    // series iterates tickers in order, so these stay sorted
                    daily_by_date
                        .entry(date.clone())
                        .or_default()
                        .push((ticker.clone(), daily));
                }
            }
            prev = Some(close);
        }
    }

    // Portfolio aggregate: $100 staked per ticker at its first recorded
    // close, valued on every date the ticker has a row.
    let all_dates: BTreeSet<&String> = series.values().flat_map(|c| c.keys()).collect();

    let mut prev_total: Option<Decimal> = None;
    for date in all_dates {
        let mut total = Decimal::ZERO;
        for closes in series.values() {
            let Some(start) = closes.values().next().copied() else {
                continue;
            };
            if start.is_zero() {
                continue;
            }
            if let Some(&close) = closes.get(date) {
                total += Decimal::ONE_HUNDRED * close / start;
            }
        }

        // Ties go to the lexicographically smallest ticker
        let (best, worst) = match daily_by_date.get(date) {
            Some(entries) if !entries.is_empty() => {
                let mut best = &entries[0];
                let mut worst = &entries[0];
                for entry in &entries[1..] {
                    if entry.1 > best.1 {
                        best = entry;
                    }
                    if entry.1 < worst.1 {
                        worst = entry;
                    }
                }
                (Some(best.0.clone()), Some(worst.0.clone()))
            }
            _ => (None, None),
        };

        let day_change = match prev_total {
            Some(prev) if !prev.is_zero() => pct((total - prev) / prev * Decimal::ONE_HUNDRED),
            _ => pct(Decimal::ZERO),
        };

        portfolio
            .upsert(&PortfolioPerformanceRecord {
                id: None,
                date: date.clone(),
                total_portfolio_value: money(total).to_string(),
                best_performer: best,
                worst_performer: worst,
                daily_return_percent: day_change.to_string(),
            })
            .await?;
        outcome.portfolio_rows += 1;
        prev_total = Some(total);
    }

    info!(
        tickers = outcome.tickers,
        return_rows = outcome.return_rows,
        portfolio_rows = outcome.portfolio_rows,
        "Analytics run complete"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::repository::{StockInfoRecord, StockInfoRepository, StockPriceRecord};
    use persistence::Database;

    async fn db_with(prices: &[(&str, &str, &str)]) -> Database {
        let db = Database::in_memory().await.unwrap();
        let info = StockInfoRepository::new(db.pool());
        let repo = PriceRepository::new(db.pool());

        let mut seeded = BTreeSet::new();
        for (ticker, date, close) in prices {
            if seeded.insert(*ticker) {
                info.seed(&StockInfoRecord {
                    ticker: ticker.to_string(),
                    company_name: format!("{ticker} Inc."),
                    sector: "Technology".to_string(),
                    market_cap: 0,
                })
                .await
                .unwrap();
            }
            repo.insert(&StockPriceRecord {
                id: None,
                ticker: ticker.to_string(),
                date: date.to_string(),
                open_price: close.to_string(),
                high_price: close.to_string(),
                low_price: close.to_string(),
                close_price: close.to_string(),
                volume: 1_000,
            })
            .await
            .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_daily_and_cumulative_returns() {
        let db = db_with(&[
            ("AAPL", "2026-02-04", "150.00"),
            ("AAPL", "2026-02-05", "165.00"),
            ("AAPL", "2026-02-06", "180.00"),
        ])
        .await;

        let outcome = run_analytics(db.pool()).await.unwrap();
        assert_eq!(outcome.return_rows, 2);

        let returns = ReturnsRepository::new(db.pool());

        // No row for the first recorded date
        assert!(returns.get("AAPL", "2026-02-04").await.unwrap().is_none());

        let d2 = returns.get("AAPL", "2026-02-05").await.unwrap().unwrap();
        assert_eq!(d2.daily_return_percent, "10.0000");
        assert_eq!(d2.cumulative_return_percent, "10.0000");

        // (180 - 165) / 165 = 9.0909...%; cumulative (180 - 150) / 150 = 20%
        let d3 = returns.get("AAPL", "2026-02-06").await.unwrap().unwrap();
        assert_eq!(d3.daily_return_percent, "9.0909");
        assert_eq!(d3.cumulative_return_percent, "20.0000");
    }

    #[tokio::test]
    async fn test_two_percent_example() {
        let db = db_with(&[
            ("AAPL", "2026-02-05", "150.00"),
            ("AAPL", "2026-02-06", "153.00"),
        ])
        .await;

        run_analytics(db.pool()).await.unwrap();

        let returns = ReturnsRepository::new(db.pool());
        let row = returns.get("AAPL", "2026-02-06").await.unwrap().unwrap();
        assert_eq!(row.daily_return_percent, "2.0000");
    }

    #[tokio::test]
    async fn test_portfolio_value_and_performers() {
        let db = db_with(&[
            ("AAPL", "2026-02-05", "150.00"),
            ("AAPL", "2026-02-06", "153.00"),
            ("MSFT", "2026-02-05", "100.00"),
            ("MSFT", "2026-02-06", "110.00"),
        ])
        .await;

        let outcome = run_analytics(db.pool()).await.unwrap();
        assert_eq!(outcome.portfolio_rows, 2);

        let portfolio = PortfolioRepository::new(db.pool());

        // Day one: both stakes at par, no daily returns yet
        let d1 = portfolio.get_by_date("2026-02-05").await.unwrap().unwrap();
        assert_eq!(d1.total_portfolio_value, "200.00");
        assert_eq!(d1.best_performer, None);
        assert_eq!(d1.worst_performer, None);
        assert_eq!(d1.daily_return_percent, "0.0000");

        // Day two: 100×153/150 + 100×110/100 = 102 + 110 = 212
        let d2 = portfolio.get_by_date("2026-02-06").await.unwrap().unwrap();
        assert_eq!(d2.total_portfolio_value, "212.00");
        assert_eq!(d2.best_performer.as_deref(), Some("MSFT"));
        assert_eq!(d2.worst_performer.as_deref(), Some("AAPL"));
        assert_eq!(d2.daily_return_percent, "6.0000");
    }

    #[tokio::test]
    async fn test_performer_tie_breaks_to_smallest_ticker() {
        let db = db_with(&[
            ("AAPL", "2026-02-05", "100.00"),
            ("AAPL", "2026-02-06", "102.00"),
            ("MSFT", "2026-02-05", "50.00"),
            ("MSFT", "2026-02-06", "51.00"),
        ])
        .await;

        run_analytics(db.pool()).await.unwrap();

        // Both returned exactly 2% — AAPL wins both slots
        let portfolio = PortfolioRepository::new(db.pool());
        let row = portfolio.get_by_date("2026-02-06").await.unwrap().unwrap();
        assert_eq!(row.best_performer.as_deref(), Some("AAPL"));
        assert_eq!(row.worst_performer.as_deref(), Some("AAPL"));
    }

    #[tokio::test]
    async fn test_single_ticker_day_best_equals_worst() {
        let db = db_with(&[
            ("AAPL", "2026-02-05", "100.00"),
            ("AAPL", "2026-02-06", "99.00"),
        ])
        .await;

        run_analytics(db.pool()).await.unwrap();

        let portfolio = PortfolioRepository::new(db.pool());
        let row = portfolio.get_by_date("2026-02-06").await.unwrap().unwrap();
        assert_eq!(row.best_performer.as_deref(), Some("AAPL"));
        assert_eq!(row.worst_performer.as_deref(), Some("AAPL"));
        assert_eq!(row.daily_return_percent, "-1.0000");
    }

    #[tokio::test]
    async fn test_zero_prior_close_skips_return_without_failing() {
        // Bypasses ingestion validation on purpose: rows written directly
        let db = db_with(&[
            ("AAPL", "2026-02-05", "0"),
            ("AAPL", "2026-02-06", "10.00"),
        ])
        .await;

        let outcome = run_analytics(db.pool()).await.unwrap();
        assert_eq!(outcome.return_rows, 0);

        let returns = ReturnsRepository::new(db.pool());
        assert!(returns.get("AAPL", "2026-02-06").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ticker_missing_on_a_date_is_excluded_from_total() {
        let db = db_with(&[
            ("AAPL", "2026-02-05", "100.00"),
            ("AAPL", "2026-02-06", "104.00"),
            // MSFT only starts on the 6th
            ("MSFT", "2026-02-06", "200.00"),
        ])
        .await;

        run_analytics(db.pool()).await.unwrap();

        let portfolio = PortfolioRepository::new(db.pool());
        let d1 = portfolio.get_by_date("2026-02-05").await.unwrap().unwrap();
        assert_eq!(d1.total_portfolio_value, "100.00");

        // AAPL at 104 plus MSFT's fresh $100 stake
        let d2 = portfolio.get_by_date("2026-02-06").await.unwrap().unwrap();
        assert_eq!(d2.total_portfolio_value, "204.00");
    }

    #[tokio::test]
    async fn test_rerun_overwrites_instead_of_duplicating() {
        let db = db_with(&[
            ("AAPL", "2026-02-05", "150.00"),
            ("AAPL", "2026-02-06", "153.00"),
        ])
        .await;

        let first = run_analytics(db.pool()).await.unwrap();
        let second = run_analytics(db.pool()).await.unwrap();
        assert_eq!(first.return_rows, second.return_rows);

        let returns = ReturnsRepository::new(db.pool());
        assert_eq!(returns.count().await.unwrap(), 1);
    }
}
