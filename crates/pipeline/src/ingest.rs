//! Ingestion job — fetch, validate, and store one daily bar per ticker
//!
//! Tickers are processed independently: a failed fetch is recorded and the
//! run moves on. Idempotency comes from the UNIQUE(ticker, date) constraint,
//! not from application-level duplicate checks.

use persistence::repository::PriceRepository;
use persistence::{DbError, DbResult, SqlitePool};
use tracing::{info, warn};

use crate::api::{fetch_with_retry, MarketDataProvider};
use crate::config::PipelineConfig;
use crate::types::{RunSummary, TickerOutcome};

/// Run one ingestion pass over the configured tickers.
///
/// Connection-level database failures abort the run; everything else is a
/// per-ticker outcome.
pub async fn run_ingestion(
    config: &PipelineConfig,
    provider: &dyn MarketDataProvider,
    pool: &SqlitePool,
) -> DbResult<RunSummary> {
    let prices = PriceRepository::new(pool);
    let mut summary = RunSummary::default();

    info!(tickers = config.tickers.len(), "Starting ingestion run");

    for (i, ticker) in config.tickers.iter().enumerate() {
        // Pace upstream calls; the free tier allows 5 per minute
        if i > 0 && !config.pacing.is_zero() {
            tokio::time::sleep(config.pacing).await;
        }

        let outcome = ingest_one(ticker, provider, &prices, config).await?;
        match &outcome {
            TickerOutcome::Ingested => info!(ticker, "Stored new price row"),
            TickerOutcome::AlreadyIngested => info!(ticker, "Already ingested, skipping"),
            TickerOutcome::Failed(reason) => warn!(ticker, reason, "Ticker failed"),
        }
        summary.outcomes.push((ticker.clone(), outcome));
    }

    info!(
        ingested = summary.ingested(),
        already = summary.already_ingested(),
        failed = summary.failed(),
        "Ingestion run complete"
    );

    Ok(summary)
}

async fn ingest_one(
    ticker: &str,
    provider: &dyn MarketDataProvider,
    prices: &PriceRepository<'_>,
    config: &PipelineConfig,
) -> DbResult<TickerOutcome> {
    let bar = match fetch_with_retry(provider, ticker, &config.retry).await {
        Ok(bar) => bar,
        Err(e) => return Ok(TickerOutcome::Failed(e.to_string())),
    };

    if let Err(reason) = bar.validate() {
        return Ok(TickerOutcome::Failed(format!("validation: {reason}")));
    }

    match prices.insert(&bar.to_record()).await {
        Ok(true) => Ok(TickerOutcome::Ingested),
        Ok(false) => Ok(TickerOutcome::AlreadyIngested),
        // Statement-level errors (e.g. an unseeded ticker tripping the
        // foreign key) stay scoped to this ticker
        Err(DbError::Sqlx(e)) if e.as_database_error().is_some() => {
            Ok(TickerOutcome::Failed(format!("insert: {e}")))
        }
        Err(e) => Err(e),
    }
}
