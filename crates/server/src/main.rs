//! stock-pipeline — daily stock market ETL job and dashboard API
//!
//! Usage:
//!   stock-pipeline run                 — Daily job: seed, ingest, analytics
//!   stock-pipeline serve --port 3001   — Read-only dashboard API

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use clap::{Parser, Subcommand};
use persistence::repository::{
    PortfolioRepository, PriceRepository, ReturnsRepository, StockInfoRepository,
};
use pipeline::config::default_stock_info;
use pipeline::{run_analytics, run_ingestion, AlphaVantageClient, PipelineConfig, TickerOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "stock-pipeline")]
#[command(about = "Daily stock market data collection and analytics", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the stock_info reference table
    Seed,
    /// Fetch the latest daily bar for each tracked ticker
    Ingest,
    /// Recompute daily returns and portfolio performance
    Analytics,
    /// Daily scheduler entry point: seed, ingest, then analytics
    Run,
    /// Launch the read-only dashboard API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 3001)]
        port: u16,
    },
}

#[derive(Clone)]
struct AppState {
    db: Arc<persistence::Database>,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,pipeline=debug,persistence=debug,stock_pipeline=debug")
    } else {
        EnvFilter::new("info,pipeline=info,persistence=info,stock_pipeline=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn db_path() -> String {
    std::env::var("STOCK_PIPELINE_DB_PATH").unwrap_or_else(|_| "data/stocks.db".to_string())
}

async fn open_database(path: &str) -> anyhow::Result<persistence::Database> {
    let db = persistence::Database::new(path).await.map_err(|e| {
        error!("Failed to initialize database: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;
    info!("Database initialized: {}", path);
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Seed => cmd_seed().await?,
        Commands::Ingest => {
            let code = cmd_ingest().await?;
            std::process::exit(code);
        }
        Commands::Analytics => cmd_analytics().await?,
        Commands::Run => {
            let code = cmd_run().await?;
            std::process::exit(code);
        }
        Commands::Serve { host, port } => cmd_serve(&host, port).await?,
    }

    Ok(())
}

// ============================================================================
// Job commands — invoked once daily by the external scheduler
// ============================================================================

async fn seed_reference(db: &persistence::Database) -> anyhow::Result<usize> {
    let repo = StockInfoRepository::new(db.pool());
    let mut created = 0;
    for record in default_stock_info() {
        if repo.seed(&record).await? {
            created += 1;
        }
    }
    Ok(created)
}

async fn cmd_seed() -> anyhow::Result<()> {
    let db = open_database(&db_path()).await?;
    let created = seed_reference(&db).await?;
    info!("Seed complete: {} new rows", created);
    Ok(())
}

/// Ingest the latest bar for every configured ticker. Returns the process
/// exit code (0 success, 1 total failure, 2 partial).
async fn cmd_ingest() -> anyhow::Result<i32> {
    let config = PipelineConfig::from_env()?;
    let db = open_database(&config.db_path).await?;
    seed_reference(&db).await?;

    let client = AlphaVantageClient::new(config.api_key.clone(), config.request_timeout);
    let summary = run_ingestion(&config, &client, db.pool()).await?;

    print_summary(&summary);
    Ok(summary.exit_code())
}

async fn cmd_analytics() -> anyhow::Result<()> {
    let db = open_database(&db_path()).await?;
    let outcome = run_analytics(db.pool()).await?;
    println!(
        "Analytics complete: {} tickers, {} return rows, {} portfolio rows",
        outcome.tickers, outcome.return_rows, outcome.portfolio_rows
    );
    Ok(())
}

async fn cmd_run() -> anyhow::Result<i32> {
    println!("=== stock-pipeline v{} — daily run ===", APP_VERSION);

    let config = PipelineConfig::from_env()?;
    let db = open_database(&config.db_path).await?;
    seed_reference(&db).await?;

    let client = AlphaVantageClient::new(config.api_key.clone(), config.request_timeout);
    let summary = run_ingestion(&config, &client, db.pool()).await?;
    print_summary(&summary);

    let outcome = run_analytics(db.pool()).await?;
    println!(
        "Analytics: {} return rows, {} portfolio rows",
        outcome.return_rows, outcome.portfolio_rows
    );

    Ok(summary.exit_code())
}

fn print_summary(summary: &pipeline::RunSummary) {
    println!("\nIngestion summary:");
    for (ticker, outcome) in &summary.outcomes {
        match outcome {
            TickerOutcome::Ingested => println!("  {:<6} stored", ticker),
            TickerOutcome::AlreadyIngested => println!("  {:<6} already ingested", ticker),
            TickerOutcome::Failed(reason) => println!("  {:<6} FAILED: {}", ticker, reason),
        }
    }
    println!(
        "Success: {}/{} (failed: {})",
        summary.ingested() + summary.already_ingested(),
        summary.outcomes.len(),
        summary.failed()
    );
}

// ============================================================================
// Serve command — read-only dashboard API
// ============================================================================

async fn cmd_serve(host: &str, port: u16) -> anyhow::Result<()> {
    info!("stock-pipeline v{} starting...", APP_VERSION);

    let db = open_database(&db_path()).await?;
    let state = AppState { db: Arc::new(db) };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/stocks", get(api_stocks))
        .route("/prices/latest", get(api_latest_prices))
        .route("/prices/:ticker", get(api_price_history))
        .route("/returns", get(api_returns))
        .route("/portfolio", get(api_portfolio))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(cors);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== stock-pipeline v{} ===", APP_VERSION);
    println!("Dashboard API (read-only)");
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /api/health          - Health check");
    println!("  GET  /api/stocks          - Tracked tickers");
    println!("  GET  /api/prices/latest   - Latest close per ticker with returns");
    println!("  GET  /api/prices/:ticker  - OHLCV history (?limit=30)");
    println!("  GET  /api/returns         - Daily returns (?ticker=&limit=)");
    println!("  GET  /api/portfolio       - Portfolio performance (?limit=)");
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /api/health
async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "stock-pipeline",
        "version": APP_VERSION,
    }))
}

/// GET /api/stocks — stock_info reference rows
async fn api_stocks(State(state): State<AppState>) -> Json<serde_json::Value> {
    let repo = StockInfoRepository::new(state.db.pool());
    match repo.get_all().await {
        Ok(records) => Json(serde_json::json!({
            "success": true,
            "data": records,
            "total": records.len(),
        })),
        Err(e) => Json(serde_json::json!({
            "success": false,
            "error": format!("Failed to query stock info: {}", e),
            "data": [],
        })),
    }
}

/// GET /api/prices/latest — most recent close per ticker with that
/// date's returns (if analytics has run)
async fn api_latest_prices(State(state): State<AppState>) -> Json<serde_json::Value> {
    let repo = PriceRepository::new(state.db.pool());
    match repo.latest_with_returns().await {
        Ok(rows) => Json(serde_json::json!({
            "success": true,
            "data": rows,
            "total": rows.len(),
        })),
        Err(e) => Json(serde_json::json!({
            "success": false,
            "error": format!("Failed to query latest prices: {}", e),
            "data": [],
        })),
    }
}

/// GET /api/prices/:ticker — recent OHLCV history, oldest first
async fn api_price_history(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let limit: i64 = params
        .get("limit")
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    let ticker = ticker.to_uppercase();
    let repo = PriceRepository::new(state.db.pool());
    match repo.history(&ticker, limit).await {
        Ok(records) => Json(serde_json::json!({
            "success": true,
            "ticker": ticker,
            "data": records,
            "total": records.len(),
        })),
        Err(e) => Json(serde_json::json!({
            "success": false,
            "error": format!("Failed to query price history: {}", e),
            "data": [],
        })),
    }
}

/// GET /api/returns — daily returns, newest first
async fn api_returns(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let limit: i64 = params
        .get("limit")
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);
    let ticker = params.get("ticker").map(|t| t.to_uppercase());

    let repo = ReturnsRepository::new(state.db.pool());
    match repo.history(ticker.as_deref(), limit).await {
        Ok(records) => Json(serde_json::json!({
            "success": true,
            "data": records,
            "total": records.len(),
        })),
        Err(e) => Json(serde_json::json!({
            "success": false,
            "error": format!("Failed to query returns: {}", e),
            "data": [],
        })),
    }
}

/// GET /api/portfolio — portfolio performance history, newest first
async fn api_portfolio(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let limit: i64 = params
        .get("limit")
        .and_then(|s| s.parse().ok())
        .unwrap_or(90);

    let repo = PortfolioRepository::new(state.db.pool());
    match repo.history(limit).await {
        Ok(records) => Json(serde_json::json!({
            "success": true,
            "data": records,
            "total": records.len(),
        })),
        Err(e) => Json(serde_json::json!({
            "success": false,
            "error": format!("Failed to query portfolio performance: {}", e),
            "data": [],
        })),
    }
}
