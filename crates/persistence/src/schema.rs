//! Database schema definitions

/// SQL to create all tables
/// NOTE: Prices and percentages stored as TEXT to preserve rust_decimal::Decimal
/// precision; dates stored as ISO-8601 TEXT (lexicographic order == date order)
pub const CREATE_TABLES: &str = r#"
-- Static reference data for tracked tickers
CREATE TABLE IF NOT EXISTS stock_info (
    ticker TEXT PRIMARY KEY,
    company_name TEXT NOT NULL,
    sector TEXT NOT NULL,
    market_cap INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- One OHLCV row per (ticker, date), append-only fact table
CREATE TABLE IF NOT EXISTS stock_prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL REFERENCES stock_info(ticker),
    date TEXT NOT NULL,
    open_price TEXT NOT NULL,
    high_price TEXT NOT NULL,
    low_price TEXT NOT NULL,
    close_price TEXT NOT NULL,
    volume INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER DEFAULT (strftime('%s', 'now')),
    UNIQUE(ticker, date)
);

-- Derived per-ticker return metrics, recomputable from stock_prices
CREATE TABLE IF NOT EXISTS daily_returns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL REFERENCES stock_info(ticker),
    date TEXT NOT NULL,
    daily_return_percent TEXT NOT NULL DEFAULT '0',
    cumulative_return_percent TEXT NOT NULL DEFAULT '0',
    created_at INTEGER DEFAULT (strftime('%s', 'now')),
    UNIQUE(ticker, date)
);

-- Derived portfolio aggregate, one row per trading date
CREATE TABLE IF NOT EXISTS portfolio_performance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL UNIQUE,
    total_portfolio_value TEXT NOT NULL DEFAULT '0',
    best_performer TEXT,
    worst_performer TEXT,
    daily_return_percent TEXT NOT NULL DEFAULT '0',
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_prices_ticker_date ON stock_prices(ticker, date);
CREATE INDEX IF NOT EXISTS idx_prices_date ON stock_prices(date);
CREATE INDEX IF NOT EXISTS idx_returns_ticker_date ON daily_returns(ticker, date);
CREATE INDEX IF NOT EXISTS idx_returns_date ON daily_returns(date);
CREATE INDEX IF NOT EXISTS idx_portfolio_date ON portfolio_performance(date)
"#;
