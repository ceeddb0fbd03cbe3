//! Table repositories

pub mod portfolio;
pub mod prices;
pub mod returns;
pub mod stock_info;

pub use portfolio::{PortfolioPerformanceRecord, PortfolioRepository};
pub use prices::{LatestPriceRow, PriceRepository, StockPriceRecord};
pub use returns::{DailyReturnRecord, ReturnsRepository};
pub use stock_info::{StockInfoRecord, StockInfoRepository};
