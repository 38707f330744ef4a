use serde::{Deserialize, Serialize};

/// A sector from the reference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRecord {
    pub id: i64,
    pub name: String,
}

/// Reference row for one listed stock, as seeded by the ticker master list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: i64,
    pub ticker: String,
    pub sector_id: Option<i64>,
}

/// One daily OHLCV row of price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPriceRecord {
    pub stock_id: i64,
    /// Session date as `YYYY-MM-DD`.
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
}

/// Fundamental fields written by the fundamental worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsUpdate {
    pub ticker: String,
    pub eps_ttm: f64,
    pub bvps: f64,
    pub roe: f64,
    pub der: f64,
    pub npm: f64,
    pub graham_number: f64,
}

/// Market and valuation fields written by the market worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub ticker: String,
    pub last_price: f64,
    pub market_cap: f64,
    pub daily_volume: f64,
    pub per: f64,
    pub pbv: f64,
    pub margin_of_safety: f64,
    pub valuation_status: String,
}

/// Full stored state of one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub id: i64,
    pub ticker: String,
    pub sector_id: Option<i64>,
    pub eps_ttm: Option<f64>,
    pub bvps: Option<f64>,
    pub roe: Option<f64>,
    pub der: Option<f64>,
    pub npm: Option<f64>,
    pub graham_number: Option<f64>,
    pub last_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub daily_volume: Option<f64>,
    pub per: Option<f64>,
    pub pbv: Option<f64>,
    pub margin_of_safety: Option<f64>,
    pub valuation_status: Option<String>,
    pub updated_at: Option<String>,
}

/// One row of `sector_performance_summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSummaryRecord {
    pub sector_id: i64,
    pub sector_name: String,
    pub avg_daily_change: f64,
    pub avg_weekly_change: f64,
    pub avg_monthly_change: f64,
}

/// Audit row for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub worker: String,
    /// RFC 3339 timestamp.
    pub started_at: String,
    /// RFC 3339 timestamp.
    pub finished_at: String,
    pub total: u64,
    pub updated: u64,
    pub skipped_derivative: u64,
    pub skipped_no_data: u64,
    pub failed: u64,
    pub cancelled: bool,
}
