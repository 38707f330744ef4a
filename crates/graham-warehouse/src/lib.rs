//! # Graham Warehouse
//!
//! DuckDB-based storage layer for the valuation pipeline.
//!
//! ## Overview
//!
//! The warehouse owns the persisted side of the pipeline: the stock and
//! sector reference tables, the daily price history, the per-stock
//! fundamental/valuation columns, the sector performance summary that backs
//! the heatmap, and an audit log of pipeline runs.
//!
//! All writes use parameterized queries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graham_warehouse::{Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!     for summary in warehouse.sector_summaries()? {
//!         println!("{}: {:.2}%", summary.sector_name, summary.avg_daily_change);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `sectors` | Sector reference list |
//! | `stocks` | Listed stocks with fundamental and valuation columns |
//! | `daily_stock_prices` | Daily OHLCV history per stock |
//! | `sector_performance_summary` | Per-sector average price changes, replaced on every run |
//! | `pipeline_runs` | Run audit log |

pub mod duckdb;
mod error;
pub mod migrations;
mod models;

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection};

pub use duckdb::{DuckDbConnectionManager, PooledConnection};
pub use error::WarehouseError;
pub use models::{
    DailyPriceRecord, FundamentalsUpdate, MarketUpdate, RunRecord, SectorRecord,
    SectorSummaryRecord, StockRecord, StockSnapshot,
};

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for graham data.
    pub graham_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let graham_home = resolve_graham_home();
        let db_path = graham_home.join("warehouse.duckdb");
        Self {
            graham_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Configuration for an explicit database file.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// The main warehouse interface.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::open(config.db_path, config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Open a throwaway in-memory warehouse.
    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        let manager = DuckDbConnectionManager::open_in_memory(4)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Initialize database schema.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> Option<&Path> {
        self.manager.db_path()
    }

    // ------------------------------------------------------------------
    // Reference data
    // ------------------------------------------------------------------

    /// Insert or replace sectors.
    pub fn upsert_sectors(&self, rows: &[SectorRecord]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                connection.execute(
                    "INSERT OR REPLACE INTO sectors (id, name) VALUES (?, ?)",
                    params![row.id, row.name],
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Insert stocks, or move an existing stock to a new sector.
    ///
    /// Fundamental and valuation columns of existing stocks are left untouched.
    pub fn upsert_stocks(&self, rows: &[StockRecord]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        for row in rows {
            if row.ticker.trim().is_empty() {
                return Err(WarehouseError::InvalidData(format!(
                    "stock {} has an empty ticker",
                    row.id
                )));
            }
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                let updated = connection.execute(
                    "UPDATE stocks SET sector_id = ? WHERE id = ?",
                    params![row.sector_id, row.id],
                )?;
                if updated == 0 {
                    connection.execute(
                        "INSERT INTO stocks (id, ticker, sector_id) VALUES (?, ?, ?)",
                        params![row.id, row.ticker, row.sector_id],
                    )?;
                }
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Ingest daily price rows, replacing any row with the same `(stock_id, date)`.
    pub fn ingest_daily_prices(&self, rows: &[DailyPriceRecord]) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                connection.execute(
                    "INSERT OR REPLACE INTO daily_stock_prices \
                     (stock_id, date, open, high, low, close, volume) \
                     VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?)",
                    params![
                        row.stock_id,
                        row.date,
                        row.open,
                        row.high,
                        row.low,
                        row.close,
                        row.volume
                    ],
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// All tickers, ordered alphabetically.
    pub fn list_tickers(&self) -> Result<Vec<String>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare("SELECT ticker FROM stocks ORDER BY ticker")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All sectors, ordered by id.
    pub fn list_sectors(&self) -> Result<Vec<SectorRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare("SELECT id, name FROM sectors ORDER BY id")?;
        let rows = statement.query_map([], |row| {
            Ok(SectorRecord {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Stocks that carry a sector reference, ordered by id.
    pub fn list_stocks_with_sector(&self) -> Result<Vec<StockRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT id, ticker, sector_id FROM stocks WHERE sector_id IS NOT NULL ORDER BY id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(StockRecord {
                id: row.get(0)?,
                ticker: row.get(1)?,
                sector_id: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Stored Graham Numbers by ticker. Stocks without a value are omitted.
    pub fn graham_numbers(&self) -> Result<HashMap<String, f64>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection
            .prepare("SELECT ticker, graham_number FROM stocks WHERE graham_number IS NOT NULL")?;
        let rows = statement.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }

    /// The most recent closes for one stock, newest first.
    pub fn recent_closes(
        &self,
        stock_id: i64,
        limit: usize,
    ) -> Result<Vec<Option<f64>>, WarehouseError> {
        let limit = i64::try_from(limit)
            .map_err(|_| WarehouseError::InvalidData(format!("limit {limit} is too large")))?;
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT close FROM daily_stock_prices WHERE stock_id = ? ORDER BY date DESC LIMIT ?",
        )?;
        let rows = statement.query_map(params![stock_id, limit], |row| {
            row.get::<_, Option<f64>>(0)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Full stored state for one ticker.
    pub fn stock(&self, ticker: &str) -> Result<Option<StockSnapshot>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT id, ticker, sector_id, eps_ttm, bvps, roe, der, npm, graham_number, \
             last_price, market_cap, daily_volume, per, pbv, margin_of_safety, \
             valuation_status, CAST(updated_at AS VARCHAR) \
             FROM stocks WHERE ticker = ?",
        )?;
        let mut rows = statement.query_map(params![ticker], |row| {
            Ok(StockSnapshot {
                id: row.get(0)?,
                ticker: row.get(1)?,
                sector_id: row.get(2)?,
                eps_ttm: row.get(3)?,
                bvps: row.get(4)?,
                roe: row.get(5)?,
                der: row.get(6)?,
                npm: row.get(7)?,
                graham_number: row.get(8)?,
                last_price: row.get(9)?,
                market_cap: row.get(10)?,
                daily_volume: row.get(11)?,
                per: row.get(12)?,
                pbv: row.get(13)?,
                margin_of_safety: row.get(14)?,
                valuation_status: row.get(15)?,
                updated_at: row.get(16)?,
            })
        })?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Current sector performance summary, ordered by sector id.
    pub fn sector_summaries(&self) -> Result<Vec<SectorSummaryRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT sector_id, sector_name, avg_daily_change, avg_weekly_change, avg_monthly_change \
             FROM sector_performance_summary ORDER BY sector_id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(SectorSummaryRecord {
                sector_id: row.get(0)?,
                sector_name: row.get(1)?,
                avg_daily_change: row.get(2)?,
                avg_weekly_change: row.get(3)?,
                avg_monthly_change: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Recorded pipeline runs, oldest first.
    pub fn pipeline_runs(&self) -> Result<Vec<RunRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT run_id, worker, started_at, finished_at, total, updated, \
             skipped_derivative, skipped_no_data, failed, cancelled \
             FROM pipeline_runs ORDER BY started_at, run_id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(RunRecord {
                run_id: row.get(0)?,
                worker: row.get(1)?,
                started_at: row.get(2)?,
                finished_at: row.get(3)?,
                total: row.get(4)?,
                updated: row.get(5)?,
                skipped_derivative: row.get(6)?,
                skipped_no_data: row.get(7)?,
                failed: row.get(8)?,
                cancelled: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ------------------------------------------------------------------
    // Pipeline writes
    // ------------------------------------------------------------------

    /// Write fundamental fields for one ticker. Returns the number of rows updated.
    pub fn update_fundamentals(&self, update: &FundamentalsUpdate) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let updated = connection.execute(
            "UPDATE stocks SET eps_ttm = ?, bvps = ?, roe = ?, der = ?, npm = ?, \
             graham_number = ?, updated_at = CURRENT_TIMESTAMP WHERE ticker = ?",
            params![
                update.eps_ttm,
                update.bvps,
                update.roe,
                update.der,
                update.npm,
                update.graham_number,
                update.ticker
            ],
        )?;
        Ok(updated)
    }

    /// Write market and valuation fields for one ticker. Returns the number of rows updated.
    pub fn update_market(&self, update: &MarketUpdate) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let updated = connection.execute(
            "UPDATE stocks SET last_price = ?, market_cap = ?, daily_volume = ?, per = ?, \
             pbv = ?, margin_of_safety = ?, valuation_status = ?, \
             updated_at = CURRENT_TIMESTAMP WHERE ticker = ?",
            params![
                update.last_price,
                update.market_cap,
                update.daily_volume,
                update.per,
                update.pbv,
                update.margin_of_safety,
                update.valuation_status,
                update.ticker
            ],
        )?;
        Ok(updated)
    }

    /// Delete every sector summary row. Returns the number of rows removed.
    ///
    /// This is the first half of a summary refresh; it is deliberately a
    /// separate statement from [`Warehouse::insert_sector_summaries`].
    pub fn delete_sector_summaries(&self) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let deleted = connection.execute("DELETE FROM sector_performance_summary", [])?;
        Ok(deleted)
    }

    /// Insert a freshly computed summary set in one transaction.
    pub fn insert_sector_summaries(
        &self,
        rows: &[SectorSummaryRecord],
    ) -> Result<(), WarehouseError> {
        if rows.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for row in rows {
                connection.execute(
                    "INSERT INTO sector_performance_summary \
                     (sector_id, sector_name, avg_daily_change, avg_weekly_change, avg_monthly_change) \
                     VALUES (?, ?, ?, ?, ?)",
                    params![
                        row.sector_id,
                        row.sector_name,
                        row.avg_daily_change,
                        row.avg_weekly_change,
                        row.avg_monthly_change
                    ],
                )?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// Append a run to the audit log.
    pub fn record_run(&self, run: &RunRecord) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        connection.execute(
            "INSERT INTO pipeline_runs \
             (run_id, worker, started_at, finished_at, total, updated, skipped_derivative, \
              skipped_no_data, failed, cancelled) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                run.run_id,
                run.worker,
                run.started_at,
                run.finished_at,
                run.total,
                run.updated,
                run.skipped_derivative,
                run.skipped_no_data,
                run.failed,
                run.cancelled
            ],
        )?;
        Ok(())
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Resolve the graham home directory from environment or default.
fn resolve_graham_home() -> PathBuf {
    if let Some(path) = env::var_os("GRAHAM_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".graham");
    }

    PathBuf::from(".graham")
}
