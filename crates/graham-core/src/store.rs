//! Persistence seam of the pipeline.

use std::collections::HashMap;

use graham_warehouse::{
    FundamentalsUpdate, MarketUpdate, RunRecord, SectorSummaryRecord, Warehouse, WarehouseError,
};

use crate::domain::{Sector, SectoredStock};
use crate::sector::SectorSummary;

/// Reads and writes the orchestrator needs from storage.
///
/// Update methods return the number of stock rows touched; zero means the
/// ticker is not in the store.
pub trait PipelineStore: Send + Sync {
    /// Security universe, ordered by ticker.
    fn tickers(&self) -> Result<Vec<String>, WarehouseError>;

    /// Previously computed Graham Numbers by ticker.
    fn graham_numbers(&self) -> Result<HashMap<String, f64>, WarehouseError>;

    fn save_fundamentals(&self, update: &FundamentalsUpdate) -> Result<usize, WarehouseError>;

    fn save_market(&self, update: &MarketUpdate) -> Result<usize, WarehouseError>;

    /// Stocks with a sector assignment.
    fn sectored_stocks(&self) -> Result<Vec<SectoredStock>, WarehouseError>;

    /// Up to `limit` closes for one stock, newest first.
    fn recent_closes(&self, stock_id: i64, limit: usize) -> Result<Vec<Option<f64>>, WarehouseError>;

    fn sectors(&self) -> Result<Vec<Sector>, WarehouseError>;

    /// Remove every stored sector summary.
    fn clear_summaries(&self) -> Result<usize, WarehouseError>;

    fn insert_summaries(&self, summaries: &[SectorSummary]) -> Result<(), WarehouseError>;

    fn record_run(&self, run: &RunRecord) -> Result<(), WarehouseError>;
}

impl PipelineStore for Warehouse {
    fn tickers(&self) -> Result<Vec<String>, WarehouseError> {
        self.list_tickers()
    }

    fn graham_numbers(&self) -> Result<HashMap<String, f64>, WarehouseError> {
        Warehouse::graham_numbers(self)
    }

    fn save_fundamentals(&self, update: &FundamentalsUpdate) -> Result<usize, WarehouseError> {
        self.update_fundamentals(update)
    }

    fn save_market(&self, update: &MarketUpdate) -> Result<usize, WarehouseError> {
        self.update_market(update)
    }

    fn sectored_stocks(&self) -> Result<Vec<SectoredStock>, WarehouseError> {
        Ok(self
            .list_stocks_with_sector()?
            .into_iter()
            .filter_map(|stock| {
                stock.sector_id.map(|sector_id| SectoredStock {
                    id: stock.id,
                    ticker: stock.ticker,
                    sector_id,
                })
            })
            .collect())
    }

    fn recent_closes(&self, stock_id: i64, limit: usize) -> Result<Vec<Option<f64>>, WarehouseError> {
        Warehouse::recent_closes(self, stock_id, limit)
    }

    fn sectors(&self) -> Result<Vec<Sector>, WarehouseError> {
        Ok(self
            .list_sectors()?
            .into_iter()
            .map(|sector| Sector {
                id: sector.id,
                name: sector.name,
            })
            .collect())
    }

    fn clear_summaries(&self) -> Result<usize, WarehouseError> {
        self.delete_sector_summaries()
    }

    fn insert_summaries(&self, summaries: &[SectorSummary]) -> Result<(), WarehouseError> {
        let rows: Vec<SectorSummaryRecord> = summaries
            .iter()
            .map(|summary| SectorSummaryRecord {
                sector_id: summary.sector_id,
                sector_name: summary.sector_name.clone(),
                avg_daily_change: summary.avg_daily_change,
                avg_weekly_change: summary.avg_weekly_change,
                avg_monthly_change: summary.avg_monthly_change,
            })
            .collect();
        self.insert_sector_summaries(&rows)
    }

    fn record_run(&self, run: &RunRecord) -> Result<(), WarehouseError> {
        Warehouse::record_run(self, run)
    }
}
