//! # Graham Core
//!
//! Valuation and sector aggregation pipeline for listed equities.
//!
//! ## Overview
//!
//! This crate turns loosely structured key-statistics reports from a
//! financial-data provider into per-stock valuation records, and daily price
//! history into per-sector performance summaries:
//!
//! - **Resilient fetcher** with bounded retries, backoff and a request timeout
//! - **Row extractor** mapping canonical fields to keyword alternatives
//! - **Valuation engine** computing the Graham Number and margin of safety
//! - **Price-change calculator** over a 22-session close window
//! - **Sector aggregator** averaging daily, weekly and monthly changes
//! - **Pipeline orchestrator** with pacing, bounded concurrency and
//!   cooperative cancellation
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | TOML and environment configuration |
//! | [`domain`] | Tickers, securities, provider rows, sectors |
//! | [`error`] | Core error types |
//! | [`extract`] | Keyword-based field extraction |
//! | [`fetcher`] | Retrying provider reads |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pipeline`] | Fundamental, market and heatmap workers |
//! | [`price_change`] | Multi-horizon price changes |
//! | [`provider`] | Provider resources and payload parsing |
//! | [`retry`] | Retry policy and backoff |
//! | [`sector`] | Sector averaging |
//! | [`store`] | Persistence seam of the pipeline |
//! | [`throttling`] | Pacing limiter |
//! | [`valuation`] | Graham Number and margin of safety |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use graham_core::{Pipeline, PipelineConfig, ReqwestHttpClient, Warehouse, WarehouseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default().with_env_overrides();
//!     let api_key = graham_core::config::api_key_from_env()?;
//!     let warehouse = Arc::new(Warehouse::open(WarehouseConfig::default())?);
//!
//!     let pipeline = Pipeline::from_config(
//!         &config,
//!         Arc::new(ReqwestHttpClient::new()),
//!         &api_key,
//!         warehouse,
//!     );
//!     for report in pipeline.run_valuation().await? {
//!         println!("{}: {} updated", report.worker, report.updated);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Missing or malformed provider data is never an error: fields default to
//! zero, statuses to `Neutral`, and units without data are skipped and
//! counted in the [`RunReport`]. Only failures to read the universe itself
//! surface as [`CoreError`].

pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod http_client;
pub mod pipeline;
pub mod price_change;
pub mod provider;
pub mod retry;
pub mod sector;
pub mod store;
pub mod throttling;
pub mod valuation;

// Configuration
pub use config::{PacingSettings, PipelineConfig, ProviderSettings, RetrySettings};

// Domain models
pub use domain::{
    is_derivative_ticker, FinancialRow, Fundamentals, MarketData, Sector, SectoredStock, Security,
    Ticker, ValuationStatus, ValuePoint,
};

// Error types
pub use error::{CoreError, ValidationError};

// Extraction
pub use extract::{extract_amount, Field, FieldKeywords, RowExtractor};

// Fetching
pub use fetcher::{FetchOutcome, ResilientFetcher};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};

// Orchestration
pub use pipeline::{CancelToken, Pipeline, RunReport, Worker};

// Price changes and sectors
pub use price_change::{pct_change, price_changes, PriceChanges};
pub use sector::{mean_or_zero, summarize, SectorAccumulator, SectorSummary};

// Provider
pub use provider::{ProviderClient, ReportPeriod};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Persistence
pub use store::PipelineStore;

// Throttling
pub use throttling::PacingLimiter;

// Valuation
pub use valuation::{graham_number, margin_of_safety, valuation_status, Valuation};

// Warehouse (re-exported from graham-warehouse)
pub use graham_warehouse::{
    DailyPriceRecord, FundamentalsUpdate, MarketUpdate, RunRecord, SectorRecord,
    SectorSummaryRecord, StockRecord, StockSnapshot, Warehouse, WarehouseConfig, WarehouseError,
};
