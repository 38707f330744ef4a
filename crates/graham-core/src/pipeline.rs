//! Pipeline orchestration: the fundamental, market and heatmap workers.
//!
//! Every worker follows the same loop. Derivative tickers are partitioned out
//! first, then each remaining unit waits for its pacing slot and a
//! concurrency permit and runs as its own task. Results come back through the
//! join set and are merged only after every task has finished, which is the
//! barrier the sector aggregation relies on. A failing or panicking unit is
//! counted and logged without touching the others.
//!
//! Tickers go to the provider and back to the store exactly as the store
//! returned them. Store calls made inside a unit run on the blocking pool.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use graham_warehouse::{RunRecord, WarehouseError};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::domain::{is_derivative_ticker, SectoredStock, Security, Ticker};
use crate::error::CoreError;
use crate::extract::{FieldKeywords, RowExtractor};
use crate::fetcher::ResilientFetcher;
use crate::http_client::{HttpAuth, HttpClient};
use crate::price_change::{price_changes, PriceChanges, WINDOW_LEN};
use crate::provider::ProviderClient;
use crate::sector::{summarize, SectorAccumulator};
use crate::store::PipelineStore;
use crate::throttling::PacingLimiter;

/// Units between two progress log lines.
pub const PROGRESS_EVERY: usize = 20;

/// Cooperative run cancellation, checked before each unit starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Worker {
    Fundamentals,
    Market,
    Heatmap,
}

impl Worker {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fundamentals => "fundamentals",
            Self::Market => "market",
            Self::Heatmap => "heatmap",
        }
    }
}

impl std::fmt::Display for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters of one worker run.
///
/// `updated + skipped_derivative + skipped_no_data + failed` equals `total`
/// unless the run was cancelled before every unit started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub worker: Worker,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub total: u64,
    pub updated: u64,
    pub skipped_derivative: u64,
    pub skipped_no_data: u64,
    pub failed: u64,
    pub cancelled: bool,
}

impl RunReport {
    fn start(worker: Worker) -> Self {
        Self {
            worker,
            run_id: Uuid::new_v4().to_string(),
            started_at: now_rfc3339(),
            finished_at: String::new(),
            total: 0,
            updated: 0,
            skipped_derivative: 0,
            skipped_no_data: 0,
            failed: 0,
            cancelled: false,
        }
    }

    /// Units that reached a terminal outcome.
    pub const fn accounted(&self) -> u64 {
        self.updated + self.skipped_derivative + self.skipped_no_data + self.failed
    }

    pub fn to_record(&self) -> RunRecord {
        RunRecord {
            run_id: self.run_id.clone(),
            worker: self.worker.as_str().to_owned(),
            started_at: self.started_at.clone(),
            finished_at: self.finished_at.clone(),
            total: self.total,
            updated: self.updated,
            skipped_derivative: self.skipped_derivative,
            skipped_no_data: self.skipped_no_data,
            failed: self.failed,
            cancelled: self.cancelled,
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

enum Unit<R> {
    Updated(R),
    NoData,
    Failed,
}

struct Tally<R> {
    values: Vec<R>,
    updated: u64,
    no_data: u64,
    failed: u64,
    cancelled: bool,
}

impl<R> Tally<R> {
    fn apply_to(&self, report: &mut RunReport) {
        report.updated += self.updated;
        report.skipped_no_data += self.no_data;
        report.failed += self.failed;
        report.cancelled |= self.cancelled;
    }
}

/// The valuation and aggregation pipeline over one provider session and one store.
#[derive(Clone)]
pub struct Pipeline {
    provider: ProviderClient,
    store: Arc<dyn PipelineStore>,
    keywords: Arc<FieldKeywords>,
    provider_pacing: PacingLimiter,
    history_pacing: PacingLimiter,
    max_concurrency: usize,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(provider: ProviderClient, store: Arc<dyn PipelineStore>) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            provider,
            store,
            keywords: Arc::new(defaults.keywords.clone()),
            provider_pacing: defaults.provider_pacing(),
            history_pacing: defaults.history_pacing(),
            max_concurrency: defaults.pacing.max_concurrency,
            cancel: CancelToken::new(),
        }
    }

    /// Wire a pipeline from configuration around one shared transport.
    pub fn from_config(
        config: &PipelineConfig,
        client: Arc<dyn HttpClient>,
        api_key: &str,
        store: Arc<dyn PipelineStore>,
    ) -> Self {
        let fetcher = ResilientFetcher::new(client, config.provider.base_url.clone())
            .with_auth(HttpAuth::BearerToken(api_key.to_owned()))
            .with_retry(config.retry_config())
            .with_timeout(config.timeout());
        let provider = ProviderClient::new(fetcher).with_period(config.provider.period);

        Self::new(provider, store)
            .with_keywords(config.keywords.clone())
            .with_provider_pacing(config.provider_pacing())
            .with_history_pacing(config.history_pacing())
            .with_max_concurrency(config.pacing.max_concurrency)
    }

    pub fn with_keywords(mut self, keywords: FieldKeywords) -> Self {
        self.keywords = Arc::new(keywords);
        self
    }

    pub fn with_provider_pacing(mut self, pacing: PacingLimiter) -> Self {
        self.provider_pacing = pacing;
        self
    }

    pub fn with_history_pacing(mut self, pacing: PacingLimiter) -> Self {
        self.history_pacing = pacing;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Fetch key statistics for every ticker and store fundamentals and the
    /// Graham Number.
    pub async fn run_fundamentals(&self) -> Result<RunReport, CoreError> {
        let mut report = RunReport::start(Worker::Fundamentals);
        let tickers = self.universe(&mut report)?;

        let pipeline = self.clone();
        let tally = self
            .drive(Worker::Fundamentals, tickers, &self.provider_pacing, move |ticker| {
                let pipeline = pipeline.clone();
                async move { pipeline.fundamentals_unit(ticker).await }
            })
            .await;
        tally.apply_to(&mut report);

        Ok(self.finish(report))
    }

    /// Fetch market data for every ticker and value it against the stored
    /// Graham Numbers.
    pub async fn run_market(&self) -> Result<RunReport, CoreError> {
        let mut report = RunReport::start(Worker::Market);
        let tickers = self.universe(&mut report)?;

        let graham_numbers = match self.store.graham_numbers() {
            Ok(numbers) => numbers,
            Err(error) => {
                warn!(%error, "could not load stored Graham Numbers, valuing every ticker as Neutral");
                HashMap::new()
            }
        };
        let graham_numbers = Arc::new(graham_numbers);

        let pipeline = self.clone();
        let tally = self
            .drive(Worker::Market, tickers, &self.provider_pacing, move |ticker| {
                let pipeline = pipeline.clone();
                let graham_numbers = Arc::clone(&graham_numbers);
                async move { pipeline.market_unit(ticker, &graham_numbers).await }
            })
            .await;
        tally.apply_to(&mut report);

        Ok(self.finish(report))
    }

    /// Fundamentals then market, so every valuation field is refreshed.
    pub async fn run_valuation(&self) -> Result<Vec<RunReport>, CoreError> {
        let fundamentals = self.run_fundamentals().await?;
        let market = self.run_market().await?;
        Ok(vec![fundamentals, market])
    }

    /// Recompute per-sector average price changes and replace the stored summary.
    pub async fn run_heatmap(&self) -> Result<RunReport, CoreError> {
        let mut report = RunReport::start(Worker::Heatmap);
        let sectors = self.store.sectors()?;
        let stocks = self.store.sectored_stocks()?;
        report.total = stocks.len() as u64;

        if stocks.is_empty() {
            info!("no stocks with a sector, keeping the stored summary");
            return Ok(self.finish(report));
        }

        let known: HashSet<i64> = sectors.iter().map(|sector| sector.id).collect();
        let (stocks, unknown): (Vec<SectoredStock>, Vec<SectoredStock>) = stocks
            .into_iter()
            .partition(|stock| known.contains(&stock.sector_id));
        for stock in &unknown {
            warn!(ticker = %stock.ticker, sector_id = stock.sector_id, "unknown sector, stock ignored");
        }
        report.skipped_no_data += unknown.len() as u64;

        let store = Arc::clone(&self.store);
        let tally = self
            .drive(Worker::Heatmap, stocks, &self.history_pacing, move |stock| {
                let store = Arc::clone(&store);
                async move { history_unit(&store, stock).await }
            })
            .await;
        tally.apply_to(&mut report);

        if tally.cancelled {
            info!("heatmap run cancelled, keeping the stored summary");
            return Ok(self.finish(report));
        }

        let mut accumulator = SectorAccumulator::new();
        for (sector_id, changes) in &tally.values {
            accumulator.record(*sector_id, changes);
        }
        let summaries = summarize(&sectors, &accumulator);

        match self.store.clear_summaries() {
            Ok(removed) => {
                debug!(removed, "cleared sector summary");
                match self.store.insert_summaries(&summaries) {
                    Ok(()) => info!(sectors = summaries.len(), "sector summary replaced"),
                    Err(error) => {
                        warn!(%error, "failed to insert sector summary");
                        report.failed += 1;
                    }
                }
            }
            Err(error) => {
                warn!(%error, "failed to clear sector summary");
                report.failed += 1;
            }
        }

        Ok(self.finish(report))
    }

    fn universe(&self, report: &mut RunReport) -> Result<Vec<Ticker>, CoreError> {
        let raw = self.store.tickers()?;
        report.total = raw.len() as u64;

        let mut tickers = Vec::with_capacity(raw.len());
        for symbol in raw {
            if is_derivative_ticker(&symbol) {
                info!(ticker = %symbol, "derivative instrument, skipped");
                report.skipped_derivative += 1;
                continue;
            }
            match Ticker::from_stored(&symbol) {
                Ok(ticker) => tickers.push(ticker),
                Err(error) => {
                    warn!(ticker = %symbol, %error, "invalid ticker in universe");
                    report.failed += 1;
                }
            }
        }
        Ok(tickers)
    }

    async fn drive<T, R, F, Fut>(
        &self,
        worker: Worker,
        units: Vec<T>,
        pacing: &PacingLimiter,
        process: F,
    ) -> Tally<R>
    where
        R: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Unit<R>> + Send + 'static,
    {
        let total = units.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut cancelled = false;

        info!(%worker, units = total, concurrency = self.max_concurrency, "run started");

        for (index, unit) in units.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            pacing.until_ready().await;
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let future = process(unit);
            tasks.spawn(async move {
                let _permit = permit;
                future.await
            });

            let started = index + 1;
            if started % PROGRESS_EVERY == 0 {
                info!(%worker, started, total, "progress");
            }
        }

        let mut tally = Tally {
            values: Vec::new(),
            updated: 0,
            no_data: 0,
            failed: 0,
            cancelled,
        };
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Unit::Updated(value)) => {
                    tally.updated += 1;
                    tally.values.push(value);
                }
                Ok(Unit::NoData) => tally.no_data += 1,
                Ok(Unit::Failed) => tally.failed += 1,
                Err(error) => {
                    warn!(%worker, %error, "unit task aborted");
                    tally.failed += 1;
                }
            }
        }
        tally
    }

    async fn fundamentals_unit(&self, ticker: Ticker) -> Unit<()> {
        let Some(rows) = self.provider.key_statistics(&ticker).await else {
            warn!(ticker = %ticker, "no key statistics available");
            return Unit::NoData;
        };

        let mut security = Security::new(ticker);
        security.apply_fundamentals(RowExtractor::new(&rows, &self.keywords).fundamentals());

        let update = security.to_fundamentals_update();
        let saved = on_store(&self.store, move |store| store.save_fundamentals(&update)).await;
        let outcome = persisted(&security.ticker, saved);
        if matches!(outcome, Unit::Updated(())) {
            debug!(
                ticker = %security.ticker,
                eps = security.fundamentals.eps,
                bvps = security.fundamentals.bvps,
                graham_number = security.graham_number,
                "fundamentals updated"
            );
        }
        outcome
    }

    async fn market_unit(&self, ticker: Ticker, graham_numbers: &HashMap<String, f64>) -> Unit<()> {
        let Some(rows) = self.provider.key_statistics(&ticker).await else {
            warn!(ticker = %ticker, "no market data available");
            return Unit::NoData;
        };

        let graham_number = graham_numbers.get(ticker.as_str()).copied().unwrap_or(0.0);
        let mut security = Security::new(ticker).with_graham_number(graham_number);
        security.apply_market(RowExtractor::new(&rows, &self.keywords).market_data());

        let update = security.to_market_update();
        let saved = on_store(&self.store, move |store| store.save_market(&update)).await;
        let outcome = persisted(&security.ticker, saved);
        if matches!(outcome, Unit::Updated(())) {
            debug!(
                ticker = %security.ticker,
                price = security.market.price,
                margin_of_safety = security.margin_of_safety,
                status = %security.valuation_status,
                "market data updated"
            );
        }
        outcome
    }

    fn finish(&self, mut report: RunReport) -> RunReport {
        report.finished_at = now_rfc3339();
        if let Err(error) = self.store.record_run(&report.to_record()) {
            warn!(run_id = %report.run_id, %error, "failed to record run");
        }
        info!(
            worker = %report.worker,
            run_id = %report.run_id,
            total = report.total,
            updated = report.updated,
            skipped_derivative = report.skipped_derivative,
            skipped_no_data = report.skipped_no_data,
            failed = report.failed,
            cancelled = report.cancelled,
            "run finished"
        );
        report
    }
}

#[derive(Debug, Error)]
enum StoreCallError {
    #[error(transparent)]
    Store(#[from] WarehouseError),
    #[error("store call aborted: {0}")]
    Aborted(#[from] JoinError),
}

/// Run a synchronous store call on the blocking pool.
async fn on_store<T, F>(store: &Arc<dyn PipelineStore>, call: F) -> Result<T, StoreCallError>
where
    T: Send + 'static,
    F: FnOnce(&dyn PipelineStore) -> Result<T, WarehouseError> + Send + 'static,
{
    let store = Arc::clone(store);
    Ok(tokio::task::spawn_blocking(move || call(store.as_ref())).await??)
}

fn persisted(ticker: &Ticker, saved: Result<usize, StoreCallError>) -> Unit<()> {
    match saved {
        Ok(0) => {
            warn!(ticker = %ticker, "ticker not found in store, nothing updated");
            Unit::NoData
        }
        Ok(_) => Unit::Updated(()),
        Err(error) => {
            warn!(ticker = %ticker, %error, "failed to persist update");
            Unit::Failed
        }
    }
}

async fn history_unit(
    store: &Arc<dyn PipelineStore>,
    stock: SectoredStock,
) -> Unit<(i64, PriceChanges)> {
    let stock_id = stock.id;
    let closes = on_store(store, move |store| store.recent_closes(stock_id, WINDOW_LEN)).await;
    match closes {
        Ok(closes) => match price_changes(&closes) {
            Some(changes) => Unit::Updated((stock.sector_id, changes)),
            None => {
                debug!(ticker = %stock.ticker, samples = closes.len(), "not enough price history");
                Unit::NoData
            }
        },
        Err(error) => {
            warn!(ticker = %stock.ticker, %error, "failed to read price history");
            Unit::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn report_maps_onto_audit_record() {
        let mut report = RunReport::start(Worker::Market);
        report.total = 5;
        report.updated = 2;
        report.skipped_derivative = 1;
        report.skipped_no_data = 1;
        report.failed = 1;

        let record = report.to_record();
        assert_eq!(record.worker, "market");
        assert_eq!(record.run_id, report.run_id);
        assert_eq!(report.accounted(), report.total);
        assert!(OffsetDateTime::parse(&report.started_at, &Rfc3339).is_ok());
    }

    #[test]
    fn worker_serializes_in_snake_case() {
        let json = serde_json::to_string(&Worker::Fundamentals).expect("json");
        assert_eq!(json, "\"fundamentals\"");
    }
}
