//! # Domain Models
//!
//! Canonical types flowing through the valuation pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated exchange ticker |
//! | [`Security`] | Per-ticker fundamentals and valuation record |
//! | [`Fundamentals`] | EPS, BVPS, ROE, DER and NPM |
//! | [`MarketData`] | Price, market cap, volume, PER and PBV |
//! | [`ValuationStatus`] | Undervalued / Overvalued / Neutral |
//! | [`FinancialRow`] | Provider row: display name plus value points |
//! | [`Sector`] | Sector reference entry |
//! | [`SectoredStock`] | Stock with a known sector, input of the heatmap |
//!
//! Missing numeric inputs degrade to zero and a `Neutral` status. Only the
//! ticker is validated at construction time.

mod rows;
mod security;
mod ticker;

pub use rows::{FinancialRow, ValuePoint};
pub use security::{
    Fundamentals, MarketData, Sector, SectoredStock, Security, ValuationStatus,
};
pub use ticker::{is_derivative_ticker, Ticker};
