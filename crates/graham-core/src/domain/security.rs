use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use graham_warehouse::{FundamentalsUpdate, MarketUpdate};

use crate::valuation::{self, Valuation};
use crate::{Ticker, ValidationError};

/// Valuation verdict derived from the margin of safety.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValuationStatus {
    Undervalued,
    Overvalued,
    #[default]
    Neutral,
}

impl ValuationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undervalued => "Undervalued",
            Self::Overvalued => "Overvalued",
            Self::Neutral => "Neutral",
        }
    }
}

impl Display for ValuationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValuationStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "undervalued" => Ok(Self::Undervalued),
            "overvalued" => Ok(Self::Overvalued),
            "neutral" => Ok(Self::Neutral),
            other => Err(ValidationError::InvalidValuationStatus {
                value: other.to_owned(),
            }),
        }
    }
}

/// Fundamental ratios from the latest key-statistics report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Earnings per share, trailing twelve months.
    pub eps: f64,
    /// Book value per share.
    pub bvps: f64,
    /// Return on equity.
    pub roe: f64,
    /// Debt to equity.
    pub der: f64,
    /// Net profit margin.
    pub npm: f64,
}

/// Market snapshot from the latest key-statistics report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub price: f64,
    pub market_cap: f64,
    pub volume: f64,
    /// Price to earnings.
    pub per: f64,
    /// Price to book value.
    pub pbv: f64,
}

/// One listed security with its fundamental and valuation record.
///
/// Missing inputs are zeros, never errors: a zero Graham Number means the
/// intrinsic value could not be determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub ticker: Ticker,
    pub fundamentals: Fundamentals,
    pub market: MarketData,
    pub graham_number: f64,
    pub margin_of_safety: f64,
    pub valuation_status: ValuationStatus,
}

impl Security {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            fundamentals: Fundamentals::default(),
            market: MarketData::default(),
            graham_number: 0.0,
            margin_of_safety: 0.0,
            valuation_status: ValuationStatus::Neutral,
        }
    }

    /// Seed the Graham Number computed by an earlier fundamental pass.
    pub fn with_graham_number(mut self, graham_number: f64) -> Self {
        self.graham_number = if graham_number.is_finite() {
            graham_number
        } else {
            0.0
        };
        self
    }

    /// Store fundamentals and recompute the Graham Number from them.
    pub fn apply_fundamentals(&mut self, fundamentals: Fundamentals) {
        self.fundamentals = fundamentals;
        self.graham_number = valuation::graham_number(fundamentals.eps, fundamentals.bvps);
    }

    /// Store market data and recompute margin of safety and status against
    /// the current Graham Number.
    pub fn apply_market(&mut self, market: MarketData) {
        self.market = market;
        self.apply_valuation(Valuation::from_graham(self.graham_number, market.price));
    }

    /// Columns persisted by the fundamental worker.
    pub fn to_fundamentals_update(&self) -> FundamentalsUpdate {
        FundamentalsUpdate {
            ticker: self.ticker.to_string(),
            eps_ttm: self.fundamentals.eps,
            bvps: self.fundamentals.bvps,
            roe: self.fundamentals.roe,
            der: self.fundamentals.der,
            npm: self.fundamentals.npm,
            graham_number: self.graham_number,
        }
    }

    /// Columns persisted by the market worker.
    pub fn to_market_update(&self) -> MarketUpdate {
        MarketUpdate {
            ticker: self.ticker.to_string(),
            last_price: self.market.price,
            market_cap: self.market.market_cap,
            daily_volume: self.market.volume,
            per: self.market.per,
            pbv: self.market.pbv,
            margin_of_safety: self.margin_of_safety,
            valuation_status: self.valuation_status.as_str().to_owned(),
        }
    }

    fn apply_valuation(&mut self, valuation: Valuation) {
        self.graham_number = valuation.graham_number;
        self.margin_of_safety = valuation.margin_of_safety;
        self.valuation_status = valuation.status;
    }
}

/// A sector from the reference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: i64,
    pub name: String,
}

/// A stock that belongs to a sector, as seen by the heatmap worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectoredStock {
    pub id: i64,
    pub ticker: String,
    pub sector_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbri() -> Security {
        Security::new(Ticker::parse("BBRI").expect("valid"))
    }

    #[test]
    fn fundamentals_then_market_fill_every_derived_field() {
        let mut security = bbri();
        security.apply_fundamentals(Fundamentals {
            eps: 500.0,
            bvps: 4500.0,
            roe: 18.0,
            der: 5.2,
            npm: 30.1,
        });
        assert!((security.graham_number - 7115.124735).abs() < 1e-3);

        security.apply_market(MarketData {
            price: 6000.0,
            ..MarketData::default()
        });
        assert!((security.margin_of_safety - 15.67).abs() < 0.01);
        assert_eq!(security.valuation_status, ValuationStatus::Undervalued);
    }

    #[test]
    fn market_pass_without_graham_is_neutral() {
        let mut security = bbri();
        security.apply_market(MarketData {
            price: 6000.0,
            ..MarketData::default()
        });
        assert_eq!(security.margin_of_safety, 0.0);
        assert_eq!(security.valuation_status, ValuationStatus::Neutral);
    }

    #[test]
    fn stored_graham_number_drives_market_pass() {
        let mut security = bbri().with_graham_number(7115.0);
        security.apply_market(MarketData {
            price: 8000.0,
            ..MarketData::default()
        });
        assert_eq!(security.valuation_status, ValuationStatus::Overvalued);

        let nan = bbri().with_graham_number(f64::NAN);
        assert_eq!(nan.graham_number, 0.0);
    }

    #[test]
    fn updates_carry_persisted_columns() {
        let mut security = bbri().with_graham_number(7115.0);
        security.apply_market(MarketData {
            price: 6000.0,
            market_cap: 1.0e15,
            volume: 2.0e8,
            per: 11.0,
            pbv: 2.1,
        });

        let update = security.to_market_update();
        assert_eq!(update.ticker, "BBRI");
        assert_eq!(update.daily_volume, 2.0e8);
        assert_eq!(update.valuation_status, "Undervalued");
        assert_eq!(security.to_fundamentals_update().graham_number, 7115.0);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            "undervalued".parse::<ValuationStatus>(),
            Ok(ValuationStatus::Undervalued)
        );
        assert!("cheap".parse::<ValuationStatus>().is_err());
        assert_eq!(ValuationStatus::Overvalued.to_string(), "Overvalued");
    }
}
