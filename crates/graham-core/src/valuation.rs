//! Graham Number, margin of safety and valuation status.

use serde::{Deserialize, Serialize};

use crate::domain::ValuationStatus;

/// Benjamin Graham's 15 (max P/E) x 1.5 (max P/B) multiplier.
pub const GRAHAM_MULTIPLIER: f64 = 22.5;

/// `sqrt(22.5 * eps * bvps)` when both inputs are strictly positive, else `0.0`.
pub fn graham_number(eps: f64, bvps: f64) -> f64 {
    if eps > 0.0 && bvps > 0.0 {
        let value = (GRAHAM_MULTIPLIER * eps * bvps).sqrt();
        if value.is_finite() {
            return value;
        }
    }
    0.0
}

/// `(graham - price) / graham * 100` when both are strictly positive, else `0.0`.
pub fn margin_of_safety(graham_number: f64, price: f64) -> f64 {
    if graham_number > 0.0 && price > 0.0 {
        (graham_number - price) / graham_number * 100.0
    } else {
        0.0
    }
}

pub fn valuation_status(graham_number: f64, price: f64) -> ValuationStatus {
    if !(graham_number > 0.0 && price > 0.0) {
        return ValuationStatus::Neutral;
    }
    if margin_of_safety(graham_number, price) > 0.0 {
        ValuationStatus::Undervalued
    } else {
        ValuationStatus::Overvalued
    }
}

/// Derived valuation fields of one security.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub graham_number: f64,
    pub margin_of_safety: f64,
    pub status: ValuationStatus,
}

impl Valuation {
    /// Full valuation from fundamentals and price.
    pub fn assess(eps: f64, bvps: f64, price: f64) -> Self {
        Self::from_graham(graham_number(eps, bvps), price)
    }

    /// Valuation against an already known Graham Number.
    pub fn from_graham(graham_number: f64, price: f64) -> Self {
        let graham_number = if graham_number.is_finite() && graham_number > 0.0 {
            graham_number
        } else {
            0.0
        };
        Self {
            graham_number,
            margin_of_safety: margin_of_safety(graham_number, price),
            status: valuation_status(graham_number, price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
        (actual - expected).abs() <= tolerance
    }

    #[test]
    fn graham_number_of_known_inputs() {
        let value = graham_number(500.0, 4500.0);
        assert!(close(value, 7115.0, 0.2), "{value}");
        assert!(close(value, (22.5_f64 * 500.0 * 4500.0).sqrt(), 1e-9));
    }

    #[test]
    fn non_positive_inputs_are_undeterminable() {
        for (eps, bvps) in [(0.0, 4500.0), (-1.0, 4500.0), (500.0, 0.0), (500.0, -3.0)] {
            let valuation = Valuation::assess(eps, bvps, 6000.0);
            assert_eq!(valuation.graham_number, 0.0);
            assert_eq!(valuation.margin_of_safety, 0.0);
            assert_eq!(valuation.status, ValuationStatus::Neutral);
        }
    }

    #[test]
    fn price_below_graham_is_undervalued() {
        let valuation = Valuation::from_graham(7115.0, 6000.0);
        assert!(close(valuation.margin_of_safety, 15.67, 0.01));
        assert_eq!(valuation.status, ValuationStatus::Undervalued);
    }

    #[test]
    fn price_above_graham_is_overvalued() {
        let valuation = Valuation::from_graham(7115.0, 8000.0);
        assert!(close(valuation.margin_of_safety, -12.44, 0.01));
        assert_eq!(valuation.status, ValuationStatus::Overvalued);
    }

    #[test]
    fn price_equal_to_graham_is_overvalued() {
        let valuation = Valuation::from_graham(7115.0, 7115.0);
        assert_eq!(valuation.margin_of_safety, 0.0);
        assert_eq!(valuation.status, ValuationStatus::Overvalued);
    }

    #[test]
    fn missing_price_is_neutral() {
        let valuation = Valuation::from_graham(7115.0, 0.0);
        assert_eq!(valuation.margin_of_safety, 0.0);
        assert_eq!(valuation.status, ValuationStatus::Neutral);
        assert_eq!(Valuation::from_graham(f64::NAN, 100.0).graham_number, 0.0);
    }
}
