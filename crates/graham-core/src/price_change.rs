//! Multi-horizon percentage price changes.

use serde::{Deserialize, Serialize};

/// Closes needed for a computation: today plus 21 sessions back.
pub const WINDOW_LEN: usize = 22;

/// Session lags of each horizon in a newest-first window.
pub const DAILY_LAG: usize = 1;
pub const WEEKLY_LAG: usize = 5;
pub const MONTHLY_LAG: usize = 21;

/// `(new - old) / old * 100`, undefined when either side is absent or `old` is zero.
pub fn pct_change(new: Option<f64>, old: Option<f64>) -> Option<f64> {
    let (new, old) = (new?, old?);
    if old == 0.0 || !old.is_finite() || !new.is_finite() {
        return None;
    }
    Some((new - old) / old * 100.0)
}

/// Daily, weekly and monthly change of one security. Undefined horizons are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceChanges {
    pub daily: Option<f64>,
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
}

/// Changes over a newest-first close window; `None` below [`WINDOW_LEN`] samples.
pub fn price_changes(closes: &[Option<f64>]) -> Option<PriceChanges> {
    if closes.len() < WINDOW_LEN {
        return None;
    }
    let latest = closes[0];
    Some(PriceChanges {
        daily: pct_change(latest, closes[DAILY_LAG]),
        weekly: pct_change(latest, closes[WEEKLY_LAG]),
        monthly: pct_change(latest, closes[MONTHLY_LAG]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Vec<Option<f64>> {
        let mut closes: Vec<Option<f64>> = (0..WINDOW_LEN).map(|i| Some(100.0 - i as f64)).collect();
        closes[0] = Some(110.0);
        closes[1] = Some(109.0);
        closes[5] = Some(105.0);
        closes[21] = Some(90.0);
        closes
    }

    #[test]
    fn horizons_use_fixed_session_lags() {
        let changes = price_changes(&window()).expect("full window");

        assert!((changes.daily.expect("daily") - 0.917).abs() < 0.001);
        assert!((changes.weekly.expect("weekly") - 4.762).abs() < 0.001);
        assert!((changes.monthly.expect("monthly") - 22.222).abs() < 0.001);
    }

    #[test]
    fn short_window_yields_nothing() {
        let closes = window();
        assert_eq!(price_changes(&closes[..WINDOW_LEN - 1]), None);
        assert_eq!(price_changes(&[]), None);
    }

    #[test]
    fn longer_window_ignores_extra_samples() {
        let mut closes = window();
        closes.extend([Some(1.0), Some(2.0)]);
        assert_eq!(price_changes(&closes), price_changes(&window()));
    }

    #[test]
    fn zero_or_missing_reference_is_undefined() {
        let mut closes = window();
        closes[1] = Some(0.0);
        closes[5] = None;
        let changes = price_changes(&closes).expect("full window");

        assert_eq!(changes.daily, None);
        assert_eq!(changes.weekly, None);
        assert!(changes.monthly.is_some());

        closes[0] = None;
        let changes = price_changes(&closes).expect("full window");
        assert_eq!(changes.monthly, None);
    }

    #[test]
    fn pct_change_sign_follows_direction() {
        assert_eq!(pct_change(Some(90.0), Some(100.0)), Some(-10.0));
        assert_eq!(pct_change(Some(100.0), Some(100.0)), Some(0.0));
    }
}
