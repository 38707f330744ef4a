//! Per-sector averaging of price changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Sector;
use crate::price_change::PriceChanges;

/// Averaged changes of one sector for one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSummary {
    pub sector_id: i64,
    pub sector_name: String,
    pub avg_daily_change: f64,
    pub avg_weekly_change: f64,
    pub avg_monthly_change: f64,
}

/// Collected per-security changes of one sector, one list per horizon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HorizonSamples {
    pub daily: Vec<f64>,
    pub weekly: Vec<f64>,
    pub monthly: Vec<f64>,
}

impl HorizonSamples {
    /// Add the defined horizons of one security.
    pub fn record(&mut self, changes: &PriceChanges) {
        self.daily.extend(changes.daily);
        self.weekly.extend(changes.weekly);
        self.monthly.extend(changes.monthly);
    }

    pub fn extend(&mut self, other: Self) {
        self.daily.extend(other.daily);
        self.weekly.extend(other.weekly);
        self.monthly.extend(other.monthly);
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty() && self.weekly.is_empty() && self.monthly.is_empty()
    }
}

/// Sector id to collected samples. Each task fills its own accumulator and
/// the orchestrator merges them once every task has finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorAccumulator {
    buckets: BTreeMap<i64, HorizonSamples>,
}

impl SectorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sector_id: i64, changes: &PriceChanges) {
        self.buckets.entry(sector_id).or_default().record(changes);
    }

    pub fn merge(&mut self, other: Self) {
        for (sector_id, samples) in other.buckets {
            self.buckets.entry(sector_id).or_default().extend(samples);
        }
    }

    pub fn samples(&self, sector_id: i64) -> Option<&HorizonSamples> {
        self.buckets.get(&sector_id)
    }

    pub fn sector_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.buckets.keys().copied()
    }
}

/// Arithmetic mean, `0.0` for an empty list.
pub fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// One summary per known sector, in sector-list order. Sectors without
/// samples report zero on every horizon.
pub fn summarize(sectors: &[Sector], accumulator: &SectorAccumulator) -> Vec<SectorSummary> {
    let empty = HorizonSamples::default();
    sectors
        .iter()
        .map(|sector| {
            let samples = accumulator.samples(sector.id).unwrap_or(&empty);
            SectorSummary {
                sector_id: sector.id,
                sector_name: sector.name.clone(),
                avg_daily_change: mean_or_zero(&samples.daily),
                avg_weekly_change: mean_or_zero(&samples.weekly),
                avg_monthly_change: mean_or_zero(&samples.monthly),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(id: i64, name: &str) -> Sector {
        Sector {
            id,
            name: name.to_owned(),
        }
    }

    fn changes(daily: f64, weekly: Option<f64>, monthly: f64) -> PriceChanges {
        PriceChanges {
            daily: Some(daily),
            weekly,
            monthly: Some(monthly),
        }
    }

    #[test]
    fn averages_each_horizon_independently() {
        let mut accumulator = SectorAccumulator::new();
        accumulator.record(1, &changes(1.0, Some(4.0), 10.0));
        accumulator.record(1, &changes(-2.0, None, 20.0));
        accumulator.record(1, &changes(3.0, Some(6.0), 30.0));

        let summaries = summarize(&[sector(1, "Finance")], &accumulator);

        assert_eq!(summaries.len(), 1);
        assert!((summaries[0].avg_daily_change - 0.667).abs() < 0.001);
        assert_eq!(summaries[0].avg_weekly_change, 5.0);
        assert_eq!(summaries[0].avg_monthly_change, 20.0);
    }

    #[test]
    fn sector_without_contributors_reports_zero() {
        let summaries = summarize(&[sector(1, "Finance"), sector(2, "Energy")], &SectorAccumulator::new());

        assert_eq!(summaries.len(), 2);
        for summary in summaries {
            assert_eq!(summary.avg_daily_change, 0.0);
            assert_eq!(summary.avg_weekly_change, 0.0);
            assert_eq!(summary.avg_monthly_change, 0.0);
        }
        assert_eq!(mean_or_zero(&[]), 0.0);
    }

    #[test]
    fn unknown_sectors_are_not_summarized() {
        let mut accumulator = SectorAccumulator::new();
        accumulator.record(99, &changes(1.0, None, 1.0));

        let summaries = summarize(&[sector(1, "Finance")], &accumulator);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].sector_id, 1);
        assert_eq!(summaries[0].avg_daily_change, 0.0);
    }

    #[test]
    fn merged_partials_equal_one_shared_accumulator() {
        let mut shared = SectorAccumulator::new();
        let mut left = SectorAccumulator::new();
        let mut right = SectorAccumulator::new();
        for (index, daily) in [1.0, -2.0, 3.0, 8.0].into_iter().enumerate() {
            let sample = changes(daily, Some(daily), daily);
            shared.record(7, &sample);
            if index % 2 == 0 {
                left.record(7, &sample);
            } else {
                right.record(7, &sample);
            }
        }
        left.merge(right);

        let sectors = [sector(7, "Tech")];
        assert_eq!(summarize(&sectors, &left), summarize(&sectors, &shared));
    }

    #[test]
    fn summarize_is_idempotent() {
        let mut accumulator = SectorAccumulator::new();
        accumulator.record(1, &changes(2.5, Some(1.0), -4.0));
        let sectors = [sector(1, "Finance")];

        assert_eq!(summarize(&sectors, &accumulator), summarize(&sectors, &accumulator));
    }
}
