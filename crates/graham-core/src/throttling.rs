//! Fixed-interval admission control for outbound work.

use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Admits one unit of work per interval, shared by every task of a run.
///
/// The first unit is admitted immediately; a zero interval disables pacing.
#[derive(Clone)]
pub struct PacingLimiter {
    limiter: Option<Arc<DirectRateLimiter>>,
    interval: Duration,
}

impl PacingLimiter {
    pub fn every(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval).map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { limiter, interval }
    }

    pub fn unlimited() -> Self {
        Self::every(Duration::ZERO)
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn is_unlimited(&self) -> bool {
        self.limiter.is_none()
    }

    /// Wait until the next unit may start.
    pub async fn until_ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Non-blocking admission check.
    pub fn try_admit(&self) -> bool {
        self.limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }
}

impl std::fmt::Debug for PacingLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacingLimiter")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn admits_one_unit_per_interval() {
        let pacing = PacingLimiter::every(Duration::from_secs(60));

        assert!(pacing.try_admit());
        assert!(!pacing.try_admit());
    }

    #[test]
    fn zero_interval_never_blocks() {
        let pacing = PacingLimiter::unlimited();

        assert!(pacing.is_unlimited());
        assert!((0..100).all(|_| pacing.try_admit()));
    }

    #[tokio::test]
    async fn until_ready_spaces_consecutive_units() {
        let pacing = PacingLimiter::every(Duration::from_millis(40));
        let started = Instant::now();

        pacing.until_ready().await;
        pacing.until_ready().await;
        pacing.until_ready().await;

        assert!(started.elapsed() >= Duration::from_millis(70));
    }

    #[test]
    fn clones_share_one_budget() {
        let pacing = PacingLimiter::every(Duration::from_secs(60));
        let clone = pacing.clone();

        assert!(pacing.try_admit());
        assert!(!clone.try_admit());
    }
}
