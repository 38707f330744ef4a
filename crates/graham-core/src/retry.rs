//! Retry policy with exponential backoff and optional jitter.

use std::time::Duration;

/// Status codes retried by default: rate limiting and transient upstream faults.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ retry)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(8),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay before the given retry (0-based: 0 is the wait after the first failure).
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let seconds = base.as_secs_f64() * factor.powi(exponent);
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds.max(0.0));

                if jitter {
                    let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    let jitter_ms = millis / 2;
                    let offset = fastrand::u64(0..=jitter_ms.saturating_mul(2));
                    delay = Duration::from_millis((millis + offset).saturating_sub(jitter_ms));
                }

                delay
            }
        }
    }
}

/// Configuration for the fetcher's retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per request, the first one included.
    pub max_attempts: u32,
    /// The backoff strategy to use between attempts.
    pub backoff: Backoff,
    /// HTTP status codes that trigger another attempt.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
            retry_on_status: RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff from `initial` doubling up to `max`.
    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                base: initial,
                factor: 2.0,
                max,
                jitter: false,
            },
            ..Self::default()
        }
    }

    /// Fixed delay between attempts.
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    /// Same attempt budget with no waiting, for tests and dry runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(Duration::ZERO, max_attempts)
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self::immediate(1)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// Delay after the failed attempt numbered `attempt` (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt.saturating_sub(1))
    }
}
