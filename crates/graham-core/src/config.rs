//! Pipeline configuration: TOML file, environment, defaults.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};
use crate::extract::FieldKeywords;
use crate::fetcher::DEFAULT_PROVIDER_URL;
use crate::provider::ReportPeriod;
use crate::retry::RetryConfig;
use crate::throttling::PacingLimiter;

pub const API_KEY_ENV: &str = "GRAHAM_API_KEY";
pub const PROVIDER_URL_ENV: &str = "GRAHAM_PROVIDER_URL";

/// Complete pipeline configuration. Every section is optional in TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub provider: ProviderSettings,
    pub retry: RetrySettings,
    pub pacing: PacingSettings,
    pub keywords: FieldKeywords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub period: ReportPeriod,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_owned(),
            timeout_secs: 15,
            period: ReportPeriod::Quarterly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Total attempts per request.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingSettings {
    /// Minimum spacing between provider-backed units.
    pub provider_interval_ms: u64,
    /// Minimum spacing between price-history reads.
    pub history_interval_ms: u64,
    /// Units in flight at once; `1` keeps the run sequential.
    pub max_concurrency: usize,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            provider_interval_ms: 200,
            history_interval_ms: 50,
            max_concurrency: 1,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Load `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, CoreError> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `GRAHAM_PROVIDER_URL` when set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_provider_url(env::var(PROVIDER_URL_ENV).ok())
    }

    pub fn with_provider_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.map(|url| url.trim().to_owned()).filter(|url| !url.is_empty()) {
            self.provider.base_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let base_url = self.provider.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidConfig {
                field: "provider.base_url",
                reason: format!("'{base_url}' is not an http(s) URL"),
            });
        }
        if self.provider.timeout_secs == 0 {
            return Err(ValidationError::InvalidConfig {
                field: "provider.timeout_secs",
                reason: String::from("must be greater than zero"),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ValidationError::InvalidConfig {
                field: "retry.max_attempts",
                reason: String::from("must be at least 1"),
            });
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ValidationError::InvalidConfig {
                field: "retry.initial_backoff_ms",
                reason: String::from("must not exceed retry.max_backoff_ms"),
            });
        }
        if self.pacing.max_concurrency == 0 {
            return Err(ValidationError::InvalidConfig {
                field: "pacing.max_concurrency",
                reason: String::from("must be at least 1"),
            });
        }
        if let Some(field) = self.keywords.empty_fields().first() {
            return Err(ValidationError::InvalidConfig {
                field: "keywords",
                reason: format!("'{}' has no keywords", field.as_str()),
            });
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::exponential(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_backoff_ms),
            Duration::from_millis(self.retry.max_backoff_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs)
    }

    pub fn provider_pacing(&self) -> PacingLimiter {
        PacingLimiter::every(Duration::from_millis(self.pacing.provider_interval_ms))
    }

    pub fn history_pacing(&self) -> PacingLimiter {
        PacingLimiter::every(Duration::from_millis(self.pacing.history_interval_ms))
    }
}

/// Provider bearer token from `GRAHAM_API_KEY`.
pub fn api_key_from_env() -> Result<String, ValidationError> {
    env::var(API_KEY_ENV)
        .ok()
        .map(|key| key.trim().to_owned())
        .filter(|key| !key.is_empty())
        .ok_or(ValidationError::MissingEnv { name: API_KEY_ENV })
}
