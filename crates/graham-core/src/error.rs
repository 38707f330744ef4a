use thiserror::Error;

/// Validation and contract errors exposed by `graham-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker must start with an ASCII letter: '{ch}'")]
    TickerInvalidStart { ch: char },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("invalid valuation status '{value}', expected Undervalued, Overvalued or Neutral")]
    InvalidValuationStatus { value: String },
    #[error("invalid report period '{value}', expected quarterly or annual")]
    InvalidReportPeriod { value: String },

    #[error("configuration value '{field}' is invalid: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("environment variable {name} is not set")]
    MissingEnv { name: &'static str },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Warehouse(#[from] graham_warehouse::WarehouseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
