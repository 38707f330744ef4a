use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_TICKER_LEN: usize = 15;

/// Tickers longer than this that contain a hyphen are derivative listings
/// (warrants `-W`, rights `-R`, ...).
const DERIVATIVE_MIN_LEN: usize = 5;

/// Exchange ticker.
///
/// [`Ticker::parse`] normalizes user input; [`Ticker::from_stored`] wraps a
/// key read back from the store without touching it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parse and normalize a ticker to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTicker);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_TICKER_LEN {
            return Err(ValidationError::TickerTooLong {
                len,
                max: MAX_TICKER_LEN,
            });
        }

        if let Some(first) = normalized.chars().next() {
            if !first.is_ascii_alphabetic() {
                return Err(ValidationError::TickerInvalidStart { ch: first });
            }
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '.' || ch == '-';
            if !valid {
                return Err(ValidationError::TickerInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    /// Wrap a ticker exactly as the store holds it.
    ///
    /// The stored ticker is the persistence key, so case and format are kept
    /// verbatim and only blank keys are rejected.
    pub fn from_stored(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyTicker);
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this ticker names a derivative instrument rather than a stock.
    pub fn is_derivative(&self) -> bool {
        is_derivative_ticker(&self.0)
    }
}

/// Derivative rule on a raw ticker: contains a hyphen and is longer than four characters.
pub fn is_derivative_ticker(raw: &str) -> bool {
    raw.contains('-') && raw.chars().count() >= DERIVATIVE_MIN_LEN
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Ticker {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_ticker() {
        let parsed = Ticker::parse(" bbri ").expect("ticker should parse");
        assert_eq!(parsed.as_str(), "BBRI");
    }

    #[test]
    fn rejects_invalid_start() {
        let err = Ticker::parse("1BBRI").expect_err("must fail");
        assert!(matches!(err, ValidationError::TickerInvalidStart { .. }));
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = Ticker::parse("BBRI$").expect_err("must fail");
        assert!(matches!(err, ValidationError::TickerInvalidChar { .. }));
    }

    #[test]
    fn stored_tickers_are_kept_verbatim() {
        assert_eq!(Ticker::from_stored("bbri").expect("stored").as_str(), "bbri");
        assert_eq!(Ticker::from_stored("1ABC").expect("stored").as_str(), "1ABC");
        assert_eq!(
            Ticker::from_stored("   ").expect_err("blank"),
            ValidationError::EmptyTicker
        );
    }

    #[test]
    fn warrants_and_rights_are_derivatives() {
        assert!(Ticker::parse("ABCD-W").expect("valid").is_derivative());
        assert!(Ticker::parse("BUKA-R").expect("valid").is_derivative());
        assert!(!Ticker::parse("BBRI").expect("valid").is_derivative());
        // hyphenated but too short
        assert!(!is_derivative_ticker("AB-W"));
        // long but no hyphen
        assert!(!is_derivative_ticker("ABCDEF"));
    }
}
