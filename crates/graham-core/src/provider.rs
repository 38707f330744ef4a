//! Provider resources and payload shapes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FinancialRow, Ticker};
use crate::error::ValidationError;
use crate::fetcher::{FetchOutcome, ResilientFetcher};

/// Reporting-period selector of the key-statistics resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Quarterly,
    Annual,
}

impl ReportPeriod {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Quarterly => "Q",
            Self::Annual => "Y",
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "q" | "quarterly" => Ok(Self::Quarterly),
            "y" | "annual" => Ok(Self::Annual),
            other => Err(ValidationError::InvalidReportPeriod {
                value: other.to_owned(),
            }),
        }
    }
}

/// Path of the latest key-statistics report for one ticker.
pub fn key_statistics_path(ticker: &str, period: ReportPeriod) -> String {
    format!(
        "/analysis/keystat/{}?type={}&limit=1",
        urlencoding::encode(ticker),
        period.code()
    )
}

/// Rows of a key-statistics payload, or `None` when `rows` is not a list.
pub fn parse_rows(payload: &Value) -> Option<Vec<FinancialRow>> {
    payload
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(FinancialRow::from_value).collect())
}

/// Typed reads of provider resources over a [`ResilientFetcher`].
#[derive(Debug, Clone)]
pub struct ProviderClient {
    fetcher: ResilientFetcher,
    period: ReportPeriod,
}

impl ProviderClient {
    pub fn new(fetcher: ResilientFetcher) -> Self {
        Self {
            fetcher,
            period: ReportPeriod::Quarterly,
        }
    }

    pub fn with_period(mut self, period: ReportPeriod) -> Self {
        self.period = period;
        self
    }

    pub const fn period(&self) -> ReportPeriod {
        self.period
    }

    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    /// Latest key-statistics rows; `None` covers missing, unavailable and
    /// structurally unexpected payloads alike.
    pub async fn key_statistics(&self, ticker: &Ticker) -> Option<Vec<FinancialRow>> {
        let path = key_statistics_path(ticker.as_str(), self.period);
        match self.fetcher.fetch(&path).await {
            FetchOutcome::Payload(payload) => parse_rows(&payload),
            FetchOutcome::NotFound | FetchOutcome::Unavailable { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::http_client::ScriptedHttpClient;
    use crate::retry::RetryConfig;

    #[test]
    fn path_carries_period_and_limit() {
        assert_eq!(
            key_statistics_path("BBRI", ReportPeriod::Quarterly),
            "/analysis/keystat/BBRI?type=Q&limit=1"
        );
        assert_eq!(
            key_statistics_path("BRK.B", ReportPeriod::Annual),
            "/analysis/keystat/BRK.B?type=Y&limit=1"
        );
    }

    #[test]
    fn rows_must_be_a_list() {
        assert_eq!(parse_rows(&json!({"rows": {"name": "EPS"}})), None);
        assert_eq!(parse_rows(&json!({"data": []})), None);
        assert_eq!(parse_rows(&json!([])), None);
        assert_eq!(parse_rows(&json!({"rows": []})), Some(Vec::new()));

        let rows = parse_rows(&json!({"rows": [{"name": "EPS", "values": [{"amount": 5}]}]}))
            .expect("rows");
        assert_eq!(rows[0].first_amount(), Some(5.0));
    }

    #[test]
    fn period_parses_codes_and_names() {
        assert_eq!("Q".parse::<ReportPeriod>(), Ok(ReportPeriod::Quarterly));
        assert_eq!("annual".parse::<ReportPeriod>(), Ok(ReportPeriod::Annual));
        assert!("monthly".parse::<ReportPeriod>().is_err());
    }

    #[tokio::test]
    async fn key_statistics_collapses_missing_data_to_none() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .respond("/keystat/BBRI?", 200, r#"{"rows":[{"name":"EPS","values":[{"amount":1}]}]}"#)
                .respond("/keystat/TLKM?", 200, r#"{"rows":null}"#),
        );
        let provider = ProviderClient::new(
            ResilientFetcher::new(client, "https://provider.test").with_retry(RetryConfig::no_retry()),
        );

        let bbri = provider
            .key_statistics(&Ticker::parse("BBRI").expect("ticker"))
            .await;
        let tlkm = provider
            .key_statistics(&Ticker::parse("TLKM").expect("ticker"))
            .await;
        let asii = provider
            .key_statistics(&Ticker::parse("ASII").expect("ticker"))
            .await;

        assert_eq!(bbri.map(|rows| rows.len()), Some(1));
        assert_eq!(tlkm, None);
        assert_eq!(asii, None);
    }
}
