//! Resilient reads against the financial-data provider.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;

/// Default provider base URL.
pub const DEFAULT_PROVIDER_URL: &str = "https://api.invezgo.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of one logical provider read.
///
/// None of the variants is an error for the caller: `NotFound` and
/// `Unavailable` both mean "no data for this unit".
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Payload(Value),
    NotFound,
    Unavailable { attempts: u32, reason: String },
}

impl FetchOutcome {
    pub fn into_payload(self) -> Option<Value> {
        match self {
            Self::Payload(value) => Some(value),
            Self::NotFound | Self::Unavailable { .. } => None,
        }
    }

    pub const fn is_payload(&self) -> bool {
        matches!(self, Self::Payload(_))
    }
}

enum Attempt {
    Done(FetchOutcome),
    Retry(String),
}

/// Authenticated GET with bounded retries, backoff and a per-request timeout.
///
/// One fetcher wraps one shared transport for the whole run.
#[derive(Clone)]
pub struct ResilientFetcher {
    client: Arc<dyn HttpClient>,
    base_url: String,
    auth: HttpAuth,
    retry: RetryConfig,
    timeout: Duration,
}

impl ResilientFetcher {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            auth: HttpAuth::None,
            retry: RetryConfig::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_auth(mut self, auth: HttpAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Read `path` and parse the body as JSON.
    pub async fn fetch(&self, path: &str) -> FetchOutcome {
        let url = self.url_for(path);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(&url).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(reason) => {
                    if attempt < max_attempts {
                        let delay = self.retry.delay_after_attempt(attempt);
                        warn!(
                            path,
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            reason = %reason,
                            "provider request failed, retrying"
                        );
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    last_reason = reason;
                }
            }
        }

        warn!(path, attempts = max_attempts, reason = %last_reason, "provider unavailable");
        FetchOutcome::Unavailable {
            attempts: max_attempts,
            reason: last_reason,
        }
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_auth(&self.auth)
            .with_timeout(self.timeout);

        let response = match tokio::time::timeout(self.timeout, self.client.execute(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(HttpError::new(format!(
                "request timed out after {}ms",
                self.timeout.as_millis()
            ))),
        };

        match response {
            Ok(response) => self.classify(response),
            Err(error) if error.retryable() => Attempt::Retry(error.message().to_owned()),
            Err(error) => Attempt::Done(FetchOutcome::Unavailable {
                attempts: 1,
                reason: error.message().to_owned(),
            }),
        }
    }

    fn classify(&self, response: HttpResponse) -> Attempt {
        if response.is_success() {
            return Attempt::Done(match serde_json::from_str::<Value>(&response.body) {
                Ok(value) => FetchOutcome::Payload(value),
                Err(error) => FetchOutcome::Unavailable {
                    attempts: 1,
                    reason: format!("invalid JSON body: {error}"),
                },
            });
        }

        if response.status == 404 {
            debug!(status = response.status, "provider has no data");
            return Attempt::Done(FetchOutcome::NotFound);
        }

        if self.retry.should_retry_status(response.status) {
            return Attempt::Retry(format!("HTTP {}", response.status));
        }

        Attempt::Done(FetchOutcome::Unavailable {
            attempts: 1,
            reason: format!("HTTP {}", response.status),
        })
    }
}

impl std::fmt::Debug for ResilientFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientFetcher")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http_client::ScriptedHttpClient;

    fn fetcher(client: Arc<ScriptedHttpClient>) -> ResilientFetcher {
        ResilientFetcher::new(client, "https://provider.test/")
            .with_auth(HttpAuth::BearerToken(String::from("k")))
            .with_retry(RetryConfig::immediate(3))
    }

    #[tokio::test]
    async fn success_returns_parsed_payload_with_bearer_auth() {
        let client = Arc::new(ScriptedHttpClient::new().respond("/ping", 200, r#"{"ok":true}"#));

        let outcome = fetcher(Arc::clone(&client)).fetch("/ping").await;

        assert_eq!(outcome, FetchOutcome::Payload(json!({"ok": true})));
        let requests = client.requests();
        assert_eq!(requests[0].url, "https://provider.test/ping");
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer k")
        );
        assert_eq!(requests[0].timeout_ms, 15_000);
    }

    #[tokio::test]
    async fn not_found_is_terminal() {
        let client = Arc::new(ScriptedHttpClient::new().respond("/gone", 404, ""));

        let outcome = fetcher(Arc::clone(&client)).fetch("/gone").await;

        assert_eq!(outcome, FetchOutcome::NotFound);
        assert_eq!(client.request_count("/gone"), 1);
    }

    #[tokio::test]
    async fn transient_status_is_retried_until_success() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .respond("/flaky", 429, "")
                .respond("/flaky", 502, "")
                .respond("/flaky", 200, "[]"),
        );

        let outcome = fetcher(Arc::clone(&client)).fetch("/flaky").await;

        assert_eq!(outcome, FetchOutcome::Payload(json!([])));
        assert_eq!(client.request_count("/flaky"), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_report_unavailable() {
        let client = Arc::new(ScriptedHttpClient::new().respond("/down", 503, ""));

        let outcome = fetcher(Arc::clone(&client)).fetch("/down").await;

        assert!(matches!(outcome, FetchOutcome::Unavailable { attempts: 3, .. }));
        assert_eq!(client.request_count("/down"), 3);
        assert_eq!(outcome.into_payload(), None);
    }

    #[tokio::test]
    async fn other_statuses_are_not_retried() {
        let client = Arc::new(ScriptedHttpClient::new().respond("/denied", 401, ""));

        let outcome = fetcher(Arc::clone(&client)).fetch("/denied").await;

        assert!(matches!(outcome, FetchOutcome::Unavailable { .. }));
        assert_eq!(client.request_count("/denied"), 1);
    }

    #[tokio::test]
    async fn transport_failures_follow_the_retryable_flag() {
        let client = Arc::new(
            ScriptedHttpClient::new()
                .fail("/reset", HttpError::new("connection reset"))
                .respond("/reset", 200, "{}")
                .fail("/bad", HttpError::non_retryable("invalid url")),
        );
        let fetcher = fetcher(Arc::clone(&client));

        assert!(fetcher.fetch("/reset").await.is_payload());
        assert!(!fetcher.fetch("/bad").await.is_payload());
        assert_eq!(client.request_count("/reset"), 2);
        assert_eq!(client.request_count("/bad"), 1);
    }

    #[tokio::test]
    async fn invalid_json_is_unavailable() {
        let client = Arc::new(ScriptedHttpClient::new().respond("/html", 200, "<html>"));

        let outcome = fetcher(client).fetch("/html").await;

        assert!(matches!(outcome, FetchOutcome::Unavailable { .. }));
    }
}
