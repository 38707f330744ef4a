use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Authentication strategy applied to outgoing HTTP requests.
#[derive(Clone, PartialEq, Eq)]
pub enum HttpAuth {
    None,
    BearerToken(String),
}

impl HttpAuth {
    pub fn apply(&self, headers: &mut BTreeMap<String, String>) {
        match self {
            Self::None => {}
            Self::BearerToken(token) => {
                headers.insert(String::from("authorization"), format!("Bearer {token}"));
            }
        }
    }
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
        }
    }
}

/// Read request sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: 15_000,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// HTTP response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract for provider reads.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production HTTP client backed by one shared reqwest session.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("graham/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .get(&request.url)
                .timeout(Duration::from_millis(request.timeout_ms));

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else if e.is_builder() {
                    HttpError::non_retryable(format!("invalid request: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?;

            Ok(HttpResponse { status, body })
        })
    }
}

type Scripted = Result<HttpResponse, HttpError>;

/// In-process transport replaying canned responses, for offline tests.
///
/// Responses are keyed by a URL fragment; the first route whose fragment
/// occurs in the request URL answers. Each route pops its queue until one
/// response is left, which then repeats. Unrouted URLs answer `404`.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response with the given status for URLs containing `fragment`.
    pub fn respond(self, fragment: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.push(fragment.into(), Ok(HttpResponse::new(status, body)))
    }

    /// Queue a transport failure for URLs containing `fragment`.
    pub fn fail(self, fragment: impl Into<String>, error: HttpError) -> Self {
        self.push(fragment.into(), Err(error))
    }

    fn push(self, fragment: String, outcome: Scripted) -> Self {
        {
            let mut routes = self
                .routes
                .lock()
                .expect("scripted http routes mutex poisoned");
            match routes.iter_mut().find(|(existing, _)| *existing == fragment) {
                Some((_, queue)) => queue.push_back(outcome),
                None => routes.push((fragment, VecDeque::from([outcome]))),
            }
        }
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("scripted http requests mutex poisoned")
            .clone()
    }

    /// Number of requests whose URL contains `fragment`.
    pub fn request_count(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .expect("scripted http requests mutex poisoned")
            .iter()
            .filter(|request| request.url.contains(fragment))
            .count()
    }

    fn next_outcome(&self, url: &str) -> Scripted {
        let mut routes = self
            .routes
            .lock()
            .expect("scripted http routes mutex poisoned");
        let Some((_, queue)) = routes
            .iter_mut()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
        else {
            return Ok(HttpResponse::new(404, "{}"));
        };

        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "{}")))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "{}")))
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let outcome = self.next_outcome(&request.url);
            self.requests
                .lock()
                .expect("scripted http requests mutex poisoned")
                .push(request);
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_auth_populates_authorization_header() {
        let request = HttpRequest::get("https://example.test/analysis/keystat/BBRI")
            .with_auth(&HttpAuth::BearerToken(String::from("token-123")));

        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer token-123")
        );
    }

    #[test]
    fn auth_debug_output_hides_token() {
        let rendered = format!("{:?}", HttpAuth::BearerToken(String::from("secret")));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn timeout_is_carried_in_milliseconds() {
        let request = HttpRequest::get("https://example.test").with_timeout(Duration::from_secs(15));
        assert_eq!(request.timeout_ms, 15_000);
    }

    #[tokio::test]
    async fn scripted_client_replays_queue_then_repeats_last() {
        let client = ScriptedHttpClient::new()
            .respond("/keystat/BBRI", 503, "")
            .respond("/keystat/BBRI", 200, r#"{"rows":[]}"#);

        let first = client
            .execute(HttpRequest::get("https://x.test/keystat/BBRI?type=Q"))
            .await
            .expect("first");
        let second = client
            .execute(HttpRequest::get("https://x.test/keystat/BBRI?type=Q"))
            .await
            .expect("second");
        let third = client
            .execute(HttpRequest::get("https://x.test/keystat/BBRI?type=Q"))
            .await
            .expect("third");
        let unrouted = client
            .execute(HttpRequest::get("https://x.test/keystat/TLKM?type=Q"))
            .await
            .expect("unrouted");

        assert_eq!(first.status, 503);
        assert_eq!(second.status, 200);
        assert_eq!(third.status, 200);
        assert_eq!(unrouted.status, 404);
        assert_eq!(client.request_count("/keystat/BBRI"), 3);
        assert_eq!(client.requests().len(), 4);
    }
}
