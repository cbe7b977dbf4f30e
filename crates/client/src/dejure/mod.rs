//! dejure.org "Vernetzung" client.
//!
//! Sends text to the linking service and returns it with citation anchors
//! added.
//!
//! ### Protocol
//!
//! - **Endpoint**: `https://rechtsnetz.dejure.org/dienste/vernetzung/vernetzen`
//! - **Request**: `POST`, `application/x-www-form-urlencoded`, text in `Originaltext`.
//! - **Identification**: `User-Agent: <provider id> (vernetzen/<version>)`.
//! - **Rate Limiting**: minimum interval between requests (default 1s).
//! - **Acceptance**: 2xx status and a body at least as long as the request text.
//!   Anything else is a failure and the caller keeps its original text.

pub mod error;
pub mod request;

pub use error::DejureError;
pub use request::{AnnotateRequest, FilterParams, Format};

use bytes::Bytes;
use reqwest::{Url, header};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use vernetzen_core::{AppConfig, FingerprintCache, PipelineEvents};

/// Default endpoint of the linking service.
const DEFAULT_ENDPOINT: &str = "https://rechtsnetz.dejure.org/dienste/vernetzung/vernetzen";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default minimum interval between requests.
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Linking service client configuration.
#[derive(Debug, Clone)]
pub struct DejureConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub min_interval: Duration,
}

impl Default for DejureConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_string(), timeout: DEFAULT_TIMEOUT, min_interval: DEFAULT_MIN_INTERVAL }
    }
}

impl From<&AppConfig> for DejureConfig {
    fn from(config: &AppConfig) -> Self {
        Self { endpoint: config.endpoint.clone(), timeout: config.timeout(), min_interval: config.min_interval() }
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(Instant::now().checked_sub(min_interval).unwrap_or_else(Instant::now)),
            min_interval,
        }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// Client for the linking service.
#[derive(Debug, Clone)]
pub struct DejureClient {
    http: reqwest::Client,
    endpoint: Url,
    rate_limiter: Arc<RateLimiter>,
}

impl DejureClient {
    /// Create a new client with the given configuration.
    pub fn new(config: DejureConfig) -> Result<Self, DejureError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|e| DejureError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| DejureError::Network(Arc::new(e)))?;

        Ok(Self { http, endpoint, rate_limiter: Arc::new(RateLimiter::new(config.min_interval)) })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send `text` to the service and return the annotated text.
    ///
    /// No retries. The body is trimmed before it is returned.
    pub async fn post(&self, text: &str, req: &AnnotateRequest) -> Result<String, DejureError> {
        self.rate_limiter.acquire().await;

        let start = Instant::now();
        tracing::debug!("posting {} bytes to {}", text.len(), self.endpoint);

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(header::USER_AGENT, req.user_agent())
            .form(&req.form_fields(text))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("linking service response status: {}", status);

        if !status.is_success() {
            return Err(DejureError::HttpError { status: status.as_u16() });
        }

        let body = response.bytes().await?;
        let output = accept_body(text, body)?;

        tracing::debug!("linking completed in {:?}", start.elapsed());
        Ok(output)
    }

    /// Annotate `text`, falling back to `text` itself on any failure.
    ///
    /// Successful results are written to `cache`. Failures are reported to
    /// `events` and never returned.
    pub async fn call(
        &self,
        text: &str,
        req: &AnnotateRequest,
        cache: &dyn FingerprintCache,
        events: &dyn PipelineEvents,
    ) -> String {
        match self.post(text, req).await {
            Ok(output) => {
                if let Err(e) = cache.write(text, &output).await {
                    events.on_cache_error(&e);
                }
                output
            }
            Err(e) => {
                events.on_remote_error(&e);
                text.to_string()
            }
        }
    }
}

/// Validate a response body against the text that was sent.
fn accept_body(text: &str, body: Bytes) -> Result<String, DejureError> {
    if body.is_empty() {
        return Err(DejureError::EmptyBody);
    }
    if body.len() < text.len() {
        return Err(DejureError::ShrunkBody { sent: text.len(), received: body.len() });
    }

    let output = String::from_utf8(body.to_vec()).map_err(|_| DejureError::InvalidEncoding)?;
    Ok(output.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vernetzen_core::events::Event;
    use vernetzen_core::{EventLog, FileCache, KeyDigest};
    use wiremock::matchers::{body_string_contains, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEXT: &str = "siehe § 123 BGB";
    const LINKED: &str = "siehe <a href=\"https://dejure.org/gesetze/BGB/123.html\">§ 123 BGB</a>";

    fn test_client(server: &MockServer) -> DejureClient {
        DejureClient::new(DejureConfig {
            endpoint: format!("{}/dienste/vernetzung/vernetzen", server.uri()),
            timeout: Duration::from_secs(5),
            min_interval: Duration::ZERO,
        })
        .unwrap()
    }

    fn test_request() -> AnnotateRequest {
        AnnotateRequest::new("0.1.0", "https://blog.example")
    }

    #[test]
    fn test_config_default() {
        let config = DejureConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.min_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = DejureConfig { endpoint: "not a url".into(), ..Default::default() };
        assert!(matches!(DejureClient::new(config), Err(DejureError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_accept_body() {
        assert_eq!(accept_body(TEXT, Bytes::from(format!("  {LINKED}\n"))).unwrap(), LINKED);
        assert!(matches!(accept_body(TEXT, Bytes::new()), Err(DejureError::EmptyBody)));
        assert!(matches!(accept_body(TEXT, Bytes::from_static(b"siehe")), Err(DejureError::ShrunkBody { .. })));
        assert!(matches!(
            accept_body("ab", Bytes::from_static(&[0xff, 0xfe, 0xfd])),
            Err(DejureError::InvalidEncoding)
        ));
    }

    #[tokio::test]
    async fn test_rate_limiter_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_post_sends_form_and_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dienste/vernetzung/vernetzen"))
            .and(header_eq("user-agent", "https://blog.example (vernetzen/0.1.0)"))
            .and(header_eq("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("Anbieterkennung=https%3A%2F%2Fblog.example"))
            .and(body_string_contains("format=weit"))
            .and(body_string_contains("buzer=1"))
            .and(body_string_contains("Originaltext=siehe+%C2%A7+123+BGB"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LINKED))
            .expect(1)
            .mount(&server)
            .await;

        let output = test_client(&server).post(TEXT, &test_request()).await.unwrap();
        assert_eq!(output, LINKED);
    }

    #[tokio::test]
    async fn test_post_sends_enabled_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("ohneUeberschriften=1"))
            .and(body_string_contains("target=_blank"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LINKED))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert_eq!(client.endpoint().path(), "/dienste/vernetzung/vernetzen");

        let mut req = test_request();
        req.noheadings = true;
        req.target = Some("_blank".into());
        let output = client.post(TEXT, &req).await.unwrap();
        assert_eq!(output, LINKED);
    }

    #[tokio::test]
    async fn test_post_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = test_client(&server).post(TEXT, &test_request()).await;
        assert!(matches!(result, Err(DejureError::HttpError { status: 503 })));
    }

    #[tokio::test]
    async fn test_post_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LINKED).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = DejureClient::new(DejureConfig {
            endpoint: server.uri(),
            timeout: Duration::from_millis(200),
            min_interval: Duration::ZERO,
        })
        .unwrap();
        let result = client.post(TEXT, &test_request()).await;
        assert!(matches!(result, Err(DejureError::Timeout)));
    }

    #[tokio::test]
    async fn test_call_writes_cache_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LINKED))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), KeyDigest::Md5);
        let events = EventLog::new();

        let output = test_client(&server).call(TEXT, &test_request(), &cache, &events).await;

        assert_eq!(output, LINKED);
        assert_eq!(cache.read(TEXT, 7).await.unwrap().as_deref(), Some(LINKED));
        assert!(events.events().is_empty());
    }

    #[tokio::test]
    async fn test_call_falls_back_on_shrunk_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("§"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("cache"), KeyDigest::Md5);
        let events = EventLog::new();

        let output = test_client(&server).call(TEXT, &test_request(), &cache, &events).await;

        assert_eq!(output, TEXT);
        assert!(cache.read(TEXT, 7).await.unwrap().is_none());
        assert!(!cache.root().exists());
        assert!(matches!(events.events().as_slice(), [Event::RemoteError(msg)] if msg.contains("shorter")));
    }
}
