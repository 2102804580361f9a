//! HTTP transport used by the adapters.
//!
//! The requester classifies failures but never retries; retry policy belongs
//! to the caller (see [`crate::retry`]).

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::FetchConfig;
use crate::errors::{FetchError, Result, StandingsError};

/// HTTP method of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// GET
    #[default]
    Get,
    /// POST with a body.
    Post,
}

/// A single HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target URL.
    pub url: String,
    /// Method.
    pub method: Method,
    /// Optional body (form-encoded or JSON).
    pub body: Option<String>,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Per-request timeout, falling back to the requester default.
    pub timeout: Option<Duration>,
}

impl Request {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            body: None,
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Creates a POST request with a body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            body: Some(body.into()),
            ..Self::get(url)
        }
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// A successful HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Body text.
    pub text: String,
}

impl Response {
    /// Creates a 200 response, mostly for mocks.
    #[must_use]
    pub fn ok(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            status: 200,
            url: url.into(),
            text: text.into(),
        }
    }
}

/// Transport capability consumed by adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Requester: Send + Sync {
    /// Performs the request. Non-2xx statuses are errors.
    async fn request(&self, request: Request) -> std::result::Result<Response, FetchError>;
}

/// reqwest-backed requester with a cookie jar shared by all its requests.
#[derive(Debug, Clone)]
pub struct HttpRequester {
    client: reqwest::Client,
    jar: Arc<Jar>,
    default_timeout: Duration,
}

impl HttpRequester {
    /// Builds a requester from the fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| StandingsError::Configuration(format!("invalid header {key}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| StandingsError::Configuration(format!("invalid header {key}: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .cookie_provider(jar.clone())
            .build()
            .map_err(|e| StandingsError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            jar,
            default_timeout: config.timeout(),
        })
    }

    /// Returns the `Cookie` header value the jar holds for `url`.
    #[must_use]
    pub fn cookie_header(&self, url: &str) -> Option<String> {
        let url = reqwest::Url::parse(url).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }

    /// Stores a `Set-Cookie` style cookie for `url`.
    pub fn add_cookie(&self, url: &str, cookie: &str) -> Result<()> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| StandingsError::Configuration(format!("invalid cookie url {url}: {e}")))?;
        self.jar.add_cookie_str(cookie, &url);
        Ok(())
    }

    fn classify(url: &str, timeout: Duration, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            FetchError::Connection {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn request(&self, request: Request) -> std::result::Result<Response, FetchError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let started = Instant::now();

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        }
        .timeout(timeout);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify(&request.url, timeout, &e))?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let text = response
            .text()
            .await
            .map_err(|e| Self::classify(&request.url, timeout, &e))?;

        tracing::debug!(
            url = %request.url,
            status,
            duration_ms = started.elapsed().as_millis() as u64,
            "Fetched"
        );

        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                url: request.url,
                code: status,
                body: text,
            });
        }

        Ok(Response {
            status,
            url: final_url,
            text,
        })
    }
}
