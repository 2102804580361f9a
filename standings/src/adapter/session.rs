//! HTTP helper shared by the adapters.

use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StandingsConfig;
use crate::errors::{parse_json, Result};
use crate::requester::{Request, Requester, Response};
use crate::retry::{with_retry, RetryPolicy};

/// A requester plus the retry policy and timeout every call uses.
#[derive(Clone)]
pub struct Session {
    requester: Arc<dyn Requester>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session from the configuration.
    #[must_use]
    pub fn new(requester: Arc<dyn Requester>, config: &StandingsConfig) -> Self {
        Self {
            requester,
            retry: config.retry.clone(),
            timeout: config.fetch.timeout(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Retry policy for top-level calls.
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Retry policy with a different attempt budget, for engine units.
    #[must_use]
    pub fn retry_with_attempts(&self, attempts: usize) -> RetryPolicy {
        self.retry.clone().with_max_attempts(attempts)
    }

    /// Sends a request, retrying transient failures.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let request = self.with_default_timeout(request);
        let url = request.url.clone();
        Ok(with_retry(&self.retry, &url, || self.requester.request(request.clone())).await?)
    }

    /// Sends a request exactly once; for callers that retry themselves.
    pub async fn send_once(&self, request: Request) -> Result<Response> {
        Ok(self.requester.request(self.with_default_timeout(request)).await?)
    }

    /// GET with retries, returning the body.
    pub async fn get(&self, url: &str) -> Result<String> {
        Ok(self.send(Request::get(url)).await?.text)
    }

    /// GET without retries, returning the body.
    pub async fn get_once(&self, url: &str) -> Result<String> {
        Ok(self.send_once(Request::get(url)).await?.text)
    }

    /// GET with retries, decoding a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.get(url).await?;
        parse_json(&text, url)
    }

    fn with_default_timeout(&self, request: Request) -> Request {
        if request.timeout.is_some() {
            request
        } else {
            request.with_timeout(self.timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StandingsError;
    use crate::testing::{connection_error, status_error, ScriptedRequester};

    fn session(requester: ScriptedRequester) -> (Arc<ScriptedRequester>, Session) {
        let requester = Arc::new(requester);
        let session = Session::new(requester.clone(), &StandingsConfig::default())
            .with_retry(RetryPolicy::immediate(3));
        (requester, session)
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let (requester, session) = session(
            ScriptedRequester::new()
                .respond("/list", "ok")
                .fail_once("/list", connection_error("https://x/list")),
        );
        assert_eq!(session.get("https://x/list").await.unwrap(), "ok");
        assert_eq!(requester.call_count("/list"), 2);
        assert!(requester.calls().iter().all(|r| r.timeout.is_some()));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let (requester, session) =
            session(ScriptedRequester::new().fail("/gone", status_error("https://x/gone", 404)));
        let err = session.get("https://x/gone").await.unwrap_err();
        assert!(matches!(err, StandingsError::Fetch(_)));
        assert_eq!(requester.call_count("/gone"), 1);
    }

    #[tokio::test]
    async fn test_get_json_reports_context() {
        let (_, session) = session(ScriptedRequester::new().respond("/api", "not json"));
        let err = session.get_json::<serde_json::Value>("https://x/api").await.unwrap_err();
        assert!(matches!(err, StandingsError::Parse { ref context, .. } if context == "https://x/api"));
    }
}
