//! Scripted transport for adapter tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::errors::FetchError;
use crate::requester::{Request, Requester, Response};

type Handler = Arc<dyn Fn(&Request) -> Result<String, FetchError> + Send + Sync>;

#[derive(Clone)]
enum Reply {
    Text(String),
    Error(FetchError),
    Dynamic(Handler),
}

impl Reply {
    fn resolve(&self, request: &Request) -> Result<Response, FetchError> {
        match self {
            Self::Text(text) => Ok(Response::ok(request.url.clone(), text.clone())),
            Self::Error(error) => Err(error.clone()),
            Self::Dynamic(handler) => handler(request).map(|text| Response::ok(request.url.clone(), text)),
        }
    }
}

struct Route {
    pattern: String,
    queued: VecDeque<Reply>,
    fallback: Option<Reply>,
}

/// A [`Requester`] answering from URL-substring routes.
///
/// Routes are tried in registration order. Queued replies of a route are
/// consumed first, then its permanent reply is repeated. A URL no route can
/// answer gets a 404 status error. Every request is recorded.
#[derive(Default)]
pub struct ScriptedRequester {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<Request>>,
}

impl fmt::Debug for ScriptedRequester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedRequester")
            .field("routes", &self.routes.lock().len())
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl ScriptedRequester {
    /// Creates a requester with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&self, pattern: &str) -> parking_lot::MappedMutexGuard<'_, Route> {
        let mut routes = self.routes.lock();
        let index = match routes.iter().position(|r| r.pattern == pattern) {
            Some(index) => index,
            None => {
                routes.push(Route {
                    pattern: pattern.to_string(),
                    queued: VecDeque::new(),
                    fallback: None,
                });
                routes.len() - 1
            }
        };
        parking_lot::MutexGuard::map(routes, |r| &mut r[index])
    }

    /// Always answers URLs containing `pattern` with `text`.
    #[must_use]
    pub fn respond(self, pattern: &str, text: impl Into<String>) -> Self {
        self.route(pattern).fallback = Some(Reply::Text(text.into()));
        self
    }

    /// Answers the next URL containing `pattern` with `text`, once.
    #[must_use]
    pub fn respond_once(self, pattern: &str, text: impl Into<String>) -> Self {
        self.route(pattern).queued.push_back(Reply::Text(text.into()));
        self
    }

    /// Always fails URLs containing `pattern` with `error`.
    #[must_use]
    pub fn fail(self, pattern: &str, error: FetchError) -> Self {
        self.route(pattern).fallback = Some(Reply::Error(error));
        self
    }

    /// Fails the next URL containing `pattern` with `error`, once.
    #[must_use]
    pub fn fail_once(self, pattern: &str, error: FetchError) -> Self {
        self.route(pattern).queued.push_back(Reply::Error(error));
        self
    }

    /// Answers URLs containing `pattern` by calling `handler`.
    #[must_use]
    pub fn respond_with<H>(self, pattern: &str, handler: H) -> Self
    where
        H: Fn(&Request) -> Result<String, FetchError> + Send + Sync + 'static,
    {
        self.route(pattern).fallback = Some(Reply::Dynamic(Arc::new(handler)));
        self
    }

    /// All requests received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().clone()
    }

    /// Number of requests whose URL contains `pattern`.
    #[must_use]
    pub fn call_count(&self, pattern: &str) -> usize {
        self.calls.lock().iter().filter(|r| r.url.contains(pattern)).count()
    }

    fn reply_for(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock();
        routes
            .iter_mut()
            .filter(|r| url.contains(&r.pattern))
            .find_map(|r| r.queued.pop_front().or_else(|| r.fallback.clone()))
    }
}

#[async_trait]
impl Requester for ScriptedRequester {
    async fn request(&self, request: Request) -> Result<Response, FetchError> {
        self.calls.lock().push(request.clone());
        match self.reply_for(&request.url) {
            Some(reply) => reply.resolve(&request),
            None => Err(FetchError::Status {
                url: request.url,
                code: 404,
                body: "no scripted route".to_string(),
            }),
        }
    }
}

/// Connection failure for `url`, a transient error.
#[must_use]
pub fn connection_error(url: &str) -> FetchError {
    FetchError::Connection {
        url: url.to_string(),
        message: "connection reset".to_string(),
    }
}

/// Status failure for `url` with an empty body.
#[must_use]
pub fn status_error(url: &str, code: u16) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        code,
        body: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requester::Request;

    #[tokio::test]
    async fn test_queued_then_permanent() {
        let requester = ScriptedRequester::new()
            .respond("/page", "always")
            .respond_once("/page", "first");

        let a = requester.request(Request::get("https://x/page")).await.unwrap();
        let b = requester.request(Request::get("https://x/page")).await.unwrap();
        let c = requester.request(Request::get("https://x/page")).await.unwrap();
        assert_eq!((a.text.as_str(), b.text.as_str(), c.text.as_str()), ("first", "always", "always"));
        assert_eq!(requester.call_count("/page"), 3);
    }

    #[tokio::test]
    async fn test_unmatched_is_404() {
        let requester = ScriptedRequester::new().fail_once("/flaky", connection_error("https://x/flaky"));
        let err = requester.request(Request::get("https://x/flaky")).await.unwrap_err();
        assert!(err.is_transient());
        let err = requester.request(Request::get("https://x/flaky")).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        let err = requester.request(Request::get("https://x/other")).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn test_dynamic_handler_sees_request() {
        let requester = ScriptedRequester::new()
            .respond_with("/echo", |r: &Request| Ok(r.url.rsplit('=').next().unwrap_or("").to_string()));
        let response = requester.request(Request::get("https://x/echo?q=42")).await.unwrap();
        assert_eq!(response.text, "42");
    }
}
