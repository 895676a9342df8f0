//! Scripted transport for testing.
//!
//! `MockTransport` answers requests from per-route reply queues and records
//! every request it receives, so tests can assert on what the client sent
//! without a live service.

use crate::core::TransportError;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this response.
    Respond(HttpResponse),
    /// Fail as if the service could not be reached.
    Unreachable(String),
}

impl From<HttpResponse> for MockReply {
    fn from(response: HttpResponse) -> Self {
        Self::Respond(response)
    }
}

#[derive(Debug)]
struct Route {
    method: Method,
    path_suffix: String,
    replies: VecDeque<MockReply>,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        self.method == request.method && request.url.path().ends_with(&self.path_suffix)
    }

    // The last reply is sticky so a route can serve any number of requests.
    fn next_reply(&mut self) -> Option<MockReply> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

/// A transport that replays scripted responses.
///
/// Routes match on method and URL path suffix; the first matching route
/// wins. Each route answers from its queue in order and repeats its last
/// reply once the queue is down to one entry. Requests that match no route
/// get an empty `404`.
///
/// # Examples
///
/// ```rust
/// use osabridge::transport::{HttpResponse, Method, MockTransport};
///
/// let transport = MockTransport::new()
///     .on(Method::Post, "auth/login", HttpResponse::new(200)
///         .with_cookie("cxCookie", "a")
///         .with_cookie("CXCSRFToken", "b"));
///
/// assert_eq!(transport.request_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Creates a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for requests matching `method` and `path_suffix`.
    pub fn on(self, method: Method, path_suffix: impl Into<String>, reply: impl Into<MockReply>) -> Self {
        self.push_reply(method, path_suffix.into(), reply.into());
        self
    }

    /// Queues several replies for one route, served in order.
    pub fn on_sequence<I, R>(self, method: Method, path_suffix: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<MockReply>,
    {
        let path_suffix = path_suffix.into();
        for reply in replies {
            self.push_reply(method, path_suffix.clone(), reply.into());
        }
        self
    }

    /// Makes requests to a route fail at the transport level.
    pub fn unreachable(self, method: Method, path_suffix: impl Into<String>) -> Self {
        self.on(
            method,
            path_suffix,
            MockReply::Unreachable("connection refused".to_string()),
        )
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Returns the requests whose path ends with `path_suffix`.
    pub fn requests_to(&self, path_suffix: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|request| request.url.path().ends_with(path_suffix))
            .cloned()
            .collect()
    }

    fn push_reply(&self, method: Method, path_suffix: String, reply: MockReply) {
        let mut routes = lock(&self.routes);
        match routes
            .iter_mut()
            .find(|route| route.method == method && route.path_suffix == path_suffix)
        {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                method,
                path_suffix,
                replies: VecDeque::from([reply]),
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = lock(&self.routes)
            .iter_mut()
            .find(|route| route.matches(&request))
            .and_then(Route::next_reply);

        tracing::trace!(method = %request.method, url = %request.url, "Mock transport received request");
        lock(&self.requests).push(request);

        match reply {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Unreachable(reason)) => Err(TransportError::Connect(reason)),
            None => Ok(HttpResponse::new(404)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(path: &str) -> HttpRequest {
        HttpRequest::get(Url::parse("https://cx.example.com/CxRestAPI/").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_sequence_then_sticky_last() {
        let transport = MockTransport::new().on_sequence(
            Method::Get,
            "osa/scans/1",
            [HttpResponse::new(200), HttpResponse::new(201)],
        );

        assert_eq!(transport.execute(get("osa/scans/1")).await.unwrap().status, 200);
        assert_eq!(transport.execute(get("osa/scans/1")).await.unwrap().status, 201);
        assert_eq!(transport.execute(get("osa/scans/1")).await.unwrap().status, 201);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_unmatched_route_is_404() {
        let transport = MockTransport::new();
        let response = transport.execute(get("projects/1/summaryresults")).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(transport.requests_to("summaryresults").len(), 1);
    }

    #[tokio::test]
    async fn test_method_must_match() {
        let transport = MockTransport::new().on(Method::Post, "auth/login", HttpResponse::new(200));
        let response = transport.execute(get("auth/login")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let transport = MockTransport::new().unreachable(Method::Get, "osa/scans/1");
        let err = transport.execute(get("osa/scans/1")).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
