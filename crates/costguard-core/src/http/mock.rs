//! In-memory transport for tests.
//!
//! Responses are queued per `"METHOD path"` key and returned in FIFO order. Every
//! exchange is recorded so tests can assert on what was sent.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result as CoreResult;
use crate::http::builder::{Body, Request};
use crate::http::transport::{HttpResponse, Transport, TransportFailure};

/// A queued mock reply
#[derive(Debug, Clone)]
enum MockReply {
    Respond(HttpResponse),
    Fail(TransportFailure),
    /// Never completes; only a deadline ends the exchange
    Hang,
}

/// Record of an exchange made through the mock
#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl MockCall {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Mock transport with predetermined replies.
///
/// # Example
/// ```
/// use costguard_core::http::{HttpResponse, MockTransport};
///
/// let mock = MockTransport::new();
/// mock.add_response("GET /health", HttpResponse::new(200, r#"{"status":"ok"}"#));
/// assert_eq!(mock.call_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<HashMap<String, VecDeque<MockReply>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, key: &str, reply: MockReply) {
        self.replies
            .lock()
            .entry(key.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Queue a response for `key` (e.g. `"POST /api/invoices/"`)
    pub fn add_response(&self, key: &str, response: HttpResponse) {
        self.push(key, MockReply::Respond(response));
    }

    /// Queue a transport failure for `key`
    pub fn add_failure(&self, key: &str, failure: TransportFailure) {
        self.push(key, MockReply::Fail(failure));
    }

    /// Queue an exchange that never completes
    pub fn add_hang(&self, key: &str) {
        self.push(key, MockReply::Hang);
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of exchanges currently executing; cancelled exchanges are not counted
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Prepared = Request;

    fn prepare(&self, request: &Request) -> CoreResult<Request> {
        Ok(request.clone())
    }

    async fn exchange(&self, request: Request) -> Result<HttpResponse, TransportFailure> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
        };

        self.calls.lock().push(MockCall {
            method: request.method().to_string(),
            path: request.path().to_string(),
            query: request.query().to_vec(),
            body: request.body().clone(),
        });

        let key = request.route_key();
        let reply = self
            .replies
            .lock()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());

        match reply {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Fail(failure)) => Err(failure),
            Some(MockReply::Hang) => std::future::pending().await,
            None => {
                tracing::warn!(key = %key, "No mock reply configured");
                Err(TransportFailure::Network)
            }
        }
    }
}

/// Decrements the in-flight counter when dropped, including on cancellation
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
