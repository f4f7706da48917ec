//! Transport layer: one network exchange under a deadline
//!
//! [`Transport`] implementations prepare a request for the wire and perform the raw
//! exchange. [`execute`] prepares first, then wraps the exchange with the deadline so
//! cancellation behaves identically everywhere: when the deadline elapses the
//! exchange future is dropped and the outcome is [`TransportFailure::Timeout`].
//! A request that cannot be prepared never reaches the wire and surfaces as
//! [`Error::InvalidRequest`]. Status codes are never interpreted here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client as ReqwestClient;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::builder::{Body, Part, PartContent, Request};

/// Response from a completed HTTP exchange, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase for the status
    pub status_text: String,
    /// Buffered response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response using the canonical reason phrase for `status`
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_string(),
            body: body.into(),
        }
    }

    /// JSON response helper, mostly for tests and mocks
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why an exchange produced no HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// The deadline elapsed and the exchange was cancelled
    Timeout,
    /// The exchange could not be established (refused, DNS, reset, ...)
    Network,
}

/// Result of one exchange before any interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    Response(HttpResponse),
    Failure(TransportFailure),
}

/// Trait for performing a single HTTP exchange.
///
/// Implementations must be stateless with respect to individual calls so they can
/// be shared; the deadline is applied by [`execute`], not by implementors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wire-ready form of a [`Request`]
    type Prepared: Send;

    /// Turn `request` into its wire form.
    ///
    /// Errors here mean the descriptor itself is unusable and must be reported as
    /// [`Error::InvalidRequest`], never as a [`TransportFailure`].
    fn prepare(&self, request: &Request) -> Result<Self::Prepared>;

    /// Perform the exchange for a prepared request
    async fn exchange(&self, prepared: Self::Prepared) -> std::result::Result<HttpResponse, TransportFailure>;
}

/// Execute `request` on `transport`, cancelling it once the deadline elapses.
///
/// The request's own timeout override wins over `default_deadline`. Only a request
/// that fails to prepare yields `Err`; every exchange yields a [`RawOutcome`].
pub async fn execute<T>(transport: &T, request: &Request, default_deadline: Duration) -> Result<RawOutcome>
where
    T: Transport + ?Sized,
{
    let prepared = transport.prepare(request).map_err(|e| {
        tracing::error!(
            method = %request.method(),
            path = %request.path(),
            error = %e,
            "Failed to prepare HTTP request"
        );
        e
    })?;

    let deadline = request.timeout().unwrap_or(default_deadline);

    let outcome = match tokio::time::timeout(deadline, transport.exchange(prepared)).await {
        Ok(Ok(response)) => RawOutcome::Response(response),
        Ok(Err(failure)) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.path(),
                failure = ?failure,
                "HTTP exchange failed"
            );
            RawOutcome::Failure(failure)
        }
        Err(_elapsed) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.path(),
                deadline_ms = deadline.as_millis() as u64,
                "HTTP exchange exceeded its deadline"
            );
            RawOutcome::Failure(TransportFailure::Timeout)
        }
    };

    Ok(outcome)
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production transport using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport for the configured base URL
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.parsed_base_url()?;

        let client = ReqwestClient::builder()
            .connect_timeout(config.timeouts.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for a request, including its query string
    pub fn url_for(&self, request: &Request) -> Result<Url> {
        let mut url = self
            .base_url
            .join(request.path().trim_start_matches('/'))
            .map_err(|e| Error::invalid_request(format!("Failed to join path '{}': {}", request.path(), e)))?;

        if !request.query().is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query().iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok(url)
    }

    fn build(&self, request: &Request) -> Result<reqwest::Request> {
        let url = self.url_for(request)?;
        let mut builder = self.client.request(request.method().clone(), url);

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body() {
            Body::None => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        builder
            .build()
            .map_err(|e| Error::invalid_request(format!("Failed to build request for '{}': {}", request.path(), e)))
    }
}

fn build_form(parts: &[Part]) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match &part.content {
            PartContent::Text(text) => form.text(part.name.clone(), text.clone()),
            PartContent::File {
                file_name,
                content_type,
                bytes,
            } => {
                let file_part = multipart::Part::bytes(bytes.to_vec())
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(|e| {
                        Error::invalid_request(format!("Invalid content type '{}': {}", content_type, e))
                    })?;
                form.part(part.name.clone(), file_part)
            }
        };
    }
    Ok(form)
}

fn map_reqwest_error(error: &reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Network
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    type Prepared = reqwest::Request;

    fn prepare(&self, request: &Request) -> Result<reqwest::Request> {
        self.build(request)
    }

    #[tracing::instrument(skip(self, prepared), fields(method = %prepared.method(), url = %prepared.url()))]
    async fn exchange(&self, prepared: reqwest::Request) -> std::result::Result<HttpResponse, TransportFailure> {
        let response = self.client.execute(prepared).await.map_err(|e| {
            tracing::debug!(error = %e, "HTTP request failed");
            map_reqwest_error(&e)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read response body");
            map_reqwest_error(&e)
        })?;

        tracing::debug!(status = status.as_u16(), response_len = body.len(), "HTTP exchange completed");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.to_vec(),
        })
    }
}

fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}
