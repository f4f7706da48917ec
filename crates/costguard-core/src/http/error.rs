//! HTTP error classification and normalization
//!
//! Turns a [`RawOutcome`] into either a decoded payload or a [`ClassifiedError`]
//! carrying a user-facing message and a fixed set of capability flags.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::http::transport::{HttpResponse, RawOutcome, TransportFailure};

const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";
const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";

/// The `detail` field of a failed response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// Plain message
    Text(String),
    /// Structured object
    Object(Map<String, Value>),
    /// Field-level validation issues, each usually carrying a `msg`
    List(Vec<Value>),
    /// Bare number or boolean
    Scalar(Value),
}

impl ErrorDetail {
    /// Interpret a JSON `detail` value; `null` means no detail
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(ErrorDetail::Text(s)),
            Value::Array(items) => Some(ErrorDetail::List(items)),
            Value::Object(map) => Some(ErrorDetail::Object(map)),
            scalar => Some(ErrorDetail::Scalar(scalar)),
        }
    }

    /// Pull `detail` out of a response body, if the body is JSON and has one
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let mut parsed: Value = serde_json::from_slice(body).ok()?;
        let detail = parsed.get_mut("detail")?.take();
        Self::from_value(detail)
    }

    /// Whether the detail should produce the message at all.
    ///
    /// Empty text, `0` and `false` do not; lists and objects always do, even when empty.
    pub fn has_message(&self) -> bool {
        match self {
            ErrorDetail::Text(s) => !s.is_empty(),
            ErrorDetail::Object(_) | ErrorDetail::List(_) => true,
            ErrorDetail::Scalar(value) => is_truthy(value),
        }
    }

    /// Message derived from the detail
    pub fn to_message(&self) -> String {
        match self {
            ErrorDetail::Text(s) => s.clone(),
            ErrorDetail::Object(map) => Value::Object(map.clone()).to_string(),
            ErrorDetail::Scalar(value) => value.to_string(),
            ErrorDetail::List(items) => items
                .iter()
                .map(|item| match item.get("msg").filter(|msg| is_truthy(msg)) {
                    Some(Value::String(msg)) => msg.clone(),
                    Some(msg) => msg.to_string(),
                    None => item.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// `null`, `false`, zero and the empty string carry no message
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coarse category of a classified failure, for exhaustive matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Client,
    Server,
    /// Non-2xx status outside the 4xx/5xx ranges
    Unexpected,
}

/// Normalized failure of a network exchange
///
/// `status` is 0 when no HTTP exchange completed. The flags are computed once from
/// `status` and the two transport booleans and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    status: u16,
    status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<ErrorDetail>,
    message: String,
    is_network_error: bool,
    is_timeout: bool,
    is_client_error: bool,
    is_server_error: bool,
    is_not_found: bool,
    is_unauthorized: bool,
    is_forbidden: bool,
    is_validation_error: bool,
    is_retryable: bool,
}

impl ClassifiedError {
    /// The deadline elapsed before a response arrived
    pub fn timeout() -> Self {
        Self::build(0, "Timeout".to_string(), None, false, true)
    }

    /// No response could be obtained at all
    pub fn network() -> Self {
        Self::build(0, "Network Error".to_string(), None, true, false)
    }

    /// A completed exchange with a non-2xx status
    pub fn from_status(status: u16, status_text: impl Into<String>, detail: Option<ErrorDetail>) -> Self {
        Self::build(status, status_text.into(), detail, false, false)
    }

    fn build(
        status: u16,
        status_text: String,
        detail: Option<ErrorDetail>,
        is_network_error: bool,
        is_timeout: bool,
    ) -> Self {
        let is_client_error = (400..500).contains(&status);
        let is_server_error = (500..600).contains(&status);
        let message = Self::format_message(status, &status_text, detail.as_ref(), is_network_error, is_timeout);

        Self {
            status,
            status_text,
            detail,
            message,
            is_network_error,
            is_timeout,
            is_client_error,
            is_server_error,
            is_not_found: status == 404,
            is_unauthorized: status == 401,
            is_forbidden: status == 403,
            is_validation_error: status == 422,
            is_retryable: is_network_error || is_timeout || is_server_error,
        }
    }

    fn format_message(
        status: u16,
        status_text: &str,
        detail: Option<&ErrorDetail>,
        is_network_error: bool,
        is_timeout: bool,
    ) -> String {
        if is_timeout {
            return TIMEOUT_MESSAGE.to_string();
        }
        if is_network_error {
            return NETWORK_MESSAGE.to_string();
        }
        if let Some(detail) = detail.filter(|detail| detail.has_message()) {
            return detail.to_message();
        }
        format!("{} {}", status, status_text)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        self.detail.as_ref()
    }

    /// User-facing message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_network_error(&self) -> bool {
        self.is_network_error
    }

    pub fn is_timeout(&self) -> bool {
        self.is_timeout
    }

    /// 400-499
    pub fn is_client_error(&self) -> bool {
        self.is_client_error
    }

    /// 500-599
    pub fn is_server_error(&self) -> bool {
        self.is_server_error
    }

    pub fn is_not_found(&self) -> bool {
        self.is_not_found
    }

    pub fn is_unauthorized(&self) -> bool {
        self.is_unauthorized
    }

    pub fn is_forbidden(&self) -> bool {
        self.is_forbidden
    }

    pub fn is_validation_error(&self) -> bool {
        self.is_validation_error
    }

    /// Network errors, timeouts and 5xx responses may be retried
    pub fn is_retryable(&self) -> bool {
        self.is_retryable
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_timeout {
            ErrorKind::Timeout
        } else if self.is_network_error {
            ErrorKind::Network
        } else if self.is_unauthorized {
            ErrorKind::Unauthorized
        } else if self.is_forbidden {
            ErrorKind::Forbidden
        } else if self.is_not_found {
            ErrorKind::NotFound
        } else if self.is_validation_error {
            ErrorKind::Validation
        } else if self.is_client_error {
            ErrorKind::Client
        } else if self.is_server_error {
            ErrorKind::Server
        } else {
            ErrorKind::Unexpected
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ClassifiedError {}

/// Decoded body of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// 2xx with a decoded body
    Content(T),
    /// 204 No Content; the body was not read
    Empty,
}

impl<T> Payload<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Payload::Content(value) => Some(value),
            Payload::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Require a body; a 204 where content was expected is a decoding failure
    pub fn into_content(self) -> Result<T> {
        match self {
            Payload::Content(value) => Ok(value),
            Payload::Empty => Err(Error::decode(
                "expected a response body but the server returned 204 No Content",
                None,
            )),
        }
    }
}

/// Map a transport failure to its classified error
pub fn classify_failure(failure: TransportFailure) -> ClassifiedError {
    match failure {
        TransportFailure::Timeout => ClassifiedError::timeout(),
        TransportFailure::Network => ClassifiedError::network(),
    }
}

/// Classify a completed non-2xx response
pub fn classify_response(response: &HttpResponse) -> ClassifiedError {
    let detail = ErrorDetail::from_body(&response.body);
    ClassifiedError::from_status(response.status, response.status_text.clone(), detail)
}

/// Decode a raw outcome into the expected shape, or a classified failure
pub fn classify<T: DeserializeOwned>(outcome: &RawOutcome) -> Result<Payload<T>> {
    let response = match outcome {
        RawOutcome::Failure(failure) => return Err(classify_failure(*failure).into()),
        RawOutcome::Response(response) => response,
    };

    if !response.is_success() {
        let error = classify_response(response);
        tracing::debug!(
            status = error.status(),
            kind = ?error.kind(),
            retryable = error.is_retryable(),
            "Classified error response"
        );
        return Err(error.into());
    }

    if response.status == 204 {
        return Ok(Payload::Empty);
    }

    serde_json::from_slice(&response.body)
        .map(Payload::Content)
        .map_err(|e| {
            Error::decode(
                format!("status {} body did not match the expected shape: {}", response.status, e),
                Some(e),
            )
        })
}
