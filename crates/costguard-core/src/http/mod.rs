//! Network layer for the invoice API
//!
//! This module provides:
//! - Immutable request descriptors and their builder
//! - A transport abstraction with deadline-based cancellation
//! - Error classification into capability flags and user-facing messages
//! - Opt-in retry with geometric backoff
//! - An in-memory transport for tests

pub mod builder;
pub mod error;
pub mod mock;
pub mod retry;
pub mod timeout;
pub mod transport;

pub use builder::{Body, Part, PartContent, Request, RequestBuilder};
pub use error::{classify, ClassifiedError, ErrorDetail, ErrorKind, Payload};
pub use mock::{MockCall, MockTransport};
pub use retry::{run_with_retry, RetryDecision, RetryHandler, RetryPolicy};
pub use timeout::TimeoutConfig;
pub use transport::{execute, HttpResponse, RawOutcome, ReqwestTransport, Transport, TransportFailure};

// Re-export commonly used types
pub use reqwest::Method;
