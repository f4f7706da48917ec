//! Error types for the CostGuard core library
//!
//! Every network or HTTP failure is normalized into a [`ClassifiedError`] before it
//! reaches callers, and travels inside [`Error::Api`]. All other variants are
//! unclassified failures (decoding problems, invalid inputs, programming errors)
//! which are never retried and are surfaced distinctly from classified ones.

use thiserror::Error;

use crate::http::error::ClassifiedError;

/// Main error type for CostGuard operations
#[derive(Error, Debug)]
pub enum Error {
    /// Classified network/HTTP failure
    #[error(transparent)]
    Api(ClassifiedError),

    /// A successful response body could not be decoded into the expected shape
    #[error("Failed to decode response: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A request descriptor could not be built or sent as described
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// An upload item was asked to move backwards or skip a lifecycle step
    #[error("Invalid upload transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The classified error carried by this failure, if any
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this failure went through the classifier
    pub fn is_classified(&self) -> bool {
        matches!(self, Error::Api(_))
    }

    pub(crate) fn decode(message: impl Into<String>, source: Option<serde_json::Error>) -> Self {
        Error::Decode {
            message: message.into(),
            source,
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: message.into(),
        }
    }
}

impl From<ClassifiedError> for Error {
    fn from(err: ClassifiedError) -> Self {
        Error::Api(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_is_transparent() {
        let err = Error::from(ClassifiedError::timeout());
        assert_eq!(err.to_string(), "Request timed out. Please try again.");
        assert!(err.is_classified());
        assert!(err.classified().unwrap().is_timeout());
    }

    #[test]
    fn test_unclassified_errors() {
        let err = Error::configuration("base URL missing");
        assert_eq!(err.to_string(), "Configuration error: base URL missing");
        assert!(!err.is_classified());
        assert!(err.classified().is_none());

        let err = Error::InvalidTransition {
            from: "success".to_string(),
            to: "uploading".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid upload transition from 'success' to 'uploading'"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Internal { .. }));
        assert_eq!(err.to_string(), "Internal error: boom");
    }
}
