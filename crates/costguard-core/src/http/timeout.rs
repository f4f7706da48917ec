//! Deadline configuration for API requests
//!
//! Ordinary calls get the request deadline; file-bearing calls get the longer
//! upload deadline. Individual requests may still override either.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default deadline for ordinary calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);
/// Default deadline for calls that carry a file
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Timeout configuration for API requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout - time to establish a connection
    pub connect_timeout: Duration,
    /// Deadline for the whole exchange of an ordinary call
    pub request_timeout: Duration,
    /// Deadline for the whole exchange of a file upload
    pub upload_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

impl TimeoutConfig {
    /// Override the ordinary request deadline. The connect timeout never exceeds it.
    pub fn with_request_timeout(&self, timeout: Duration) -> Self {
        let mut config = self.clone();
        config.request_timeout = timeout;
        config.connect_timeout = config.connect_timeout.min(timeout);
        config
    }

    /// Override the upload deadline
    pub fn with_upload_timeout(&self, timeout: Duration) -> Self {
        let mut config = self.clone();
        config.upload_timeout = timeout;
        config
    }

    /// Validate timeout configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout cannot be zero".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be zero".to_string());
        }

        if self.upload_timeout.is_zero() {
            return Err("Upload timeout cannot be zero".to_string());
        }

        if self.request_timeout < self.connect_timeout {
            return Err("Request timeout should be >= connect timeout".to_string());
        }

        Ok(())
    }
}
