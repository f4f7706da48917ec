//! Client configuration
//!
//! The base URL comes from the environment and defaults to a local backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::http::timeout::TimeoutConfig;

/// Default API location for local development
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable holding the API base URL
pub const BASE_URL_ENV: &str = "COSTGUARD_API_URL";
/// Environment variable overriding the ordinary request deadline (milliseconds)
pub const TIMEOUT_ENV: &str = "COSTGUARD_TIMEOUT_MS";
/// Environment variable overriding the upload deadline (milliseconds)
pub const UPLOAD_TIMEOUT_ENV: &str = "COSTGUARD_UPLOAD_TIMEOUT_MS";

/// Configuration for [`crate::ApiClient`] and [`crate::http::ReqwestTransport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the invoice API
    pub base_url: String,
    /// Deadlines for ordinary and file-bearing calls
    pub timeouts: TimeoutConfig,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: TimeoutConfig::default(),
            user_agent: format!("costguard/{}", crate::VERSION),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = url;
        }
        if let Some(ms) = lookup(TIMEOUT_ENV) {
            config.timeouts = config.timeouts.with_request_timeout(parse_millis(TIMEOUT_ENV, &ms)?);
        }
        if let Some(ms) = lookup(UPLOAD_TIMEOUT_ENV) {
            config.timeouts = config.timeouts.with_upload_timeout(parse_millis(UPLOAD_TIMEOUT_ENV, &ms)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Parsed base URL, normalized to end with `/` so paths join beneath it
    pub fn parsed_base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::configuration(format!("Invalid base URL '{}': {}", self.base_url, e)))?;

        if url.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "Base URL '{}' cannot carry a path",
                self.base_url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url()?;
        self.timeouts.validate().map_err(Error::configuration)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| Error::configuration(format!("{} must be a number of milliseconds: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeouts.request_timeout, Duration::from_millis(30_000));
        assert_eq!(config.timeouts.upload_timeout, Duration::from_millis(60_000));
        assert!(config.user_agent.starts_with("costguard/"));
    }

    #[test]
    fn test_environment_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "https://api.costguard.test"),
            (TIMEOUT_ENV, "15000"),
            (UPLOAD_TIMEOUT_ENV, "120000"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://api.costguard.test");
        assert_eq!(config.timeouts.request_timeout, Duration::from_secs(15));
        assert_eq!(config.timeouts.upload_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_invalid_values() {
        assert!(ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, "not a url")])).is_err());
        assert!(ClientConfig::new("mailto:someone@example.com").validate().is_err());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = ClientConfig::new("https://example.com/backend").parsed_base_url().unwrap();
        assert_eq!(url.as_str(), "https://example.com/backend/");
    }
}
