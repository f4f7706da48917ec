//! Configuration management for the CLI
//!
//! This module handles loading and merging configuration from:
//! - Default values
//! - Configuration files (YAML/JSON/TOML)
//! - Environment variables (a `.env` file is loaded by `main` before this runs)
//! - Command-line arguments

use crate::error::{Error, Result};
use costguard_core::config::{BASE_URL_ENV, TIMEOUT_ENV, UPLOAD_TIMEOUT_ENV};
use costguard_core::http::TimeoutConfig;
use costguard_core::{ClientConfig, InvoiceCreate, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Caller identity used until the API grows authentication
pub const DEFAULT_USER_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API location and deadlines
    pub api: ApiConfig,

    /// Who the CLI acts as
    pub identity: IdentityConfig,

    /// Retry policy for retried calls
    pub retry: RetryConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// API connection settings; unset values fall back to the core defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the invoice API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Deadline for ordinary calls, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Deadline for file uploads, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_timeout_ms: Option<u64>,
}

/// Fixed caller identity sent with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub user_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,

    /// Currency used when none is given on the command line
    pub currency: String,
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Use colored output by default
    pub color: bool,

    /// Show progress indicators
    pub progress: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (compact, full, json)
    pub format: String,

    /// Log file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            identity: IdentityConfig::default(),
            retry: RetryConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            vendor_id: None,
            currency: "USD".to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            progress: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            file: None,
        }
    }
}

/// Supported file formats, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Yaml,
    Json,
    Toml,
}

impl FileFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;

        let config = match FileFormat::from_path(path) {
            FileFormat::Yaml => serde_yaml::from_str(&content)?,
            FileFormat::Toml => toml::from_str(&content)?,
            FileFormat::Json => serde_json::from_str(&content)?,
        };

        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "Loaded configuration");
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to load config");
                    }
                }
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations, then apply the environment
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::load()?,
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Path of the per-user configuration file
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("costguard").join("config.toml"))
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".costguard.yaml"),
            PathBuf::from(".costguard.yml"),
            PathBuf::from(".costguard.json"),
            PathBuf::from(".costguard.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let costguard_dir = config_dir.join("costguard");
            paths.push(costguard_dir.join("config.yaml"));
            paths.push(costguard_dir.join("config.json"));
            paths.push(costguard_dir.join("config.toml"));
        }

        paths
    }

    /// Apply environment overrides on top of file values
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = Some(url);
        }
        if let Some(ms) = lookup(TIMEOUT_ENV) {
            self.api.timeout_ms = Some(parse_env_number(TIMEOUT_ENV, &ms)?);
        }
        if let Some(ms) = lookup(UPLOAD_TIMEOUT_ENV) {
            self.api.upload_timeout_ms = Some(parse_env_number(UPLOAD_TIMEOUT_ENV, &ms)?);
        }
        if let Some(user_id) = lookup("COSTGUARD_USER_ID") {
            self.identity.user_id = user_id;
        }
        if let Some(vendor_id) = lookup("COSTGUARD_VENDOR_ID") {
            self.identity.vendor_id = Some(vendor_id);
        }
        if let Some(retries) = lookup("COSTGUARD_MAX_RETRIES") {
            self.retry.max_retries = parse_env_number("COSTGUARD_MAX_RETRIES", &retries)?;
        }
        if let Some(level) = lookup("COSTGUARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Core client configuration derived from the `api` section
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut client = ClientConfig::default();
        if let Some(url) = &self.api.base_url {
            client.base_url = url.clone();
        }

        let mut timeouts = TimeoutConfig::default();
        if let Some(ms) = self.api.timeout_ms {
            timeouts = timeouts.with_request_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.api.upload_timeout_ms {
            timeouts = timeouts.with_upload_timeout(Duration::from_millis(ms));
        }

        let client = client.with_timeouts(timeouts);
        client.validate()?;
        Ok(client)
    }

    /// Retry policy described by the `retry` section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_retries)
            .with_base_delay(Duration::from_millis(self.retry.base_delay_ms))
            .with_multiplier(self.retry.backoff_multiplier)
    }

    /// Invoice metadata carrying the configured identity
    pub fn invoice_template(&self, currency: Option<&str>) -> InvoiceCreate {
        let mut invoice = InvoiceCreate::new(
            self.identity.user_id.clone(),
            currency.unwrap_or(self.identity.currency.as_str()),
        );
        invoice.vendor_id = self.identity.vendor_id.clone();
        invoice
    }

    /// Check values that cannot be caught by deserialization
    pub fn validate(&self) -> Result<()> {
        if self.identity.user_id.trim().is_empty() {
            return Err(Error::config("identity.user_id cannot be empty"));
        }
        if self.identity.currency.trim().is_empty() {
            return Err(Error::config("identity.currency cannot be empty"));
        }
        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(Error::config("retry.backoff_multiplier must be at least 1.0"));
        }
        self.client_config()?;
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.render(FileFormat::from_path(path))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    fn render(&self, format: FileFormat) -> Result<String> {
        Ok(match format {
            FileFormat::Yaml => serde_yaml::to_string(self)?,
            FileFormat::Toml => toml::to_string_pretty(self)?,
            FileFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("{} must be a number: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.identity.user_id, DEFAULT_USER_ID);
        assert_eq!(config.identity.currency, "USD");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert!(config.validate().is_ok());

        let client = config.client_config().unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
        assert_eq!(client.timeouts.upload_timeout, Duration::from_millis(60_000));
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("costguard.yaml");
        std::fs::write(
            &path,
            "api:\n  base_url: https://api.example.com\n  timeout_ms: 5000\nidentity:\n  vendor_id: vendor-9\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.identity.vendor_id.as_deref(), Some("vendor-9"));
        // Unset sections keep their defaults
        assert_eq!(config.identity.user_id, DEFAULT_USER_ID);

        let client = config.client_config().unwrap();
        assert_eq!(client.timeouts.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_load_toml_and_json_files() {
        let dir = TempDir::new().unwrap();

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, "[retry]\nmax_retries = 5\n").unwrap();
        assert_eq!(Config::from_file(&toml_path).unwrap().retry.max_retries, 5);

        let json_path = dir.path().join("config.json");
        std::fs::write(&json_path, r#"{"identity": {"currency": "EUR"}}"#).unwrap();
        assert_eq!(Config::from_file(&json_path).unwrap().identity.currency, "EUR");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(Path::new("/no/such/costguard.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let mut config = Config::default();
        config.api.base_url = Some("http://from-file:8000".to_string());

        config
            .apply_env(lookup(&[
                (BASE_URL_ENV, "http://from-env:9000"),
                (UPLOAD_TIMEOUT_ENV, "90000"),
                ("COSTGUARD_VENDOR_ID", "vendor-env"),
            ]))
            .unwrap();

        assert_eq!(config.api.base_url.as_deref(), Some("http://from-env:9000"));
        assert_eq!(config.api.upload_timeout_ms, Some(90_000));
        assert_eq!(config.identity.vendor_id.as_deref(), Some("vendor-env"));

        assert!(config.clone().apply_env(lookup(&[(TIMEOUT_ENV, "fast")])).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.identity.vendor_id = Some("vendor-1".to_string());

        for name in ["saved.toml", "saved.yaml", "nested/saved.json"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(Config::from_file(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_invoice_template_and_retry_policy() {
        let mut config = Config::default();
        config.identity.vendor_id = Some("vendor-1".to_string());
        config.retry.max_retries = 1;

        let invoice = config.invoice_template(Some("GBP"));
        assert_eq!(invoice.user_id, DEFAULT_USER_ID);
        assert_eq!(invoice.vendor_id.as_deref(), Some("vendor-1"));
        assert_eq!(invoice.currency, "GBP");
        assert_eq!(config.invoice_template(None).currency, "USD");

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.base_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }
}
