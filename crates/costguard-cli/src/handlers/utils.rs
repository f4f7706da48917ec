//! Shared utilities for command handlers

use crate::config::Config;
use crate::error::Result;
use costguard_core::ApiClient;

/// Build an API client from the effective configuration
pub fn api_client(config: &Config) -> Result<ApiClient> {
    let client_config = config.client_config()?;
    tracing::debug!(
        base_url = %client_config.base_url,
        timeout_ms = client_config.timeouts.request_timeout.as_millis() as u64,
        "Creating API client"
    );
    Ok(ApiClient::new(client_config)?)
}
