//! Mathpix client configuration
//!
//! This module provides configuration structures and builders for the Mathpix client.

use std::time::Duration;

use derive_builder::Builder;
use url::Url;

use crate::error::{Error, Result};

/// Base URL of the production Mathpix API.
pub const PRODUCTION_API_URL: &str = "https://api.mathpix.com";

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "MATHPIX_URL";

/// Configuration for the Mathpix client
///
/// Contains all the settings needed to configure the client behavior,
/// including timeouts, retry settings, polling cadence and the API endpoint.
#[derive(Debug, Clone, Builder)]
#[builder(
    name = "MpxBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate_config")
)]
pub struct MpxConfig {
    /// Base URL for the Mathpix API
    #[builder(setter(custom), default = "MpxConfig::default_api_url()")]
    pub api_url: Url,
    /// Request timeout duration
    #[builder(default = "Duration::from_secs(30)")]
    pub timeout: Duration,
    /// Connection timeout duration
    #[builder(default = "Duration::from_secs(10)")]
    pub connect_timeout: Duration,
    /// Maximum number of retry attempts
    #[builder(default = "3")]
    pub max_retries: u32,
    /// Base delay between retry attempts, multiplied by the attempt number
    #[builder(default = "Duration::from_millis(500)")]
    pub retry_backoff: Duration,
    /// Delay between two status checks while waiting for completion
    #[builder(default = "Duration::from_secs(1)")]
    pub poll_interval: Duration,
    /// User agent string for requests
    #[builder(default = "MpxConfig::default_user_agent()")]
    pub user_agent: String,
}

impl Default for MpxConfig {
    fn default() -> Self {
        Self {
            api_url: Self::default_api_url(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            poll_interval: Duration::from_secs(1),
            user_agent: Self::default_user_agent(),
        }
    }
}

impl MpxConfig {
    /// Create a new configuration builder
    pub fn builder() -> MpxBuilder {
        MpxBuilder::default()
    }

    /// Default configuration with the API URL taken from `MATHPIX_URL` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        match lookup(ENV_API_URL).filter(|url| !url.trim().is_empty()) {
            Some(url) => Ok(Self::builder().with_api_url(url.trim())?.build()?),
            None => Ok(Self::default()),
        }
    }

    /// Whether requests go to the production Mathpix API.
    pub fn is_production(&self) -> bool {
        self.api_url.as_str().trim_end_matches('/') == PRODUCTION_API_URL
    }

    fn default_api_url() -> Url {
        PRODUCTION_API_URL.parse().expect("Valid default URL")
    }

    fn default_user_agent() -> String {
        format!("mpx-client/{}", env!("CARGO_PKG_VERSION"))
    }
}

impl MpxBuilder {
    /// Set the base URL for the Mathpix API
    pub fn with_api_url(mut self, url: &str) -> Result<Self> {
        let parsed: Url = url
            .parse()
            .map_err(|e| Error::invalid_config(format!("Invalid API URL '{}': {}", url, e)))?;

        if parsed.cannot_be_a_base() {
            return Err(Error::invalid_config(format!(
                "Invalid API URL '{}': not a base URL",
                url
            )));
        }

        self.api_url = Some(parsed);
        Ok(self)
    }

    fn validate_config(&self) -> std::result::Result<(), String> {
        if let Some(timeout) = &self.timeout
            && timeout.is_zero()
        {
            return Err("Timeout must be greater than 0".to_string());
        }

        if let Some(connect_timeout) = &self.connect_timeout
            && connect_timeout.is_zero()
        {
            return Err("Connect timeout must be greater than 0".to_string());
        }

        if let Some(poll_interval) = &self.poll_interval
            && poll_interval.is_zero()
        {
            return Err("Poll interval must be greater than 0".to_string());
        }

        Ok(())
    }
}
