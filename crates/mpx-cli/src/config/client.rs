//! Mathpix client configuration with CLI argument parsing.

use std::time::Duration;

use anyhow::Context;
use clap::Args;
use mpx_client::{MpxClient, MpxConfig, MpxCredentials};

/// Credentials and connection options shared by every command.
#[derive(Clone, Args)]
#[must_use = "config does nothing unless you use it"]
pub struct ClientConfig {
    /// Mathpix application id.
    #[arg(long, env = "MATHPIX_APP_ID", global = true)]
    pub app_id: Option<String>,

    /// Mathpix application key.
    #[arg(long, env = "MATHPIX_APP_KEY", global = true, hide_env_values = true)]
    pub app_key: Option<String>,

    /// Base URL of the Mathpix API.
    #[arg(long, env = "MATHPIX_URL", global = true)]
    pub api_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "MPX_TIMEOUT", global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Retries for transient request failures.
    #[arg(long, env = "MPX_MAX_RETRIES", global = true, default_value_t = 3)]
    pub max_retries: u32,

    /// Delay between status checks in milliseconds.
    #[arg(long, env = "MPX_POLL_INTERVAL", global = true, default_value_t = 1000)]
    pub poll_interval_ms: u64,
}

impl ClientConfig {
    /// Build a client from these options.
    pub fn build_client(&self) -> anyhow::Result<MpxClient> {
        let mut builder = MpxConfig::builder()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_retries(self.max_retries)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms));
        if let Some(api_url) = &self.api_url {
            builder = builder
                .with_api_url(api_url)
                .context("invalid Mathpix API URL")?;
        }
        let config = builder.build()?;

        let credentials = MpxCredentials::resolve(self.app_id.clone(), self.app_key.clone())?;
        Ok(MpxClient::new(config, credentials)?)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("app_id", &self.app_id)
            .field("app_key", &self.app_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish()
    }
}
