//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── client: ClientConfig   # Credentials, API URL, timeouts, retries
//! └── command: Command       # image | pdf | convert | batch
//! ```
//!
//! Client options can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod client;

use std::process;

use clap::Parser;
pub use client::ClientConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::Command;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "mpx")]
#[command(about = "Mathpix OCR and conversion from the command line")]
#[command(version)]
pub struct Cli {
    /// Mathpix API connection configuration.
    #[clap(flatten)]
    pub client: ClientConfig,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so that clap's `env` fallbacks see its values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            api_url = self.client.api_url.as_deref().unwrap_or(mpx_client::PRODUCTION_API_URL),
            timeout_secs = self.client.timeout,
            max_retries = self.client.max_retries,
            poll_interval_ms = self.client.poll_interval_ms,
            command = self.command.name(),
            "Client configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pdf_command() {
        let cli = Cli::try_parse_from([
            "mpx",
            "--app-id",
            "app",
            "--app-key",
            "key",
            "--timeout",
            "10",
            "pdf",
            "--url",
            "https://example.com/bitcoin-7.pdf",
            "--convert",
            "docx",
            "--download",
            "mmd",
            "--download",
            "docx",
        ])
        .unwrap();

        assert_eq!(cli.client.timeout, 10);
        let Command::Pdf(args) = cli.command else {
            panic!("expected pdf command");
        };
        assert_eq!(args.convert, ["docx"]);
        assert_eq!(args.download, ["mmd", "docx"]);
    }

    #[test]
    fn test_source_is_exclusive() {
        let result = Cli::try_parse_from([
            "mpx",
            "image",
            "--file",
            "equation.png",
            "--url",
            "https://example.com/equation.png",
        ]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["mpx", "image"]);
        assert!(result.is_err());
    }
}
