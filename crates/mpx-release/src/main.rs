#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod config;
mod error;
mod release;

use std::io;
use std::process;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Cli;
use crate::release::{Release, SystemRunner};

// Tracing target constants
pub const TRACING_TARGET_CONFIG: &str = "mpx_release::config";
pub const TRACING_TARGET_RELEASE: &str = "mpx_release::release";
pub const TRACING_TARGET_COMMAND: &str = "mpx_release::command";

fn main() {
    let Err(error) = run() else {
        process::exit(0);
    };

    eprintln!("{error:#}");
    process::exit(1);
}

/// Main application entry point.
fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    init_tracing();

    let mut release = Release::new(cli.into_plan(), SystemRunner);
    let stdin = io::stdin();
    release.run(&mut stdin.lock(), &mut io::stdout())?;

    Ok(())
}

/// Initializes tracing with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
