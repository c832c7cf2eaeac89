//! Command-line options for a release.

use std::path::PathBuf;

use clap::Parser;

use crate::TRACING_TARGET_CONFIG;
use crate::release::{Destination, ReleasePlan};

/// Branch production releases are made from unless overridden.
pub const DEFAULT_PRODUCTION_BRANCH: &str = "main";

#[derive(Debug, Clone, Parser)]
#[command(name = "mpx-release")]
#[command(about = "Package and publish a workspace crate")]
#[command(version)]
pub struct Cli {
    /// Registry to publish to.
    #[arg(long, value_enum, env = "MPX_RELEASE_DESTINATION")]
    pub destination: Destination,

    /// Workspace crate to package and publish.
    #[arg(long, default_value = "mpx-client")]
    pub package: String,

    /// Name of the test registry in `.cargo/config.toml`.
    #[arg(long, env = "MPX_TEST_REGISTRY", default_value = "staging")]
    pub test_registry: String,

    /// Branch the release must be made from (production defaults to `main`).
    #[arg(long, value_name = "BRANCH")]
    pub required_branch: Option<String>,

    /// Artifact path removed before packaging (repeatable, one `*` allowed).
    #[arg(
        long = "clean",
        value_name = "PATH",
        default_values = ["dist", "build", "target/package", "*.egg-info"]
    )]
    pub clean: Vec<String>,

    /// Publish without asking for confirmation.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Workspace root the release runs in.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub workspace: PathBuf,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
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

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Resolve defaults that depend on the destination.
    pub fn into_plan(self) -> ReleasePlan {
        let required_branch = self.required_branch.or_else(|| {
            (self.destination == Destination::Production)
                .then(|| DEFAULT_PRODUCTION_BRANCH.to_string())
        });

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            destination = %self.destination,
            package = %self.package,
            test_registry = %self.test_registry,
            required_branch = required_branch.as_deref(),
            clean = ?self.clean,
            "Release configuration"
        );

        ReleasePlan {
            destination: self.destination,
            package: self.package,
            test_registry: self.test_registry,
            required_branch,
            clean: self.clean,
            assume_yes: self.yes,
            workspace: self.workspace,
        }
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
    fn test_production_defaults() {
        let plan = Cli::try_parse_from(["mpx-release", "--destination", "production"])
            .unwrap()
            .into_plan();

        assert_eq!(plan.destination, Destination::Production);
        assert_eq!(plan.package, "mpx-client");
        assert_eq!(plan.required_branch.as_deref(), Some("main"));
        assert_eq!(plan.clean, ["dist", "build", "target/package", "*.egg-info"]);
        assert!(!plan.assume_yes);
    }

    #[test]
    fn test_test_destination() {
        let plan = Cli::try_parse_from([
            "mpx-release",
            "--destination",
            "test",
            "--test-registry",
            "local",
            "--clean",
            "dist",
            "-y",
        ])
        .unwrap()
        .into_plan();

        assert_eq!(plan.test_registry, "local");
        assert_eq!(plan.required_branch, None);
        assert_eq!(plan.clean, ["dist"]);
        assert!(plan.assume_yes);
    }

    #[test]
    fn test_destination_is_required() {
        assert!(Cli::try_parse_from(["mpx-release"]).is_err());
    }
}
