//! The release sequence: guard, confirm, clean, package, publish.
//!
//! Every step runs in order and the first failure stops the release, so a
//! declined prompt or a branch mismatch never reaches the build or upload.

mod clean;
mod runner;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::ValueEnum;
use strum::{AsRefStr, Display};

use self::clean::clean;
pub use self::runner::{CommandRunner, SystemRunner};
use crate::TRACING_TARGET_RELEASE;
use crate::error::{Error, Result};

/// Registry a release is published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Destination {
    /// A test registry configured in `.cargo/config.toml`.
    Test,
    /// The default registry (crates.io).
    Production,
}

/// Everything a release needs to know before it starts.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    pub destination: Destination,
    /// Crate to package and publish.
    pub package: String,
    /// Registry name used for [`Destination::Test`].
    pub test_registry: String,
    /// Branch releases must be made from, if any.
    pub required_branch: Option<String>,
    /// Artifact paths removed before packaging.
    pub clean: Vec<String>,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
    /// Workspace root commands run in.
    pub workspace: PathBuf,
}

impl ReleasePlan {
    fn needs_confirmation(&self) -> bool {
        self.destination == Destination::Production && !self.assume_yes
    }

    fn package_args(&self) -> Vec<&str> {
        vec!["package", "--package", self.package.as_str()]
    }

    fn publish_args(&self) -> Vec<&str> {
        let mut args = vec!["publish", "--package", self.package.as_str()];
        if self.destination == Destination::Test {
            args.extend(["--registry", self.test_registry.as_str()]);
        }
        args
    }
}

/// A release driven by a [`CommandRunner`].
pub struct Release<R> {
    plan: ReleasePlan,
    runner: R,
}

impl<R: CommandRunner> Release<R> {
    pub fn new(plan: ReleasePlan, runner: R) -> Self {
        Self { plan, runner }
    }

    #[cfg(test)]
    fn into_runner(self) -> R {
        self.runner
    }

    /// Run every step, reading the confirmation from `input` and writing the
    /// prompt to `output`.
    pub fn run(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_RELEASE,
            destination = %self.plan.destination,
            package = %self.plan.package,
            "Starting release"
        );

        self.check_branch()?;
        if self.plan.needs_confirmation() {
            confirm(&self.plan, input, output)?;
        }
        clean(&self.plan.workspace, &self.plan.clean)?;

        let package_args = self.plan.package_args();
        self.runner
            .run("cargo", &package_args, &self.plan.workspace)?;

        let publish_args = self.plan.publish_args();
        self.runner
            .run("cargo", &publish_args, &self.plan.workspace)?;

        tracing::info!(
            target: TRACING_TARGET_RELEASE,
            destination = %self.plan.destination,
            package = %self.plan.package,
            "Release published"
        );
        Ok(())
    }

    fn check_branch(&mut self) -> Result<()> {
        let Some(expected) = &self.plan.required_branch else {
            return Ok(());
        };

        let actual = self.runner.capture(
            "git",
            &["rev-parse", "--abbrev-ref", "HEAD"],
            &self.plan.workspace,
        )?;
        if &actual != expected {
            tracing::error!(
                target: TRACING_TARGET_RELEASE,
                expected = %expected,
                actual = %actual,
                "Release attempted from the wrong branch"
            );
            return Err(Error::branch_mismatch(expected, actual));
        }

        Ok(())
    }
}

/// Ask before publishing; only `y` or `Y` proceeds.
fn confirm(plan: &ReleasePlan, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
    write!(
        output,
        "You are about to publish {} to the {} registry. Continue? [y/N] ",
        plan.package, plan.destination
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    match answer.trim() {
        "y" | "Y" => Ok(()),
        _ => Err(Error::Cancelled),
    }
}
