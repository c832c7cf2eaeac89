//! External command execution.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::TRACING_TARGET_COMMAND;
use crate::error::{Error, Result};

/// Runs the external tools a release needs.
pub trait CommandRunner {
    /// Run `program` in `dir`, inheriting stdio, and fail unless it succeeds.
    fn run(&mut self, program: &str, args: &[&str], dir: &Path) -> Result<()>;

    /// Run `program` in `dir` and return its trimmed standard output.
    fn capture(&mut self, program: &str, args: &[&str], dir: &Path) -> Result<String>;
}

/// [`CommandRunner`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, program: &str, args: &[&str], dir: &Path) -> Result<()> {
        let command = display_command(program, args);
        tracing::info!(target: TRACING_TARGET_COMMAND, command = %command, "Running command");

        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .status()
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            tracing::error!(
                target: TRACING_TARGET_COMMAND,
                command = %command,
                code = status.code(),
                "Command failed"
            );
            return Err(Error::command_failed(command, status.code()));
        }

        Ok(())
    }

    fn capture(&mut self, program: &str, args: &[&str], dir: &Path) -> Result<String> {
        let command = display_command(program, args);
        tracing::debug!(target: TRACING_TARGET_COMMAND, command = %command, "Capturing command output");

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| Error::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::command_failed(command, output.status.code()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// `program` and `args` joined for messages.
pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
