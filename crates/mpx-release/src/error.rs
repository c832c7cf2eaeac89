//! Error types for the release tool.

use std::path::PathBuf;

/// Result type for release operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reasons a release stops.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The checked-out branch is not the one releases are made from.
    #[error("Deployment aborted: current branch is '{actual}', releases must be made from '{expected}'")]
    BranchMismatch { expected: String, actual: String },

    /// The confirmation prompt was declined.
    #[error("Deployment cancelled.")]
    Cancelled,

    /// An external command could not be started.
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command exited unsuccessfully.
    #[error("`{command}` failed with {}", .code.map_or_else(|| "no exit code".to_string(), |code| format!("exit code {code}")))]
    CommandFailed { command: String, code: Option<i32> },

    /// An artifact could not be removed.
    #[error("Failed to remove {}: {source}", .path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the confirmation or writing the prompt failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a branch mismatch error
    pub fn branch_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::BranchMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a command failure error
    pub fn command_failed(command: impl Into<String>, code: Option<i32>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Error::Cancelled.to_string(), "Deployment cancelled.");

        let err = Error::branch_mismatch("main", "feature/ocr");
        assert!(err.to_string().contains("'feature/ocr'"));

        let err = Error::command_failed("cargo publish --package mpx-client", Some(101));
        assert_eq!(
            err.to_string(),
            "`cargo publish --package mpx-client` failed with exit code 101"
        );
    }
}
