//! Removal of stale build artifacts.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::TRACING_TARGET_RELEASE;
use crate::error::{Error, Result};

/// Existing paths under `root` matched by `pattern`.
///
/// A pattern with a single `*` matches entry names directly inside `root`
/// (`*.egg-info`); any other pattern is a path relative to `root`.
pub fn resolve(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let Some((prefix, suffix)) = pattern.split_once('*') else {
        let path = root.join(pattern);
        return Ok(if path.symlink_metadata().is_ok() {
            vec![path]
        } else {
            Vec::new()
        });
    };

    let mut matches = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.len() >= prefix.len() + suffix.len()
            && name.starts_with(prefix)
            && name.ends_with(suffix)
        {
            matches.push(entry.path());
        }
    }
    matches.sort();

    Ok(matches)
}

/// Remove everything under `root` matched by `patterns`.
///
/// Returns the removed paths. Patterns matching nothing are skipped.
pub fn clean(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for pattern in patterns {
        for path in resolve(root, pattern)? {
            tracing::info!(
                target: TRACING_TARGET_RELEASE,
                path = %path.display(),
                "Removing artifact"
            );

            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed.push(path),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(Error::Clean { path, source }),
            }
        }
    }

    Ok(removed)
}
