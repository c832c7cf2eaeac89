//! Output readiness checks and downloads to disk.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Response;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::TRACING_TARGET_CLIENT;
use crate::error::{Error, Result};
use crate::status::{ConversionStatus, ProcessingStatus};

/// Whether `segment` can be used verbatim as one path segment.
fn is_path_segment(segment: &str) -> bool {
    !segment.trim().is_empty()
        && segment == segment.trim()
        && !segment.starts_with('.')
        && !segment.contains(['/', '\\'])
        && !segment.contains("..")
}

/// Reject output format names that cannot form a single path segment.
pub(crate) fn validate_format(format: &str) -> Result<()> {
    if !is_path_segment(format) {
        return Err(Error::validation(format!(
            "Invalid output format '{}'",
            format
        )));
    }
    Ok(())
}

/// Reject resource ids that cannot form a single path segment.
///
/// Ids name downloaded files, so they follow the same rules as formats.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::validation(format!("{kind} requires an id")));
    }
    if !is_path_segment(id) {
        return Err(Error::validation(format!("Invalid {kind} id '{id}'")));
    }
    Ok(())
}

/// Name of a downloaded output: `{id}.{format}`.
pub(crate) fn output_file_name(id: &str, format: &str) -> String {
    format!("{id}.{format}")
}

/// Fail with [`Error::ConversionIncomplete`] unless `format` has completed.
pub(crate) fn ensure_format_ready(status: &ConversionStatus, format: &str) -> Result<()> {
    match status.format_status(format) {
        Some(ProcessingStatus::Completed) => Ok(()),
        state => {
            let state = state.map_or_else(|| "not started".to_string(), |s| s.to_string());
            Err(Error::conversion_incomplete(
                format,
                state,
                serde_json::to_value(status).ok(),
            ))
        }
    }
}

/// Stream `response` into `dir/file_name`, creating `dir` when it is not empty.
///
/// A partially written file is removed if the download fails.
pub(crate) async fn save_response(
    response: Response,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::filesystem(dir, e.to_string()))?;
    }

    let path = dir.join(file_name);
    let file = File::create(&path)
        .await
        .map_err(|e| Error::filesystem(&path, e.to_string()))?;

    let written = match write_stream(response, file, &path).await {
        Ok(written) => written,
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                path = %path.display(),
                error = %err,
                "Download failed, removing partial file"
            );
            let _ = tokio::fs::remove_file(&path).await;
            return Err(err);
        }
    };

    tracing::info!(
        target: TRACING_TARGET_CLIENT,
        path = %path.display(),
        bytes = written,
        "File saved successfully"
    );

    Ok(path)
}

async fn write_stream(response: Response, mut file: File, path: &Path) -> Result<u64> {
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::filesystem(path, e.to_string()))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| Error::filesystem(path, e.to_string()))?;

    Ok(written)
}
