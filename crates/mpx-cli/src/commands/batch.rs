use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Args;
use mpx_client::{DocumentSource, MpxClient, PdfOptions};

use super::conversion_formats;
use crate::TRACING_TARGET_COMMAND;

#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// Directory whose files are uploaded into the batch.
    #[arg(long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Additional format to convert every PDF to (repeatable).
    #[arg(long, value_name = "FMT")]
    pub convert: Vec<String>,

    /// Seconds to wait for the batch to complete.
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    pub wait: u64,
}

impl BatchArgs {
    pub async fn execute(self, client: &MpxClient) -> anyhow::Result<()> {
        let files = list_files(&self.dir)?;
        if files.is_empty() {
            bail!("no files found in {}", self.dir.display());
        }

        let batch = client.file_batch_new().await?;
        let options = PdfOptions {
            file_batch_uuid: Some(batch.file_batch_uuid().to_string()),
            conversion_formats: conversion_formats(&self.convert),
            ..Default::default()
        };

        for path in files {
            tracing::info!(
                target: TRACING_TARGET_COMMAND,
                file_batch_uuid = batch.file_batch_uuid(),
                path = %path.display(),
                "Sending file"
            );
            client
                .pdf_new(DocumentSource::path(path), options.clone())
                .await?;
        }

        if !batch
            .wait_until_complete(Duration::from_secs(self.wait))
            .await?
        {
            bail!(
                "file batch {} failed or did not complete within {}s",
                batch.file_batch_uuid(),
                self.wait
            );
        }

        for pdf in batch.all_files().await? {
            println!("{}", pdf.pdf_id());
        }

        Ok(())
    }
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.pdf"), dir.path().join("b.pdf")]
        );
    }

    #[test]
    fn test_list_missing_dir() {
        assert!(list_files(Path::new("files/pdfs/missing")).is_err());
    }
}
