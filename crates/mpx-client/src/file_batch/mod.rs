//! File batches through `v3/file-batches`.
//!
//! A batch groups PDFs submitted with [`PdfOptions::file_batch_uuid`] so they
//! can be tracked together. Batches are only offered by non-production
//! deployments.
//!
//! [`PdfOptions::file_batch_uuid`]: crate::PdfOptions::file_batch_uuid

use std::time::Duration;

use serde::Deserialize;

use crate::TRACING_TARGET_FILE_BATCH;
use crate::client::MpxClient;
use crate::error::{Error, Result};
use crate::pdf::Pdf;
use crate::poll::{PollState, wait_until};
use crate::status::{FileBatchStatus, ProcessingStatus};

#[derive(Deserialize)]
struct FileBatchCreated {
    file_batch_uuid: String,
}

#[derive(Deserialize)]
struct RawFilesPage {
    #[serde(default)]
    files: Vec<RawFile>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Deserialize)]
struct RawFile {
    pdf_id: String,
}

/// One page of the PDFs in a batch.
#[derive(Debug, Clone)]
pub struct FilesPage {
    pub files: Vec<Pdf>,
    pub has_more: bool,
    /// Pass to [`FileBatch::files`] to fetch the next page.
    pub cursor: Option<String>,
}

/// A group of PDFs processed together.
#[derive(Debug, Clone)]
pub struct FileBatch {
    client: MpxClient,
    file_batch_uuid: String,
}

impl MpxClient {
    /// Create a new, empty file batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] against the production API.
    pub async fn file_batch_new(&self) -> Result<FileBatch> {
        if self.is_production() {
            tracing::warn!(
                target: TRACING_TARGET_FILE_BATCH,
                "File batch feature not available in production API"
            );
            return Err(Error::unavailable("File batches"));
        }

        tracing::info!(target: TRACING_TARGET_FILE_BATCH, "Creating new file batch");

        let endpoint = self.endpoint(&["v3", "file-batches"])?;
        let created: FileBatchCreated = self.post_empty(endpoint).await?;

        tracing::info!(
            target: TRACING_TARGET_FILE_BATCH,
            file_batch_uuid = %created.file_batch_uuid,
            "File batch created"
        );

        FileBatch::new(self.clone(), created.file_batch_uuid)
    }
}

impl FileBatch {
    /// Handle to an existing batch.
    pub fn new(client: MpxClient, file_batch_uuid: impl Into<String>) -> Result<Self> {
        let file_batch_uuid = file_batch_uuid.into();
        if file_batch_uuid.trim().is_empty() {
            tracing::error!(
                target: TRACING_TARGET_FILE_BATCH,
                "File batch requires a file batch id"
            );
            return Err(Error::validation("File batch requires a file batch id"));
        }

        Ok(Self {
            client,
            file_batch_uuid,
        })
    }

    pub fn file_batch_uuid(&self) -> &str {
        &self.file_batch_uuid
    }

    /// Current status of the batch.
    pub async fn file_batch_status(&self) -> Result<FileBatchStatus> {
        tracing::debug!(
            target: TRACING_TARGET_FILE_BATCH,
            file_batch_uuid = %self.file_batch_uuid,
            "Getting file batch status"
        );

        let endpoint = self
            .client
            .endpoint(&["v3", "file-batches", &self.file_batch_uuid])?;
        self.client.get_json(endpoint).await
    }

    /// Poll until the batch completes.
    ///
    /// Returns `false` if the batch reports an error or `timeout` elapses.
    pub async fn wait_until_complete(&self, timeout: Duration) -> Result<bool> {
        wait_until(
            "file_batch",
            &self.file_batch_uuid,
            timeout,
            self.client.config().poll_interval,
            || async {
                let status = self.file_batch_status().await?;
                Ok(match status.status {
                    ProcessingStatus::Completed => PollState::Completed,
                    ProcessingStatus::Error => PollState::Failed,
                    _ => PollState::Pending,
                })
            },
        )
        .await
    }

    /// Fetch one page of the batch's PDFs, starting at `cursor`.
    pub async fn files(&self, cursor: Option<&str>) -> Result<FilesPage> {
        tracing::debug!(
            target: TRACING_TARGET_FILE_BATCH,
            file_batch_uuid = %self.file_batch_uuid,
            cursor,
            "Listing file batch files"
        );

        let mut endpoint =
            self.client
                .endpoint(&["v3", "file-batches", &self.file_batch_uuid, "files"])?;
        if let Some(cursor) = cursor {
            endpoint.query_pairs_mut().append_pair("cursor", cursor);
        }

        let page: RawFilesPage = self.client.get_json(endpoint).await?;
        let files = page
            .files
            .into_iter()
            .map(|file| Pdf::new(self.client.clone(), file.pdf_id))
            .collect::<Result<Vec<_>>>()?;

        Ok(FilesPage {
            files,
            has_more: page.has_more,
            cursor: page.cursor,
        })
    }

    /// Fetch every PDF in the batch, following cursors until the last page.
    pub async fn all_files(&self) -> Result<Vec<Pdf>> {
        let mut files = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.files(cursor.as_deref()).await?;
            files.extend(page.files);

            match page.cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }
}
