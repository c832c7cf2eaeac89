//! PDF processing through `v3/pdf`.
//!
//! [`MpxClient::pdf_new`] uploads a document and returns a [`Pdf`] handle
//! used to follow processing and download the results. Formats produced by
//! PDF processing itself (`mmd`, `md`, `lines.json`, `lines.mmd.json`) are
//! available once the PDF completes; every other format is produced by the
//! converter and tracked per format.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TRACING_TARGET_PDF;
use crate::client::{DocumentSource, MpxClient};
use crate::conversion::ConversionFormats;
use crate::error::{Error, Result};
use crate::poll::{PollState, wait_until};
use crate::status::{ConversionStatus, PdfStatus, ProcessingStatus};
use crate::transfer::{
    ensure_format_ready, output_file_name, save_response, validate_format, validate_id,
};

/// Output formats available as soon as PDF processing completes.
const NATIVE_FORMATS: &[&str] = &["mmd", "md", "lines.json", "lines.mmd.json"];

/// Options for a PDF submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    /// Batch to associate this file with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_batch_uuid: Option<String>,
    /// URL notified about processing events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Secret used to sign webhook deliveries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mathpix_webhook_secret: Option<String>,
    /// Custom payload included in webhook deliveries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_payload: Option<Value>,
    /// Events that trigger a webhook delivery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_enabled_events: Option<Vec<String>>,
    /// Formats to convert the result to, e.g. `{"docx": true}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_formats: Option<ConversionFormats>,
}

impl PdfOptions {
    fn uses_webhooks(&self) -> bool {
        self.webhook_url.is_some()
            || self.mathpix_webhook_secret.is_some()
            || self.webhook_payload.is_some()
            || self.webhook_enabled_events.is_some()
    }
}

#[derive(Serialize)]
struct PdfRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    math_inline_delimiters: [&'static str; 2],
    rm_spaces: bool,
    #[serde(flatten)]
    options: &'a PdfOptions,
}

#[derive(Deserialize)]
struct PdfCreated {
    pdf_id: String,
}

/// A PDF submitted for processing.
#[derive(Debug, Clone)]
pub struct Pdf {
    client: MpxClient,
    pdf_id: String,
    source: Option<DocumentSource>,
    options: PdfOptions,
}

impl MpxClient {
    /// Send a PDF to Mathpix for processing.
    ///
    /// # Errors
    ///
    /// - [`Error::Unavailable`] if webhook or batch options are used against
    ///   the production API
    /// - [`Error::FileNotFound`] if a local source does not exist
    /// - [`Error::Api`] if the service rejects the request
    pub async fn pdf_new(&self, source: DocumentSource, options: PdfOptions) -> Result<Pdf> {
        if self.is_production() {
            if options.uses_webhooks() {
                tracing::warn!(
                    target: TRACING_TARGET_PDF,
                    "Webhook features not available in production API"
                );
                return Err(Error::unavailable("Webhook features"));
            }
            if options.file_batch_uuid.is_some() {
                tracing::warn!(
                    target: TRACING_TARGET_PDF,
                    "File batch features not available in production API"
                );
                return Err(Error::unavailable("File batches"));
            }
        }
        if let Some(formats) = &options.conversion_formats {
            formats.requested().try_for_each(validate_format)?;
        }

        tracing::info!(
            target: TRACING_TARGET_PDF,
            source = %source,
            file_batch_uuid = options.file_batch_uuid.as_deref(),
            "Creating new PDF"
        );

        let endpoint = self.endpoint(&["v3", "pdf"])?;
        let created: PdfCreated = match &source {
            DocumentSource::Path(path) => {
                let request = PdfRequest {
                    url: None,
                    math_inline_delimiters: ["$", "$"],
                    rm_spaces: true,
                    options: &options,
                };
                let options_json = serde_json::to_string(&request)?;
                self.post_file(endpoint, path, options_json).await?
            }
            DocumentSource::Url(url) => {
                let request = PdfRequest {
                    url: Some(url.as_str()),
                    math_inline_delimiters: ["$", "$"],
                    rm_spaces: true,
                    options: &options,
                };
                self.post_json(endpoint, &request).await?
            }
        };

        tracing::info!(
            target: TRACING_TARGET_PDF,
            pdf_id = %created.pdf_id,
            "PDF processing started"
        );

        Pdf::with_source(self.clone(), created.pdf_id, Some(source), options)
    }
}

impl Pdf {
    /// Handle to a PDF that was already submitted.
    pub fn new(client: MpxClient, pdf_id: impl Into<String>) -> Result<Self> {
        Self::with_source(client, pdf_id, None, PdfOptions::default())
    }

    pub(crate) fn with_source(
        client: MpxClient,
        pdf_id: impl Into<String>,
        source: Option<DocumentSource>,
        options: PdfOptions,
    ) -> Result<Self> {
        let pdf_id = pdf_id.into();
        if let Err(err) = validate_id("PDF", &pdf_id) {
            tracing::error!(target: TRACING_TARGET_PDF, error = %err, "Rejected PDF id");
            return Err(err);
        }

        Ok(Self {
            client,
            pdf_id,
            source,
            options,
        })
    }

    /// PDF id assigned by the service.
    pub fn pdf_id(&self) -> &str {
        &self.pdf_id
    }

    /// Where the PDF was read from, when submitted through this client.
    pub fn source(&self) -> Option<&DocumentSource> {
        self.source.as_ref()
    }

    /// Options the PDF was submitted with.
    pub fn options(&self) -> &PdfOptions {
        &self.options
    }

    /// Current processing status.
    pub async fn pdf_status(&self) -> Result<PdfStatus> {
        tracing::debug!(
            target: TRACING_TARGET_PDF,
            pdf_id = %self.pdf_id,
            "Getting PDF status"
        );

        let endpoint = self.client.endpoint(&["v3", "pdf", &self.pdf_id])?;
        self.client.get_json(endpoint).await
    }

    /// Current status of the conversions requested for this PDF.
    pub async fn conversion_status(&self) -> Result<ConversionStatus> {
        tracing::debug!(
            target: TRACING_TARGET_PDF,
            pdf_id = %self.pdf_id,
            "Getting conversion status"
        );

        let endpoint = self.client.endpoint(&["v3", "converter", &self.pdf_id])?;
        self.client.get_json(endpoint).await
    }

    /// Poll until processing and every requested conversion has settled.
    ///
    /// Returns `false` if processing reports an error or `timeout` elapses.
    pub async fn wait_until_complete(&self, timeout: Duration) -> Result<bool> {
        wait_until(
            "pdf",
            &self.pdf_id,
            timeout,
            self.client.config().poll_interval,
            || self.check_progress(),
        )
        .await
    }

    async fn check_progress(&self) -> Result<PollState> {
        let status = self.pdf_status().await?;
        match status.status {
            ProcessingStatus::Error => return Ok(PollState::Failed),
            ProcessingStatus::Completed => {}
            _ => return Ok(PollState::Pending),
        }

        let Some(formats) = self
            .options
            .conversion_formats
            .as_ref()
            .filter(|formats| !formats.is_empty())
        else {
            return Ok(PollState::Completed);
        };

        let conversion = match self.conversion_status().await {
            Ok(conversion) => conversion,
            // The converter entry appears shortly after processing completes.
            Err(Error::Api { status: 404, .. }) => return Ok(PollState::Pending),
            Err(err) => return Err(err),
        };

        Ok(if conversion.status == ProcessingStatus::Error {
            PollState::Failed
        } else if conversion.formats_settled(formats.requested()) {
            PollState::Completed
        } else {
            PollState::Pending
        })
    }

    /// Download the result in `format` (e.g. `mmd`, `docx`, `lines.json`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConversionIncomplete`] if the output is not ready.
    pub async fn download_output(&self, format: &str) -> Result<Bytes> {
        let response = self.ready_output(format).await?;
        Ok(response.bytes().await?)
    }

    /// Download the result in `format` to `{dir}/{pdf_id}.{format}`.
    ///
    /// `dir` is created if it does not exist; an empty path writes to the
    /// current directory.
    pub async fn download_output_to_local_path(
        &self,
        format: &str,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let dir = dir.as_ref();
        tracing::info!(
            target: TRACING_TARGET_PDF,
            pdf_id = %self.pdf_id,
            format,
            path = %dir.display(),
            "Downloading PDF output"
        );

        let response = self.ready_output(format).await?;
        save_response(response, dir, &output_file_name(&self.pdf_id, format)).await
    }

    async fn ready_output(&self, format: &str) -> Result<reqwest::Response> {
        validate_format(format)?;

        if NATIVE_FORMATS.contains(&format) {
            let status = self.pdf_status().await?;
            if status.status != ProcessingStatus::Completed {
                return Err(Error::conversion_incomplete(
                    format,
                    status.status.to_string(),
                    serde_json::to_value(&status).ok(),
                ));
            }
        } else {
            let status = match self.conversion_status().await {
                Ok(status) => status,
                Err(Error::Api { status: 404, .. }) => ConversionStatus::default(),
                Err(err) => return Err(err),
            };
            ensure_format_ready(&status, format)?;
        }

        let file_name = output_file_name(&self.pdf_id, format);
        let endpoint = self.client.endpoint(&["v3", "pdf", &file_name])?;
        self.client.get(endpoint).await
    }
}
