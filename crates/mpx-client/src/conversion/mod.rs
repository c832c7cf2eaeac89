//! Mathpix Markdown conversions through `v3/converter`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONVERSION;
use crate::client::MpxClient;
use crate::error::{Error, Result};
use crate::poll::{PollState, wait_until};
use crate::status::{ConversionStatus, ProcessingStatus};
use crate::transfer::{
    ensure_format_ready, output_file_name, save_response, validate_format, validate_id,
};

/// Output formats requested from a conversion, e.g. `{"docx": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionFormats(BTreeMap<String, bool>);

impl ConversionFormats {
    /// No formats requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `format` in addition to the formats already set.
    pub fn with(mut self, format: impl Into<String>) -> Self {
        self.0.insert(format.into(), true);
        self
    }

    /// Set whether `format` is requested.
    pub fn set(&mut self, format: impl Into<String>, enabled: bool) -> &mut Self {
        self.0.insert(format.into(), enabled);
        self
    }

    /// Names of the requested formats.
    pub fn requested(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(format, _)| format.as_str())
    }

    /// Whether no format is requested.
    pub fn is_empty(&self) -> bool {
        self.requested().next().is_none()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::validation(
                "At least one conversion format must be requested",
            ));
        }
        self.requested().try_for_each(validate_format)
    }
}

impl<S: Into<String>> FromIterator<S> for ConversionFormats {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |formats, format| formats.with(format))
    }
}

#[derive(Serialize)]
struct ConversionRequest<'a> {
    mmd: &'a str,
    formats: &'a ConversionFormats,
}

#[derive(Deserialize)]
struct ConversionCreated {
    conversion_id: String,
}

/// A conversion of Mathpix Markdown to other formats.
#[derive(Debug, Clone)]
pub struct Conversion {
    client: MpxClient,
    conversion_id: String,
    conversion_formats: ConversionFormats,
}

impl MpxClient {
    /// Convert Mathpix Markdown to the requested formats.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if no format is requested and
    /// [`Error::Api`] if the service rejects the conversion.
    pub async fn conversion_new(
        &self,
        mmd: &str,
        conversion_formats: ConversionFormats,
    ) -> Result<Conversion> {
        conversion_formats.validate()?;

        tracing::info!(
            target: TRACING_TARGET_CONVERSION,
            formats = ?conversion_formats.requested().collect::<Vec<_>>(),
            "Starting new MMD conversion"
        );

        let endpoint = self.endpoint(&["v3", "converter"])?;
        let request = ConversionRequest {
            mmd,
            formats: &conversion_formats,
        };
        let created: ConversionCreated = self.post_json(endpoint, &request).await?;

        tracing::info!(
            target: TRACING_TARGET_CONVERSION,
            conversion_id = %created.conversion_id,
            "Conversion created"
        );

        Conversion::new(self.clone(), created.conversion_id, conversion_formats)
    }
}

impl Conversion {
    /// Handle to an existing conversion.
    pub fn new(
        client: MpxClient,
        conversion_id: impl Into<String>,
        conversion_formats: ConversionFormats,
    ) -> Result<Self> {
        let conversion_id = conversion_id.into();
        if let Err(err) = validate_id("Conversion", &conversion_id) {
            tracing::error!(
                target: TRACING_TARGET_CONVERSION,
                error = %err,
                "Rejected conversion id"
            );
            return Err(err);
        }

        Ok(Self {
            client,
            conversion_id,
            conversion_formats,
        })
    }

    /// Conversion id assigned by the service.
    pub fn conversion_id(&self) -> &str {
        &self.conversion_id
    }

    /// Formats requested at creation.
    pub fn conversion_formats(&self) -> &ConversionFormats {
        &self.conversion_formats
    }

    /// Current status of the conversion.
    pub async fn conversion_status(&self) -> Result<ConversionStatus> {
        tracing::debug!(
            target: TRACING_TARGET_CONVERSION,
            conversion_id = %self.conversion_id,
            "Getting conversion status"
        );

        let endpoint = self
            .client
            .endpoint(&["v3", "converter", &self.conversion_id])?;
        self.client.get_json(endpoint).await
    }

    /// Poll until every format has completed or failed.
    ///
    /// Returns `false` if the conversion reports an error or `timeout` elapses.
    pub async fn wait_until_complete(&self, timeout: Duration) -> Result<bool> {
        wait_until(
            "conversion",
            &self.conversion_id,
            timeout,
            self.client.config().poll_interval,
            || async {
                let status = self.conversion_status().await?;
                Ok(match status.status {
                    ProcessingStatus::Error => PollState::Failed,
                    _ if status.is_complete() => PollState::Completed,
                    _ => PollState::Pending,
                })
            },
        )
        .await
    }

    /// Download the converted output in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConversionIncomplete`] if `format` has not completed.
    pub async fn download_output(&self, format: &str) -> Result<Bytes> {
        let response = self.ready_output(format).await?;
        Ok(response.bytes().await?)
    }

    /// Download the converted output in `format` to `{dir}/{conversion_id}.{format}`.
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
            target: TRACING_TARGET_CONVERSION,
            conversion_id = %self.conversion_id,
            format,
            path = %dir.display(),
            "Downloading conversion output"
        );

        let response = self.ready_output(format).await?;
        save_response(
            response,
            dir,
            &output_file_name(&self.conversion_id, format),
        )
        .await
    }

    async fn ready_output(&self, format: &str) -> Result<reqwest::Response> {
        validate_format(format)?;

        let status = self.conversion_status().await?;
        ensure_format_ready(&status, format)?;

        let file_name = output_file_name(&self.conversion_id, format);
        let endpoint = self.client.endpoint(&["v3", "converter", &file_name])?;
        self.client.get(endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::Path as UrlPath;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::{spawn_server, test_client};

    const DOCX_BYTES: &[u8] = b"PK\x03\x04 fake docx";

    /// Converter whose `docx` output completes on the third status check.
    fn converter_router() -> Router {
        let checks = Arc::new(AtomicUsize::new(0));
        Router::new()
            .route(
                "/v3/converter",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["formats"], json!({ "docx": true }));
                    assert!(body["mmd"].as_str().unwrap().contains("f(x)"));
                    Json(json!({ "conversion_id": "conv-123" }))
                }),
            )
            .route(
                "/v3/converter/{name}",
                get(move |UrlPath(name): UrlPath<String>| {
                    let checks = checks.clone();
                    async move {
                        if name == "conv-123.docx" {
                            return DOCX_BYTES.into_response();
                        }
                        let state = if checks.fetch_add(1, Ordering::SeqCst) < 2 {
                            "processing"
                        } else {
                            "completed"
                        };
                        Json(json!({
                            "status": "completed",
                            "conversion_status": { "docx": { "status": state } }
                        }))
                        .into_response()
                    }
                }),
            )
    }

    #[test]
    fn test_formats() {
        let mut formats = ConversionFormats::new().with("docx").with("tex.zip");
        formats.set("tex.zip", false);

        assert_eq!(formats.requested().collect::<Vec<_>>(), vec!["docx"]);
        assert_eq!(
            serde_json::to_value(&formats).unwrap(),
            json!({ "docx": true, "tex.zip": false })
        );
        assert!(formats.validate().is_ok());

        assert!(ConversionFormats::new().is_empty());
        assert!(ConversionFormats::new().validate().is_err());

        let collected: ConversionFormats = ["md", "html"].into_iter().collect();
        assert_eq!(collected.requested().count(), 2);
    }

    #[test]
    fn test_invalid_conversion_id() {
        let client = test_client("http://127.0.0.1:9");
        for id in [" ", "../escape", "/tmp/x", "nested/id"] {
            assert!(matches!(
                Conversion::new(client.clone(), id, ConversionFormats::new()),
                Err(Error::Validation { .. })
            ));
        }
        assert!(Conversion::new(client, "2025_01_01_conv", ConversionFormats::new()).is_ok());
    }

    #[tokio::test]
    async fn test_conversion_new_requires_formats() {
        let client = test_client("http://127.0.0.1:9");
        let result = client.conversion_new("x^2", ConversionFormats::new()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_conversion_rejected() {
        let router = Router::new().route(
            "/v3/converter",
            post(|| async { Json(json!({ "error": "Invalid mmd" })) }),
        );
        let client = test_client(&spawn_server(router).await);

        let result = client
            .conversion_new("\\(", ConversionFormats::new().with("docx"))
            .await;
        assert!(matches!(result, Err(Error::Api { .. })));
    }

    #[tokio::test]
    async fn test_conversion_lifecycle() {
        let client = test_client(&spawn_server(converter_router()).await);
        let mmd = r"\( f(x)=\left\{\begin{array}{ll}x^{2} & \text { if } x<0\end{array}\right. \)";

        let conversion = client
            .conversion_new(mmd, ConversionFormats::new().with("docx"))
            .await
            .unwrap();
        assert_eq!(conversion.conversion_id(), "conv-123");

        // The first status check still reports docx as processing.
        let err = conversion.download_output("docx").await.unwrap_err();
        assert!(matches!(err, Error::ConversionIncomplete { .. }));

        assert!(
            conversion
                .wait_until_complete(Duration::from_secs(5))
                .await
                .unwrap()
        );

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("output/dir");
        let path = conversion
            .download_output_to_local_path("docx", &output_dir)
            .await
            .unwrap();

        assert_eq!(path, output_dir.join("conv-123.docx"));
        assert_eq!(std::fs::read(&path).unwrap(), DOCX_BYTES);

        let bytes = conversion.download_output("docx").await.unwrap();
        assert_eq!(bytes.as_ref(), DOCX_BYTES);
    }

    #[tokio::test]
    async fn test_wait_stops_on_error() {
        let router = Router::new().route(
            "/v3/converter/{name}",
            get(|| async { Json(json!({ "status": "error", "error": "bad input" })) }),
        );
        let client = test_client(&spawn_server(router).await);

        let conversion =
            Conversion::new(client, "conv-err", ConversionFormats::new().with("docx")).unwrap();
        assert!(
            !conversion
                .wait_until_complete(Duration::from_secs(5))
                .await
                .unwrap()
        );
    }
}
