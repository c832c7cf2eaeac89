//! Processing status reported by the Mathpix API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Lifecycle state of a PDF, conversion, conversion format or file batch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessingStatus {
    Received,
    Loaded,
    Split,
    Processing,
    Completed,
    Error,
    /// Any state this client does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProcessingStatus {
    /// Whether no further transitions are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Response of `GET v3/pdf/{pdf_id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfStatus {
    #[serde(default)]
    pub status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_pages_completed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_done: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// State of a single requested output format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatStatus {
    #[serde(default)]
    pub status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<serde_json::Value>,
}

/// Response of `GET v3/converter/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStatus {
    #[serde(default)]
    pub status: ProcessingStatus,
    /// Per-format progress, keyed by format name (`docx`, `tex.zip`, ...).
    #[serde(default)]
    pub conversion_status: BTreeMap<String, FormatStatus>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConversionStatus {
    /// Status of `format`, if the service reports it.
    pub fn format_status(&self, format: &str) -> Option<ProcessingStatus> {
        self.conversion_status.get(format).map(|f| f.status)
    }

    /// The conversion finished and every format either completed or failed.
    pub fn is_complete(&self) -> bool {
        self.status == ProcessingStatus::Completed
            && self
                .conversion_status
                .values()
                .all(|format| format.status.is_terminal())
    }

    /// Every format in `formats` has reached a terminal state.
    pub fn formats_settled<'a>(&self, mut formats: impl Iterator<Item = &'a str>) -> bool {
        formats.all(|format| {
            self.format_status(format)
                .is_some_and(ProcessingStatus::is_terminal)
        })
    }
}

/// Response of `GET v3/file-batches/{file_batch_uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileBatchStatus {
    #[serde(default)]
    pub status: ProcessingStatus,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unknown_status_fallback() {
        let status: ProcessingStatus = serde_json::from_value(json!("queued")).unwrap();
        assert_eq!(status, ProcessingStatus::Unknown);

        let status: ProcessingStatus = serde_json::from_value(json!("split")).unwrap();
        assert_eq!(status, ProcessingStatus::Split);
        assert_eq!(status.to_string(), "split");
    }

    #[test]
    fn test_pdf_status_keeps_extra_fields() {
        let status: PdfStatus = serde_json::from_value(json!({
            "status": "processing",
            "num_pages": 9,
            "num_pages_completed": 3,
            "percent_done": 33.3,
            "input_file": "bitcoin.pdf"
        }))
        .unwrap();

        assert_eq!(status.status, ProcessingStatus::Processing);
        assert_eq!(status.num_pages, Some(9));
        assert_eq!(status.extra["input_file"], "bitcoin.pdf");
    }

    #[test]
    fn test_conversion_completion() {
        let status: ConversionStatus = serde_json::from_value(json!({
            "status": "completed",
            "conversion_status": {
                "docx": { "status": "completed" },
                "tex.zip": { "status": "error", "error_info": { "id": "conversion_error" } }
            }
        }))
        .unwrap();

        assert!(status.is_complete());
        assert_eq!(status.format_status("docx"), Some(ProcessingStatus::Completed));
        assert_eq!(status.format_status("pdf"), None);
        assert!(status.formats_settled(["docx", "tex.zip"].into_iter()));
        assert!(!status.formats_settled(["docx", "pdf"].into_iter()));
    }

    #[test]
    fn test_conversion_in_progress() {
        let status: ConversionStatus = serde_json::from_value(json!({
            "status": "completed",
            "conversion_status": { "docx": { "status": "processing" } }
        }))
        .unwrap();
        assert!(!status.is_complete());

        let status: ConversionStatus =
            serde_json::from_value(json!({ "status": "processing" })).unwrap();
        assert!(!status.is_complete());
    }
}
