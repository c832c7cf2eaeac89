//! Image OCR through `v3/text`.
//!
//! An [`Image`] is created by [`MpxClient::image_new`] and sends its source
//! to the service every time one of its result accessors is called.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TRACING_TARGET_IMAGE;
use crate::client::{DocumentSource, MpxClient};
use crate::error::{Error, Result};

/// Image area to process, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub top_left_x: u32,
    pub top_left_y: u32,
    pub width: u32,
    pub height: u32,
}

/// Request options for `v3/text`.
///
/// Options left as `None` are omitted from the request so the service
/// defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Callback object forwarded to the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<Value>,
    /// Output format, one of `text`, `data`, `html` or `latex_styled`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<String>>,
    /// Outputs to include in the `data` and `html` fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_detected_alphabets: Option<bool>,
    /// Alphabets allowed in the output, e.g. `{"hi": false}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alphabets_allowed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    /// Only process blue hue text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_blue_hsv_filter: Option<bool>,
    /// Confidence in `[0, 1]` below which the service reports an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    /// Per-character confidence in `[0, 1]` below which the service reports an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_rate_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_equation_tags: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_line_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_word_data: Option<bool>,
    /// Experimental chemistry diagram OCR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_smiles: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_inchi: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_geometry_data: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_diagram_text: Option<bool>,
    /// Confidence in `[0, 1]` required before the image is auto rotated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_rotate_confidence_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rm_spaces: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rm_fonts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idiomatic_eqn_arrays: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idiomatic_braces: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numbers_default_to_math: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub math_fonts_default_to_math: Option<bool>,
    /// Begin and end delimiters for inline math.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub math_inline_delimiters: Option<(String, String)>,
    /// Begin and end delimiters for display math.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub math_display_delimiters: Option<(String, String)>,
    /// Predictive mode for English handwriting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_spell_check: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tables_fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullwidth_punctuation: Option<bool>,
}

impl ImageOptions {
    /// Check option values before any request is made.
    pub fn validate(&self) -> Result<()> {
        if let Some(formats) = &self.formats
            && formats.len() != 1
        {
            return Err(Error::validation("formats can only contain one argument"));
        }

        let thresholds = [
            ("confidence_threshold", self.confidence_threshold),
            ("confidence_rate_threshold", self.confidence_rate_threshold),
            (
                "auto_rotate_confidence_threshold",
                self.auto_rotate_confidence_threshold,
            ),
        ];
        for (name, value) in thresholds {
            if let Some(value) = value
                && !(0.0..=1.0).contains(&value)
            {
                return Err(Error::validation(format!(
                    "{} must be between 0 and 1",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// An image submitted for OCR.
#[derive(Debug, Clone)]
pub struct Image {
    client: MpxClient,
    source: DocumentSource,
    options: ImageOptions,
}

impl MpxClient {
    /// Create a new image resource from a local file or remote URL.
    ///
    /// No request is made until one of the result accessors is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if an option is out of range.
    pub fn image_new(&self, source: DocumentSource, options: ImageOptions) -> Result<Image> {
        if let Err(err) = options.validate() {
            tracing::error!(
                target: TRACING_TARGET_IMAGE,
                error = %err,
                "Invalid image parameters"
            );
            return Err(err);
        }

        tracing::info!(
            target: TRACING_TARGET_IMAGE,
            source = %source,
            "Creating new image"
        );

        Ok(Image {
            client: self.clone(),
            source,
            options,
        })
    }
}

impl Image {
    /// Where the image is read from.
    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    /// Options sent with every request.
    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    /// Process the image and return the full OCR response.
    pub async fn results(&self) -> Result<Value> {
        self.process(&self.options).await
    }

    /// Line-by-line OCR data for the image.
    pub async fn lines_json(&self) -> Result<Vec<Value>> {
        tracing::info!(target: TRACING_TARGET_IMAGE, "Getting line-by-line OCR data");

        let options = ImageOptions {
            include_line_data: Some(true),
            ..self.options.clone()
        };
        let mut result = self.process(&options).await?;

        match result.get_mut("line_data").map(Value::take) {
            Some(Value::Array(lines)) => Ok(lines),
            _ => Err(Error::invalid_response("response has no line_data array")),
        }
    }

    /// Recognized content as Mathpix Markdown.
    pub async fn mmd(&self) -> Result<String> {
        tracing::info!(
            target: TRACING_TARGET_IMAGE,
            "Getting Mathpix Markdown (MMD) representation"
        );

        let result = self.results().await?;
        result
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_response("response has no text field"))
    }

    async fn process(&self, options: &ImageOptions) -> Result<Value> {
        tracing::info!(
            target: TRACING_TARGET_IMAGE,
            source = %self.source,
            "Processing image"
        );

        let endpoint = self.client.endpoint(&["v3", "text"])?;
        let result = match &self.source {
            DocumentSource::Path(path) => {
                let options_json = serde_json::to_string(options)?;
                self.client
                    .post_file(endpoint, path, options_json)
                    .await?
            }
            DocumentSource::Url(url) => {
                let mut body = serde_json::to_value(options)?;
                if let Value::Object(map) = &mut body {
                    map.insert("src".to_string(), Value::String(url.to_string()));
                }
                self.client.post_json(endpoint, &body).await?
            }
        };

        tracing::info!(target: TRACING_TARGET_IMAGE, "OCR processing successful");
        Ok(result)
    }
}
