#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for client construction and configuration.
pub const TRACING_TARGET_CLIENT: &str = "mpx_client::client";

/// Tracing target for HTTP requests, responses and retries.
pub const TRACING_TARGET_HTTP: &str = "mpx_client::http";

/// Tracing target for image OCR requests.
pub const TRACING_TARGET_IMAGE: &str = "mpx_client::image";

/// Tracing target for PDF processing.
pub const TRACING_TARGET_PDF: &str = "mpx_client::pdf";

/// Tracing target for Mathpix Markdown conversions.
pub const TRACING_TARGET_CONVERSION: &str = "mpx_client::conversion";

/// Tracing target for file batches.
pub const TRACING_TARGET_FILE_BATCH: &str = "mpx_client::file_batch";

mod client;
pub mod conversion;
pub mod error;
pub mod file_batch;
pub mod image;
pub mod pdf;
#[doc(hidden)]
pub mod prelude;
pub mod status;

mod poll;
mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::client::{
    DocumentSource, ENV_API_URL, ENV_APP_ID, ENV_APP_KEY, MpxBuilder, MpxBuilderError, MpxClient,
    MpxConfig, MpxCredentials, PRODUCTION_API_URL,
};
pub use crate::conversion::{Conversion, ConversionFormats};
pub use crate::error::{Error, Result};
pub use crate::file_batch::{FileBatch, FilesPage};
pub use crate::image::{Image, ImageOptions, Region};
pub use crate::pdf::{Pdf, PdfOptions};
pub use crate::status::{
    ConversionStatus, FileBatchStatus, FormatStatus, PdfStatus, ProcessingStatus,
};
