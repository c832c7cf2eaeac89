//! Prelude for the mpx-client crate
//!
//! This module re-exports the types most callers need to submit documents
//! and collect their results with a single import.

pub use crate::client::{DocumentSource, MpxClient, MpxConfig, MpxCredentials};
pub use crate::conversion::{Conversion, ConversionFormats};
pub use crate::error::{Error, Result};
pub use crate::file_batch::{FileBatch, FilesPage};
pub use crate::image::{Image, ImageOptions};
pub use crate::pdf::{Pdf, PdfOptions};
pub use crate::status::ProcessingStatus;
