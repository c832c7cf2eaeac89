//! Subcommands, one module per Mathpix resource.

mod batch;
mod convert;
mod image;
mod pdf;

use std::path::PathBuf;

use clap::{Args, Subcommand};
use mpx_client::{ConversionFormats, DocumentSource, MpxClient};

pub use self::batch::BatchArgs;
pub use self::convert::ConvertArgs;
pub use self::image::ImageArgs;
pub use self::pdf::PdfArgs;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run OCR on an image and print the result.
    Image(ImageArgs),
    /// Process a PDF and download its outputs.
    Pdf(PdfArgs),
    /// Convert Mathpix Markdown to other formats.
    Convert(ConvertArgs),
    /// Upload a directory of PDFs as one file batch.
    Batch(BatchArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Pdf(_) => "pdf",
            Self::Convert(_) => "convert",
            Self::Batch(_) => "batch",
        }
    }

    pub async fn execute(self, client: &MpxClient) -> anyhow::Result<()> {
        match self {
            Self::Image(args) => args.execute(client).await,
            Self::Pdf(args) => args.execute(client).await,
            Self::Convert(args) => args.execute(client).await,
            Self::Batch(args) => args.execute(client).await,
        }
    }
}

/// A local file or a remote URL; exactly one must be given.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Local file to upload.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Publicly reachable URL of the document.
    #[arg(long)]
    pub url: Option<String>,
}

impl SourceArgs {
    pub fn source(&self) -> mpx_client::Result<DocumentSource> {
        DocumentSource::from_parts(self.file.clone(), self.url.as_deref())
    }
}

fn conversion_formats(formats: &[String]) -> Option<ConversionFormats> {
    if formats.is_empty() {
        return None;
    }
    Some(formats.iter().cloned().collect())
}
