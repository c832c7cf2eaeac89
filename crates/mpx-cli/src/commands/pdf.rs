use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Args;
use mpx_client::{MpxClient, PdfOptions};

use super::{SourceArgs, conversion_formats};
use crate::TRACING_TARGET_COMMAND;

#[derive(Debug, Clone, Args)]
pub struct PdfArgs {
    #[clap(flatten)]
    pub source: SourceArgs,

    /// Additional format to convert the PDF to (repeatable).
    #[arg(long, value_name = "FMT")]
    pub convert: Vec<String>,

    /// Output format to download once processing completes (repeatable).
    #[arg(long, value_name = "FMT")]
    pub download: Vec<String>,

    /// Directory downloads are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Seconds to wait for processing to complete.
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    pub wait: u64,
}

impl PdfArgs {
    pub async fn execute(self, client: &MpxClient) -> anyhow::Result<()> {
        let options = PdfOptions {
            conversion_formats: conversion_formats(&self.convert),
            ..Default::default()
        };
        let pdf = client.pdf_new(self.source.source()?, options).await?;
        println!("{}", pdf.pdf_id());

        if !pdf.wait_until_complete(Duration::from_secs(self.wait)).await? {
            bail!(
                "PDF {} failed or did not complete within {}s",
                pdf.pdf_id(),
                self.wait
            );
        }

        for format in &self.download {
            let path = pdf
                .download_output_to_local_path(format, &self.output)
                .await?;
            tracing::info!(
                target: TRACING_TARGET_COMMAND,
                pdf_id = pdf.pdf_id(),
                format = format.as_str(),
                path = %path.display(),
                "Saved PDF output"
            );
            println!("{}", path.display());
        }

        Ok(())
    }
}
