use clap::Args;
use mpx_client::{ImageOptions, MpxClient};

use super::SourceArgs;
use crate::TRACING_TARGET_COMMAND;

#[derive(Debug, Clone, Args)]
pub struct ImageArgs {
    #[clap(flatten)]
    pub source: SourceArgs,

    /// Print line-by-line data as JSON instead of Mathpix Markdown.
    #[arg(long)]
    pub lines: bool,
}

impl ImageArgs {
    pub async fn execute(self, client: &MpxClient) -> anyhow::Result<()> {
        let image = client.image_new(self.source.source()?, ImageOptions::default())?;

        tracing::debug!(
            target: TRACING_TARGET_COMMAND,
            source = %image.source(),
            lines = self.lines,
            "Running image OCR"
        );

        if self.lines {
            let lines = image.lines_json().await?;
            println!("{}", serde_json::to_string_pretty(&lines)?);
        } else {
            println!("{}", image.mmd().await?);
        }

        Ok(())
    }
}
