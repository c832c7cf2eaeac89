use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Args;
use mpx_client::{ConversionFormats, MpxClient};

use crate::TRACING_TARGET_COMMAND;

#[derive(Debug, Clone, Args)]
pub struct ConvertArgs {
    /// File containing Mathpix Markdown.
    #[arg(long, value_name = "FILE", conflicts_with = "mmd", required_unless_present = "mmd")]
    pub input: Option<PathBuf>,

    /// Mathpix Markdown text.
    #[arg(long, value_name = "TEXT")]
    pub mmd: Option<String>,

    /// Format to convert to (repeatable).
    #[arg(long, value_name = "FMT", required = true)]
    pub format: Vec<String>,

    /// Directory outputs are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Seconds to wait for the conversion to complete.
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    pub wait: u64,
}

impl ConvertArgs {
    async fn read_mmd(&self) -> anyhow::Result<String> {
        match (&self.input, &self.mmd) {
            (Some(path), None) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display())),
            (None, Some(mmd)) => Ok(mmd.clone()),
            _ => bail!("exactly one of --input or --mmd is required"),
        }
    }

    pub async fn execute(self, client: &MpxClient) -> anyhow::Result<()> {
        let mmd = self.read_mmd().await?;
        let formats: ConversionFormats = self.format.iter().cloned().collect();

        let conversion = client.conversion_new(&mmd, formats).await?;
        println!("{}", conversion.conversion_id());

        if !conversion
            .wait_until_complete(Duration::from_secs(self.wait))
            .await?
        {
            bail!(
                "conversion {} failed or did not complete within {}s",
                conversion.conversion_id(),
                self.wait
            );
        }

        for format in &self.format {
            let path = conversion
                .download_output_to_local_path(format, &self.output)
                .await?;
            tracing::info!(
                target: TRACING_TARGET_COMMAND,
                conversion_id = conversion.conversion_id(),
                format = format.as_str(),
                path = %path.display(),
                "Saved conversion output"
            );
            println!("{}", path.display());
        }

        Ok(())
    }
}
