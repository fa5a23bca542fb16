use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::AsyncWriteExt;
use tracing::info;

use pkgstore_core::Backend;

#[derive(Args)]
pub struct GetArgs {
    /// Storage path, e.g. files/3.0/library.zip
    path: PathBuf,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(backend: &Backend, args: GetArgs) -> Result<()> {
    match args.output {
        Some(output) => {
            let bytes = backend
                .read_file(&args.path, |src| {
                    let output = output.clone();
                    async move { tokio::fs::copy(&src, &output).await }
                })
                .await?
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %args.path.display(), bytes, "File retrieved");
        }
        None => {
            let data = backend.read_bytes(&args.path).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
