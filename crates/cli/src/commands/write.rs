use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokio::io::AsyncReadExt;
use tracing::info;

use pkgstore_core::Backend;

#[derive(Args)]
pub struct WriteArgs {
    /// Storage path to overwrite
    path: PathBuf,
}

pub async fn run(backend: &Backend, args: WriteArgs) -> Result<()> {
    let mut data = Vec::new();
    tokio::io::stdin().read_to_end(&mut data).await?;
    backend.write_bytes(&args.path, &data).await?;
    info!(path = %args.path.display(), bytes = data.len(), "File written");
    Ok(())
}
