use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use pkgstore_core::Backend;

#[derive(Args)]
pub struct RmArgs {
    /// Storage path to delete
    path: PathBuf,
}

pub async fn run(backend: &Backend, args: RmArgs) -> Result<()> {
    backend.delete_file(&args.path).await?;
    info!(path = %args.path.display(), "File deleted");
    Ok(())
}
