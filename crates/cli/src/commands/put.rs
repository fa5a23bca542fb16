use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use pkgstore_core::Backend;

#[derive(Args)]
pub struct PutArgs {
    /// Local file to import
    src: PathBuf,

    /// Storage path to import into
    dst: PathBuf,

    /// Remove the source file after a successful import
    #[arg(long = "move")]
    move_src: bool,
}

pub async fn run(backend: &Backend, args: PutArgs) -> Result<()> {
    let src = std::path::absolute(&args.src)
        .with_context(|| format!("invalid source path: {}", args.src.display()))?;
    backend.import_file(&src, &args.dst, args.move_src).await?;
    info!(
        src = %src.display(),
        dst = %args.dst.display(),
        moved = args.move_src,
        "File imported"
    );
    Ok(())
}
