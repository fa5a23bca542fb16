use anyhow::Result;

use pkgstore_core::Backend;

pub async fn run(backend: &Backend) -> Result<()> {
    println!("Backend: {}", backend.describe());
    println!("Root:    {}", backend.root().display());
    Ok(())
}
