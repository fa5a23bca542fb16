//! Storage backends.
//!
//! A [`Backend`] maps relative storage keys such as `files/3.0/library.zip`
//! onto files under its root directory. Both variants honour the same
//! contract so callers never need to know which one is active:
//!
//! - `read_file` guarantees the file exists while the continuation runs.
//! - `write_file` creates parent directories; the remote variant pushes the
//!   result to the object store before returning.
//! - `import_file` copies (or moves) an absolute source into storage.
//! - `delete_file` is idempotent.

pub mod local;
pub mod remote;

use std::fs::Metadata;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::{Selection, StorageConfig};
use crate::error::{Result, StorageError};
use crate::store::s3::S3Store;

pub use local::LocalBackend;
pub use remote::CachedRemoteBackend;

pub enum Backend {
    Local(LocalBackend),
    CachedRemote(CachedRemoteBackend),
}

impl Backend {
    /// Build the backend chosen by `config`. Unmounted remote storage and
    /// plain local storage are rooted at `working_dir`.
    pub fn from_config(config: &StorageConfig, working_dir: &Path) -> Result<Self> {
        let backend = match config.selection() {
            Selection::CachedRemote {
                bucket,
                region,
                endpoint,
            } => {
                let store = S3Store::new(
                    &region,
                    endpoint.as_deref(),
                    config.access_key.as_deref(),
                    config.secret_key.as_deref(),
                );
                Backend::CachedRemote(CachedRemoteBackend::new(
                    working_dir,
                    bucket,
                    Arc::new(store),
                    config.transfer_timeout(),
                )?)
            }
            Selection::Mounted(mount) => {
                info!(mount = %mount.display(), "Bucket is mounted locally, skipping S3 client");
                Backend::Local(LocalBackend::new(mount)?)
            }
            Selection::Local => Backend::Local(LocalBackend::new(working_dir)?),
        };
        info!(backend = %backend.describe(), "Storage backend selected");
        Ok(backend)
    }

    pub fn root(&self) -> &Path {
        match self {
            Backend::Local(b) => b.root(),
            Backend::CachedRemote(b) => b.root(),
        }
    }

    pub fn resolve(&self, file: &Path) -> Result<PathBuf> {
        match self {
            Backend::Local(b) => b.resolve(file),
            Backend::CachedRemote(b) => b.resolve(file),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Backend::Local(b) => format!("local filesystem at {}", b.root().display()),
            Backend::CachedRemote(b) => format!(
                "local cache at {} backed by bucket {}",
                b.root().display(),
                b.bucket()
            ),
        }
    }

    pub async fn read_file<F, Fut, T>(&self, file: &Path, f: F) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = T>,
    {
        match self {
            Backend::Local(b) => b.read_file(file, f).await,
            Backend::CachedRemote(b) => b.read_file(file, f).await,
        }
    }

    pub async fn write_file<F, Fut, T>(&self, file: &Path, f: F) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = T>,
    {
        match self {
            Backend::Local(b) => b.write_file(file, f).await,
            Backend::CachedRemote(b) => b.write_file(file, f).await,
        }
    }

    pub async fn import_file(&self, src: &Path, dst: &Path, move_src: bool) -> Result<()> {
        match self {
            Backend::Local(b) => b.import_file(src, dst, move_src).await,
            Backend::CachedRemote(b) => b.import_file(src, dst, move_src).await,
        }
    }

    pub async fn delete_file(&self, file: &Path) -> Result<()> {
        match self {
            Backend::Local(b) => b.delete_file(file).await,
            Backend::CachedRemote(b) => b.delete_file(file).await,
        }
    }

    /// Read the whole content of a stored file.
    pub async fn read_bytes(&self, file: &Path) -> Result<Vec<u8>> {
        self.read_file(file, |path| async move {
            tokio::fs::read(&path)
                .await
                .map_err(|e| StorageError::io(&path, e))
        })
        .await?
    }

    /// Replace the content of a stored file.
    pub async fn write_bytes(&self, file: &Path, data: &[u8]) -> Result<()> {
        self.write_file(file, |path| async move {
            tokio::fs::write(&path, data)
                .await
                .map_err(|e| StorageError::io(&path, e))
        })
        .await?
    }
}

/// Resolve a relative key under `root`. Keys that normalize to nothing
/// (`""`, `"."`, `"a/.."`) would name the root itself and are rejected.
pub(crate) fn resolve_under(root: &Path, file: &Path) -> Result<PathBuf> {
    crate::path::assert_relative(file)?;
    let normalized = crate::path::normalize(file);
    if normalized.as_os_str().is_empty() {
        return Err(StorageError::EmptyKey(file.to_path_buf()));
    }
    Ok(root.join(normalized))
}

pub(crate) fn absolute_root(root: impl AsRef<Path>) -> Result<PathBuf> {
    let root = root.as_ref();
    std::path::absolute(root).map_err(|e| StorageError::io(root, e))
}

pub(crate) async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| StorageError::io(path, e))
}

pub(crate) async fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e))?;
    }
    Ok(())
}

/// Whether both paths name the same existing file, hard links included.
pub(crate) async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::metadata(a).await, tokio::fs::metadata(b).await) {
        (Ok(meta_a), Ok(meta_b)) => same_identity(a, &meta_a, b, &meta_b).await,
        _ => false,
    }
}

#[cfg(unix)]
async fn same_identity(_a: &Path, meta_a: &Metadata, _b: &Path, meta_b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino()
}

#[cfg(not(unix))]
async fn same_identity(a: &Path, _meta_a: &Metadata, b: &Path, _meta_b: &Metadata) -> bool {
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy `src` over `dst`. Returns `true` when both already name the same file
/// and nothing was copied.
pub(crate) async fn copy_into(src: &Path, dst: &Path) -> Result<bool> {
    if !exists(src).await? {
        return Err(StorageError::NotFound(src.to_path_buf()));
    }
    if same_file(src, dst).await {
        return Ok(true);
    }
    create_parent(dst).await?;
    tokio::fs::copy(src, dst)
        .await
        .map_err(|e| StorageError::io(dst, e))?;
    Ok(false)
}

pub(crate) async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}
