//! Local cache in front of a remote object store.
//!
//! The bucket is the source of truth; the root directory only caches it.
//! Reads make sure the object is cached before the continuation runs, and
//! mutations return only after the remote copy has been updated. A cached
//! file is trusted as-is: there is no staleness check.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, StorageError};
use crate::path::{assert_absolute, object_key};
use crate::store::{DEFAULT_CONTENT_TYPE, ObjectStore, TransferFailure};

use super::{absolute_root, copy_into, create_parent, exists, remove_if_exists, resolve_under};

pub struct CachedRemoteBackend {
    root: PathBuf,
    bucket: String,
    store: Arc<dyn ObjectStore>,
    transfer_timeout: Duration,
}

impl CachedRemoteBackend {
    pub fn new(
        root: impl AsRef<Path>,
        bucket: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        transfer_timeout: Duration,
    ) -> Result<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(StorageError::Config("bucket name is empty".into()));
        }
        Ok(Self {
            root: absolute_root(root)?,
            bucket,
            store,
            transfer_timeout,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn resolve(&self, file: &Path) -> Result<PathBuf> {
        resolve_under(&self.root, file)
    }

    pub async fn read_file<F, Fut, T>(&self, file: &Path, f: F) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = T>,
    {
        let full = self.resolve(file)?;
        if !exists(&full).await? {
            self.download(file, &full).await?;
        }
        Ok(f(full).await)
    }

    /// Run `f` on the cached file, then upload the result.
    ///
    /// The file must already be cached. If the upload fails, whatever `f`
    /// did to the local copy stays in place.
    pub async fn write_file<F, Fut, T>(&self, file: &Path, f: F) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = T>,
    {
        let full = self.resolve(file)?;
        if !exists(&full).await? {
            return Err(StorageError::Precondition(format!(
                "{} is not present in the local cache",
                file.display()
            )));
        }
        let out = f(full.clone()).await;
        self.upload(&object_key(file), &full).await?;
        Ok(out)
    }

    pub async fn import_file(&self, src: &Path, dst: &Path, move_src: bool) -> Result<()> {
        assert_absolute(src)?;
        let full = self.resolve(dst)?;
        let same = copy_into(src, &full).await?;
        self.upload(&object_key(dst), &full).await?;
        if move_src && !same {
            remove_if_exists(src).await?;
        }
        Ok(())
    }

    pub async fn delete_file(&self, file: &Path) -> Result<()> {
        let full = self.resolve(file)?;
        remove_if_exists(&full).await?;

        let key = object_key(file);
        // A missing remote object is not an error.
        if let Err(e) = self.store.delete(&self.bucket, &key).await {
            debug!(bucket = %self.bucket, key = %key, error = %format!("{e:#}"), "remote delete ignored");
        }
        Ok(())
    }

    /// Download into a private temp file and rename it into place, so the
    /// cache entry only appears once the transfer has fully succeeded.
    async fn download(&self, file: &Path, full: &Path) -> Result<()> {
        let key = object_key(file);
        create_parent(full).await?;
        let partial = partial_path(full);
        debug!(bucket = %self.bucket, key = %key, "cache miss, downloading");

        let handle = self
            .store
            .download(&self.bucket, &key, &partial)
            .await
            .map_err(|e| transfer_error(&key, format!("{e:#}")))?;

        if let Err(failure) = handle.wait(self.transfer_timeout).await {
            remove_if_exists(&partial).await?;
            return match failure {
                TransferFailure::Missing => Err(StorageError::NotFound(file.to_path_buf())),
                other => Err(transfer_error(&key, other.to_string())),
            };
        }
        if !exists(&partial).await? {
            return Err(transfer_error(
                &key,
                "download reported success but the file is absent".into(),
            ));
        }
        tokio::fs::rename(&partial, full)
            .await
            .map_err(|e| StorageError::io(full, e))
    }

    async fn upload(&self, key: &str, full: &Path) -> Result<()> {
        debug!(bucket = %self.bucket, key = %key, "uploading");
        let handle = self
            .store
            .upload(&self.bucket, key, full, DEFAULT_CONTENT_TYPE)
            .await
            .map_err(|e| transfer_error(key, format!("{e:#}")))?;
        handle
            .wait(self.transfer_timeout)
            .await
            .map_err(|failure| transfer_error(key, failure.to_string()))
    }
}

fn partial_path(full: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let name = full
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    full.with_file_name(format!(
        ".{name}.{}.{}.part",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ))
}

fn transfer_error(key: &str, detail: String) -> StorageError {
    StorageError::Transfer {
        key: key.to_string(),
        detail,
    }
}
