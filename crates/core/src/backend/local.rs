use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};
use crate::path::assert_absolute;

use super::{absolute_root, copy_into, create_parent, exists, remove_if_exists, resolve_under};

/// Files stored directly under a root directory.
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let root = absolute_root(path)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
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
            return Err(StorageError::NotFound(file.to_path_buf()));
        }
        Ok(f(full).await)
    }

    pub async fn write_file<F, Fut, T>(&self, file: &Path, f: F) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = T>,
    {
        let full = self.resolve(file)?;
        create_parent(&full).await?;
        Ok(f(full).await)
    }

    pub async fn import_file(&self, src: &Path, dst: &Path, move_src: bool) -> Result<()> {
        assert_absolute(src)?;
        let full = self.resolve(dst)?;
        let same = copy_into(src, &full).await?;
        if move_src && !same {
            remove_if_exists(src).await?;
        }
        Ok(())
    }

    pub async fn delete_file(&self, file: &Path) -> Result<()> {
        let full = self.resolve(file)?;
        remove_if_exists(&full).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::error::PathKind;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn write_then_read_sees_same_path_and_content() {
        let (dir, backend) = backend();
        let key = Path::new("a/b.txt");

        let written = backend
            .write_file(key, |path| async move {
                tokio::fs::write(&path, b"hello").await.unwrap();
                path
            })
            .await
            .unwrap();
        assert_eq!(written, dir.path().join("a/b.txt"));
        assert!(dir.path().join("a").is_dir());

        let (seen, data) = backend
            .read_file(key, |path| async move {
                let data = tokio::fs::read(&path).await.unwrap();
                (path, data)
            })
            .await
            .unwrap();
        assert_eq!(seen, written);
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn read_missing_never_runs_continuation() {
        let (_dir, backend) = backend();
        let called = AtomicBool::new(false);

        let err = backend
            .read_file(Path::new("nope/missing.zip"), |_| async {
                called.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn wrong_path_kinds_are_rejected_before_io() {
        let (dir, backend) = backend();

        let err = backend
            .write_file(Path::new("/abs/file.txt"), |_| async {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidPathKind {
                expected: PathKind::Relative,
                ..
            }
        ));
        assert!(!dir.path().join("abs").exists());

        let src = dir.path().join("src.txt");
        std::fs::write(&src, b"x").unwrap();
        let err = backend
            .import_file(Path::new("relative/src.txt"), Path::new("dst.txt"), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidPathKind {
                expected: PathKind::Absolute,
                ..
            }
        ));
        let err = backend
            .import_file(&src, &dir.path().join("dst.txt"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPathKind { .. }));
        assert!(src.exists());
        assert!(!dir.path().join("dst.txt").exists());

        assert!(backend.delete_file(&src).await.is_err());
        assert!(src.exists());
    }

    #[tokio::test]
    async fn import_copy_and_move() {
        let (_dir, backend) = backend();
        let outside = tempfile::tempdir().unwrap();

        let src = outside.path().join("upload.zip");
        std::fs::write(&src, b"v1").unwrap();
        backend
            .import_file(&src, Path::new("files/1.0/lib.zip"), false)
            .await
            .unwrap();
        assert!(src.exists());

        std::fs::write(&src, b"v2").unwrap();
        backend
            .import_file(&src, Path::new("files/1.0/lib.zip"), true)
            .await
            .unwrap();
        assert!(!src.exists());

        let stored = backend.resolve(Path::new("files/1.0/lib.zip")).unwrap();
        assert_eq!(std::fs::read(stored).unwrap(), b"v2");
    }

    #[tokio::test]
    async fn import_onto_itself_keeps_source() {
        let (_dir, backend) = backend();
        let key = Path::new("files/same.zip");
        let stored = backend.resolve(key).unwrap();
        std::fs::create_dir_all(stored.parent().unwrap()).unwrap();
        std::fs::write(&stored, b"same").unwrap();

        backend.import_file(&stored, key, true).await.unwrap();
        assert_eq!(std::fs::read(&stored).unwrap(), b"same");
    }

    #[tokio::test]
    async fn import_missing_source_is_not_found() {
        let (dir, backend) = backend();
        let err = backend
            .import_file(&dir.path().join("ghost.zip"), Path::new("deep/dir/x.zip"), false)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("deep").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn import_through_hard_link_keeps_content() {
        let (dir, backend) = backend();
        let key = Path::new("files/lib.zip");
        let stored = backend.resolve(key).unwrap();
        std::fs::create_dir_all(stored.parent().unwrap()).unwrap();
        std::fs::write(&stored, b"payload").unwrap();
        let link = dir.path().join("link.zip");
        std::fs::hard_link(&stored, &link).unwrap();

        backend.import_file(&link, key, true).await.unwrap();
        assert_eq!(std::fs::read(&stored).unwrap(), b"payload");
        assert!(link.exists());
    }

    #[tokio::test]
    async fn keys_naming_the_root_never_reach_the_filesystem() {
        let (dir, backend) = backend();
        let called = AtomicBool::new(false);

        for key in ["", ".", "..", "a/.."] {
            let err = backend
                .read_file(Path::new(key), |_| async {
                    called.store(true, Ordering::SeqCst);
                })
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::EmptyKey(_)), "{key:?}");

            let err = backend.delete_file(Path::new(key)).await.unwrap_err();
            assert!(matches!(err, StorageError::EmptyKey(_)), "{key:?}");
        }
        assert!(!called.load(Ordering::SeqCst));
        assert!(dir.path().is_dir());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, backend) = backend();
        let key = Path::new("files/gone.zip");
        backend
            .write_file(key, |path| async move { std::fs::write(path, b"x").unwrap() })
            .await
            .unwrap();

        backend.delete_file(key).await.unwrap();
        backend.delete_file(key).await.unwrap();
        backend
            .delete_file(Path::new("never/existed.zip"))
            .await
            .unwrap();
        assert!(!backend.resolve(key).unwrap().exists());
    }
}
