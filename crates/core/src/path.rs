//! Path kind checks and root-relative resolution.
//!
//! Callers address stored files with relative keys; only backends turn them
//! into absolute filesystem paths. The checks here assert the kind of a path
//! handed in by a caller and never rewrite it.

use std::path::{Component, Path, PathBuf};

use crate::error::{PathKind, Result, StorageError};

pub fn assert_absolute(path: &Path) -> Result<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(StorageError::InvalidPathKind {
            path: path.to_path_buf(),
            expected: PathKind::Absolute,
        })
    }
}

pub fn assert_relative(path: &Path) -> Result<()> {
    // `has_root` also rejects `\foo` on Windows, which is not absolute there.
    if path.is_absolute() || path.has_root() {
        Err(StorageError::InvalidPathKind {
            path: path.to_path_buf(),
            expected: PathKind::Relative,
        })
    } else {
        Ok(())
    }
}

/// Lexically normalize a relative path. `..` never climbs above the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.iter().collect()
}

/// Object key for a relative path: normalized components joined with `/`.
pub fn object_key(path: &Path) -> String {
    normalize(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
