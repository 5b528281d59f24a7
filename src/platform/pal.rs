//! Filesystem abstraction for scoped directories: a real implementation backed
//! by `tempfile` + `std::fs`, and a fault-injecting mock for tests.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::core::errors::{Result, TdrError};

/// Filesystem operations the retention manager depends on.
///
/// Unique naming and recursive deletion are delegated here; the manager never
/// reimplements either.
pub trait TempFs: Send + Sync + fmt::Debug {
    /// Create `<root>/<prefix><random><suffix>` with owner-only access and return it.
    fn create_unique_dir(&self, root: &Path, prefix: &str, suffix: &str) -> Result<PathBuf>;
    /// Immediate children of `root`, as full paths.
    fn list_dir(&self, root: &Path) -> Result<Vec<PathBuf>>;
    /// Creation time, or modification time where the platform lacks it.
    fn created_at(&self, path: &Path) -> Result<SystemTime>;
    /// Recursively delete a directory tree.
    fn remove_tree(&self, path: &Path) -> Result<()>;
}

/// Real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdTempFs;

impl TempFs for StdTempFs {
    fn create_unique_dir(&self, root: &Path, prefix: &str, suffix: &str) -> Result<PathBuf> {
        // Builder creates the directory 0o700 on unix.
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempdir_in(root)
            .map_err(|source| TdrError::io(root, source))?;
        Ok(dir.keep())
    }

    fn list_dir(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(root).map_err(|source| TdrError::io(root, source))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| TdrError::io(root, source))?;
            children.push(entry.path());
        }
        Ok(children)
    }

    fn created_at(&self, path: &Path) -> Result<SystemTime> {
        let meta = fs::symlink_metadata(path).map_err(|source| TdrError::io(path, source))?;
        meta.created()
            .or_else(|_| meta.modified())
            .map_err(|source| TdrError::io(path, source))
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).map_err(|source| TdrError::io(path, source))
    }
}

/// Shared handle to the real filesystem.
pub fn std_fs() -> Arc<dyn TempFs> {
    Arc::new(StdTempFs)
}

/// Real filesystem with injectable failures, for deterministic tests.
///
/// Every call is forwarded to [`StdTempFs`] unless a failure was armed for it.
/// Removal attempts are recorded in call order.
#[derive(Debug, Default)]
pub struct MockTempFs {
    inner: StdTempFs,
    failing_removals: Mutex<HashSet<PathBuf>>,
    fail_listing: Mutex<bool>,
    fail_create: Mutex<bool>,
    removal_attempts: Mutex<Vec<PathBuf>>,
}

impl MockTempFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `remove_tree(path)` fail with `PermissionDenied` and leave the tree alone.
    pub fn fail_removal_of(&self, path: impl Into<PathBuf>) {
        self.failing_removals.lock().insert(path.into());
    }

    pub fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.lock() = fail;
    }

    pub fn set_fail_create(&self, fail: bool) {
        *self.fail_create.lock() = fail;
    }

    /// Paths passed to `remove_tree`, in order, including failed attempts.
    pub fn removal_attempts(&self) -> Vec<PathBuf> {
        self.removal_attempts.lock().clone()
    }
}

impl TempFs for MockTempFs {
    fn create_unique_dir(&self, root: &Path, prefix: &str, suffix: &str) -> Result<PathBuf> {
        if *self.fail_create.lock() {
            return Err(TdrError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::StorageFull, "injected create failure"),
            ));
        }
        self.inner.create_unique_dir(root, prefix, suffix)
    }

    fn list_dir(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if *self.fail_listing.lock() {
            return Err(TdrError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected list failure"),
            ));
        }
        self.inner.list_dir(root)
    }

    fn created_at(&self, path: &Path) -> Result<SystemTime> {
        self.inner.created_at(path)
    }

    fn remove_tree(&self, path: &Path) -> Result<()> {
        self.removal_attempts.lock().push(path.to_path_buf());
        if self.failing_removals.lock().contains(path) {
            return Err(TdrError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "injected removal failure",
                ),
            ));
        }
        self.inner.remove_tree(path)
    }
}
