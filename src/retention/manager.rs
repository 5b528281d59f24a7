//! Scoped temporary directory manager.
//!
//! `enter` creates `<root>/<prefix><random><suffix>`. Dropping the returned
//! [`ScopedDir`] (or calling [`ScopedDir::exit`]) queues the directory under
//! its `(root, prefix, suffix)` key instead of deleting it, then deletes the
//! oldest queued directories beyond `keep_max`. The last few runs stay on disk
//! for inspection while disk use stays bounded across repeated invocations.
//!
//! ```rust,no_run
//! use tempdir_retention::retention::manager::{ScopeOptions, TempDirManager};
//!
//! let mut manager = TempDirManager::new(ScopeOptions::default().keep_max(5))?;
//! manager.scope(|dir| std::fs::write(dir.join("out.log"), b"debug output"))??;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::{Config, DEFAULT_KEEP_MAX, DEFAULT_PREFIX, DEFAULT_SUFFIX};
use crate::core::errors::Result;
use crate::core::paths::{resolve_root, working_root};
use crate::logger::jsonl::{ActivityLogger, EventType, LogEntry, Severity};
use crate::platform::pal::{TempFs, std_fs};

use super::queue::{PurgePolicy, PurgeReport, RetentionKey, RetentionQueue, list_historic};
use super::registry::RetentionRegistry;

/// Construction options for [`TempDirManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeOptions {
    /// Trailing component of generated names; also filters the historic scan.
    pub suffix: String,
    /// Leading component of generated names; also filters the historic scan.
    pub prefix: String,
    /// Parent directory. `None` selects the platform temp root.
    pub root: Option<PathBuf>,
    /// Whether exits actually delete expired directories. Also enables the
    /// historic scan on first use of a key.
    pub delete_historic: bool,
    /// Directories retained under this key before the oldest are purged.
    pub keep_max: usize,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            root: None,
            delete_historic: true,
            keep_max: DEFAULT_KEEP_MAX,
        }
    }
}

impl ScopeOptions {
    /// Options from the `[retention]` config section.
    pub fn from_config(cfg: &Config) -> Self {
        let r = &cfg.retention;
        Self {
            suffix: r.suffix.clone(),
            prefix: r.prefix.clone(),
            root: r.root.clone(),
            delete_historic: r.delete_historic,
            keep_max: r.keep_max,
        }
    }

    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub fn delete_historic(mut self, delete_historic: bool) -> Self {
        self.delete_historic = delete_historic;
        self
    }

    #[must_use]
    pub fn keep_max(mut self, keep_max: usize) -> Self {
        self.keep_max = keep_max;
        self
    }

    fn policy(&self) -> PurgePolicy {
        if self.delete_historic {
            PurgePolicy::KeepNewest(self.keep_max)
        } else {
            PurgePolicy::KeepAll
        }
    }
}

/// Handle into a shared retention queue that hands out scoped directories.
///
/// Managers built with the same `(root, prefix, suffix)` share one queue, even
/// with different `keep_max` values; each exit enforces the exiting manager's
/// limit.
#[derive(Debug)]
pub struct TempDirManager {
    options: ScopeOptions,
    root: PathBuf,
    key: RetentionKey,
    queue: Arc<RetentionQueue>,
    fs: Arc<dyn TempFs>,
    logger: Option<ActivityLogger>,
    owned: Option<PathBuf>,
}

impl TempDirManager {
    /// Build against the global registry and the real filesystem.
    ///
    /// On the first construction for a key with `delete_historic` set, the
    /// queue is seeded from matching directories already under `root`.
    /// Fails if that scan cannot list `root`.
    pub fn new(options: ScopeOptions) -> Result<Self> {
        Self::with_parts(options, RetentionRegistry::global(), std_fs(), None)
    }

    /// [`TempDirManager::new`] with default options.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ScopeOptions::default())
    }

    /// Options and activity log from a loaded [`Config`].
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::with_parts(
            ScopeOptions::from_config(cfg),
            RetentionRegistry::global(),
            std_fs(),
            ActivityLogger::from_logging(&cfg.logging),
        )
    }

    /// Full control over registry, filesystem and logging.
    pub fn with_parts(
        options: ScopeOptions,
        registry: &RetentionRegistry,
        fs: Arc<dyn TempFs>,
        logger: Option<ActivityLogger>,
    ) -> Result<Self> {
        // Symlinked spellings of one root share a key; directories are still
        // created under the caller's spelling.
        let root = working_root(options.root.as_deref());
        let key = RetentionKey::new(
            resolve_root(options.root.as_deref()),
            options.prefix.clone(),
            options.suffix.clone(),
        );
        let queue = registry.resolve(&key);

        let seed = options
            .delete_historic
            .then(|| || list_historic(fs.as_ref(), &root, key.prefix(), key.suffix()));
        let seeded = queue.initialize(seed)?;

        let manager = Self {
            options,
            root,
            key,
            queue,
            fs,
            logger,
            owned: None,
        };
        if seeded > 0 {
            manager.log(
                LogEntry::new(EventType::HistoricSeeded, Severity::Info)
                    .with_path(&manager.root)
                    .with_queue_len(seeded),
            );
        }
        Ok(manager)
    }

    /// Create a fresh directory and return a guard owning it.
    ///
    /// The scope ends when the guard is dropped, including on early return
    /// and panic unwinding.
    pub fn enter(&mut self) -> Result<ScopedDir<'_>> {
        // A leaked guard never ran its exit; queue that directory now.
        if let Some(stale) = self.owned.take() {
            self.release(stale);
        }

        let path = self
            .fs
            .create_unique_dir(&self.root, self.key.prefix(), self.key.suffix())?;
        self.log(LogEntry::new(EventType::DirCreated, Severity::Info).with_path(&path));
        self.owned = Some(path.clone());
        Ok(ScopedDir {
            manager: self,
            path,
        })
    }

    /// Run `body` inside a scope and return its value.
    ///
    /// A body that returns `Err` or panics is never masked by cleanup.
    pub fn scope<T, F>(&mut self, body: F) -> Result<T>
    where
        F: FnOnce(&Path) -> T,
    {
        let dir = self.enter()?;
        let out = body(dir.path());
        drop(dir);
        Ok(out)
    }

    /// Options as given at construction (root not normalized).
    pub fn options(&self) -> &ScopeOptions {
        &self.options
    }

    /// Key of the shared queue this manager feeds.
    pub fn key(&self) -> &RetentionKey {
        &self.key
    }

    /// Absolute parent directory of every scope, symlinks kept.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the active scope, if any.
    pub fn owned_path(&self) -> Option<&Path> {
        self.owned.as_deref()
    }

    /// Snapshot of the shared queue, oldest first.
    pub fn queued(&self) -> Vec<PathBuf> {
        self.queue.snapshot()
    }

    /// Current length of the shared queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn exit(&mut self) -> Option<PurgeReport> {
        let path = self.owned.take()?;
        Some(self.release(path))
    }

    fn release(&self, path: PathBuf) -> PurgeReport {
        let report = self.queue.release(path, self.options.policy(), self.fs.as_ref());
        let key = self.key.to_string();

        self.log(
            LogEntry::new(EventType::DirQueued, Severity::Info)
                .with_path(&report.queued)
                .with_key(key.clone())
                .with_queue_len(report.remaining),
        );
        for purged in &report.purged {
            self.log(
                LogEntry::new(EventType::DirPurged, Severity::Info)
                    .with_path(purged)
                    .with_key(key.clone()),
            );
        }
        for failure in &report.failed {
            if self.logger.is_none() {
                eprintln!(
                    "[TDR-PURGE] failed to delete {}: {}",
                    failure.path.display(),
                    failure.error
                );
            }
            self.log(
                LogEntry::new(EventType::PurgeFailed, Severity::Warning)
                    .with_path(&failure.path)
                    .with_key(key.clone())
                    .with_error(&failure.error),
            );
        }
        report
    }

    fn log(&self, entry: LogEntry) {
        if let Some(logger) = &self.logger {
            logger.log(&entry);
        }
    }
}

/// Guard for an active scope. Derefs to the directory path.
#[derive(Debug)]
pub struct ScopedDir<'a> {
    manager: &'a mut TempDirManager,
    path: PathBuf,
}

impl ScopedDir<'_> {
    /// Absolute path of the scoped directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// End the scope now and report what was purged.
    pub fn exit(mut self) -> PurgeReport {
        self.manager.exit().unwrap_or_default()
    }
}

impl Deref for ScopedDir<'_> {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for ScopedDir<'_> {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedDir<'_> {
    fn drop(&mut self) {
        // No-op after an explicit `exit`.
        let _ = self.manager.exit();
    }
}
