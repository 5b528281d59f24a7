//! Retention queues: oldest-first lists of directories awaiting possible
//! deletion, one per `(root, prefix, suffix)` key.
//!
//! Every mutation happens under the queue's own lock. An exit appends and
//! dequeues the excess in one critical section, then deletes the dequeued
//! trees after the lock is released. Once an entry leaves the queue it is
//! untracked whether or not its deletion succeeds.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::errors::{Result, TdrError};
use crate::core::paths::name_matches;
use crate::platform::pal::TempFs;

/// Identifies one independent retention queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RetentionKey {
    root: PathBuf,
    prefix: String,
    suffix: String,
}

impl RetentionKey {
    /// `root` is expected to be already normalized (see [`crate::core::paths::resolve_root`]).
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for RetentionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.root.display(), self.prefix, self.suffix)
    }
}

/// What happens to the queue tail on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgePolicy {
    /// Queue only; nothing is deleted.
    KeepAll,
    /// Delete oldest entries until at most this many remain.
    KeepNewest(usize),
}

/// A queued directory whose deletion failed. It is no longer tracked.
#[derive(Debug)]
pub struct PurgeFailure {
    pub path: PathBuf,
    pub error: TdrError,
}

/// Outcome of one scope exit.
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Directory appended by this exit.
    pub queued: PathBuf,
    /// Directories deleted, oldest first.
    pub purged: Vec<PathBuf>,
    pub failed: Vec<PurgeFailure>,
    /// Queue length once this exit finished dequeuing.
    pub remaining: usize,
}

impl PurgeReport {
    /// Number of entries that left the queue, deleted or not.
    pub fn dequeued(&self) -> usize {
        self.purged.len() + self.failed.len()
    }
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<PathBuf>,
    /// Set by the first construction that completes for this key.
    initialized: bool,
}

/// Oldest-first list of directory paths for one key, shared by every manager
/// built with that key.
#[derive(Debug, Default)]
pub struct RetentionQueue {
    state: Mutex<QueueState>,
}

impl RetentionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.state.lock().entries.iter().cloned().collect()
    }

    /// Whether some construction has already claimed this queue.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Claim the queue on first construction, optionally seeding it.
    ///
    /// Only the first successful call has any effect. When `seed` is given it
    /// runs under the queue lock, so racing first constructions seed once.
    /// A failing seed leaves the queue unclaimed and propagates the error.
    /// Returns the number of seeded entries.
    pub fn initialize<F>(&self, seed: Option<F>) -> Result<usize>
    where
        F: FnOnce() -> Result<Vec<PathBuf>>,
    {
        let mut state = self.state.lock();
        if state.initialized {
            return Ok(0);
        }
        let mut seeded = 0;
        if let Some(seed) = seed {
            let historic = seed()?;
            seeded = historic.len();
            state.entries.extend(historic);
        }
        state.initialized = true;
        Ok(seeded)
    }

    /// Append `path` and, under `policy`, delete the oldest excess entries.
    ///
    /// Deletion failures are recorded in the report and never returned as
    /// errors; the failed entry stays dequeued and the purge moves on.
    pub fn release(&self, path: PathBuf, policy: PurgePolicy, fs: &dyn TempFs) -> PurgeReport {
        let (expired, remaining) = {
            let mut state = self.state.lock();
            state.entries.push_back(path.clone());
            let mut expired = Vec::new();
            if let PurgePolicy::KeepNewest(keep_max) = policy {
                while state.entries.len() > keep_max {
                    if let Some(head) = state.entries.pop_front() {
                        expired.push(head);
                    }
                }
            }
            (expired, state.entries.len())
        };

        let mut report = PurgeReport {
            queued: path,
            remaining,
            ..PurgeReport::default()
        };
        for head in expired {
            match fs.remove_tree(&head) {
                Ok(()) => report.purged.push(head),
                Err(error) => report.failed.push(PurgeFailure { path: head, error }),
            }
        }
        report
    }
}

/// Children of `root` named `<prefix>…<suffix>`, oldest first by creation time.
///
/// Entries that vanish between listing and stat are skipped; any other
/// filesystem failure propagates.
pub fn list_historic(
    fs: &dyn TempFs,
    root: &Path,
    prefix: &str,
    suffix: &str,
) -> Result<Vec<PathBuf>> {
    let mut stamped: Vec<(SystemTime, PathBuf)> = Vec::new();
    for child in fs.list_dir(root)? {
        let Some(name) = child.file_name() else {
            continue;
        };
        if !name_matches(name, prefix, suffix) {
            continue;
        }
        match fs.created_at(&child) {
            Ok(created) => stamped.push((created, child)),
            Err(TdrError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    stamped.sort();
    Ok(stamped.into_iter().map(|(_, path)| path).collect())
}
