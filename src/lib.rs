#![forbid(unsafe_code)]

//! tempdir_retention (tdr): scoped temporary directories that outlive their
//! scope just long enough to be useful.
//!
//! Each scope gets a fresh `<prefix><random><suffix>` directory. On exit the
//! directory is queued rather than deleted, and only the oldest directories
//! beyond `keep_max` for that `(root, prefix, suffix)` are removed. Leftovers
//! from earlier processes are picked up on first use of a key, so the limit
//! holds across runs.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use tempdir_retention::prelude::*;
//!
//! let mut manager = TempDirManager::new(ScopeOptions::default().suffix("MyTool"))?;
//! {
//!     let dir = manager.enter()?;
//!     std::fs::write(dir.join("trace.txt"), b"...")?;
//! } // queued here; the newest three stay on disk
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod platform;
pub mod retention;
