//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use tempdir_retention::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, TdrError};

// Platform
pub use crate::platform::pal::{StdTempFs, TempFs};

// Logging
pub use crate::logger::jsonl::ActivityLogger;

// Retention
pub use crate::retention::manager::{ScopeOptions, ScopedDir, TempDirManager};
pub use crate::retention::queue::{PurgeReport, RetentionKey};
pub use crate::retention::registry::RetentionRegistry;
