//! Scoped temporary directories with delayed, bounded cleanup.
//!
//! - [`queue`]: per-key retention queues and the purge policy
//! - [`registry`]: the process-wide key → queue map
//! - [`manager`]: the scoped-resource API callers use

pub mod manager;
pub mod queue;
pub mod registry;

#[cfg(test)]
mod test_properties;
