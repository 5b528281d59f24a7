//! Process-wide registry of retention queues.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use super::queue::{RetentionKey, RetentionQueue};

static GLOBAL: LazyLock<RetentionRegistry> = LazyLock::new(RetentionRegistry::new);

/// Thread-safe map from key to queue with lazy insert-if-absent.
///
/// Queues are never removed; they live as long as the registry.
#[derive(Debug, Default)]
pub struct RetentionRegistry {
    queues: Mutex<HashMap<RetentionKey, Arc<RetentionQueue>>>,
}

impl RetentionRegistry {
    /// An isolated registry. Most callers want [`RetentionRegistry::global`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every manager in this process.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// The queue for `key`, created empty if this is its first use.
    pub fn resolve(&self, key: &RetentionKey) -> Arc<RetentionQueue> {
        let mut queues = self.queues.lock();
        Arc::clone(
            queues
                .entry(key.clone())
                .or_insert_with(|| Arc::new(RetentionQueue::new())),
        )
    }

    /// The queue for `key` if one exists, without creating it.
    pub fn get(&self, key: &RetentionKey) -> Option<Arc<RetentionQueue>> {
        self.queues.lock().get(key).cloned()
    }

    /// Keys whose queue was claimed by a successful construction, sorted.
    ///
    /// A key whose historic scan failed stays registered but is not listed.
    pub fn keys(&self) -> Vec<RetentionKey> {
        let mut keys: Vec<RetentionKey> = self
            .queues
            .lock()
            .iter()
            .filter(|(_, queue)| queue.is_initialized())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.queues.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn same_key_shares_one_queue() {
        let registry = RetentionRegistry::new();
        let key = RetentionKey::new("/r", "tmp", "X");
        let a = registry.resolve(&key);
        let b = registry.resolve(&key);
        assert!(Arc::ptr_eq(&a, &b));
        a.initialize(Some(|| Ok(vec![PathBuf::from("/r/tmp1X")])))
            .unwrap();
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let registry = RetentionRegistry::new();
        let a = registry.resolve(&RetentionKey::new("/r", "tmp", "Outer"));
        let b = registry.resolve(&RetentionKey::new("/r", "tmp", "Inner"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_does_not_create() {
        let registry = RetentionRegistry::new();
        let key = RetentionKey::new("/r", "p", "s");
        assert!(registry.get(&key).is_none());
        assert!(registry.is_empty());
        registry.resolve(&key);
        assert!(registry.get(&key).is_some());
    }

    #[test]
    fn keys_are_sorted() {
        let registry = RetentionRegistry::new();
        for root in ["/b", "/a"] {
            registry
                .resolve(&RetentionKey::new(root, "p", "s"))
                .initialize(None::<fn() -> crate::core::errors::Result<Vec<PathBuf>>>)
                .unwrap();
        }
        let roots: Vec<PathBuf> = registry
            .keys()
            .iter()
            .map(|k| k.root().to_path_buf())
            .collect();
        assert_eq!(roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn keys_skip_queues_whose_seed_failed() {
        let registry = RetentionRegistry::new();
        let claimed = RetentionKey::new("/ok", "p", "s");
        registry
            .resolve(&claimed)
            .initialize(Some(|| Ok(vec![PathBuf::from("/ok/p1s")])))
            .unwrap();
        let failed = registry
            .resolve(&RetentionKey::new("/gone", "p", "s"))
            .initialize(Some(|| {
                Err(crate::core::errors::TdrError::io(
                    "/gone",
                    std::io::Error::other("unreadable"),
                ))
            }));
        assert!(failed.is_err());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.keys(), vec![claimed]);
    }

    #[test]
    fn concurrent_resolution_yields_one_queue() {
        let registry = Arc::new(RetentionRegistry::new());
        let key = RetentionKey::new("/r", "p", "s");
        let queues: Vec<Arc<RetentionQueue>> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let key = key.clone();
                thread::spawn(move || registry.resolve(&key))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();
        assert!(queues.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn global_is_a_singleton() {
        assert!(std::ptr::eq(
            RetentionRegistry::global(),
            RetentionRegistry::global()
        ));
    }
}
