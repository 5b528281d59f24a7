//! Property tests for retention queues over random scope sequences.

use std::sync::Arc;

use proptest::prelude::*;

use super::manager::{ScopeOptions, TempDirManager};
use super::registry::RetentionRegistry;
use crate::platform::pal::std_fs;

#[derive(Debug, Clone, Copy)]
struct Exit {
    keep_max: usize,
    delete_historic: bool,
}

fn arb_exit() -> impl Strategy<Value = Exit> {
    (0usize..4, prop::bool::weighted(0.8)).prop_map(|(keep_max, delete_historic)| Exit {
        keep_max,
        delete_historic,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// After each exit: the exiting manager's limit holds, tracked entries
    /// exist, untracked ones are gone, and creation order is preserved.
    #[test]
    fn exits_preserve_queue_invariants(
        exits in prop::collection::vec(arb_exit(), 1..12)
    ) {
        let root = tempfile::tempdir().unwrap();
        let registry = RetentionRegistry::new();
        let mut created = Vec::new();

        for exit in exits {
            let mut manager = TempDirManager::with_parts(
                ScopeOptions::default()
                    .root(root.path())
                    .keep_max(exit.keep_max)
                    .delete_historic(exit.delete_historic),
                &registry,
                std_fs(),
                None,
            )
            .unwrap();
            let dir = manager.enter().unwrap();
            created.push(dir.path().to_path_buf());
            let report = dir.exit();
            prop_assert!(report.failed.is_empty());

            let queued = manager.queued();
            if exit.delete_historic {
                prop_assert!(queued.len() <= exit.keep_max);
            }
            prop_assert_eq!(queued.len(), report.remaining);

            // Queue is a suffix of the creation order.
            let tail = &created[created.len() - queued.len()..];
            prop_assert_eq!(queued.as_slice(), tail);
            for path in &created {
                prop_assert_eq!(path.exists(), queued.contains(path));
            }
        }
    }

    /// Managers with different keys under one root never purge each other.
    #[test]
    fn distinct_suffixes_are_isolated(
        rounds in 1usize..6,
        keep_a in 0usize..3,
        keep_b in 0usize..3,
    ) {
        let root = tempfile::tempdir().unwrap();
        let registry = Arc::new(RetentionRegistry::new());
        let build = |suffix: &str, keep: usize| {
            TempDirManager::with_parts(
                ScopeOptions::default().root(root.path()).suffix(suffix).keep_max(keep),
                &registry,
                std_fs(),
                None,
            )
            .unwrap()
        };
        let mut a = build("Alpha", keep_a);
        let mut b = build("Beta", keep_b);

        for _ in 0..rounds {
            a.scope(|_| ()).unwrap();
            b.scope(|_| ()).unwrap();
        }
        prop_assert_eq!(a.queue_len(), rounds.min(keep_a));
        prop_assert_eq!(b.queue_len(), rounds.min(keep_b));
    }
}
