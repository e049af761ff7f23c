//! Partition index: isolation key to registered context set.
//!
//! # Responsibility
//! - Create the context set of a key lazily, exactly once.
//! - Keep membership changes of one partition safe alongside readers.
//!
//! # Invariants
//! - At most one `ContextSet` exists per key; it is never replaced.
//! - Set creation is serialized per map shard, never behind one global lock.
//! - Sets hold `Weak` handles only; context ownership stays with the caller.

use crate::extension::context::ExtensionContext;
use crate::partition::key::IsolationKey;
use dashmap::DashMap;
use log::debug;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// Registered contexts of one isolation key.
///
/// Uniqueness is by allocation identity. Entries whose owner dropped the
/// context are invisible to readers and pruned on the next write.
#[derive(Default)]
pub struct ContextSet {
    entries: RwLock<Vec<Weak<dyn ExtensionContext>>>,
}

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `context`; returns `false` when it was already present.
    pub fn insert(&self, context: &Arc<dyn ExtensionContext>) -> bool {
        let mut entries = self.entries.write();
        entries.retain(|entry| entry.strong_count() > 0);
        if entries.iter().any(|entry| is_same_context(entry, context)) {
            return false;
        }
        entries.push(Arc::downgrade(context));
        true
    }

    /// Removes `context`; returns `false` when it was not present.
    pub fn remove(&self, context: &Arc<dyn ExtensionContext>) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.strong_count() > 0);
        let live = entries.len();
        entries.retain(|entry| !is_same_context(entry, context));
        let removed = entries.len() != live;
        if live != before {
            debug!(
                "event=partition_prune module=partition status=ok pruned={}",
                before - live
            );
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn contains(&self, context: &Arc<dyn ExtensionContext>) -> bool {
        self.entries
            .read()
            .iter()
            .any(|entry| entry.strong_count() > 0 && is_same_context(entry, context))
    }

    /// Returns strong handles to every live context.
    ///
    /// The lock is released before the caller iterates, so a concurrent
    /// mutation is either fully visible or not visible at all.
    pub fn snapshot(&self) -> Vec<Arc<dyn ExtensionContext>> {
        self.entries
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Number of live contexts.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_same_context(
    entry: &Weak<dyn ExtensionContext>,
    context: &Arc<dyn ExtensionContext>,
) -> bool {
    // Compare data pointers only; vtable pointers are not unique per type.
    entry.as_ptr() as *const () == Arc::as_ptr(context) as *const ()
}

/// Concurrent map of isolation keys to their context sets.
#[derive(Default)]
pub struct PartitionIndex {
    partitions: DashMap<IsolationKey, Arc<ContextSet>>,
}

impl PartitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set for `key`, creating and publishing it on first use.
    ///
    /// Concurrent first callers for one key all receive the same instance.
    pub fn get_or_create(&self, key: &IsolationKey) -> Arc<ContextSet> {
        if let Some(existing) = self.partitions.get(key) {
            return Arc::clone(existing.value());
        }
        let entry = self.partitions.entry(key.clone()).or_insert_with(|| {
            debug!(
                "event=partition_create module=partition status=ok key={}",
                key
            );
            Arc::new(ContextSet::new())
        });
        Arc::clone(entry.value())
    }

    /// Returns the set for `key` without creating it.
    pub fn get(&self, key: &IsolationKey) -> Option<Arc<ContextSet>> {
        self.partitions
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Adds `context` under `key`; idempotent.
    pub fn add(&self, key: &IsolationKey, context: &Arc<dyn ExtensionContext>) -> bool {
        self.get_or_create(key).insert(context)
    }

    /// Removes `context` from `key`; no-op when absent.
    pub fn remove(&self, key: &IsolationKey, context: &Arc<dyn ExtensionContext>) -> bool {
        self.get(key)
            .map(|set| set.remove(context))
            .unwrap_or(false)
    }

    /// Empties the set of `key`. Test teardown only.
    pub fn clear(&self, key: &IsolationKey) {
        if let Some(set) = self.get(key) {
            set.clear();
        }
    }

    pub fn keys(&self) -> Vec<IsolationKey> {
        self.partitions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ContextSet, PartitionIndex};
    use crate::extension::context::ExtensionContext;
    use crate::extension::memory::InMemoryContext;
    use crate::partition::key::IsolationKey;
    use std::sync::Arc;

    fn context(label: &str) -> Arc<dyn ExtensionContext> {
        InMemoryContext::new(label).into_shared()
    }

    #[test]
    fn insert_is_idempotent_by_identity() {
        let set = ContextSet::new();
        let first = context("a");
        let twin = context("a");

        assert!(set.insert(&first));
        assert!(!set.insert(&first));
        assert!(set.insert(&twin));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_only_touches_matching_context() {
        let set = ContextSet::new();
        let first = context("a");
        let second = context("b");
        set.insert(&first);
        set.insert(&second);

        assert!(set.remove(&first));
        assert!(!set.remove(&first));
        assert!(!set.contains(&first));
        assert!(set.contains(&second));
    }

    #[test]
    fn dropped_contexts_disappear_from_snapshot() {
        let set = ContextSet::new();
        let kept = context("kept");
        let dropped = context("dropped");
        set.insert(&kept);
        set.insert(&dropped);
        drop(dropped);

        let snapshot = set.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(Arc::ptr_eq(&snapshot[0], &kept));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn get_or_create_returns_same_set() {
        let index = PartitionIndex::new();
        let key = IsolationKey::new("moduleA");

        let first = index.get_or_create(&key);
        let second = index.get_or_create(&key);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_and_clear_do_not_create_partitions() {
        let index = PartitionIndex::new();
        let key = IsolationKey::new("moduleA");
        let ctx = context("a");

        assert!(!index.remove(&key, &ctx));
        index.clear(&key);
        assert!(index.get(&key).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn clear_keeps_partition_instance() {
        let index = PartitionIndex::new();
        let key = IsolationKey::new("moduleA");
        let ctx = context("a");
        index.add(&key, &ctx);
        let before = index.get_or_create(&key);

        index.clear(&key);
        let after = index.get(&key).expect("partition survives clear");
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.is_empty());
    }
}
