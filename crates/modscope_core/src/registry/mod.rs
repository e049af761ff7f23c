//! Extension registry facade.
//!
//! # Responsibility
//! - Accept context registration from module lifecycles.
//! - Resolve extensions against the caller's partition only.
//!
//! # Invariants
//! - Resolution never crosses partitions.
//! - A missing isolation key resolves against the configured default
//!   partition, which is an ordinary partition like any other.

pub mod resolver;

use crate::config::RegistryConfig;
use crate::extension::context::ExtensionContext;
use crate::partition::index::{ContextSet, PartitionIndex};
use crate::partition::key::IsolationKey;
use log::{debug, info};
use resolver::{resolve_in, ResolveResult};
use std::any::Any;
use std::sync::Arc;

/// Registry of module contexts partitioned by isolation key.
///
/// Construct once per host process and hand out by reference or `Arc`.
pub struct ExtensionRegistry {
    index: PartitionIndex,
    default_key: IsolationKey,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self {
            index: PartitionIndex::new(),
            default_key: IsolationKey::default_scope(),
        }
    }

    /// Builds a registry from validated configuration.
    ///
    /// Partitions listed in `preload_partitions` are created up front.
    pub fn with_config(config: &RegistryConfig) -> Self {
        let registry = Self {
            index: PartitionIndex::new(),
            default_key: IsolationKey::new(&config.default_isolation_key),
        };
        for key in &config.preload_partitions {
            registry.index.get_or_create(&IsolationKey::new(key));
        }
        info!(
            "event=registry_init module=registry status=ok default_key={} preloaded={}",
            registry.default_key,
            config.preload_partitions.len()
        );
        registry
    }

    pub fn default_key(&self) -> &IsolationKey {
        &self.default_key
    }

    /// Returns `scope` or the default partition key when none is supplied.
    pub fn scope_key(&self, scope: Option<&IsolationKey>) -> IsolationKey {
        scope.unwrap_or(&self.default_key).clone()
    }

    /// Registers a module context under `key`.
    ///
    /// Returns `false` when the context was already registered there.
    pub fn register_context(
        &self,
        key: &IsolationKey,
        context: &Arc<dyn ExtensionContext>,
    ) -> bool {
        let inserted = self.index.add(key, context);
        debug!(
            "event=context_register module=registry status={} key={} context={}",
            if inserted { "ok" } else { "duplicate" },
            key,
            context.context_id()
        );
        inserted
    }

    /// Removes a module context from `key`; no-op when absent.
    pub fn unregister_context(
        &self,
        key: &IsolationKey,
        context: &Arc<dyn ExtensionContext>,
    ) -> bool {
        let removed = self.index.remove(key, context);
        debug!(
            "event=context_unregister module=registry status={} key={} context={}",
            if removed { "ok" } else { "absent" },
            key,
            context.context_id()
        );
        removed
    }

    /// Resolves `name` as a `T` within the caller's partition.
    ///
    /// Returns `Ok(None)` when neither an exact name match nor a unique type
    /// match exists.
    ///
    /// # Errors
    /// - `ResolveError::Ambiguous` when one context holds several `T`s.
    pub fn resolve<T: Any + Send + Sync>(
        &self,
        scope: Option<&IsolationKey>,
        name: &str,
    ) -> ResolveResult<T> {
        let key = self.scope_key(scope);
        let contexts = self.index.get_or_create(&key).snapshot();
        resolve_in::<T>(&contexts, name)
    }

    /// Drops every registration of the caller's partition. Test teardown only.
    pub fn clear_contexts(&self, scope: Option<&IsolationKey>) {
        let key = self.scope_key(scope);
        self.index.clear(&key);
        debug!(
            "event=partition_clear module=registry status=ok key={}",
            key
        );
    }

    pub fn partition(&self, key: &IsolationKey) -> Arc<ContextSet> {
        self.index.get_or_create(key)
    }

    pub fn partition_keys(&self) -> Vec<IsolationKey> {
        self.index.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::ExtensionRegistry;
    use crate::config::RegistryConfig;
    use crate::extension::memory::InMemoryContext;
    use crate::partition::key::IsolationKey;

    #[test]
    fn missing_scope_uses_default_partition() {
        let registry = ExtensionRegistry::new();
        let context = InMemoryContext::builder("host")
            .with("retries", 3_u8)
            .build_shared();
        registry.register_context(registry.default_key(), &context);

        let found = registry
            .resolve::<u8>(None, "retries")
            .expect("resolution")
            .expect("default partition match");
        assert_eq!(*found, 3);

        let other = IsolationKey::new("moduleA");
        assert!(registry
            .resolve::<u8>(Some(&other), "retries")
            .expect("resolution")
            .is_none());
    }

    #[test]
    fn config_sets_default_key_and_preloads() {
        let config = RegistryConfig {
            default_isolation_key: "host".to_string(),
            preload_partitions: ["moduleA".to_string(), "moduleB".to_string()]
                .into_iter()
                .collect(),
            ..RegistryConfig::default()
        };
        let registry = ExtensionRegistry::with_config(&config);

        assert_eq!(registry.default_key().as_str(), "host");
        let mut keys = registry
            .partition_keys()
            .into_iter()
            .map(|key| key.as_str().to_string())
            .collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, vec!["moduleA", "moduleB"]);
    }

    #[test]
    fn duplicate_registration_reports_false() {
        let registry = ExtensionRegistry::new();
        let key = IsolationKey::new("moduleA");
        let context = InMemoryContext::new("a").into_shared();

        assert!(registry.register_context(&key, &context));
        assert!(!registry.register_context(&key, &context));
        assert_eq!(registry.partition(&key).len(), 1);

        assert!(registry.unregister_context(&key, &context));
        assert!(!registry.unregister_context(&key, &context));
    }
}
