//! In-process context container backed by a named object map.

use crate::extension::context::{CapabilityType, ContextLookupError, Extension, ExtensionContext};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Stable identifier of one in-memory context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ContextId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe named object container.
///
/// Objects are matched by their concrete type. To expose a trait object as a
/// capability, register it wrapped once more, e.g. `Arc<dyn Greeter>`.
pub struct InMemoryContext {
    id: ContextId,
    label: String,
    objects: RwLock<BTreeMap<String, Extension>>,
}

impl InMemoryContext {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: ContextId::new(),
            label: label.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn builder(label: impl Into<String>) -> InMemoryContextBuilder {
        InMemoryContextBuilder {
            context: Self::new(label),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Registers `value` under `name`, replacing any previous object.
    pub fn insert<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        let name = name.into();
        debug!(
            "event=context_bean_insert module=extension status=ok context={} name={} type={}",
            self.id,
            name,
            std::any::type_name::<T>()
        );
        self.objects.write().insert(name, Arc::new(value));
    }

    pub fn remove(&self, name: &str) -> bool {
        self.objects.write().remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Wraps the context for registration.
    pub fn into_shared(self) -> Arc<dyn ExtensionContext> {
        Arc::new(self)
    }
}

impl ExtensionContext for InMemoryContext {
    fn context_id(&self) -> String {
        format!("{}#{}", self.label, self.id)
    }

    fn contains_named(&self, name: &str) -> bool {
        self.objects.read().contains_key(name)
    }

    fn get_named(&self, name: &str) -> Result<Extension, ContextLookupError> {
        self.objects
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContextLookupError::no_such_name(name))
    }

    fn get_by_type(&self, capability: CapabilityType) -> Result<Extension, ContextLookupError> {
        let objects = self.objects.read();
        let mut matches = objects
            .values()
            .filter(|value| capability.is_instance(value));
        let Some(first) = matches.next() else {
            return Err(ContextLookupError::no_such_type(capability));
        };
        let extra = matches.count();
        if extra > 0 {
            return Err(ContextLookupError::NotUnique {
                capability: capability.name(),
                candidates: extra + 1,
            });
        }
        Ok(Arc::clone(first))
    }
}

/// Builder for contexts assembled before registration.
pub struct InMemoryContextBuilder {
    context: InMemoryContext,
}

impl InMemoryContextBuilder {
    pub fn with<T: Any + Send + Sync>(self, name: impl Into<String>, value: T) -> Self {
        self.context.insert(name, value);
        self
    }

    pub fn build(self) -> InMemoryContext {
        self.context
    }

    pub fn build_shared(self) -> Arc<dyn ExtensionContext> {
        self.context.into_shared()
    }
}
