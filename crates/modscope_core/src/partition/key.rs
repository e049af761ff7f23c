//! Isolation key identifying one module execution scope.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Name of the partition used when a caller supplies no isolation key.
pub const DEFAULT_ISOLATION_KEY: &str = "modscope.default";

/// Opaque identifier of one isolation unit.
///
/// Only equality and hashing are meaningful; keys have no ordering
/// semantics and are never interpreted by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IsolationKey(Arc<str>);

impl IsolationKey {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    /// Key of the registry's own defining scope.
    pub fn default_scope() -> Self {
        Self::new(DEFAULT_ISOLATION_KEY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IsolationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IsolationKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IsolationKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}
