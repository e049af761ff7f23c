//! Lookup contract of one registered module context.
//!
//! # Responsibility
//! - Define the three lookups the registry needs from an object container.
//! - Keep "nothing matched" and "more than one matched" as distinct signals.
//!
//! # Invariants
//! - `get_by_type` never picks one of several candidates on its own.
//! - Implementations are shared across threads (`Send + Sync`).

use std::any::{Any, TypeId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Type-erased extension object handed out by a context.
pub type Extension = Arc<dyn Any + Send + Sync>;

/// Capability type requested by a caller.
///
/// Carries the type name only for diagnostics; identity is the `TypeId`.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityType {
    id: TypeId,
    name: &'static str,
}

impl CapabilityType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns whether `extension` is an instance of this capability.
    pub fn is_instance(&self, extension: &Extension) -> bool {
        extension.as_ref().type_id() == self.id
    }
}

impl PartialEq for CapabilityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CapabilityType {}

impl Display for CapabilityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Failure of a single lookup against one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextLookupError {
    /// No object matches the requested name or type.
    NotFound { target: String },
    /// More than one object matches the requested type.
    NotUnique {
        capability: &'static str,
        candidates: usize,
    },
}

impl ContextLookupError {
    pub fn no_such_name(name: &str) -> Self {
        Self::NotFound {
            target: format!("name `{name}`"),
        }
    }

    pub fn no_such_type(capability: CapabilityType) -> Self {
        Self::NotFound {
            target: format!("type `{capability}`"),
        }
    }
}

impl Display for ContextLookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { target } => write!(f, "no extension found for {target}"),
            Self::NotUnique {
                capability,
                candidates,
            } => write!(
                f,
                "expected a single extension of type `{capability}` but found {candidates}"
            ),
        }
    }
}

impl Error for ContextLookupError {}

/// Opaque object container registered by one module.
///
/// The registry never creates or destroys contexts; it only holds non-owning
/// references between registration and unregistration.
pub trait ExtensionContext: Send + Sync {
    /// Stable diagnostic identifier used in log events.
    fn context_id(&self) -> String;

    fn contains_named(&self, name: &str) -> bool;

    /// Returns the object registered under `name`.
    ///
    /// # Errors
    /// - `NotFound` when no object is registered under `name`.
    fn get_named(&self, name: &str) -> Result<Extension, ContextLookupError>;

    /// Returns the single object of `capability`.
    ///
    /// # Errors
    /// - `NotFound` when no object has that type.
    /// - `NotUnique` when more than one object has that type.
    fn get_by_type(&self, capability: CapabilityType) -> Result<Extension, ContextLookupError>;
}
