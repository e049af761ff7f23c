//! Isolation-scoped extension registry.
//! Modules register their contexts under an isolation key and resolve
//! extensions by name, then by type, within that key only.

pub mod config;
pub mod extension;
pub mod logging;
pub mod partition;
pub mod properties;
pub mod registry;

pub use config::{ConfigError, RegistryConfig};
pub use extension::context::{CapabilityType, ContextLookupError, Extension, ExtensionContext};
pub use extension::memory::{ContextId, InMemoryContext, InMemoryContextBuilder};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use partition::index::{ContextSet, PartitionIndex};
pub use partition::key::{IsolationKey, DEFAULT_ISOLATION_KEY};
pub use properties::{format_property_values, load_properties, parse_properties, Properties};
pub use registry::resolver::{
    resolve_in, resolve_traced, ResolveError, ResolvePhase, ResolveResult,
};
pub use registry::ExtensionRegistry;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
