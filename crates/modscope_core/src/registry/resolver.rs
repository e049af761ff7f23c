//! Two-phase extension resolution over one partition snapshot.
//!
//! # Responsibility
//! - Prefer an exact name match of the requested type.
//! - Fall back to a per-context unique type match.
//!
//! # Invariants
//! - A same-named object of another type is skipped, never an error.
//! - Type ambiguity inside one context aborts the search immediately.
//! - Per-context misses never escape; they are logged at debug level.
//! - "Nothing matched" is `Ok(None)`, distinct from `Err(Ambiguous)`.

use crate::extension::context::{CapabilityType, ContextLookupError, ExtensionContext};
use log::{debug, warn};
use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ResolveResult<T> = Result<Option<Arc<T>>, ResolveError>;

/// Resolution failure surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// One context holds several objects of the requested type.
    Ambiguous {
        name: String,
        capability: &'static str,
        context: String,
        candidates: usize,
    },
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ambiguous {
                name,
                capability,
                context,
                candidates,
            } => write!(
                f,
                "extension `{name}` is ambiguous: context `{context}` holds {candidates} objects of type `{capability}`"
            ),
        }
    }
}

impl Error for ResolveError {}

/// Lookup phase that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePhase {
    Name,
    Type,
}

impl ResolvePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
        }
    }
}

/// Resolves `name` as a `T` against `contexts`.
///
/// # Errors
/// - `ResolveError::Ambiguous` when a context holds more than one `T` and no
///   context provided a `T` under `name`.
pub fn resolve_in<T: Any + Send + Sync>(
    contexts: &[Arc<dyn ExtensionContext>],
    name: &str,
) -> ResolveResult<T> {
    Ok(resolve_traced::<T>(contexts, name)?.map(|(extension, _)| extension))
}

/// Like [`resolve_in`], also reporting the phase that matched.
pub fn resolve_traced<T: Any + Send + Sync>(
    contexts: &[Arc<dyn ExtensionContext>],
    name: &str,
) -> Result<Option<(Arc<T>, ResolvePhase)>, ResolveError> {
    let capability = CapabilityType::of::<T>();

    if let Some(found) = resolve_by_name::<T>(contexts, name, capability) {
        return Ok(Some((found, ResolvePhase::Name)));
    }

    warn!(
        "event=extension_resolve module=registry status=fallback phase=name name={} type={} contexts={}",
        name,
        capability,
        contexts.len()
    );

    if let Some(found) = resolve_by_type::<T>(contexts, name, capability)? {
        return Ok(Some((found, ResolvePhase::Type)));
    }

    warn!(
        "event=extension_resolve module=registry status=not_found name={} type={}",
        name, capability
    );
    Ok(None)
}

fn resolve_by_name<T: Any + Send + Sync>(
    contexts: &[Arc<dyn ExtensionContext>],
    name: &str,
    capability: CapabilityType,
) -> Option<Arc<T>> {
    for context in contexts {
        if !context.contains_named(name) {
            continue;
        }
        let extension = match context.get_named(name) {
            Ok(extension) => extension,
            Err(err) => {
                // Removed between the two calls.
                log_context_miss(context.as_ref(), ResolvePhase::Name, capability, &err);
                continue;
            }
        };
        match extension.downcast::<T>() {
            Ok(found) => {
                debug!(
                    "event=extension_resolve module=registry status=ok phase=name name={} type={} context={}",
                    name,
                    capability,
                    context.context_id()
                );
                return Some(found);
            }
            Err(_) => {
                debug!(
                    "event=extension_resolve module=registry status=skip phase=name reason=type_mismatch name={} type={} context={}",
                    name,
                    capability,
                    context.context_id()
                );
            }
        }
    }
    None
}

fn resolve_by_type<T: Any + Send + Sync>(
    contexts: &[Arc<dyn ExtensionContext>],
    name: &str,
    capability: CapabilityType,
) -> ResolveResult<T> {
    for context in contexts {
        match context.get_by_type(capability) {
            Ok(extension) => match extension.downcast::<T>() {
                Ok(found) => {
                    debug!(
                        "event=extension_resolve module=registry status=ok phase=type name={} type={} context={}",
                        name,
                        capability,
                        context.context_id()
                    );
                    return Ok(Some(found));
                }
                Err(_) => {
                    warn!(
                        "event=extension_resolve module=registry status=skip phase=type reason=contract_violation type={} context={}",
                        capability,
                        context.context_id()
                    );
                }
            },
            Err(ContextLookupError::NotUnique { candidates, .. }) => {
                let context_id = context.context_id();
                warn!(
                    "event=extension_resolve module=registry status=error phase=type error_code=ambiguous name={} type={} context={} candidates={}",
                    name, capability, context_id, candidates
                );
                return Err(ResolveError::Ambiguous {
                    name: name.to_string(),
                    capability: capability.name(),
                    context: context_id,
                    candidates,
                });
            }
            Err(err @ ContextLookupError::NotFound { .. }) => {
                log_context_miss(context.as_ref(), ResolvePhase::Type, capability, &err);
            }
        }
    }
    Ok(None)
}

fn log_context_miss(
    context: &dyn ExtensionContext,
    phase: ResolvePhase,
    capability: CapabilityType,
    err: &ContextLookupError,
) {
    debug!(
        "event=extension_resolve module=registry status=miss phase={} type={} context={} error={}",
        phase.as_str(),
        capability,
        context.context_id(),
        err
    );
}
