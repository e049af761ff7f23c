//! Extension context contracts.
//!
//! Contexts are owned by the module system; this module only defines what
//! the registry asks of them plus an in-memory container for hosts without
//! their own.

pub mod context;
pub mod memory;
