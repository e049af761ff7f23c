//! Isolation-unit partitioning of registered contexts.

pub mod index;
pub mod key;
