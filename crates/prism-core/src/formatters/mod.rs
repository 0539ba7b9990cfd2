//! # Built-in Formatters
//!
//! Formatters shipped with the subsystem. Each standard library layout lives
//! in its own category so clients can pick one with
//! [`FormatterRegistry::set_category_enabled`].

pub mod atomic;

pub use atomic::{AtomicLayout, AtomicProvider, AtomicSummary, VALUE_CHILD};

use crate::registry::FormatterRegistry;

/// Install every built-in category into `registry`.
pub fn register_builtin(registry: &FormatterRegistry)
{
    atomic::register(registry);
}
