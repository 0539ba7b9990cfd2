//! # Provider Interfaces
//!
//! Formatters are open-ended: anything implementing [`SyntheticProvider`] or
//! [`SummaryProvider`] can be registered for a type pattern at runtime.
//!
//! ## Synthetic Providers
//!
//! A synthetic provider is created *per value* by a [`ProviderFactory`]. The
//! factory inspects the value's resolved type and either returns a provider
//! or declines (`None`), in which case the registry tries the next candidate.
//!
//! Providers only describe children. Caching lives in the
//! [`ValueHandle`]: a child is requested from the provider at most once per
//! stop, then served from the handle's cache.
//!
//! ## Summary Providers
//!
//! A summary provider turns a value into a one-line string. Summaries are
//! composed from the value's children and the handle's byte cache; they
//! never resolve anything beyond one level.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::value::ValueHandle;

/// Computes the children of one value.
///
/// Implementations must never write target memory or run target code, and
/// must report the same [`num_children`](Self::num_children) until
/// [`update`](Self::update) is called again.
pub trait SyntheticProvider
{
    /// Re-read whatever state the provider derives from memory.
    ///
    /// Called once after the provider is created and again whenever the
    /// value is recomputed after a stop.
    ///
    /// ## Errors
    ///
    /// An error makes the value fall back to its raw children.
    fn update(&mut self, _value: &ValueHandle) -> Result<()>
    {
        Ok(())
    }

    /// Number of synthetic children.
    fn num_children(&self, value: &ValueHandle) -> usize;

    /// Build child `index`. Only called for indices below `num_children`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the child's type can't be resolved. Unreadable
    /// memory is *not* an error here: the child handle reports it.
    fn child_at_index(&self, value: &ValueHandle, index: usize) -> Result<ValueHandle>;

    /// Index of the child called `name`, if any.
    fn index_of_child(&self, name: &str) -> Option<usize>;

    /// Child that stands in for the value itself when a scalar is asked for.
    fn value_index(&self) -> Option<usize>
    {
        None
    }

    fn might_have_children(&self) -> bool
    {
        true
    }
}

/// Produces a one-line description of a value.
pub trait SummaryProvider: Send + Sync
{
    /// Short identifier used in listings (`atomic`).
    fn name(&self) -> &str;

    /// Summary text, or `None` to show no summary.
    fn summarize(&self, value: &ValueHandle) -> Option<String>;
}

/// Creates a [`SyntheticProvider`] for a value, or declines.
pub type ProviderFactory = Arc<dyn Fn(&ValueHandle) -> Option<Box<dyn SyntheticProvider>> + Send + Sync>;

/// What a registry entry produces.
#[derive(Clone)]
pub enum Formatter
{
    Synthetic(ProviderFactory),
    Summary(Arc<dyn SummaryProvider>),
}

impl Formatter
{
    /// Wrap a closure as a synthetic factory.
    pub fn synthetic<F>(factory: F) -> Self
    where
        F: Fn(&ValueHandle) -> Option<Box<dyn SyntheticProvider>> + Send + Sync + 'static,
    {
        Formatter::Synthetic(Arc::new(factory))
    }

    pub fn summary(provider: impl SummaryProvider + 'static) -> Self
    {
        Formatter::Summary(Arc::new(provider))
    }

    pub fn kind(&self) -> FormatterKind
    {
        match self {
            Formatter::Synthetic(_) => FormatterKind::Synthetic,
            Formatter::Summary(_) => FormatterKind::Summary,
        }
    }
}

impl fmt::Debug for Formatter
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Formatter::Synthetic(_) => f.write_str("Synthetic(..)"),
            Formatter::Summary(provider) => write!(f, "Summary({})", provider.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatterKind
{
    Synthetic,
    Summary,
}

impl fmt::Display for FormatterKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            FormatterKind::Synthetic => f.write_str("synthetic"),
            FormatterKind::Summary => f.write_str("summary"),
        }
    }
}
