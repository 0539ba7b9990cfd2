//! # Formatter Registry
//!
//! Session-wide catalog of `pattern -> formatter` bindings grouped into named
//! categories.
//!
//! ## Lookup Order
//!
//! Lookup is deterministic:
//!
//! 1. candidate names in [`candidate_names`](crate::matcher::candidate_names) order
//! 2. enabled categories by priority (highest first), then creation order
//! 3. entries within a category by priority (highest first), then
//!    registration order
//!
//! Disabled categories are skipped entirely, which is how one standard
//! library layout is selected over another for the same generic type.
//!
//! ## Thread Safety
//!
//! State sits behind an `RwLock`: any number of lookups can run
//! concurrently, while `register`/`set_category_enabled` take the write
//! side and are serialized against them. Every mutation bumps
//! [`FormatterRegistry::generation`] so value handles can tell that their
//! selected formatter may be out of date.
//!
//! ## Example
//!
//! ```rust
//! use prism_core::registry::FormatterRegistry;
//!
//! let registry = FormatterRegistry::with_builtin();
//! assert!(registry.lookup("std::__1::atomic<int>").is_some());
//!
//! registry.set_category_enabled("libcxx", false).unwrap();
//! assert!(registry.lookup("std::__1::atomic<int>").is_none());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::{FormatterError, Result};
use crate::matcher::{MatchOutcome, TypePattern};
use crate::provider::{Formatter, FormatterKind, ProviderFactory, SummaryProvider};

/// One `pattern -> formatter` binding.
#[derive(Debug, Clone)]
pub struct FormatterEntry
{
    pattern: TypePattern,
    category: String,
    formatter: Formatter,
    priority: i32,
}

impl FormatterEntry
{
    pub fn pattern(&self) -> &TypePattern
    {
        &self.pattern
    }

    pub fn category(&self) -> &str
    {
        &self.category
    }

    pub fn formatter(&self) -> &Formatter
    {
        &self.formatter
    }

    pub fn priority(&self) -> i32
    {
        self.priority
    }
}

/// A named, independently toggleable group of entries.
#[derive(Debug, Clone)]
pub struct FormatterCategory
{
    name: String,
    enabled: bool,
    priority: i32,
    entries: Vec<FormatterEntry>,
}

impl FormatterCategory
{
    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn is_enabled(&self) -> bool
    {
        self.enabled
    }

    pub fn priority(&self) -> i32
    {
        self.priority
    }

    /// Entries in lookup order.
    pub fn entries(&self) -> &[FormatterEntry]
    {
        &self.entries
    }
}

/// A formatter that matched a name, in lookup order.
#[derive(Debug, Clone)]
pub struct Candidate
{
    pub category: String,
    pub pattern: String,
    pub formatter: Formatter,
}

#[derive(Debug, Default)]
struct RegistryState
{
    /// Kept sorted in lookup order
    categories: Vec<FormatterCategory>,
}

impl RegistryState
{
    fn category_mut(&mut self, name: &str) -> Option<&mut FormatterCategory>
    {
        self.categories.iter_mut().find(|category| category.name == name)
    }

    fn insert_category(&mut self, name: &str, priority: i32, enabled: bool) -> &mut FormatterCategory
    {
        // Insert after every category of equal or higher priority.
        let position = self
            .categories
            .iter()
            .position(|existing| existing.priority < priority)
            .unwrap_or(self.categories.len());
        self.categories.insert(
            position,
            FormatterCategory {
                name: name.to_string(),
                enabled,
                priority,
                entries: Vec::new(),
            },
        );
        &mut self.categories[position]
    }
}

/// Process-wide formatter catalog.
///
/// Constructed explicitly (usually once per debugger session) and shared via
/// `Arc`; there is no global instance.
#[derive(Debug, Default)]
pub struct FormatterRegistry
{
    state: RwLock<RegistryState>,
    generation: AtomicU64,
}

impl FormatterRegistry
{
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// A registry with the built-in formatter categories installed.
    #[must_use]
    pub fn with_builtin() -> Self
    {
        let registry = Self::new();
        crate::formatters::register_builtin(&registry);
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState>
    {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState>
    {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump_generation(&self)
    {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Counter that changes on every mutation.
    pub fn generation(&self) -> u64
    {
        self.generation.load(Ordering::Acquire)
    }

    /// Create a category. Returns `false` (and changes nothing) if a
    /// category with this name already exists.
    pub fn create_category(&self, name: &str, priority: i32, enabled: bool) -> bool
    {
        let mut state = self.write();
        if state.category_mut(name).is_some() {
            return false;
        }
        state.insert_category(name, priority, enabled);
        drop(state);
        self.bump_generation();
        debug!(category = name, priority, enabled, "created formatter category");
        true
    }

    /// Bind `formatter` to `pattern` in `category`.
    ///
    /// A missing category is created enabled with priority 0.
    pub fn register(&self, pattern: TypePattern, category: &str, priority: i32, formatter: Formatter)
    {
        let mut state = self.write();
        debug!(%pattern, category, priority, kind = %formatter.kind(), "registered formatter");
        let entry = FormatterEntry {
            pattern,
            category: category.to_string(),
            formatter,
            priority,
        };
        let target = match state.categories.iter().position(|existing| existing.name == category) {
            Some(index) => &mut state.categories[index],
            None => state.insert_category(category, 0, true),
        };
        let position = target
            .entries
            .iter()
            .position(|existing| existing.priority < priority)
            .unwrap_or(target.entries.len());
        target.entries.insert(position, entry);
        drop(state);
        self.bump_generation();
    }

    /// Shorthand for registering a synthetic child provider factory.
    pub fn register_synthetic(&self, pattern: TypePattern, category: &str, priority: i32, factory: ProviderFactory)
    {
        self.register(pattern, category, priority, Formatter::Synthetic(factory));
    }

    /// Shorthand for registering a summary provider.
    pub fn register_summary(
        &self,
        pattern: TypePattern,
        category: &str,
        priority: i32,
        provider: Arc<dyn SummaryProvider>,
    )
    {
        self.register(pattern, category, priority, Formatter::Summary(provider));
    }

    /// Enable or disable a category.
    ///
    /// ## Errors
    ///
    /// Returns `UnknownCategory` if no such category exists.
    pub fn set_category_enabled(&self, name: &str, enabled: bool) -> Result<()>
    {
        let mut state = self.write();
        let category = state
            .category_mut(name)
            .ok_or_else(|| FormatterError::UnknownCategory(name.to_string()))?;
        if category.enabled == enabled {
            return Ok(());
        }
        category.enabled = enabled;
        drop(state);
        self.bump_generation();
        info!(category = name, enabled, "formatter category toggled");
        Ok(())
    }

    /// ## Errors
    ///
    /// Returns `UnknownCategory` if no such category exists.
    pub fn is_category_enabled(&self, name: &str) -> Result<bool>
    {
        self.read()
            .categories
            .iter()
            .find(|category| category.name == name)
            .map(|category| category.enabled)
            .ok_or_else(|| FormatterError::UnknownCategory(name.to_string()))
    }

    /// Snapshot of all categories in lookup order.
    pub fn categories(&self) -> Vec<FormatterCategory>
    {
        self.read().categories.clone()
    }

    /// Every formatter of `kind` matching any of `names`, in lookup order.
    ///
    /// The registry lock is released before this returns, so callers may run
    /// factories that read memory without blocking registration.
    pub fn candidates<S: AsRef<str>>(&self, names: &[S], kind: FormatterKind) -> Vec<Candidate>
    {
        let state = self.read();
        let mut found = Vec::new();
        for name in names {
            let name = name.as_ref();
            for category in state.categories.iter().filter(|category| category.enabled) {
                for entry in category.entries.iter().filter(|entry| entry.formatter.kind() == kind) {
                    match entry.pattern.matches(name) {
                        MatchOutcome::Matched => found.push(Candidate {
                            category: category.name.clone(),
                            pattern: entry.pattern.to_string(),
                            formatter: entry.formatter.clone(),
                        }),
                        MatchOutcome::Declined => {
                            debug!(type_name = name, pattern = %entry.pattern, "pattern declined type");
                        }
                        MatchOutcome::NoMatch => {}
                    }
                }
            }
        }
        found
    }

    /// First synthetic provider factory for `type_name`.
    pub fn lookup(&self, type_name: &str) -> Option<ProviderFactory>
    {
        self.candidates(&[type_name], FormatterKind::Synthetic)
            .into_iter()
            .find_map(|candidate| match candidate.formatter {
                Formatter::Synthetic(factory) => Some(factory),
                Formatter::Summary(_) => None,
            })
    }

    /// First summary provider for any of `names`.
    pub fn summary_for<S: AsRef<str>>(&self, names: &[S]) -> Option<Arc<dyn SummaryProvider>>
    {
        self.candidates(names, FormatterKind::Summary)
            .into_iter()
            .find_map(|candidate| match candidate.formatter {
                Formatter::Summary(provider) => Some(provider),
                Formatter::Synthetic(_) => None,
            })
    }
}
