//! # prism-core
//!
//! Data formatters for debugger values.
//!
//! Given a typed location in a stopped process (or a core file, or a recorded
//! snapshot), this crate decides how the value should be displayed: which
//! synthetic children it exposes, what one-line summary it has, and how the
//! whole thing renders as text. Formatters never run target code and never
//! write target memory; everything they show comes from bounded reads.
//!
//! ## Layers
//!
//! - [`memory`]: the Value Access Layer (bounded reads of target memory)
//! - [`types`]: type descriptors and the per-module type catalog
//! - [`symbols`]: type layouts and globals from DWARF
//! - [`matcher`] and [`registry`]: which formatter applies to which type name
//! - [`provider`]: the synthetic-children and summary contracts
//! - [`formatters`]: built-in formatters (`std::atomic<T>`)
//! - [`value`]: lazily evaluated value handles and their stop-scoped caches
//! - [`render`]: `frame variable` style text output
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use prism_core::memory::SnapshotMemory;
//! use prism_core::render::{render, RenderOptions};
//! use prism_core::types::{Address, TypeCatalog, TypeDescriptor};
//! use prism_core::{FormatterRegistry, Target};
//!
//! let catalog = TypeCatalog::new("demo");
//! let int = catalog.resolve("int").unwrap();
//! catalog.insert(
//!     TypeDescriptor::structure("std::atomic<int>", 4)
//!         .with_field("_Storage", int, 0),
//! );
//!
//! let mut memory = SnapshotMemory::new();
//! memory.add_region(Address::new(0x1000), 5i32.to_le_bytes().to_vec());
//!
//! let target = Arc::new(Target::new(
//!     Arc::new(memory),
//!     Arc::new(catalog),
//!     Arc::new(FormatterRegistry::with_builtin()),
//! ));
//! let i = target.value_at("i", Address::new(0x1000), "std::atomic<int>").unwrap();
//! assert_eq!(i.value_as_unsigned(0), 5);
//! assert_eq!(
//!     render(&i, &RenderOptions::default()),
//!     "(std::atomic<int>) i = 5 {\n  Value = 5\n}\n"
//! );
//! ```

pub mod error;
pub mod formatters;
pub mod matcher;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod render;
pub mod settings;
pub mod symbols;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use error::{FormatterError, ReadError, Result};
pub use matcher::{MatchOutcome, TypePattern};
pub use memory::MemorySource;
pub use provider::{Formatter, FormatterKind, SummaryProvider, SyntheticProvider};
pub use registry::FormatterRegistry;
pub use settings::{DisplaySettings, DynamicPreference};
pub use value::{Target, ValueHandle};
