//! # Types
//!
//! The type model shared by every layer of the formatter subsystem.
//!
//! - [`Address`]: a location in the target's address space
//! - [`TypeDescriptor`]: an immutable, resolved type layout
//! - [`TypeCatalog`]: the per-module cache that creates descriptors on first use
//! - [`name`]: normalisation and template parsing of type names

pub mod address;
pub mod catalog;
pub mod descriptor;
pub mod name;

// Re-export all public types
pub use address::Address;
pub use catalog::{TypeCatalog, TypeSource};
pub use descriptor::{
    AggregateKind, FieldDescriptor, Qualifiers, ScalarEncoding, TemplateArg, TypeDescriptor, TypeKind,
};
pub use name::{normalize_type_name, parse_type_name, ParsedTypeName};
