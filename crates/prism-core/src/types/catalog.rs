//! # Type Catalog
//!
//! Per-module cache of resolved [`TypeDescriptor`]s.
//!
//! A descriptor is created the first time its name is encountered and then
//! shared for the rest of the session. Names the catalog has not seen are
//! handed to an optional [`TypeSource`] (for example a
//! [`BinaryImage`](crate::symbols::BinaryImage) reading DWARF). Pointer,
//! reference and cv-qualified names are synthesised locally so that a pointee
//! never has to be resolved just to describe the pointer.
//!
//! ## Thread Safety
//!
//! The cache sits behind an `RwLock`; lookups take the read side and only a
//! miss takes the write side.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use super::descriptor::{ScalarEncoding, TypeDescriptor};
use super::name::{normalize_type_name, strip_cv};
use crate::error::{FormatterError, Result};

/// Something that can produce type layouts by name (usually debug info).
pub trait TypeSource: Send + Sync
{
    /// Resolve a normalized type name, or `Ok(None)` if it is unknown here.
    ///
    /// ## Errors
    ///
    /// Returns an error only if the underlying debug info is corrupt.
    fn resolve_type(&self, name: &str) -> Result<Option<TypeDescriptor>>;

    /// Pointer width of the module, in bytes.
    fn pointer_size(&self) -> u64
    {
        8
    }
}

const BUILTIN_SCALARS: &[(&str, ScalarEncoding, u64)] = &[
    ("bool", ScalarEncoding::Bool, 1),
    ("char", ScalarEncoding::SignedChar, 1),
    ("signed char", ScalarEncoding::SignedChar, 1),
    ("unsigned char", ScalarEncoding::UnsignedChar, 1),
    ("short", ScalarEncoding::Signed, 2),
    ("unsigned short", ScalarEncoding::Unsigned, 2),
    ("int", ScalarEncoding::Signed, 4),
    ("unsigned int", ScalarEncoding::Unsigned, 4),
    ("long", ScalarEncoding::Signed, 8),
    ("unsigned long", ScalarEncoding::Unsigned, 8),
    ("long long", ScalarEncoding::Signed, 8),
    ("unsigned long long", ScalarEncoding::Unsigned, 8),
    ("float", ScalarEncoding::Float, 4),
    ("double", ScalarEncoding::Float, 8),
];

/// Cache of type descriptors for one module.
pub struct TypeCatalog
{
    module: String,
    pointer_size: u64,
    types: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
    source: Option<Arc<dyn TypeSource>>,
}

impl std::fmt::Debug for TypeCatalog
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("TypeCatalog")
            .field("module", &self.module)
            .field("pointer_size", &self.pointer_size)
            .field("types", &self.len())
            .field("source", &self.source.is_some())
            .finish()
    }
}

impl TypeCatalog
{
    /// Create a catalog pre-populated with the C/C++ builtin scalars
    /// (LP64 sizes) and `void`.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self
    {
        let mut types = HashMap::new();
        for (name, encoding, size) in BUILTIN_SCALARS {
            types.insert((*name).to_string(), Arc::new(TypeDescriptor::scalar(*name, *encoding, *size)));
        }
        types.insert("void".to_string(), Arc::new(TypeDescriptor::void()));

        Self {
            module: module.into(),
            pointer_size: 8,
            types: RwLock::new(types),
            source: None,
        }
    }

    /// Create a catalog that falls back to `source` for unknown names.
    #[must_use]
    pub fn with_source(module: impl Into<String>, source: Arc<dyn TypeSource>) -> Self
    {
        let mut catalog = Self::new(module);
        catalog.pointer_size = source.pointer_size();
        catalog.source = Some(source);
        catalog
    }

    pub fn module(&self) -> &str
    {
        &self.module
    }

    pub fn pointer_size(&self) -> u64
    {
        self.pointer_size
    }

    pub fn len(&self) -> usize
    {
        self.types.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Add a descriptor. If the name is already cached the existing descriptor
    /// wins, since resolved descriptors never change for a given binary.
    pub fn insert(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor>
    {
        let key = normalize_type_name(descriptor.name());
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        types.entry(key).or_insert_with(|| Arc::new(descriptor)).clone()
    }

    /// Cached descriptor for `name`, without consulting the type source.
    pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>>
    {
        let key = normalize_type_name(name);
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Resolve a type by name.
    ///
    /// ## Errors
    ///
    /// - `UnknownType`: neither the cache nor the type source knows the name
    /// - `Dwarf`: the type source failed to parse debug info
    pub fn resolve(&self, name: &str) -> Result<Arc<TypeDescriptor>>
    {
        let key = normalize_type_name(name);
        if let Some(existing) = self.get(&key) {
            return Ok(existing);
        }

        let descriptor = self.synthesize(&key)?;
        let descriptor = match descriptor {
            Some(descriptor) => descriptor,
            None => {
                let Some(source) = &self.source else {
                    return Err(FormatterError::UnknownType(key));
                };
                trace!(module = %self.module, name = %key, "resolving type from source");
                source
                    .resolve_type(&key)?
                    .ok_or_else(|| FormatterError::UnknownType(key.clone()))?
            }
        };

        debug!(module = %self.module, name = %key, size = descriptor.byte_size(), "cached type descriptor");
        let resolved = Arc::new(descriptor);
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        let resolved = types.entry(key).or_insert(resolved).clone();
        types
            .entry(normalize_type_name(resolved.name()))
            .or_insert_with(|| resolved.clone());
        Ok(resolved)
    }

    /// Descriptors that can be derived from the name alone.
    fn synthesize(&self, key: &str) -> Result<Option<TypeDescriptor>>
    {
        let (qualifiers, unqualified) = strip_cv(key);
        if qualifiers != Default::default() {
            let target = self.resolve(unqualified)?;
            return Ok(Some(TypeDescriptor::qualified(qualifiers, target)));
        }

        if let Some(referent) = unqualified.strip_suffix("&&").or_else(|| unqualified.strip_suffix('&')) {
            return Ok(Some(TypeDescriptor::reference(referent, self.pointer_size)));
        }
        if let Some(pointee) = unqualified.strip_suffix('*') {
            return Ok(Some(TypeDescriptor::pointer(pointee, self.pointer_size)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::TypeKind;

    struct FixedSource;

    impl TypeSource for FixedSource
    {
        fn resolve_type(&self, name: &str) -> Result<Option<TypeDescriptor>>
        {
            if name == "Widget" {
                Ok(Some(TypeDescriptor::structure("Widget", 16)))
            } else {
                Ok(None)
            }
        }

        fn pointer_size(&self) -> u64
        {
            4
        }
    }

    #[test]
    fn test_builtins_present()
    {
        let catalog = TypeCatalog::new("a.out");
        assert_eq!(catalog.resolve("int").unwrap().byte_size(), 4);
        assert_eq!(catalog.resolve("unsigned  long").unwrap().byte_size(), 8);
    }

    #[test]
    fn test_pointer_synthesised_without_pointee()
    {
        let catalog = TypeCatalog::new("a.out");
        let ptr = catalog.resolve("NotYetKnown*").unwrap();
        assert_eq!(ptr.name(), "NotYetKnown *");
        assert!(matches!(ptr.kind(), TypeKind::Pointer { .. }));
        assert!(catalog.resolve("NotYetKnown").is_err());
    }

    #[test]
    fn test_const_resolves_target()
    {
        let catalog = TypeCatalog::new("a.out");
        let ty = catalog.resolve("const int").unwrap();
        assert_eq!(ty.canonical().name(), "int");
    }

    #[test]
    fn test_source_fallback_is_cached()
    {
        let catalog = TypeCatalog::with_source("lib.so", Arc::new(FixedSource));
        let first = catalog.resolve("Widget").unwrap();
        let second = catalog.resolve("Widget").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(catalog.resolve("Widget *").unwrap().byte_size(), 4);
        assert!(matches!(catalog.resolve("Gadget"), Err(FormatterError::UnknownType(_))));
    }

    #[test]
    fn test_insert_keeps_first()
    {
        let catalog = TypeCatalog::new("a.out");
        let first = catalog.insert(TypeDescriptor::structure("S", 8));
        let second = catalog.insert(TypeDescriptor::structure("S", 16));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(catalog.get("struct S").unwrap().byte_size(), 8);
    }
}
