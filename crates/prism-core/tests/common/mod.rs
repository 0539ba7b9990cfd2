//! Fixtures shared by the integration tests: the standard library atomic
//! layouts and a snapshot with `s`, `i` and the self-referential `p`.

#![allow(dead_code)]

use std::sync::Arc;

use prism_core::memory::SnapshotMemory;
use prism_core::types::{Address, TemplateArg, TypeCatalog, TypeDescriptor};
use prism_core::{FormatterRegistry, Target};

pub const S_ADDRESS: u64 = 0x1000;
pub const I_ADDRESS: u64 = 0x1010;
pub const P_ADDRESS: u64 = 0x1020;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Library
{
    LibCxx,
    MsvcStl,
    LibStdCpp,
}

impl Library
{
    pub fn atomic_name(self, arg: &str) -> String
    {
        match self {
            Library::LibCxx => format!("std::__1::atomic<{arg}>"),
            Library::MsvcStl | Library::LibStdCpp => format!("std::atomic<{arg}>"),
        }
    }

    pub fn category(self) -> &'static str
    {
        match self {
            Library::LibCxx => "libcxx",
            Library::MsvcStl => "msvcstl",
            Library::LibStdCpp => "libstdcpp",
        }
    }

    /// Wrapper type for `std::atomic<arg>` laid out the way the library does.
    pub fn insert_atomic(self, catalog: &TypeCatalog, arg: &str, value: Arc<TypeDescriptor>) -> Arc<TypeDescriptor>
    {
        let size = value.byte_size();
        let name = self.atomic_name(arg);
        let wrapper = match self {
            Library::LibCxx => {
                let base_impl = Arc::new(
                    TypeDescriptor::structure(format!("std::__1::__cxx_atomic_base_impl<{arg}>"), size)
                        .with_field("__a_value", value, 0),
                );
                let atomic_impl = Arc::new(
                    TypeDescriptor::structure(format!("std::__1::__cxx_atomic_impl<{arg}>"), size)
                        .with_base(base_impl, 0),
                );
                let atomic_base = Arc::new(
                    TypeDescriptor::structure(format!("std::__1::__atomic_base<{arg}>"), size)
                        .with_field("__a_", atomic_impl, 0),
                );
                TypeDescriptor::structure(name, size).with_base(atomic_base, 0)
            }
            Library::MsvcStl => {
                let padded = Arc::new(
                    TypeDescriptor::structure(format!("std::_Atomic_padded<{arg}>"), size)
                        .with_field("_Value", value, 0),
                );
                let storage = Arc::new(
                    TypeDescriptor::structure(format!("std::_Atomic_storage<{arg}, {size}>"), size)
                        .with_field("_Storage", padded, 0),
                );
                TypeDescriptor::structure(name, size).with_base(storage, 0)
            }
            Library::LibStdCpp => TypeDescriptor::structure(name, size).with_field("_M_i", value, 0),
        };
        catalog.insert(wrapper.with_template_arg(TemplateArg::Type(arg.to_string())))
    }
}

/// Catalog with `S`, `Parent`, `Parent::Child` and the three atomics.
pub fn catalog(library: Library) -> TypeCatalog
{
    let catalog = TypeCatalog::new(format!("test-{}", library.category()));
    let int = catalog.resolve("int").unwrap();
    let s = catalog.insert(
        TypeDescriptor::structure("S", 8)
            .with_field("x", int.clone(), 0)
            .with_field("y", int.clone(), 4),
    );
    library.insert_atomic(&catalog, "S", s);
    library.insert_atomic(&catalog, "int", int);

    let pointer = Arc::new(TypeDescriptor::pointer("Parent", 8));
    let parent_atomic = library.insert_atomic(&catalog, "Parent *", pointer);
    let child = catalog.insert(TypeDescriptor::structure("Parent::Child", 8).with_field("parent", parent_atomic, 0));
    catalog.insert(TypeDescriptor::structure("Parent", 8).with_field("child", child, 0));
    catalog
}

/// `s = {1, 2}`, `i = 5`, `p.child.parent = &p`.
pub fn memory(i: i32) -> SnapshotMemory
{
    let mut s_bytes = 1i32.to_le_bytes().to_vec();
    s_bytes.extend_from_slice(&2i32.to_le_bytes());
    let mut memory = SnapshotMemory::new();
    memory
        .add_region(Address::new(S_ADDRESS), s_bytes)
        .add_region(Address::new(I_ADDRESS), i.to_le_bytes().to_vec())
        .add_region(Address::new(P_ADDRESS), P_ADDRESS.to_le_bytes().to_vec());
    memory
}

pub fn target(library: Library) -> Arc<Target>
{
    target_with_registry(library, FormatterRegistry::with_builtin())
}

pub fn target_with_registry(library: Library, registry: FormatterRegistry) -> Arc<Target>
{
    Arc::new(Target::new(
        Arc::new(memory(5)),
        Arc::new(catalog(library)),
        Arc::new(registry),
    ))
}
