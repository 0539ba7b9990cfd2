//! Built-in snapshot with the atomic variables used to exercise the
//! formatters without a live process.
//!
//! ```c++
//! struct S { int x = 1; int y = 2; };
//! struct Parent { struct Child { std::atomic<Parent *> parent; } child; };
//!
//! std::atomic<S> s{S()};
//! std::atomic<int> i{5};
//! Parent p;  // p.child.parent == &p
//! ```

use std::str::FromStr;
use std::sync::Arc;

use prism_core::formatters::AtomicLayout;
use prism_core::memory::SnapshotMemory;
use prism_core::types::{Address, TemplateArg, TypeCatalog, TypeDescriptor};
use prism_core::Result;

const S_ADDRESS: u64 = 0x7ffc_0000_1000;
const I_ADDRESS: u64 = 0x7ffc_0000_1010;
const P_ADDRESS: u64 = 0x7ffc_0000_1020;

/// Standard library whose atomic layout the snapshot uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoLibrary
{
    LibCxx,
    MsvcStl,
}

impl FromStr for DemoLibrary
{
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err>
    {
        match s {
            "libcxx" | "libc++" => Ok(DemoLibrary::LibCxx),
            "msvcstl" | "msvc" => Ok(DemoLibrary::MsvcStl),
            _ => Err(format!("unknown library `{s}` (use libcxx or msvcstl)")),
        }
    }
}

impl DemoLibrary
{
    pub fn layout(self) -> AtomicLayout
    {
        match self {
            DemoLibrary::LibCxx => AtomicLayout::LibCxx,
            DemoLibrary::MsvcStl => AtomicLayout::MsvcStl,
        }
    }

    fn atomic_name(self, arg: &str) -> String
    {
        match self {
            DemoLibrary::LibCxx => format!("std::__1::atomic<{arg}>"),
            DemoLibrary::MsvcStl => format!("std::atomic<{arg}>"),
        }
    }

    /// Insert the library's wrapper chain around `value`.
    fn insert_atomic(self, catalog: &TypeCatalog, arg: &str, value: Arc<TypeDescriptor>) -> Arc<TypeDescriptor>
    {
        let size = value.byte_size();
        let name = self.atomic_name(arg);
        let wrapper = match self {
            DemoLibrary::LibCxx => {
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
                TypeDescriptor::structure(name.clone(), size).with_base(atomic_base, 0)
            }
            DemoLibrary::MsvcStl => {
                let padded = Arc::new(
                    TypeDescriptor::structure(format!("std::_Atomic_padded<{arg}>"), size)
                        .with_field("_Value", value, 0),
                );
                let storage = Arc::new(
                    TypeDescriptor::structure(format!("std::_Atomic_storage<{arg}, {size}>"), size)
                        .with_field("_Storage", padded, 0),
                );
                TypeDescriptor::structure(name.clone(), size).with_base(storage, 0)
            }
        };
        catalog.insert(wrapper.with_template_arg(TemplateArg::Type(arg.to_string())))
    }
}

/// A root variable of the snapshot.
#[derive(Debug, Clone)]
pub struct DemoVariable
{
    pub name: &'static str,
    pub address: Address,
    pub type_name: String,
}

/// Types, memory and variables of the snapshot.
pub struct Demo
{
    pub catalog: TypeCatalog,
    pub memory: SnapshotMemory,
    pub variables: Vec<DemoVariable>,
}

/// Build the snapshot for `library`.
///
/// ## Errors
///
/// Returns `UnknownType` if the catalog lacks the `int` builtin.
pub fn build(library: DemoLibrary) -> Result<Demo>
{
    let catalog = TypeCatalog::new(format!("demo-{}", library.layout().category()));
    let int = catalog.resolve("int")?;

    let s = catalog.insert(
        TypeDescriptor::structure("S", 8)
            .with_field("x", int.clone(), 0)
            .with_field("y", int.clone(), 4),
    );
    let s_atomic = library.insert_atomic(&catalog, "S", s);
    let i_atomic = library.insert_atomic(&catalog, "int", int);

    let parent_ptr = Arc::new(TypeDescriptor::pointer("Parent", catalog.pointer_size()));
    let parent_atomic = library.insert_atomic(&catalog, "Parent *", parent_ptr);
    let child = catalog.insert(TypeDescriptor::structure("Parent::Child", 8).with_field("parent", parent_atomic, 0));
    catalog.insert(TypeDescriptor::structure("Parent", 8).with_field("child", child, 0));

    let mut memory = SnapshotMemory::new();
    let mut s_bytes = 1i32.to_le_bytes().to_vec();
    s_bytes.extend_from_slice(&2i32.to_le_bytes());
    memory
        .add_region(Address::new(S_ADDRESS), s_bytes)
        .add_region(Address::new(I_ADDRESS), 5i32.to_le_bytes().to_vec())
        .add_region(Address::new(P_ADDRESS), P_ADDRESS.to_le_bytes().to_vec());

    let variables = vec![
        DemoVariable {
            name: "s",
            address: Address::new(S_ADDRESS),
            type_name: s_atomic.name().to_string(),
        },
        DemoVariable {
            name: "i",
            address: Address::new(I_ADDRESS),
            type_name: i_atomic.name().to_string(),
        },
        DemoVariable {
            name: "p",
            address: Address::new(P_ADDRESS),
            type_name: "Parent".to_string(),
        },
    ];

    Ok(Demo {
        catalog,
        memory,
        variables,
    })
}
