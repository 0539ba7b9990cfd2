//! End-to-end tests for the `std::atomic<T>` formatters across standard
//! library layouts.

mod common;

use std::sync::Arc;

use common::{Library, I_ADDRESS, P_ADDRESS, S_ADDRESS};
use prism_core::memory::SnapshotMemory;
use prism_core::render::{render, RenderOptions};
use prism_core::types::{Address, TypeDescriptor};
use prism_core::{DynamicPreference, FormatterRegistry, ReadError, Target, ValueHandle};

fn variable(target: &Arc<Target>, library: Library, name: &str) -> ValueHandle
{
    let (address, type_name) = match name {
        "s" => (S_ADDRESS, library.atomic_name("S")),
        "i" => (I_ADDRESS, library.atomic_name("int")),
        "p" => (P_ADDRESS, "Parent".to_string()),
        other => panic!("no fixture variable {other}"),
    };
    let value = target.value_at(name, Address::new(address), &type_name).unwrap();
    value.set_prefer_dynamic(DynamicPreference::CanRunTarget);
    value.set_prefer_synthetic(true);
    value
}

#[test]
fn test_atomic_scalar_and_struct_children()
{
    for library in [Library::LibCxx, Library::MsvcStl] {
        let target = common::target(library);
        let s = variable(&target, library, "s");
        let i = variable(&target, library, "i");

        assert_eq!(s.num_children(), 1, "{library:?}");
        assert_eq!(i.num_children(), 1, "{library:?}");
        assert_eq!(i.formatter_category().as_deref(), Some(library.category()));

        let value = i.child_at_index(0).unwrap();
        assert_eq!(value.name(), "Value");
        assert_eq!(value.value_as_unsigned(0), 5);
        assert_eq!(i.value_as_unsigned(0), 5, "{library:?}");

        let inner = s.child_at_index(0).unwrap();
        assert_eq!(inner.num_children(), 2);
        assert_eq!(inner.child_at_index(0).unwrap().value_as_unsigned(0), 1);
        assert_eq!(inner.child_at_index(1).unwrap().value_as_unsigned(0), 2);
    }
}

#[test]
fn test_frame_variable_output()
{
    let target = common::target(Library::LibCxx);
    let options = RenderOptions::default();

    let i = variable(&target, Library::LibCxx, "i");
    assert_eq!(render(&i, &options), "(std::__1::atomic<int>) i = 5 {\n  Value = 5\n}\n");

    let s = variable(&target, Library::LibCxx, "s");
    assert_eq!(
        render(&s, &options),
        "(std::__1::atomic<S>) s = {\n  Value = {\n    x = 1\n    y = 2\n  }\n}\n"
    );
    assert_eq!(
        render(&s, &options.clone().one_line().without_types()),
        "s = { Value = { x = 1, y = 2 } }\n"
    );
}

#[test]
fn test_self_referential_parent()
{
    for library in [Library::LibCxx, Library::MsvcStl] {
        let target = common::target(library);
        let options = RenderOptions::default();
        let p = variable(&target, library, "p");

        let child = p.value_for_path("child").unwrap();
        assert!(render(&child, &options).contains("Value = 0x"));

        let whole = render(&p, &options);
        assert_eq!(
            whole,
            "(Parent) p = {\n  child = {\n    parent = {\n      Value = 0x0000000000001020\n    }\n  }\n}\n"
        );

        let parent = p.value_for_path("child.parent").unwrap();
        assert!(render(&parent, &options).contains("p.child.parent = {\n  Value = 0x"));
    }
}

#[test]
fn test_pointer_depth_follows_one_level()
{
    let target = common::target(Library::LibCxx);
    let p = variable(&target, Library::LibCxx, "p");
    let parent = p.value_for_path("child.parent").unwrap();
    let options = RenderOptions {
        ptr_depth: 1,
        ..RenderOptions::default()
    };
    assert_eq!(
        render(&parent, &options),
        "(std::__1::atomic<Parent *>) p.child.parent = {\n  Value = 0x0000000000001020 {\n    child = {\n      parent = {\n        Value = 0x0000000000001020\n      }\n    }\n  }\n}\n"
    );
}

#[test]
fn test_path_through_atomic_pointer()
{
    let target = common::target(Library::MsvcStl);
    let p = variable(&target, Library::MsvcStl, "p");
    let again = p.value_for_path("child.parent.Value->child.parent").unwrap();
    assert_eq!(again.path_expression(), "p.child.parent.Value->child.parent");
    assert_eq!(again.value_as_unsigned(0), P_ADDRESS);
}

#[test]
fn test_disabled_category_falls_back_to_raw()
{
    let target = common::target(Library::LibCxx);
    let i = variable(&target, Library::LibCxx, "i");
    assert!(i.is_synthetic());

    target.registry().set_category_enabled("libcxx", false).unwrap();
    assert!(!i.is_synthetic());
    assert_eq!(i.summary(), None);
    assert_eq!(i.num_children(), 1);
    assert_eq!(i.child_at_index(0).unwrap().name(), "std::__1::__atomic_base<int>");

    target.registry().set_category_enabled("libcxx", true).unwrap();
    assert_eq!(i.child_at_index(0).unwrap().name(), "Value");
}

#[test]
fn test_raw_preference_shows_members()
{
    let target = common::target(Library::MsvcStl);
    let i = variable(&target, Library::MsvcStl, "i");
    i.set_prefer_synthetic(false);
    assert_eq!(i.child_at_index(0).unwrap().name(), "std::_Atomic_storage<int, 4>");
    i.set_prefer_synthetic(true);
    assert_eq!(i.child_at_index(0).unwrap().name(), "Value");
}

#[test]
fn test_foreign_layout_is_declined()
{
    let target = common::target(Library::LibStdCpp);
    let i = variable(&target, Library::LibStdCpp, "i");
    // msvcstl matches the name but finds no `_Storage`; libstdcpp is off by default.
    assert!(!i.is_synthetic());
    assert_eq!(i.child_at_index(0).unwrap().name(), "_M_i");

    target.registry().set_category_enabled("libstdcpp", true).unwrap();
    assert_eq!(i.formatter_category().as_deref(), Some("libstdcpp"));
    assert_eq!(i.value_as_unsigned(0), 5);
}

#[test]
fn test_unreadable_atomic_keeps_structure()
{
    let target = common::target(Library::LibCxx);
    let bad = target
        .value_at("bad", Address::new(0xdead_0000), "std::__1::atomic<int>")
        .unwrap();
    assert_eq!(bad.num_children(), 1);
    assert_eq!(bad.value_as_unsigned(42), 42);
    assert!(matches!(
        bad.child_at_index(0).unwrap().error(),
        Some(ReadError::Unreadable { .. })
    ));
    let text = render(&bad, &RenderOptions::default().without_types());
    assert!(text.starts_with("bad = {\n  Value = <unreadable: 4 bytes at 0x00000000dead0000"), "{text}");
}

#[test]
fn test_unreadable_sibling_is_isolated()
{
    let catalog = common::catalog(Library::LibCxx);
    let atomic = catalog.resolve("std::__1::atomic<int>").unwrap();
    catalog.insert(
        TypeDescriptor::structure("Pair", 8)
            .with_field("a", atomic.clone(), 0)
            .with_field("b", atomic, 4),
    );
    let mut memory = SnapshotMemory::new();
    memory.add_region(Address::new(0x4000), 5i32.to_le_bytes().to_vec());
    let target = Arc::new(Target::new(
        Arc::new(memory),
        Arc::new(catalog),
        Arc::new(FormatterRegistry::with_builtin()),
    ));

    let pair = target.value_at("pair", Address::new(0x4000), "Pair").unwrap();
    assert!(!pair.is_valid());
    assert_eq!(pair.value_for_path("a").unwrap().value_as_unsigned(0), 5);
    assert!(pair.value_for_path("b.Value").unwrap().error().is_some());
    assert_eq!(pair.value_for_path("b").unwrap().num_children(), 1);
}
