//! Value handle behavior across stops, registry changes and path lookups.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{Library, I_ADDRESS, P_ADDRESS, S_ADDRESS};
use prism_core::matcher::TypePattern;
use prism_core::memory::{MemorySource, SnapshotMemory};
use prism_core::types::{Address, TypeCatalog, TypeDescriptor};
use prism_core::value::{DynamicTypeResolver, ValuePhase};
use prism_core::{
    DynamicPreference, Formatter, FormatterError, FormatterRegistry, MatchOutcome, ReadError, Result,
    SyntheticProvider, Target, ValueHandle,
};

#[test]
fn test_values_recompute_after_stop()
{
    let target = common::target(Library::LibCxx);
    let i = target.value_at("i", Address::new(I_ADDRESS), "std::__1::atomic<int>").unwrap();
    let value = i.child_at_index(0).unwrap();
    assert_eq!(value.value_as_unsigned(0), 5);

    target.notify_resumed();
    assert_eq!(value.error(), Some(ReadError::TargetRunning));
    assert_eq!(value.value_as_unsigned(0), 0);

    target.replace_memory(Arc::new(common::memory(7)));
    target.notify_stopped();
    assert_eq!(i.value_as_unsigned(0), 7);
    assert_eq!(value.value_as_unsigned(0), 7);
    assert_eq!(i.summary().as_deref(), Some("7"));
}

#[test]
fn test_children_are_stable_within_a_stop()
{
    let target = common::target(Library::MsvcStl);
    let i = target.value_at("i", Address::new(I_ADDRESS), "std::atomic<int>").unwrap();
    assert_eq!(i.num_children(), i.num_children());

    let first = i.child_at_index(0).unwrap();
    let second = i.child_at_index(0).unwrap();
    assert!(first.is_same(&second));
    assert_eq!(i.phase(), ValuePhase::ChildrenComputed);

    assert!(matches!(
        i.child_at_index(1),
        Err(FormatterError::IndexOutOfRange { index: 1, count: 1 })
    ));
}

#[test]
fn test_path_errors()
{
    let target = common::target(Library::LibCxx);
    let p = target.value_at("p", Address::new(P_ADDRESS), "Parent").unwrap();

    match p.value_for_path("child.nope") {
        Err(FormatterError::NoSuchMember { value, member }) => {
            assert_eq!(value, "p.child");
            assert_eq!(member, "nope");
        }
        other => panic!("expected NoSuchMember, got {:?}", other.map(|v| v.path_expression())),
    }
    assert!(matches!(
        p.value_for_path("child..parent"),
        Err(FormatterError::InvalidArgument(_))
    ));
    assert!(matches!(
        p.value_for_path("child[3]"),
        Err(FormatterError::IndexOutOfRange { index: 3, count: 1 })
    ));
}

struct NoChildren;

impl SyntheticProvider for NoChildren
{
    fn num_children(&self, _value: &ValueHandle) -> usize
    {
        0
    }

    fn child_at_index(&self, _value: &ValueHandle, index: usize) -> Result<ValueHandle>
    {
        Err(FormatterError::IndexOutOfRange { index, count: 0 })
    }

    fn index_of_child(&self, _name: &str) -> Option<usize>
    {
        None
    }
}

#[test]
fn test_higher_priority_category_wins()
{
    let registry = FormatterRegistry::with_builtin();
    let target = common::target_with_registry(Library::LibCxx, registry);
    let i = target.value_at("i", Address::new(I_ADDRESS), "std::__1::atomic<int>").unwrap();
    assert_eq!(i.formatter_category().as_deref(), Some("libcxx"));

    let registry = target.registry();
    assert!(registry.create_category("user", 10, true));
    registry.register(
        TypePattern::exact("std::__1::atomic<int>"),
        "user",
        0,
        Formatter::synthetic(|_| Some(Box::new(NoChildren) as Box<dyn SyntheticProvider>)),
    );

    assert_eq!(i.formatter_category().as_deref(), Some("user"));
    assert_eq!(i.num_children(), 0);

    registry.set_category_enabled("user", false).unwrap();
    assert_eq!(i.formatter_category().as_deref(), Some("libcxx"));
    assert!(registry.set_category_enabled("nobody", true).is_err());
}

#[test]
fn test_malformed_names_are_declined()
{
    let pattern = TypePattern::template("std::atomic", 1);
    assert_eq!(pattern.matches("std::atomic<int"), MatchOutcome::Declined);
    assert_eq!(pattern.matches("std::atomic<>"), MatchOutcome::Declined);
    assert_eq!(pattern.matches("std::atomic<int>"), MatchOutcome::Matched);
    assert_eq!(pattern.matches("std::atomic_flag"), MatchOutcome::NoMatch);
}

/// Reports `Derived` when the first word of the object is the marker.
struct MarkerResolver;

impl DynamicTypeResolver for MarkerResolver
{
    fn dynamic_type_name(&self, memory: &dyn MemorySource, address: Address, ty: &TypeDescriptor) -> Option<String>
    {
        if ty.name() != "Base" {
            return None;
        }
        let bytes = memory.read_bytes(address, 8).ok()?;
        let marker = u64::from_le_bytes(bytes.try_into().ok()?);
        (marker == 0xd).then(|| "Derived".to_string())
    }
}

#[test]
fn test_dynamic_type_resolution()
{
    let catalog = TypeCatalog::new("dynamic");
    let long = catalog.resolve("unsigned long").unwrap();
    let int = catalog.resolve("int").unwrap();
    let base = catalog.insert(TypeDescriptor::structure("Base", 8).with_field("tag", long, 0));
    catalog.insert(
        TypeDescriptor::structure("Derived", 16)
            .with_base(base, 0)
            .with_field("extra", int, 8),
    );

    let mut bytes = 0xdu64.to_le_bytes().to_vec();
    bytes.extend_from_slice(&[9, 0, 0, 0, 0, 0, 0, 0]);
    let mut memory = SnapshotMemory::new();
    memory.add_region(Address::new(0x2000), bytes);

    let target = Arc::new(
        Target::new(
            Arc::new(memory),
            Arc::new(catalog),
            Arc::new(FormatterRegistry::with_builtin()),
        )
        .with_dynamic_resolver(Arc::new(MarkerResolver)),
    );
    let obj = target.value_at("obj", Address::new(0x2000), "Base").unwrap();
    assert_eq!(obj.type_name(), "Base");
    assert_eq!(obj.num_children(), 1);

    obj.set_prefer_dynamic(DynamicPreference::DontRunTarget);
    assert_eq!(obj.type_name(), "Derived");
    assert_eq!(obj.num_children(), 2);
    assert_eq!(obj.value_for_path("extra").unwrap().value_as_unsigned(0), 9);
}

/// Snapshot that counts how often it is read.
struct CountingMemory
{
    inner: SnapshotMemory,
    reads: AtomicUsize,
}

impl CountingMemory
{
    fn new(inner: SnapshotMemory) -> Self
    {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    fn reads(&self) -> usize
    {
        self.reads.load(Ordering::SeqCst)
    }
}

impl MemorySource for CountingMemory
{
    fn read_bytes(&self, address: Address, size: usize) -> std::result::Result<Vec<u8>, ReadError>
    {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_bytes(address, size)
    }
}

fn counting_target(library: Library) -> (Arc<Target>, Arc<CountingMemory>)
{
    let memory = Arc::new(CountingMemory::new(common::memory(5)));
    let target = Arc::new(Target::new(
        memory.clone(),
        Arc::new(common::catalog(library)),
        Arc::new(FormatterRegistry::with_builtin()),
    ));
    (target, memory)
}

#[test]
fn test_summary_never_reads_memory()
{
    let (target, memory) = counting_target(Library::LibCxx);
    let i = target.value_at("i", Address::new(I_ADDRESS), "std::__1::atomic<int>").unwrap();

    assert_eq!(i.summary(), None);
    assert_eq!(memory.reads(), 0);

    assert_eq!(i.child_at_index(0).unwrap().value_as_unsigned(0), 5);
    let after_child = memory.reads();
    assert_eq!(i.summary().as_deref(), Some("5"));
    assert_eq!(memory.reads(), after_child);
}

#[test]
fn test_members_share_one_parent_read()
{
    let (target, memory) = counting_target(Library::MsvcStl);
    let s = target.value_at("s", Address::new(S_ADDRESS), "std::atomic<S>").unwrap();
    let inner = s.child_at_index(0).unwrap();
    assert_eq!(memory.reads(), 0);

    let x = inner.value_for_path("x").unwrap();
    let y = inner.value_for_path("y").unwrap();
    assert_eq!((x.value_as_unsigned(0), y.value_as_unsigned(0)), (1, 2));
    // `s` is read once; its wrapped `S` and both fields are cut from those bytes.
    assert_eq!(memory.reads(), 1);
}

#[test]
fn test_member_lookup_on_self_based_type_terminates()
{
    let catalog = TypeCatalog::new("self-based");
    let pointer = Arc::new(TypeDescriptor::pointer("Node", 8));
    let atomic = Library::LibCxx.insert_atomic(&catalog, "Node *", pointer);
    catalog.insert(TypeDescriptor::structure("Node", 8).with_base(atomic, 0));

    let mut memory = SnapshotMemory::new();
    memory.add_region(Address::new(0x5000), 0x5000u64.to_le_bytes().to_vec());
    let target = Arc::new(Target::new(
        Arc::new(memory),
        Arc::new(catalog),
        Arc::new(FormatterRegistry::with_builtin()),
    ));
    let node = target.value_at("node", Address::new(0x5000), "Node").unwrap();

    match node.value_for_path("missing") {
        Err(FormatterError::NoSuchMember { value, member }) => {
            assert_eq!(value, "node");
            assert_eq!(member, "missing");
        }
        other => panic!("expected NoSuchMember, got {:?}", other.map(|v| v.path_expression())),
    }
    assert_eq!(node.value_for_path("Value").unwrap().value_as_unsigned(0), 0x5000);
    assert_eq!(node.value_for_path("Value->Value").unwrap().value_as_unsigned(0), 0x5000);
}
