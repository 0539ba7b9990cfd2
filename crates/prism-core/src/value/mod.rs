//! # Value Handles
//!
//! A [`ValueHandle`] is a typed location in the target plus everything the
//! formatter subsystem has worked out about it for the current stop: the
//! bytes read so far, the selected synthetic and summary providers, and the
//! children materialised on request.
//!
//! ## State Machine
//!
//! ```text
//!  Uncomputed --resolve--> Resolved --children--> ChildrenComputed
//!       ^                      |                         |
//!       |                      +---- resume / step ------+--> Stale
//!       +------------------- next access ----------------------+
//! ```
//!
//! - **Resolved**: the dynamic type (if requested) and formatters are bound
//! - **ChildrenComputed**: the child count is fixed for this stop
//! - **Stale**: the [`StopId`] moved on or the registry changed. The next
//!   access drops every cache and recomputes; cached state is never reused
//!   across two stops.
//!
//! ## Ownership
//!
//! Parents own their cached children (`Rc`); children point back through a
//! `Weak` used only to build display paths and to share the parent's byte
//! cache. Nothing is ever expanded eagerly: each call materialises at most
//! one level, so self-referential object graphs are safe to browse without
//! cycle detection.
//!
//! Handles are `!Send`: formatting runs on the debugger's control thread
//! while the target is stopped.

mod path;
mod target;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tracing::{debug, trace, warn};

pub use target::{DynamicTypeResolver, StopId, Target};

use crate::error::{FormatterError, ReadError, Result};
use crate::matcher::candidate_names;
use crate::memory::{interpret_as, interpret_scalar, Scalar, ValueView, MAX_READ_SIZE};
use crate::provider::{Formatter, FormatterKind, SummaryProvider, SyntheticProvider};
use crate::settings::DynamicPreference;
use crate::types::{Address, TypeDescriptor, TypeKind};

/// Where a value's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location
{
    /// In target memory
    Memory(Address),
    /// Already materialised (registers, expression results, slices of those)
    Value(Arc<[u8]>),
    /// No location at this program point
    Unavailable(ReadError),
}

/// Lifecycle phase of a [`ValueHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePhase
{
    Uncomputed,
    Resolved,
    ChildrenComputed,
    Stale,
}

/// How a handle was derived from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin
{
    Root,
    /// Field `n` of the parent's layout
    Member(usize),
    Element(u64),
    Deref,
    Synthetic,
}

type SharedProvider = Rc<RefCell<Box<dyn SyntheticProvider>>>;

struct NodeState
{
    phase: ValuePhase,
    stop_id: StopId,
    generation: u64,
    prefer_synthetic: bool,
    dynamic: DynamicPreference,
    bytes: Option<std::result::Result<Arc<[u8]>, ReadError>>,
    dynamic_type: Option<Arc<TypeDescriptor>>,
    synthetic: Option<(String, SharedProvider)>,
    summary: Option<Arc<dyn SummaryProvider>>,
    num_children: Option<usize>,
    children: Vec<Option<ValueHandle>>,
}

impl NodeState
{
    fn reset(&mut self)
    {
        self.phase = ValuePhase::Uncomputed;
        self.bytes = None;
        self.dynamic_type = None;
        self.synthetic = None;
        self.summary = None;
        self.clear_children();
    }

    fn clear_children(&mut self)
    {
        self.num_children = None;
        self.children.clear();
    }

    fn uses_synthetic(&self) -> Option<SharedProvider>
    {
        if self.prefer_synthetic {
            self.synthetic.as_ref().map(|(_, provider)| provider.clone())
        } else {
            None
        }
    }
}

struct ValueNode
{
    target: Arc<Target>,
    name: String,
    origin: Origin,
    parent: Weak<ValueNode>,
    /// Offset inside the parent's bytes, for members and synthetic children
    parent_offset: Option<u64>,
    location: Location,
    static_type: Arc<TypeDescriptor>,
    state: RefCell<NodeState>,
}

/// A lazily evaluated view of one value in the target.
///
/// Cloning a handle is cheap and shares all caches.
#[derive(Clone)]
pub struct ValueHandle
{
    node: Rc<ValueNode>,
}

impl fmt::Debug for ValueHandle
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ValueHandle")
            .field("path", &self.path_expression())
            .field("type", &self.node.static_type.name())
            .field("location", &self.node.location)
            .finish_non_exhaustive()
    }
}

impl ValueHandle
{
    #[allow(clippy::too_many_arguments)]
    fn build(
        target: Arc<Target>,
        name: String,
        origin: Origin,
        parent: Weak<ValueNode>,
        parent_offset: Option<u64>,
        location: Location,
        ty: Arc<TypeDescriptor>,
        preferences: (bool, DynamicPreference),
    ) -> Self
    {
        let stop_id = target.stop_id();
        let generation = target.registry().generation();
        Self {
            node: Rc::new(ValueNode {
                target,
                name,
                origin,
                parent,
                parent_offset,
                location,
                static_type: ty,
                state: RefCell::new(NodeState {
                    phase: ValuePhase::Uncomputed,
                    stop_id,
                    generation,
                    prefer_synthetic: preferences.0,
                    dynamic: preferences.1,
                    bytes: None,
                    dynamic_type: None,
                    synthetic: None,
                    summary: None,
                    num_children: None,
                    children: Vec::new(),
                }),
            }),
        }
    }

    fn root(target: &Arc<Target>, name: &str, location: Location, ty: Arc<TypeDescriptor>) -> Self
    {
        let settings = target.settings();
        let preferences = (settings.prefer_synthetic, settings.dynamic);
        Self::build(
            target.clone(),
            name.to_string(),
            Origin::Root,
            Weak::new(),
            None,
            location,
            ty,
            preferences,
        )
    }

    /// A root value of type `ty` stored at `address`.
    pub fn at_address(target: &Arc<Target>, name: &str, address: Address, ty: Arc<TypeDescriptor>) -> Self
    {
        Self::root(target, name, Location::Memory(address), ty)
    }

    /// A root value with known contents.
    pub fn from_bytes(target: &Arc<Target>, name: &str, bytes: &[u8], ty: Arc<TypeDescriptor>) -> Self
    {
        Self::root(target, name, Location::Value(Arc::from(bytes)), ty)
    }

    /// A root value that has no location (optimized out, unreadable register).
    pub fn unavailable(target: &Arc<Target>, name: &str, ty: Arc<TypeDescriptor>, reason: ReadError) -> Self
    {
        Self::root(target, name, Location::Unavailable(reason), ty)
    }

    /// A child `offset` bytes into this value.
    ///
    /// Used by synthetic providers to expose storage at a layout-derived
    /// offset. Nothing is read until the child's value is requested.
    pub fn child_at_offset(&self, name: impl Into<String>, offset: u64, ty: Arc<TypeDescriptor>) -> ValueHandle
    {
        self.derive(name.into(), Origin::Synthetic, offset, ty)
    }

    fn derive(&self, name: String, origin: Origin, offset: u64, ty: Arc<TypeDescriptor>) -> ValueHandle
    {
        let size = usize::try_from(ty.byte_size()).unwrap_or(usize::MAX);
        let location = match &self.node.location {
            Location::Memory(address) => match address.offset(offset) {
                Some(address) => Location::Memory(address),
                None => Location::Unavailable(ReadError::unreadable(*address, size, "member offset overflows")),
            },
            Location::Value(bytes) => {
                let range = usize::try_from(offset)
                    .ok()
                    .and_then(|start| start.checked_add(size).map(|end| start..end))
                    .filter(|range| range.end <= bytes.len());
                match range {
                    Some(range) => Location::Value(Arc::from(&bytes[range])),
                    None => Location::Unavailable(ReadError::unreadable(
                        Address::NULL,
                        size,
                        format!("member at offset {offset} is outside the value"),
                    )),
                }
            }
            Location::Unavailable(reason) => Location::Unavailable(reason.clone()),
        };

        let preferences = {
            let state = self.node.state.borrow();
            (state.prefer_synthetic, state.dynamic)
        };
        Self::build(
            self.node.target.clone(),
            name,
            origin,
            Rc::downgrade(&self.node),
            Some(offset),
            location,
            ty,
            preferences,
        )
    }

    pub fn name(&self) -> &str
    {
        &self.node.name
    }

    pub fn target(&self) -> &Arc<Target>
    {
        &self.node.target
    }

    pub fn location(&self) -> &Location
    {
        &self.node.location
    }

    /// Address of the value, if it lives in target memory.
    pub fn address(&self) -> Option<Address>
    {
        match self.node.location {
            Location::Memory(address) => Some(address),
            _ => None,
        }
    }

    /// Declared type.
    pub fn static_type(&self) -> &Arc<TypeDescriptor>
    {
        &self.node.static_type
    }

    /// Dynamic type when one was resolved, otherwise the declared type.
    pub fn value_type(&self) -> Arc<TypeDescriptor>
    {
        self.ensure_current();
        self.node
            .state
            .borrow()
            .dynamic_type
            .clone()
            .unwrap_or_else(|| self.node.static_type.clone())
    }

    pub fn type_name(&self) -> String
    {
        self.value_type().name().to_string()
    }

    /// Parent handle, if this value was derived from one that is still alive.
    pub fn parent(&self) -> Option<ValueHandle>
    {
        self.node.parent.upgrade().map(|node| ValueHandle { node })
    }

    /// Whether `self` and `other` are the same handle (not just equal values).
    pub fn is_same(&self, other: &ValueHandle) -> bool
    {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Current lifecycle phase. Detects staleness but does not recompute.
    pub fn phase(&self) -> ValuePhase
    {
        let mut state = self.node.state.borrow_mut();
        if state.phase != ValuePhase::Uncomputed && self.is_outdated(&state) {
            state.phase = ValuePhase::Stale;
        }
        state.phase
    }

    /// Stop the cached state belongs to.
    pub fn stop_id(&self) -> StopId
    {
        self.node.state.borrow().stop_id
    }

    pub fn prefer_synthetic(&self) -> bool
    {
        self.node.state.borrow().prefer_synthetic
    }

    /// Choose between synthetic and raw children.
    pub fn set_prefer_synthetic(&self, prefer: bool)
    {
        let mut state = self.node.state.borrow_mut();
        if state.prefer_synthetic != prefer {
            state.prefer_synthetic = prefer;
            state.clear_children();
        }
    }

    pub fn dynamic_preference(&self) -> DynamicPreference
    {
        self.node.state.borrow().dynamic
    }

    /// Choose whether formatters see the dynamic type.
    pub fn set_prefer_dynamic(&self, preference: DynamicPreference)
    {
        let mut state = self.node.state.borrow_mut();
        if state.dynamic.effective() != preference.effective() {
            state.reset();
        }
        state.dynamic = preference;
    }

    /// Category of the selected synthetic provider.
    pub fn formatter_category(&self) -> Option<String>
    {
        self.ensure_current();
        self.node
            .state
            .borrow()
            .synthetic
            .as_ref()
            .map(|(category, _)| category.clone())
    }

    /// Whether children currently come from a synthetic provider.
    pub fn is_synthetic(&self) -> bool
    {
        self.ensure_current();
        self.node.state.borrow().uses_synthetic().is_some()
    }

    fn is_outdated(&self, state: &NodeState) -> bool
    {
        state.stop_id != self.node.target.stop_id() || state.generation != self.node.target.registry().generation()
    }

    /// Bring the handle up to date with the target's current stop.
    fn ensure_current(&self)
    {
        {
            let mut state = self.node.state.borrow_mut();
            if state.phase != ValuePhase::Uncomputed && self.is_outdated(&state) {
                state.phase = ValuePhase::Stale;
            }
            match state.phase {
                ValuePhase::Resolved | ValuePhase::ChildrenComputed => return,
                ValuePhase::Stale => {
                    debug!(path = %self.node.name, from = %state.stop_id, "recomputing stale value");
                    state.reset();
                }
                ValuePhase::Uncomputed => {}
            }
        }
        self.resolve();
    }

    /// Recompute everything from scratch.
    ///
    /// ## Errors
    ///
    /// Returns `Unreadable` if the value's own bytes can't be read. The
    /// handle stays usable and reports the error through [`Self::error`].
    pub fn update(&self) -> Result<()>
    {
        self.node.state.borrow_mut().reset();
        self.resolve();
        match self.data() {
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Uncomputed -> Resolved: bind the dynamic type and formatters.
    fn resolve(&self)
    {
        let target = self.node.target.clone();
        let dynamic = {
            let mut state = self.node.state.borrow_mut();
            state.stop_id = target.stop_id();
            state.generation = target.registry().generation();
            // Accessors called from factories below must not re-enter resolve.
            state.phase = ValuePhase::Resolved;
            state.dynamic
        };

        let dynamic_type = if dynamic.effective().is_enabled() {
            self.resolve_dynamic_type()
        } else {
            None
        };
        if let Some(ty) = &dynamic_type {
            self.node.state.borrow_mut().dynamic_type = Some(ty.clone());
        }

        let names = candidate_names(dynamic_type.as_deref(), &self.node.static_type);
        let mut selected = None;
        for candidate in target.registry().candidates(&names, FormatterKind::Synthetic) {
            let Formatter::Synthetic(factory) = candidate.formatter else {
                continue;
            };
            let Some(mut provider) = factory(self) else {
                debug!(path = %self.node.name, category = %candidate.category, pattern = %candidate.pattern, "provider declined");
                continue;
            };
            if let Err(err) = provider.update(self) {
                warn!(path = %self.node.name, category = %candidate.category, error = %err, "provider update failed");
                continue;
            }
            debug!(
                path = %self.node.name,
                type_name = %names[0],
                category = %candidate.category,
                pattern = %candidate.pattern,
                "selected synthetic provider"
            );
            selected = Some((candidate.category, Rc::new(RefCell::new(provider))));
            break;
        }
        let summary = target.registry().summary_for(&names);

        let mut state = self.node.state.borrow_mut();
        state.synthetic = selected;
        state.summary = summary;
        state.clear_children();
        state.phase = ValuePhase::Resolved;
    }

    fn resolve_dynamic_type(&self) -> Option<Arc<TypeDescriptor>>
    {
        let target = &self.node.target;
        let resolver = target.dynamic_resolver()?;
        let address = self.address()?;
        if target.is_running() {
            return None;
        }
        let memory = target.memory();
        let name = resolver.dynamic_type_name(memory.as_ref(), address, &self.node.static_type)?;
        match target.catalog().resolve(&name) {
            Ok(ty) => {
                trace!(path = %self.node.name, dynamic = %name, "resolved dynamic type");
                Some(ty)
            }
            Err(err) => {
                debug!(path = %self.node.name, dynamic = %name, error = %err, "dynamic type not in catalog");
                None
            }
        }
    }

    /// Bytes of the value, read at most once per stop.
    ///
    /// ## Errors
    ///
    /// The [`ReadError`] from the Value Access Layer. It only affects this
    /// value; siblings read independently.
    pub fn data(&self) -> std::result::Result<Arc<[u8]>, ReadError>
    {
        self.ensure_current();
        if let Some(cached) = self.node.state.borrow().bytes.clone() {
            return cached;
        }
        let bytes = self.load_bytes();
        if let Err(err) = &bytes {
            warn!(path = %self.path_expression(), error = %err, "value is unreadable");
        }
        self.node.state.borrow_mut().bytes = Some(bytes.clone());
        bytes
    }

    fn load_bytes(&self) -> std::result::Result<Arc<[u8]>, ReadError>
    {
        let ty = self.value_type();
        let size = usize::try_from(ty.byte_size()).unwrap_or(usize::MAX);
        match &self.node.location {
            Location::Unavailable(reason) => Err(reason.clone()),
            Location::Value(bytes) => {
                if bytes.len() < size {
                    return Err(ReadError::unreadable(
                        Address::NULL,
                        size,
                        format!("only {} bytes available", bytes.len()),
                    ));
                }
                Ok(bytes.clone())
            }
            Location::Memory(address) => {
                if let Some(bytes) = self.slice_of_parent(size) {
                    return Ok(bytes);
                }
                if size > MAX_READ_SIZE {
                    return Err(ReadError::unreadable(*address, size, "value exceeds the read limit"));
                }
                self.node.target.read_memory(*address, size).map(Arc::from)
            }
        }
    }

    /// This value's bytes cut out of the parent's, when the parent is readable.
    fn slice_of_parent(&self, size: usize) -> Option<Arc<[u8]>>
    {
        let offset = usize::try_from(self.node.parent_offset?).ok()?;
        let parent = self.parent()?;
        if parent.address().is_none() || parent.value_type().byte_size() > MAX_READ_SIZE as u64 {
            return None;
        }
        let bytes = parent.data().ok()?;
        if let Origin::Member(index) = self.node.origin {
            let parent_type = parent.value_type();
            if let Ok(ValueView::Aggregate(fields)) = interpret_as(&bytes, &parent_type, self.node.target.byte_order()) {
                return fields
                    .get(index)
                    .filter(|view| view.bytes.len() == size)
                    .map(|view| Arc::from(view.bytes));
            }
        }
        let end = offset.checked_add(size)?;
        bytes.get(offset..end).map(Arc::from)
    }

    /// The read error for this value, if its bytes can't be read.
    pub fn error(&self) -> Option<ReadError>
    {
        self.data().err()
    }

    /// Whether the value's bytes can be read.
    pub fn is_valid(&self) -> bool
    {
        self.error().is_none()
    }

    /// The value as a scalar.
    ///
    /// Scalars, enums and pointers decode their own bytes. Other values use
    /// their synthetic value (an atomic's wrapped scalar), if they have one.
    ///
    /// ## Errors
    ///
    /// - `Unreadable`: the bytes can't be read
    /// - `InvalidArgument`: the value is an aggregate with no synthetic value
    pub fn scalar(&self) -> Result<Scalar>
    {
        let ty = self.value_type();
        if ty.is_scalar() || ty.is_pointer() {
            let bytes = self.data()?;
            return interpret_scalar(&bytes, &ty, self.node.target.byte_order());
        }
        if let Some(value) = self.synthetic_value() {
            return value.scalar();
        }
        Err(FormatterError::InvalidArgument(format!(
            "`{}` of type `{}` has no scalar value",
            self.path_expression(),
            ty.name()
        )))
    }

    /// Scalar value as `u64`, or `default` if there is none.
    pub fn value_as_unsigned(&self, default: u64) -> u64
    {
        self.scalar().map_or(default, |scalar| scalar.as_u64())
    }

    /// Scalar value as `i64`, or `default` if there is none.
    pub fn value_as_signed(&self, default: i64) -> i64
    {
        self.scalar().map_or(default, |scalar| scalar.as_i64())
    }

    /// Literal text of a scalar value (`5`, `true`, `0x00007ffc...`).
    pub fn value_string(&self) -> Option<String>
    {
        let ty = self.value_type();
        if !(ty.is_scalar() || ty.is_pointer()) {
            return None;
        }
        self.scalar().ok().map(|scalar| scalar.to_string())
    }

    /// One-line summary from the matching summary provider.
    pub fn summary(&self) -> Option<String>
    {
        self.ensure_current();
        let provider = self.node.state.borrow().summary.clone()?;
        provider.summarize(self)
    }

    /// The child that stands in for this value, if the synthetic provider
    /// designates one.
    pub fn synthetic_value(&self) -> Option<ValueHandle>
    {
        self.ensure_current();
        let provider = self.node.state.borrow().uses_synthetic()?;
        let index = provider.borrow().value_index()?;
        self.child_at_index(index).ok()
    }

    /// Number of children. Fixed for the rest of the stop once computed.
    pub fn num_children(&self) -> usize
    {
        self.ensure_current();
        if let Some(count) = self.node.state.borrow().num_children {
            return count;
        }

        let provider = self.node.state.borrow().uses_synthetic();
        let count = match provider {
            Some(provider) => provider.borrow().num_children(self),
            None => self.raw_num_children(),
        };
        let count = count.min(self.node.target.settings().max_children);

        let mut state = self.node.state.borrow_mut();
        state.num_children = Some(count);
        state.children = vec![None; count];
        state.phase = ValuePhase::ChildrenComputed;
        count
    }

    /// Whether the value could have children, without counting them.
    pub fn might_have_children(&self) -> bool
    {
        self.ensure_current();
        let provider = self.node.state.borrow().uses_synthetic();
        match provider {
            Some(provider) => provider.borrow().might_have_children(),
            None => {
                let ty = self.value_type();
                ty.is_aggregate() || ty.is_pointer()
            }
        }
    }

    /// Child `index`, created on first request and cached for the stop.
    ///
    /// ## Errors
    ///
    /// - `IndexOutOfRange`: `index >= num_children()`
    /// - `UnknownType`: a pointee type can't be resolved
    pub fn child_at_index(&self, index: usize) -> Result<ValueHandle>
    {
        let count = self.num_children();
        if index >= count {
            return Err(FormatterError::IndexOutOfRange { index, count });
        }
        if let Some(child) = self.cached_child(index) {
            return Ok(child);
        }

        let provider = self.node.state.borrow().uses_synthetic();
        let child = match provider {
            Some(provider) => provider.borrow().child_at_index(self, index)?,
            None => self.raw_child_at_index(index)?,
        };
        trace!(parent = %self.node.name, index, child = %child.name(), "materialised child");

        let mut state = self.node.state.borrow_mut();
        if let Some(slot) = state.children.get_mut(index) {
            *slot = Some(child.clone());
        }
        Ok(child)
    }

    /// Child `index` if it has already been materialised this stop.
    pub fn cached_child(&self, index: usize) -> Option<ValueHandle>
    {
        let state = self.node.state.borrow();
        if self.is_outdated(&state) {
            return None;
        }
        state.children.get(index).cloned().flatten()
    }

    /// Whether this value's bytes were already read (successfully) this stop.
    pub fn has_cached_data(&self) -> bool
    {
        let state = self.node.state.borrow();
        !self.is_outdated(&state) && matches!(state.bytes, Some(Ok(_)))
    }

    /// Index of the child called `name`.
    pub fn index_of_child(&self, name: &str) -> Option<usize>
    {
        let count = self.num_children();
        let provider = self.node.state.borrow().uses_synthetic();
        if let Some(provider) = provider {
            return provider.borrow().index_of_child(name).filter(|index| *index < count);
        }
        let ty = self.value_type();
        let ty = ty.canonical();
        match ty.kind() {
            TypeKind::Aggregate(_) => ty.field_index(name).filter(|index| *index < count),
            _ => (0..count).find(|index| self.child_at_index(*index).is_ok_and(|child| child.name() == name)),
        }
    }

    fn raw_num_children(&self) -> usize
    {
        let ty = self.value_type();
        let ty = ty.canonical();
        match ty.kind() {
            TypeKind::Aggregate(_) => ty.fields().len(),
            TypeKind::Array { count, .. } => usize::try_from(*count).unwrap_or(usize::MAX),
            TypeKind::Pointer { .. } | TypeKind::Reference { .. } => usize::from(self.pointee_type().is_some()),
            _ => 0,
        }
    }

    fn raw_child_at_index(&self, index: usize) -> Result<ValueHandle>
    {
        let ty = self.value_type();
        let ty = ty.canonical();
        match ty.kind() {
            TypeKind::Aggregate(_) => {
                let field = &ty.fields()[index];
                Ok(self.derive(field.name.clone(), Origin::Member(index), field.offset, field.ty.clone()))
            }
            TypeKind::Array { element, .. } => {
                let index = index as u64;
                let offset = index.saturating_mul(element.byte_size());
                Ok(self.derive(format!("[{index}]"), Origin::Element(index), offset, element.clone()))
            }
            TypeKind::Pointer { .. } | TypeKind::Reference { .. } => self.dereference(),
            _ => Err(FormatterError::IndexOutOfRange { index, count: 0 }),
        }
    }

    /// Pointee type of a non-null pointer whose type the catalog knows.
    fn pointee_type(&self) -> Option<Arc<TypeDescriptor>>
    {
        let ty = self.value_type();
        let pointee = ty.pointee_name()?;
        let resolved = self.node.target.catalog().resolve(pointee).ok()?;
        if matches!(resolved.canonical().kind(), TypeKind::Void) {
            return None;
        }
        let address = self.scalar().ok()?.as_u64();
        (address != 0).then_some(resolved)
    }

    /// The object a pointer or reference refers to.
    ///
    /// A fresh handle is built on each call that isn't served from the
    /// child cache; nothing behind it is read until requested.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: not a pointer, or the pointer is unreadable
    /// - `UnknownType`: the pointee type can't be resolved
    pub fn dereference(&self) -> Result<ValueHandle>
    {
        let ty = self.value_type();
        let Some(pointee) = ty.pointee_name() else {
            return Err(FormatterError::InvalidArgument(format!(
                "`{}` of type `{}` is not a pointer",
                self.path_expression(),
                ty.name()
            )));
        };
        let pointee = self.node.target.catalog().resolve(pointee)?;
        let address = Address::new(self.scalar()?.as_u64());
        let preferences = {
            let state = self.node.state.borrow();
            (state.prefer_synthetic, state.dynamic)
        };
        Ok(Self::build(
            self.node.target.clone(),
            format!("*{}", self.node.name),
            Origin::Deref,
            Rc::downgrade(&self.node),
            None,
            Location::Memory(address),
            pointee,
            preferences,
        ))
    }

    /// Expression that names this value (`p.child.parent`, `arr[2]`, `ptr->x`).
    pub fn path_expression(&self) -> String
    {
        let Some(parent) = self.parent() else {
            return self.node.name.clone();
        };
        match self.node.origin {
            Origin::Root => self.node.name.clone(),
            Origin::Element(index) => format!("{}[{index}]", parent.path_expression()),
            Origin::Deref => format!("*{}", parent.path_expression()),
            Origin::Member(_) | Origin::Synthetic => {
                if parent.node.origin == Origin::Deref {
                    match parent.parent() {
                        Some(pointer) => format!("{}->{}", pointer.path_expression(), self.node.name),
                        None => format!("({})->{}", parent.node.name, self.node.name),
                    }
                } else {
                    format!("{}.{}", parent.path_expression(), self.node.name)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::memory::SnapshotMemory;
    use crate::registry::FormatterRegistry;
    use crate::types::{ScalarEncoding, TypeCatalog};

    fn target_with(memory: SnapshotMemory, catalog: TypeCatalog) -> Arc<Target>
    {
        Arc::new(Target::new(
            Arc::new(memory),
            Arc::new(catalog),
            Arc::new(FormatterRegistry::with_builtin()),
        ))
    }

    fn point_catalog() -> TypeCatalog
    {
        let catalog = TypeCatalog::new("test");
        let int = catalog.resolve("int").unwrap();
        catalog.insert(
            TypeDescriptor::structure("Point", 8)
                .with_field("x", int.clone(), 0)
                .with_field("y", int, 4),
        );
        catalog
    }

    fn point_memory(x: i32, y: i32) -> SnapshotMemory
    {
        let mut bytes = x.to_le_bytes().to_vec();
        bytes.extend_from_slice(&y.to_le_bytes());
        let mut memory = SnapshotMemory::new();
        memory.add_region(Address::new(0x1000), bytes);
        memory
    }

    #[test]
    fn test_raw_aggregate_children()
    {
        let target = target_with(point_memory(3, -4), point_catalog());
        let point = target.value_at("pt", Address::new(0x1000), "Point").unwrap();
        assert_eq!(point.phase(), ValuePhase::Uncomputed);
        assert_eq!(point.num_children(), 2);
        assert_eq!(point.phase(), ValuePhase::ChildrenComputed);

        let y = point.child_at_index(1).unwrap();
        assert_eq!(y.name(), "y");
        assert_eq!(y.value_as_signed(0), -4);
        assert_eq!(y.path_expression(), "pt.y");
        assert_eq!(y.address(), Some(Address::new(0x1004)));
        assert!(matches!(
            point.child_at_index(2),
            Err(FormatterError::IndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_children_cached_within_stop()
    {
        let target = target_with(point_memory(1, 2), point_catalog());
        let point = target.value_at("pt", Address::new(0x1000), "Point").unwrap();
        let first = point.child_at_index(0).unwrap();
        let again = point.child_at_index(0).unwrap();
        assert!(first.is_same(&again));

        target.notify_resumed();
        assert_eq!(point.phase(), ValuePhase::Stale);
        target.notify_stopped();
        let fresh = point.child_at_index(0).unwrap();
        assert!(!first.is_same(&fresh));
        assert_eq!(fresh.value_as_signed(0), 1);
    }

    #[test]
    fn test_running_target_is_unreadable()
    {
        let target = target_with(point_memory(1, 2), point_catalog());
        let point = target.value_at("pt", Address::new(0x1000), "Point").unwrap();
        target.notify_resumed();
        assert_eq!(point.error(), Some(ReadError::TargetRunning));
        target.notify_stopped();
        assert!(point.is_valid());
    }

    #[test]
    fn test_from_bytes_children()
    {
        let target = target_with(SnapshotMemory::new(), point_catalog());
        let mut bytes = 7i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&8i32.to_le_bytes());
        let point = target.value_from_bytes("reg", &bytes, "Point").unwrap();
        assert_eq!(point.child_at_index(1).unwrap().value_as_signed(0), 8);
        assert_eq!(point.address(), None);
    }

    #[test]
    fn test_unavailable_value()
    {
        let target = target_with(SnapshotMemory::new(), point_catalog());
        let int = target.catalog().resolve("int").unwrap();
        let gone = ValueHandle::unavailable(&target, "tmp", int, ReadError::OptimizedOut);
        assert_eq!(gone.error(), Some(ReadError::OptimizedOut));
        assert_eq!(gone.value_as_unsigned(42), 42);
    }

    #[test]
    fn test_pointer_dereference_is_one_hop()
    {
        let catalog = point_catalog();
        let mut memory = point_memory(5, 6);
        memory.add_region(Address::new(0x2000), 0x1000u64.to_le_bytes().to_vec());
        let target = target_with(memory, catalog);

        let ptr = target.value_at("ptr", Address::new(0x2000), "Point *").unwrap();
        assert_eq!(ptr.value_as_unsigned(0), 0x1000);
        assert_eq!(ptr.num_children(), 1);
        let pointee = ptr.child_at_index(0).unwrap();
        assert_eq!(pointee.path_expression(), "*ptr");
        assert_eq!(pointee.child_at_index(0).unwrap().path_expression(), "ptr->x");
    }

    #[test]
    fn test_null_pointer_has_no_children()
    {
        let catalog = point_catalog();
        let mut memory = SnapshotMemory::new();
        memory.add_region(Address::new(0x2000), vec![0; 8]);
        let target = target_with(memory, catalog);
        let ptr = target.value_at("ptr", Address::new(0x2000), "Point *").unwrap();
        assert_eq!(ptr.num_children(), 0);
        assert_eq!(ptr.value_string().as_deref(), Some("0x0000000000000000"));
    }

    #[test]
    fn test_array_elements()
    {
        let catalog = TypeCatalog::new("test");
        let short = Arc::new(TypeDescriptor::scalar("short", ScalarEncoding::Signed, 2));
        catalog.insert(TypeDescriptor::typedef("triple", Arc::new(TypeDescriptor::array(short, 3))));
        let mut memory = SnapshotMemory::new();
        memory.add_region(
            Address::new(0x10),
            [1i16, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect(),
        );
        let target = target_with(memory, catalog);
        let array = target.value_at("arr", Address::new(0x10), "triple").unwrap();
        assert_eq!(array.num_children(), 3);
        let last = array.child_at_index(2).unwrap();
        assert_eq!(last.name(), "[2]");
        assert_eq!(last.path_expression(), "arr[2]");
        assert_eq!(last.value_as_signed(0), 3);
    }
}
