//! # `std::atomic<T>` Formatters
//!
//! Every standard library wraps the atomic's storage in its own chain of
//! base classes and members. The provider finds the storage by walking the
//! resolved field layout, so the offset of `T` (which may follow control or
//! padding bytes) always comes from debug info and is never assumed.
//!
//! ## Layouts
//!
//! | Category    | Type name          | Storage                                  |
//! |-------------|--------------------|------------------------------------------|
//! | `libcxx`    | `std::__1::atomic` | `__a_value`, else `__a_`                 |
//! | `msvcstl`   | `std::atomic`      | `_Storage._Value`, else `_Storage`       |
//! | `libstdcpp` | `std::atomic`      | `_M_i`, else `_M_b._M_p` (pointers)      |
//!
//! A factory whose storage member is missing declines, so a `std::atomic`
//! from one library never gets read with another library's layout.
//!
//! ## Children
//!
//! Exactly one child, `Value`, of the storage member's type. When `T` is a
//! scalar or pointer the child also serves as the wrapper's synthetic value,
//! so `value_as_unsigned` on the atomic yields the stored number.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{FormatterError, Result};
use crate::matcher::TypePattern;
use crate::provider::{Formatter, SummaryProvider, SyntheticProvider};
use crate::registry::FormatterRegistry;
use crate::types::TypeDescriptor;
use crate::value::ValueHandle;

/// Name of the single synthetic child.
pub const VALUE_CHILD: &str = "Value";

const MAX_LAYOUT_DEPTH: usize = 8;

/// Standard library implementation an atomic layout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicLayout
{
    LibCxx,
    MsvcStl,
    LibStdCpp,
}

impl AtomicLayout
{
    pub const ALL: [AtomicLayout; 3] = [AtomicLayout::LibCxx, AtomicLayout::MsvcStl, AtomicLayout::LibStdCpp];

    /// Formatter category the layout is registered in.
    pub fn category(self) -> &'static str
    {
        match self {
            AtomicLayout::LibCxx => "libcxx",
            AtomicLayout::MsvcStl => "msvcstl",
            AtomicLayout::LibStdCpp => "libstdcpp",
        }
    }

    pub fn enabled_by_default(self) -> bool
    {
        !matches!(self, AtomicLayout::LibStdCpp)
    }

    /// Type pattern the layout's formatters are registered under.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidPattern` if the inline-namespace expression fails to
    /// compile.
    pub fn pattern(self) -> Result<TypePattern>
    {
        match self {
            AtomicLayout::LibCxx => TypePattern::template_regex(r"std::__[[:alnum:]_]+::atomic", 1),
            AtomicLayout::MsvcStl | AtomicLayout::LibStdCpp => Ok(TypePattern::template("std::atomic", 1)),
        }
    }

    /// `(offset, type)` of the wrapped value inside `wrapper`.
    pub fn locate_storage(self, wrapper: &TypeDescriptor) -> Option<(u64, Arc<TypeDescriptor>)>
    {
        match self {
            AtomicLayout::LibCxx => {
                find_member(wrapper, "__a_value", 0).or_else(|| find_member(wrapper, "__a_", 0))
            }
            AtomicLayout::MsvcStl => {
                let (offset, storage) = find_member(wrapper, "_Storage", 0)?;
                match storage.canonical().field("_Value") {
                    Some(value) => Some((offset + value.offset, value.ty.clone())),
                    None => Some((offset, storage)),
                }
            }
            AtomicLayout::LibStdCpp => find_member(wrapper, "_M_i", 0).or_else(|| {
                let (outer, base) = find_member(wrapper, "_M_b", 0)?;
                let (inner, pointer) = find_member(&base, "_M_p", 0)?;
                Some((outer + inner, pointer))
            }),
        }
    }
}

/// Find a data member by name: direct members first, then inside nested
/// members and base classes. Offsets are accumulated along the way.
fn find_member(ty: &TypeDescriptor, name: &str, depth: usize) -> Option<(u64, Arc<TypeDescriptor>)>
{
    if depth > MAX_LAYOUT_DEPTH {
        return None;
    }
    let ty = ty.canonical();
    if let Some(field) = ty.fields().iter().find(|field| !field.is_base && field.name == name) {
        return Some((field.offset, field.ty.clone()));
    }
    ty.fields()
        .iter()
        .filter(|field| !field.ty.canonical().fields().is_empty())
        .find_map(|field| {
            find_member(&field.ty, name, depth + 1).map(|(offset, found)| (field.offset + offset, found))
        })
}

/// Synthetic provider exposing the value inside an atomic wrapper.
#[derive(Debug, Clone)]
pub struct AtomicProvider
{
    layout: AtomicLayout,
    offset: u64,
    storage: Arc<TypeDescriptor>,
}

impl AtomicProvider
{
    /// Provider for `value`, or `None` if its layout has no recognisable storage.
    pub fn create(layout: AtomicLayout, value: &ValueHandle) -> Option<Self>
    {
        let wrapper = value.value_type();
        let Some((offset, storage)) = layout.locate_storage(&wrapper) else {
            debug!(type_name = %wrapper.name(), layout = layout.category(), "atomic storage not found");
            return None;
        };

        let end = offset.checked_add(storage.byte_size());
        if storage.byte_size() == 0 || end.map_or(true, |end| end > wrapper.byte_size()) {
            warn!(
                type_name = %wrapper.name(),
                offset,
                size = storage.byte_size(),
                wrapper_size = wrapper.byte_size(),
                "atomic storage lies outside the wrapper"
            );
            return None;
        }

        Some(Self {
            layout,
            offset,
            storage,
        })
    }

    pub fn layout(&self) -> AtomicLayout
    {
        self.layout
    }

    /// Byte offset of the wrapped value inside the wrapper.
    pub fn offset(&self) -> u64
    {
        self.offset
    }

    pub fn storage_type(&self) -> &Arc<TypeDescriptor>
    {
        &self.storage
    }
}

impl SyntheticProvider for AtomicProvider
{
    fn num_children(&self, _value: &ValueHandle) -> usize
    {
        1
    }

    fn child_at_index(&self, value: &ValueHandle, index: usize) -> Result<ValueHandle>
    {
        if index != 0 {
            return Err(FormatterError::IndexOutOfRange { index, count: 1 });
        }
        Ok(value.child_at_offset(VALUE_CHILD, self.offset, self.storage.clone()))
    }

    fn index_of_child(&self, name: &str) -> Option<usize>
    {
        (name == VALUE_CHILD).then_some(0)
    }

    fn value_index(&self) -> Option<usize>
    {
        (self.storage.is_scalar() || self.storage.is_pointer()).then_some(0)
    }
}

/// Summary showing the wrapped scalar (`5`, `true`).
///
/// Pointers and aggregates have no summary: their structure is the display.
/// The text comes from the already materialised `Value` child; nothing is
/// read to produce it, so a fresh handle has no summary until its child
/// has been read.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicSummary;

impl SummaryProvider for AtomicSummary
{
    fn name(&self) -> &str
    {
        "atomic"
    }

    fn summarize(&self, value: &ValueHandle) -> Option<String>
    {
        if !value.is_synthetic() {
            return None;
        }
        let child = value.cached_child(0)?;
        if !child.has_cached_data() || !child.value_type().is_scalar() {
            return None;
        }
        child.value_string()
    }
}

/// Install the atomic categories and their formatters into `registry`.
pub fn register(registry: &FormatterRegistry)
{
    for layout in AtomicLayout::ALL {
        let pattern = match layout.pattern() {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!(layout = layout.category(), error = %err, "skipping atomic formatters");
                continue;
            }
        };
        registry.create_category(layout.category(), 0, layout.enabled_by_default());
        registry.register(
            pattern.clone(),
            layout.category(),
            0,
            Formatter::synthetic(move |value| {
                AtomicProvider::create(layout, value).map(|provider| Box::new(provider) as Box<dyn SyntheticProvider>)
            }),
        );
        registry.register(pattern, layout.category(), 0, Formatter::summary(AtomicSummary));
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{ScalarEncoding, TemplateArg};

    fn int() -> Arc<TypeDescriptor>
    {
        Arc::new(TypeDescriptor::scalar("int", ScalarEncoding::Signed, 4))
    }

    #[test]
    fn test_libcxx_storage_through_bases()
    {
        let base_impl = Arc::new(
            TypeDescriptor::structure("std::__1::__cxx_atomic_base_impl<int>", 4).with_field("__a_value", int(), 0),
        );
        let impl_ = Arc::new(TypeDescriptor::structure("std::__1::__cxx_atomic_impl<int>", 4).with_base(base_impl, 0));
        let atomic_base =
            Arc::new(TypeDescriptor::structure("std::__1::__atomic_base<int>", 8).with_field("__a_", impl_, 4));
        let atomic = TypeDescriptor::structure("std::__1::atomic<int>", 8)
            .with_base(atomic_base, 0)
            .with_template_arg(TemplateArg::Type("int".into()));

        let (offset, ty) = AtomicLayout::LibCxx.locate_storage(&atomic).unwrap();
        assert_eq!(offset, 4);
        assert_eq!(ty.name(), "int");
    }

    #[test]
    fn test_msvc_storage_value()
    {
        let padded = Arc::new(TypeDescriptor::structure("std::_Atomic_padded<int>", 4).with_field("_Value", int(), 0));
        let storage =
            Arc::new(TypeDescriptor::structure("std::_Atomic_storage<int, 4>", 4).with_field("_Storage", padded, 0));
        let atomic = TypeDescriptor::structure("std::atomic<int>", 4).with_base(storage, 0);
        let (offset, ty) = AtomicLayout::MsvcStl.locate_storage(&atomic).unwrap();
        assert_eq!((offset, ty.name()), (0, "int"));

        let direct = TypeDescriptor::structure("std::atomic<int>", 4).with_field("_Storage", int(), 0);
        let (_, ty) = AtomicLayout::MsvcStl.locate_storage(&direct).unwrap();
        assert_eq!(ty.name(), "int");
    }

    #[test]
    fn test_libstdcpp_pointer_storage()
    {
        let pointer = Arc::new(TypeDescriptor::pointer("Parent", 8));
        let base = Arc::new(TypeDescriptor::structure("std::__atomic_base<Parent *>", 8).with_field("_M_p", pointer, 0));
        let atomic = TypeDescriptor::structure("std::atomic<Parent *>", 8).with_field("_M_b", base, 0);
        let (offset, ty) = AtomicLayout::LibStdCpp.locate_storage(&atomic).unwrap();
        assert_eq!((offset, ty.name()), (0, "Parent *"));
        assert!(AtomicLayout::MsvcStl.locate_storage(&atomic).is_none());
        assert!(AtomicLayout::LibCxx.locate_storage(&atomic).is_none());
    }

    #[test]
    fn test_categories_registered()
    {
        let registry = FormatterRegistry::new();
        register(&registry);
        assert!(registry.is_category_enabled("libcxx").unwrap());
        assert!(registry.is_category_enabled("msvcstl").unwrap());
        assert!(!registry.is_category_enabled("libstdcpp").unwrap());
        assert!(registry.lookup("std::__1::atomic<S>").is_some());
        assert!(registry.lookup("std::atomic<S>").is_some());
        assert!(registry.lookup("std::atomic_flag").is_none());
    }
}
