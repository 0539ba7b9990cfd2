//! Resolved type layouts.
//!
//! A [`TypeDescriptor`] is the immutable description of one type in one
//! binary: its name, template arguments, byte size and field layout. They are
//! produced by a [`TypeSource`](super::catalog::TypeSource) (usually DWARF)
//! or built programmatically, and cached per module by the
//! [`TypeCatalog`](super::catalog::TypeCatalog).
//!
//! Pointers refer to their pointee by *name* rather than by descriptor. This
//! keeps self-referential layouts (`struct Node { Node *next; }`) finite: the
//! pointee is only resolved when somebody dereferences the pointer.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// How the bytes of a scalar are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarEncoding
{
    /// `bool`
    Bool,
    /// Two's complement signed integer
    Signed,
    /// Unsigned integer
    Unsigned,
    /// `char` / `signed char`
    SignedChar,
    /// `unsigned char`, `char8_t`
    UnsignedChar,
    /// IEEE-754 binary float (4 or 8 bytes)
    Float,
}

/// Source-level flavour of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind
{
    Struct,
    Class,
    Union,
}

/// cv-qualifiers attached to a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers
{
    pub is_const: bool,
    pub is_volatile: bool,
}

impl Qualifiers
{
    pub const CONST: Self = Self {
        is_const: true,
        is_volatile: false,
    };
    pub const VOLATILE: Self = Self {
        is_const: false,
        is_volatile: true,
    };

    fn prefix(self) -> &'static str
    {
        match (self.is_const, self.is_volatile) {
            (true, true) => "const volatile ",
            (true, false) => "const ",
            (false, true) => "volatile ",
            (false, false) => "",
        }
    }
}

/// Shape of a type.
#[derive(Debug, Clone)]
pub enum TypeKind
{
    /// `void` or an unspecified type. Never has a value.
    Void,
    /// Integer, boolean, character or floating point value.
    Scalar(ScalarEncoding),
    /// Enumeration over an integral representation.
    Enum
    {
        encoding: ScalarEncoding,
        enumerators: Vec<(String, i64)>,
    },
    /// Pointer; the pointee is resolved lazily by name.
    Pointer
    {
        pointee: String
    },
    /// Lvalue or rvalue reference; displayed like a pointer to its referent.
    Reference
    {
        referent: String
    },
    /// struct / class / union with a field layout.
    Aggregate(AggregateKind),
    /// Fixed-size array.
    Array
    {
        element: Arc<TypeDescriptor>,
        count: u64,
    },
    /// Named alias of another type.
    Typedef
    {
        target: Arc<TypeDescriptor>
    },
    /// cv-qualified view of another type.
    Qualified
    {
        qualifiers: Qualifiers,
        target: Arc<TypeDescriptor>,
    },
}

/// A template argument as recorded in debug info.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateArg
{
    /// Type parameter, by name (`int`, `Parent *`)
    Type(String),
    /// Non-type parameter (`std::array<int, 4>`)
    Value(i64),
}

/// One member (or base-class subobject) of an aggregate.
#[derive(Debug, Clone)]
pub struct FieldDescriptor
{
    /// Member name; base classes use the base type's name
    pub name: String,
    /// Declared member type
    pub ty: Arc<TypeDescriptor>,
    /// Byte offset from the start of the enclosing object
    pub offset: u64,
    /// Whether this entry is a base-class subobject rather than a member
    pub is_base: bool,
}

/// Immutable, fully resolved description of a type.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use prism_core::types::{ScalarEncoding, TypeDescriptor};
///
/// let int = Arc::new(TypeDescriptor::scalar("int", ScalarEncoding::Signed, 4));
/// let s = TypeDescriptor::structure("S", 8)
///     .with_field("x", int.clone(), 0)
///     .with_field("y", int, 4);
/// assert_eq!(s.fields().len(), 2);
/// assert_eq!(s.field("y").map(|f| f.offset), Some(4));
/// ```
#[derive(Debug, Clone)]
pub struct TypeDescriptor
{
    name: String,
    kind: TypeKind,
    byte_size: u64,
    template_args: SmallVec<[TemplateArg; 2]>,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor
{
    fn new(name: impl Into<String>, kind: TypeKind, byte_size: u64) -> Self
    {
        Self {
            name: name.into(),
            kind,
            byte_size,
            template_args: SmallVec::new(),
            fields: Vec::new(),
        }
    }

    /// `void`
    pub fn void() -> Self
    {
        Self::new("void", TypeKind::Void, 0)
    }

    /// A base type such as `int` or `double`.
    pub fn scalar(name: impl Into<String>, encoding: ScalarEncoding, byte_size: u64) -> Self
    {
        Self::new(name, TypeKind::Scalar(encoding), byte_size)
    }

    /// Pointer to the type named `pointee`.
    pub fn pointer(pointee: &str, byte_size: u64) -> Self
    {
        Self::new(
            pointer_type_name(pointee, '*'),
            TypeKind::Pointer {
                pointee: pointee.trim().to_string(),
            },
            byte_size,
        )
    }

    /// Reference to the type named `referent`.
    pub fn reference(referent: &str, byte_size: u64) -> Self
    {
        Self::new(
            pointer_type_name(referent, '&'),
            TypeKind::Reference {
                referent: referent.trim().to_string(),
            },
            byte_size,
        )
    }

    /// An aggregate with no fields yet; add them with [`Self::with_field`].
    pub fn aggregate(name: impl Into<String>, kind: AggregateKind, byte_size: u64) -> Self
    {
        Self::new(name, TypeKind::Aggregate(kind), byte_size)
    }

    /// Shorthand for a `struct` aggregate.
    pub fn structure(name: impl Into<String>, byte_size: u64) -> Self
    {
        Self::aggregate(name, AggregateKind::Struct, byte_size)
    }

    /// An enumeration.
    pub fn enumeration(
        name: impl Into<String>,
        encoding: ScalarEncoding,
        byte_size: u64,
        enumerators: Vec<(String, i64)>,
    ) -> Self
    {
        Self::new(name, TypeKind::Enum { encoding, enumerators }, byte_size)
    }

    /// `element[count]`
    pub fn array(element: Arc<TypeDescriptor>, count: u64) -> Self
    {
        let name = format!("{}[{count}]", element.name());
        let byte_size = element.byte_size().saturating_mul(count);
        Self::new(name, TypeKind::Array { element, count }, byte_size)
    }

    /// `typedef target name;`
    pub fn typedef(name: impl Into<String>, target: Arc<TypeDescriptor>) -> Self
    {
        let byte_size = target.byte_size();
        Self::new(name, TypeKind::Typedef { target }, byte_size)
    }

    /// cv-qualified `target`.
    pub fn qualified(qualifiers: Qualifiers, target: Arc<TypeDescriptor>) -> Self
    {
        let name = format!("{}{}", qualifiers.prefix(), target.name());
        let byte_size = target.byte_size();
        Self::new(name, TypeKind::Qualified { qualifiers, target }, byte_size)
    }

    /// Append a member at `offset` bytes.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, ty: Arc<TypeDescriptor>, offset: u64) -> Self
    {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            ty,
            offset,
            is_base: false,
        });
        self
    }

    /// Append a base-class subobject at `offset` bytes.
    #[must_use]
    pub fn with_base(mut self, ty: Arc<TypeDescriptor>, offset: u64) -> Self
    {
        self.fields.push(FieldDescriptor {
            name: ty.name().to_string(),
            ty,
            offset,
            is_base: true,
        });
        self
    }

    /// Append a template argument.
    #[must_use]
    pub fn with_template_arg(mut self, arg: TemplateArg) -> Self
    {
        self.template_args.push(arg);
        self
    }

    pub(crate) fn push_field(&mut self, field: FieldDescriptor)
    {
        self.fields.push(field);
    }

    pub(crate) fn push_template_arg(&mut self, arg: TemplateArg)
    {
        self.template_args.push(arg);
    }

    pub fn name(&self) -> &str
    {
        &self.name
    }

    pub fn kind(&self) -> &TypeKind
    {
        &self.kind
    }

    pub fn byte_size(&self) -> u64
    {
        self.byte_size
    }

    pub fn template_args(&self) -> &[TemplateArg]
    {
        &self.template_args
    }

    /// Name of the `index`-th template argument if it is a type parameter.
    pub fn template_type_arg(&self, index: usize) -> Option<&str>
    {
        match self.template_args.get(index)? {
            TemplateArg::Type(name) => Some(name),
            TemplateArg::Value(_) => None,
        }
    }

    /// Declared fields in layout order (bases first, as compilers emit them).
    pub fn fields(&self) -> &[FieldDescriptor]
    {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor>
    {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize>
    {
        self.fields.iter().position(|field| field.name == name)
    }

    /// The type with all typedefs and cv-qualifiers peeled off.
    pub fn canonical(&self) -> &TypeDescriptor
    {
        let mut current = self;
        loop {
            match &current.kind {
                TypeKind::Typedef { target } | TypeKind::Qualified { target, .. } => current = target,
                _ => return current,
            }
        }
    }

    /// Scalars and enums: values that render as a single literal.
    pub fn is_scalar(&self) -> bool
    {
        matches!(self.canonical().kind, TypeKind::Scalar(_) | TypeKind::Enum { .. })
    }

    /// Pointers and references.
    pub fn is_pointer(&self) -> bool
    {
        matches!(self.canonical().kind, TypeKind::Pointer { .. } | TypeKind::Reference { .. })
    }

    /// Types whose display is a list of children.
    pub fn is_aggregate(&self) -> bool
    {
        matches!(self.canonical().kind, TypeKind::Aggregate(_) | TypeKind::Array { .. })
    }

    /// Name of the pointed-to type for pointers and references.
    pub fn pointee_name(&self) -> Option<&str>
    {
        match &self.canonical().kind {
            TypeKind::Pointer { pointee } => Some(pointee),
            TypeKind::Reference { referent } => Some(referent),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.name)
    }
}

/// `Parent` -> `Parent *`, `Parent *` -> `Parent **`
pub(crate) fn pointer_type_name(pointee: &str, sigil: char) -> String
{
    let pointee = pointee.trim();
    if pointee.ends_with('*') || pointee.ends_with('&') {
        format!("{pointee}{sigil}")
    } else {
        format!("{pointee} {sigil}")
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_canonical_strips_typedef_and_const()
    {
        let int = Arc::new(TypeDescriptor::scalar("int", ScalarEncoding::Signed, 4));
        let alias = Arc::new(TypeDescriptor::typedef("my_int", int));
        let constant = TypeDescriptor::qualified(Qualifiers::CONST, alias);

        assert_eq!(constant.name(), "const my_int");
        assert_eq!(constant.canonical().name(), "int");
        assert_eq!(constant.byte_size(), 4);
        assert!(constant.is_scalar());
    }

    #[test]
    fn test_pointer_names()
    {
        let ptr = TypeDescriptor::pointer("Parent", 8);
        assert_eq!(ptr.name(), "Parent *");
        assert_eq!(ptr.pointee_name(), Some("Parent"));

        let ptr_ptr = TypeDescriptor::pointer(ptr.name(), 8);
        assert_eq!(ptr_ptr.name(), "Parent **");
    }

    #[test]
    fn test_array_size()
    {
        let short = Arc::new(TypeDescriptor::scalar("short", ScalarEncoding::Signed, 2));
        let array = TypeDescriptor::array(short, 3);
        assert_eq!(array.name(), "short[3]");
        assert_eq!(array.byte_size(), 6);
        assert!(array.is_aggregate());
    }
}
