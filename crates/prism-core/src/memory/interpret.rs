//! Interpreting raw bytes as typed values.

use std::fmt;

use crate::error::{FormatterError, Result};
use crate::types::{Address, FieldDescriptor, ScalarEncoding, TypeDescriptor, TypeKind};

/// Byte order of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder
{
    #[default]
    Little,
    Big,
}

/// A decoded scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar
{
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    /// Character; `signed` records whether the source type was signed
    Char
    {
        value: u8,
        signed: bool,
    },
    Float(f64),
    Pointer(Address),
    /// Enumeration value with the matching enumerator, if any
    Enum
    {
        value: i64,
        name: Option<String>,
    },
}

impl Scalar
{
    /// Value reinterpreted as an unsigned 64-bit integer.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn as_u64(&self) -> u64
    {
        match self {
            Scalar::Bool(value) => u64::from(*value),
            Scalar::Signed(value) => *value as u64,
            Scalar::Unsigned(value) => *value,
            Scalar::Char { value, signed: true } => i64::from(*value as i8) as u64,
            Scalar::Char { value, signed: false } => u64::from(*value),
            Scalar::Float(value) => *value as u64,
            Scalar::Pointer(address) => address.value(),
            Scalar::Enum { value, .. } => *value as u64,
        }
    }

    /// Value reinterpreted as a signed 64-bit integer.
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> i64
    {
        match self {
            Scalar::Signed(value) | Scalar::Enum { value, .. } => *value,
            Scalar::Char { value, signed: true } => i64::from(*value as i8),
            Scalar::Float(value) => *value as i64,
            other => other.as_u64() as i64,
        }
    }
}

impl fmt::Display for Scalar
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Signed(value) => write!(f, "{value}"),
            Scalar::Unsigned(value) => write!(f, "{value}"),
            Scalar::Char { value, .. } => {
                if value.is_ascii_graphic() || *value == b' ' {
                    write!(f, "'{}'", char::from(*value))
                } else {
                    write!(f, "'\\x{value:02x}'")
                }
            }
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Pointer(address) => write!(f, "{address}"),
            Scalar::Enum { name: Some(name), .. } => write!(f, "{name}"),
            Scalar::Enum { value, name: None } => write!(f, "{value}"),
        }
    }
}

/// One field of an aggregate together with the bytes that back it.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a>
{
    pub field: &'a FieldDescriptor,
    pub bytes: &'a [u8],
}

/// Structured view of a byte buffer.
#[derive(Debug, Clone)]
pub enum ValueView<'a>
{
    Scalar(Scalar),
    /// Fields in declared order
    Aggregate(Vec<FieldView<'a>>),
    /// Array elements in index order
    Array(Vec<&'a [u8]>),
    /// `void` and other types without a value
    Opaque,
}

/// Interpret `bytes` as a value of type `ty`.
///
/// Aggregates are not decoded recursively: each field is returned as a slice
/// so callers can decode only what they display.
///
/// ## Errors
///
/// Returns `InvalidArgument` if the buffer is shorter than the type or a
/// scalar has a width this layer can't decode.
pub fn interpret_as<'a>(bytes: &'a [u8], ty: &'a TypeDescriptor, order: ByteOrder) -> Result<ValueView<'a>>
{
    let ty = ty.canonical();
    match ty.kind() {
        TypeKind::Void => Ok(ValueView::Opaque),
        TypeKind::Aggregate(_) => {
            let mut fields = Vec::with_capacity(ty.fields().len());
            for field in ty.fields() {
                let bytes = slice_at(bytes, field.offset, field.ty.byte_size(), field.ty.name())?;
                fields.push(FieldView { field, bytes });
            }
            Ok(ValueView::Aggregate(fields))
        }
        TypeKind::Array { element, count } => {
            let mut items = Vec::new();
            let stride = element.byte_size();
            for index in 0..*count {
                items.push(slice_at(bytes, index * stride, stride, element.name())?);
            }
            Ok(ValueView::Array(items))
        }
        _ => interpret_scalar(bytes, ty, order).map(ValueView::Scalar),
    }
}

/// Decode a scalar, enum or pointer.
///
/// ## Errors
///
/// Returns `InvalidArgument` for non-scalar types, short buffers, or widths
/// other than 1, 2, 4 or 8 bytes.
pub fn interpret_scalar(bytes: &[u8], ty: &TypeDescriptor, order: ByteOrder) -> Result<Scalar>
{
    let ty = ty.canonical();
    let size = ty.byte_size();
    let raw = slice_at(bytes, 0, size, ty.name())?;
    let unsupported = || FormatterError::InvalidArgument(format!("cannot decode {size} byte scalar `{}`", ty.name()));

    match ty.kind() {
        TypeKind::Scalar(encoding) => {
            let bits = read_uint(raw, order).ok_or_else(unsupported)?;
            Ok(match encoding {
                ScalarEncoding::Bool => Scalar::Bool(bits != 0),
                ScalarEncoding::Signed => Scalar::Signed(sign_extend(bits, raw.len())),
                ScalarEncoding::Unsigned => Scalar::Unsigned(bits),
                #[allow(clippy::cast_possible_truncation)]
                ScalarEncoding::SignedChar => Scalar::Char {
                    value: bits as u8,
                    signed: true,
                },
                #[allow(clippy::cast_possible_truncation)]
                ScalarEncoding::UnsignedChar => Scalar::Char {
                    value: bits as u8,
                    signed: false,
                },
                #[allow(clippy::cast_possible_truncation)]
                ScalarEncoding::Float => match raw.len() {
                    4 => Scalar::Float(f64::from(f32::from_bits(bits as u32))),
                    8 => Scalar::Float(f64::from_bits(bits)),
                    _ => return Err(unsupported()),
                },
            })
        }
        TypeKind::Enum { encoding, enumerators } => {
            let bits = read_uint(raw, order).ok_or_else(unsupported)?;
            #[allow(clippy::cast_possible_wrap)]
            let value = match encoding {
                ScalarEncoding::Signed | ScalarEncoding::SignedChar => sign_extend(bits, raw.len()),
                _ => bits as i64,
            };
            let name = enumerators
                .iter()
                .find(|(_, candidate)| *candidate == value)
                .map(|(name, _)| name.clone());
            Ok(Scalar::Enum { value, name })
        }
        TypeKind::Pointer { .. } | TypeKind::Reference { .. } => {
            let bits = read_uint(raw, order).ok_or_else(unsupported)?;
            Ok(Scalar::Pointer(Address::new(bits)))
        }
        _ => Err(FormatterError::InvalidArgument(format!("`{}` is not a scalar type", ty.name()))),
    }
}

fn slice_at<'a>(bytes: &'a [u8], offset: u64, size: u64, type_name: &str) -> Result<&'a [u8]>
{
    let start = usize::try_from(offset).ok();
    let end = start.and_then(|start| usize::try_from(size).ok().and_then(|size| start.checked_add(size)));
    match (start, end) {
        (Some(start), Some(end)) if end <= bytes.len() => Ok(&bytes[start..end]),
        _ => Err(FormatterError::InvalidArgument(format!(
            "{} byte buffer is too short for `{type_name}` at offset {offset} (size {size})",
            bytes.len()
        ))),
    }
}

fn read_uint(bytes: &[u8], order: ByteOrder) -> Option<u64>
{
    if !matches!(bytes.len(), 1 | 2 | 4 | 8) {
        return None;
    }
    let mut buffer = [0u8; 8];
    match order {
        ByteOrder::Little => {
            buffer[..bytes.len()].copy_from_slice(bytes);
            Some(u64::from_le_bytes(buffer))
        }
        ByteOrder::Big => {
            buffer[8 - bytes.len()..].copy_from_slice(bytes);
            Some(u64::from_be_bytes(buffer))
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn sign_extend(bits: u64, width: usize) -> i64
{
    let shift = 64 - (width as u32) * 8;
    ((bits << shift) as i64) >> shift
}
