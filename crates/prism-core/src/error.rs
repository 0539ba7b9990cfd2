//! # Error Types
//!
//! Error handling for the formatter subsystem.
//!
//! We use `thiserror` to generate the `Error` implementations. None of these
//! conditions is fatal to a debugging session: callers degrade to a raw
//! display, an error sentinel child, or a recompute.

use thiserror::Error;

use crate::types::Address;

/// Failure reported by the Value Access Layer.
///
/// This is the only error a memory source can produce. It never propagates
/// past a single value: the affected child reports it, siblings are
/// unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError
{
    /// The location is unmapped, inaccessible, or the read exceeded the bounded size.
    #[error("unreadable: {size} bytes at {address} ({reason})")]
    Unreadable
    {
        /// Start of the requested range
        address: Address,
        /// Number of bytes requested
        size: usize,
        /// Short human-readable cause
        reason: String,
    },

    /// The value has no location at the current program point.
    #[error("value is optimized out")]
    OptimizedOut,

    /// The target is executing; memory must not be read until it stops again.
    #[error("target is running")]
    TargetRunning,
}

impl ReadError
{
    /// Shorthand for an [`ReadError::Unreadable`] error.
    pub fn unreadable(address: Address, size: usize, reason: impl Into<String>) -> Self
    {
        Self::Unreadable {
            address,
            size,
            reason: reason.into(),
        }
    }
}

/// Main error type for formatter operations
///
/// ## Error Categories
///
/// 1. **Lookup errors**: UnknownType, UnknownCategory
/// 2. **Data errors**: Unreadable (wraps [`ReadError`])
/// 3. **Matching errors**: MalformedTemplateArgs, InvalidPattern
/// 4. **Client errors**: IndexOutOfRange, NoSuchMember, InvalidArgument
/// 5. **Debug info errors**: Dwarf, Io
///
/// A type with no formatter and a value from an earlier stop are not errors:
/// the first displays raw, the second recomputes.
#[derive(Error, Debug)]
pub enum FormatterError
{
    /// Underlying memory could not be read.
    #[error(transparent)]
    Unreadable(#[from] ReadError),

    /// A template argument list is unbalanced or contains an empty argument.
    #[error("malformed template arguments in `{0}`")]
    MalformedTemplateArgs(String),

    /// Requested child index is past the end of the child list.
    #[error("child index {index} out of range (value has {count} children)")]
    IndexOutOfRange
    {
        /// Requested index
        index: usize,
        /// Number of children the value exposes
        count: usize,
    },

    /// A dotted path names a member that does not exist.
    #[error("`{value}` has no member named `{member}`")]
    NoSuchMember
    {
        /// Display path of the value that was searched
        value: String,
        /// Member that was requested
        member: String,
    },

    /// A formatter pattern could not be compiled.
    #[error("invalid type pattern `{pattern}`: {reason}")]
    InvalidPattern
    {
        /// The pattern text
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// The type catalog could not resolve a type name.
    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// No category with this name has been registered.
    #[error("unknown formatter category `{0}`")]
    UnknownCategory(String),

    /// Invalid argument passed by a client (bad path syntax, zero-sized read, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Debug information could not be parsed.
    #[error("DWARF error: {0}")]
    Dwarf(String),

    /// I/O error (for binaries and core files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, FormatterError>`
///
/// ```rust
/// use prism_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, FormatterError>;
