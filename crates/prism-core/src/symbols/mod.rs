//! # Debug Info
//!
//! Type layouts and global variables read from the DWARF of an ELF or Mach-O
//! binary.
//!
//! [`BinaryImage`] is the [`TypeSource`](crate::types::TypeSource) behind a
//! [`TypeCatalog`](crate::types::TypeCatalog): the catalog asks for a type by
//! name the first time it is needed, and the image answers from a name index
//! built on first use.
//!
//! ## What is understood
//!
//! - structs, classes and unions, with members, base classes
//!   (`DW_TAG_inheritance`) and template parameters
//! - base types (via `DW_AT_encoding`), enumerations and arrays
//! - pointers and references (pointees are kept by name)
//! - typedefs, `const`, `volatile` and `_Atomic`
//! - global variables located by `DW_OP_addr` / `DW_OP_addrx`
//!
//! Location lists, bitfield extraction and split DWARF are not supported.

mod dwarf;
mod image;

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian};

pub use dwarf::GlobalVariable;
pub use image::BinaryImage;

use crate::error::FormatterError;

type OwnedReader = EndianArcSlice<RunTimeEndian>;
type OwnedDwarf = Dwarf<OwnedReader>;

fn map_dwarf_error(context: &str, err: gimli::Error) -> FormatterError
{
    FormatterError::Dwarf(format!("{context}: {err}"))
}
