//! # Value Access Layer
//!
//! Bounded, read-only access to target memory.
//!
//! Every byte a formatter looks at comes through a [`MemorySource`]. The trait
//! has no write method and no way to run target code: a formatter can only
//! *observe* a stopped (or recorded) process.
//!
//! Implementations:
//!
//! - [`SnapshotMemory`]: recorded regions held in memory (tests, demos, replays)
//! - [`CoreFileMemory`]: `PT_LOAD` segments of an ELF core dump
//! - [`ProcessMemory`] (Linux): a live, stopped process via `process_vm_readv`
//!
//! Raw bytes are turned into scalars and field slices by [`interpret_as`].

pub mod core_file;
pub mod interpret;
#[cfg(target_os = "linux")]
pub mod process;
pub mod snapshot;

pub use core_file::CoreFileMemory;
pub use interpret::{interpret_as, interpret_scalar, ByteOrder, FieldView, Scalar, ValueView};
#[cfg(target_os = "linux")]
pub use process::ProcessMemory;
pub use snapshot::SnapshotMemory;

use crate::error::ReadError;
use crate::types::Address;

/// Largest single read a formatter may issue (1 MiB).
pub const MAX_READ_SIZE: usize = 1 << 20;

/// Read-only view of a target's address space.
pub trait MemorySource: Send + Sync
{
    /// Read exactly `size` bytes starting at `address`.
    ///
    /// Must complete or fail without waiting on the target. Partial reads are
    /// reported as [`ReadError::Unreadable`].
    ///
    /// ## Errors
    ///
    /// - `Unreadable`: unmapped, inaccessible, or larger than [`MAX_READ_SIZE`]
    fn read_bytes(&self, address: Address, size: usize) -> Result<Vec<u8>, ReadError>;

    /// Short description for logs (`snapshot`, `core:/tmp/core.123`, `pid 42`).
    fn describe(&self) -> String
    {
        "memory".to_string()
    }
}

/// Reject reads that are too large or wrap the address space.
pub(crate) fn check_read_bounds(address: Address, size: usize) -> Result<(), ReadError>
{
    if size > MAX_READ_SIZE {
        return Err(ReadError::unreadable(
            address,
            size,
            format!("read exceeds the {MAX_READ_SIZE} byte limit"),
        ));
    }
    if address.range_end(size).is_none() {
        return Err(ReadError::unreadable(address, size, "range wraps the address space"));
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_bounds()
    {
        assert!(check_read_bounds(Address::new(0x1000), 16).is_ok());
        assert!(check_read_bounds(Address::new(0x1000), MAX_READ_SIZE + 1).is_err());
        assert!(check_read_bounds(Address::new(u64::MAX - 2), 8).is_err());
    }
}
