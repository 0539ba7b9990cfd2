//! Recorded memory regions.

use std::collections::BTreeMap;

use tracing::trace;

use super::{check_read_bounds, MemorySource};
use crate::error::ReadError;
use crate::types::Address;

/// A set of recorded, non-overlapping memory regions.
///
/// Reads may span adjacent regions; any gap makes the whole read fail.
///
/// ## Example
///
/// ```rust
/// use prism_core::memory::{MemorySource, SnapshotMemory};
/// use prism_core::types::Address;
///
/// let mut memory = SnapshotMemory::new();
/// memory.add_region(Address::new(0x1000), 5i32.to_le_bytes().to_vec());
/// assert_eq!(memory.read_bytes(Address::new(0x1000), 4).unwrap(), vec![5, 0, 0, 0]);
/// assert!(memory.read_bytes(Address::new(0x2000), 4).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SnapshotMemory
{
    regions: BTreeMap<u64, Vec<u8>>,
}

impl SnapshotMemory
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Record a region. A region already starting at `start` is replaced.
    pub fn add_region(&mut self, start: Address, bytes: Vec<u8>) -> &mut Self
    {
        self.regions.insert(start.value(), bytes);
        self
    }

    /// Overwrite recorded bytes in place.
    ///
    /// Returns `false` (and changes nothing) if the range is not fully
    /// covered by a single recorded region.
    pub fn overwrite(&mut self, address: Address, bytes: &[u8]) -> bool
    {
        let Some((&start, region)) = self.regions.range_mut(..=address.value()).next_back() else {
            return false;
        };
        let Ok(offset) = usize::try_from(address.value() - start) else {
            return false;
        };
        let Some(end) = offset.checked_add(bytes.len()) else {
            return false;
        };
        if end > region.len() {
            return false;
        }
        region[offset..end].copy_from_slice(bytes);
        true
    }

    /// `(start, length)` of every recorded region, in address order.
    pub fn regions(&self) -> impl Iterator<Item = (Address, usize)> + '_
    {
        self.regions
            .iter()
            .map(|(start, bytes)| (Address::new(*start), bytes.len()))
    }

    pub fn total_bytes(&self) -> usize
    {
        self.regions.values().map(Vec::len).sum()
    }
}

impl MemorySource for SnapshotMemory
{
    fn read_bytes(&self, address: Address, size: usize) -> Result<Vec<u8>, ReadError>
    {
        check_read_bounds(address, size)?;
        trace!(%address, size, "snapshot read");

        let mut out = Vec::with_capacity(size);
        let mut cursor = address.value();
        while out.len() < size {
            let region = self
                .regions
                .range(..=cursor)
                .next_back()
                .filter(|(start, bytes)| cursor - **start < bytes.len() as u64);
            let Some((start, bytes)) = region else {
                return Err(ReadError::unreadable(
                    address,
                    size,
                    format!("{} is not mapped", Address::new(cursor)),
                ));
            };
            // Bounded by the region length, so it fits in usize.
            let offset = (cursor - start) as usize;
            let take = (size - out.len()).min(bytes.len() - offset);
            out.extend_from_slice(&bytes[offset..offset + take]);
            cursor += take as u64;
        }
        Ok(out)
    }

    fn describe(&self) -> String
    {
        format!("snapshot ({} regions)", self.regions.len())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_read_spans_adjacent_regions()
    {
        let mut memory = SnapshotMemory::new();
        memory
            .add_region(Address::new(0x100), vec![1, 2, 3, 4])
            .add_region(Address::new(0x104), vec![5, 6]);
        assert_eq!(memory.read_bytes(Address::new(0x102), 4).unwrap(), vec![3, 4, 5, 6]);
        assert!(memory.read_bytes(Address::new(0x104), 4).is_err());
    }

    #[test]
    fn test_zero_sized_read()
    {
        let memory = SnapshotMemory::new();
        assert_eq!(memory.read_bytes(Address::new(0x100), 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_overwrite_in_place()
    {
        let mut memory = SnapshotMemory::new();
        memory.add_region(Address::new(0x100), vec![0; 8]);
        assert!(memory.overwrite(Address::new(0x104), &[9, 9]));
        assert!(!memory.overwrite(Address::new(0x107), &[1, 1]));
        assert!(!memory.overwrite(Address::new(0x50), &[1]));
        assert_eq!(memory.read_bytes(Address::new(0x104), 3).unwrap(), vec![9, 9, 0]);
    }

    #[test]
    fn test_unmapped_error_names_address()
    {
        let memory = SnapshotMemory::new();
        let err = memory.read_bytes(Address::new(0x40), 4).unwrap_err();
        assert!(err.to_string().contains("0x0000000000000040"));
    }
}
