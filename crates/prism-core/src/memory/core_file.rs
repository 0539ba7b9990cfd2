//! Memory recorded in an ELF core dump.

use std::fs;
use std::path::{Path, PathBuf};

use object::{Object, ObjectKind, ObjectSegment};
use tracing::{debug, info};

use super::{MemorySource, SnapshotMemory};
use crate::error::{FormatterError, ReadError, Result};
use crate::memory::ByteOrder;
use crate::types::Address;

/// Read-only memory backed by the `PT_LOAD` segments of a core file.
///
/// Segments are copied out once at open time; reads never touch the file
/// again. Segments that were not dumped (`p_filesz == 0`) read as unmapped.
#[derive(Debug, Clone)]
pub struct CoreFileMemory
{
    path: PathBuf,
    byte_order: ByteOrder,
    segments: SnapshotMemory,
}

impl CoreFileMemory
{
    /// Open and index a core file.
    ///
    /// ## Errors
    ///
    /// - `Io`: the file can't be read
    /// - `InvalidArgument`: the file isn't an object file, or isn't a core dump
    pub fn open(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::parse(path, &bytes)
    }

    /// Index core-file bytes already in memory. `path` is only used for logs.
    ///
    /// ## Errors
    ///
    /// Same as [`Self::open`], minus `Io`.
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self>
    {
        let file = object::File::parse(bytes)
            .map_err(|err| FormatterError::InvalidArgument(format!("failed to parse {}: {err}", path.display())))?;
        if file.kind() != ObjectKind::Core {
            return Err(FormatterError::InvalidArgument(format!(
                "{} is not a core file ({:?})",
                path.display(),
                file.kind()
            )));
        }

        let byte_order = if file.is_little_endian() {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };

        let mut segments = SnapshotMemory::new();
        for segment in file.segments() {
            let data = segment.data().map_err(|err| {
                FormatterError::InvalidArgument(format!("failed to read segment at {:#x}: {err}", segment.address()))
            })?;
            if data.is_empty() {
                continue;
            }
            debug!(address = %Address::new(segment.address()), size = data.len(), "core segment");
            segments.add_region(Address::new(segment.address()), data.to_vec());
        }

        info!(
            path = %path.display(),
            segments = segments.regions().count(),
            bytes = segments.total_bytes(),
            "opened core file"
        );
        Ok(Self {
            path: path.to_path_buf(),
            byte_order,
            segments,
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn byte_order(&self) -> ByteOrder
    {
        self.byte_order
    }
}

impl MemorySource for CoreFileMemory
{
    fn read_bytes(&self, address: Address, size: usize) -> std::result::Result<Vec<u8>, ReadError>
    {
        self.segments.read_bytes(address, size)
    }

    fn describe(&self) -> String
    {
        format!("core:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rejects_garbage()
    {
        let err = CoreFileMemory::parse(Path::new("garbage"), b"definitely not elf").unwrap_err();
        assert!(matches!(err, FormatterError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_file_is_io_error()
    {
        let err = CoreFileMemory::open("/nonexistent/prism/core.1").unwrap_err();
        assert!(matches!(err, FormatterError::Io(_)));
    }
}
