//! # Linux Process Memory
//!
//! Reads from a live, stopped process with `process_vm_readv(2)`.
//!
//! The caller is responsible for keeping the process stopped (ptrace stop,
//! `SIGSTOP`, or an attached debugger) while values are being formatted, and
//! for calling [`Target::notify_resumed`](crate::value::Target::notify_resumed)
//! if it lets the process run. This type never attaches, writes, or signals.
//!
//! ## References
//!
//! - [process_vm_readv(2)](https://man7.org/linux/man-pages/man2/process_vm_readv.2.html)

use std::io;

use tracing::trace;

use super::{check_read_bounds, MemorySource};
use crate::error::ReadError;
use crate::types::Address;

/// Memory of a process on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMemory
{
    pid: libc::pid_t,
}

impl ProcessMemory
{
    #[must_use]
    pub fn new(pid: libc::pid_t) -> Self
    {
        Self { pid }
    }

    pub fn pid(&self) -> libc::pid_t
    {
        self.pid
    }
}

impl MemorySource for ProcessMemory
{
    fn read_bytes(&self, address: Address, size: usize) -> Result<Vec<u8>, ReadError>
    {
        check_read_bounds(address, size)?;
        if size == 0 {
            return Ok(Vec::new());
        }
        let Ok(remote_base) = usize::try_from(address.value()) else {
            return Err(ReadError::unreadable(address, size, "address does not fit the host pointer width"));
        };

        let mut buffer = vec![0u8; size];
        let local = libc::iovec {
            iov_base: buffer.as_mut_ptr().cast(),
            iov_len: size,
        };
        let remote = libc::iovec {
            iov_base: remote_base as *mut libc::c_void,
            iov_len: size,
        };

        // SAFETY: `local` points at `size` writable bytes owned by `buffer`;
        // the remote iovec is only dereferenced by the kernel, in the target.
        #[allow(unsafe_code)]
        let read = unsafe { libc::process_vm_readv(self.pid, &local, 1, &remote, 1, 0) };

        if read < 0 {
            let err = io::Error::last_os_error();
            trace!(pid = self.pid, %address, size, error = %err, "process_vm_readv failed");
            return Err(ReadError::unreadable(address, size, err.to_string()));
        }
        #[allow(clippy::cast_sign_loss)]
        let read = read as usize;
        if read < size {
            return Err(ReadError::unreadable(
                address,
                size,
                format!("short read ({read} of {size} bytes)"),
            ));
        }
        Ok(buffer)
    }

    fn describe(&self) -> String
    {
        format!("pid {}", self.pid)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_reads_own_memory()
    {
        let value: u64 = 0x1122_3344_5566_7788;
        let memory = ProcessMemory::new(std::process::id() as libc::pid_t);
        let address = Address::new(std::ptr::addr_of!(value) as u64);
        match memory.read_bytes(address, 8) {
            Ok(bytes) => assert_eq!(bytes, value.to_ne_bytes()),
            // Some sandboxes deny process_vm_readv even on self.
            Err(ReadError::Unreadable { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_page_unreadable()
    {
        let memory = ProcessMemory::new(std::process::id() as libc::pid_t);
        assert!(memory.read_bytes(Address::NULL, 8).is_err());
    }
}
