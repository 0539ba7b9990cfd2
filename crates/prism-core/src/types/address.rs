//! Target address type.

use std::fmt;
use std::ops::Add;

/// Strongly typed address in the target's address space
///
/// A newtype around `u64` so that addresses, byte sizes and field offsets
/// cannot be mixed up when computing child locations.
///
/// `Display` renders the zero-padded form used for pointer values
/// (`0x00007ffc1234abcd`), which is also how pointer children are printed.
///
/// ## Example
///
/// ```rust
/// use prism_core::types::Address;
///
/// let base = Address::new(0x1000);
/// assert_eq!(base.offset(0x10), Some(Address::new(0x1010)));
/// assert_eq!(base.to_string(), "0x0000000000001000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address
    pub const NULL: Self = Address(0);

    /// Create a new address from a raw value.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Raw numeric value.
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Address of a member `offset` bytes into an object at `self`.
    ///
    /// Returns `None` on overflow so a corrupt offset can't wrap around into
    /// an unrelated mapping.
    pub fn offset(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// End of a `size` byte range starting here, if it doesn't overflow.
    pub fn range_end(self, size: usize) -> Option<Self>
    {
        u64::try_from(size).ok().and_then(|size| self.offset(size))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_offset_overflow()
    {
        let addr = Address::new(u64::MAX - 1);
        assert_eq!(addr.offset(1), Some(Address::new(u64::MAX)));
        assert_eq!(addr.offset(2), None);
        assert_eq!(addr.range_end(8), None);
    }

    #[test]
    fn test_display_is_zero_padded()
    {
        assert_eq!(Address::new(0x7ffc_0010).to_string(), "0x000000007ffc0010");
        assert_eq!(format!("{:x}", Address::new(0xbeef)), "beef");
    }
}
