//! Control register access
//!
//! A thin, side-effecting accessor over a fixed physical address range.
//! No validation and no retries: an invalid offset is a caller bug.

/// 32-bit control register access
///
/// Every call is an observable side effect. Implementations must not
/// reorder, merge or cache accesses relative to program order; on real
/// hardware this means volatile reads and writes.
pub trait RegisterAccess {
    /// Read the register at `base + offset`
    fn read_register(&self, base: u32, offset: u32) -> u32;

    /// Write `value` to the register at `base + offset`
    fn write_register(&mut self, base: u32, offset: u32, value: u32);

    /// Check whether the register block can be accessed yet
    ///
    /// Returns false while the owning clock domain or peripheral is not
    /// available. The caller retries later; nothing here blocks.
    fn is_ready(&self) -> bool {
        true
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read_register(&self, base: u32, offset: u32) -> u32 {
        (**self).read_register(base, offset)
    }

    fn write_register(&mut self, base: u32, offset: u32, value: u32) {
        (**self).write_register(base, offset, value)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}
