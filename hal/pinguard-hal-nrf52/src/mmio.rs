//! Memory-mapped GPIO register access
//!
//! Reads and writes go straight to the peripheral through volatile
//! pointer accesses, in program order.

use core::ops::Range;

use pinguard_hal::RegisterAccess;

/// Address window covering the P0 and P1 GPIO register blocks
pub const GPIO_WINDOW: Range<u32> = 0x5000_0000..0x5000_1000;

/// Check that a register address falls inside the GPIO peripheral
pub fn in_gpio_window(base: u32, offset: u32) -> bool {
    match base.checked_add(offset) {
        Some(addr) => GPIO_WINDOW.contains(&addr) && addr % 4 == 0,
        None => false,
    }
}

/// Volatile GPIO register access for nRF52 ports
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MmioRegisters {
    _private: (),
}

impl MmioRegisters {
    /// Take direct register access to the GPIO ports
    ///
    /// # Safety
    ///
    /// Caller must ensure:
    /// - No other driver (embassy-nrf `Input`/`Output`, GPIOTE) owns the
    ///   pins this handle will be used to reconfigure
    /// - Only one `MmioRegisters` is used to write a given pin's registers
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for MmioRegisters {
    #[inline]
    fn read_register(&self, base: u32, offset: u32) -> u32 {
        debug_assert!(in_gpio_window(base, offset));
        let reg = (base + offset) as *const u32;
        // SAFETY: address is inside the always-mapped GPIO peripheral
        unsafe { reg.read_volatile() }
    }

    #[inline]
    fn write_register(&mut self, base: u32, offset: u32, value: u32) {
        debug_assert!(in_gpio_window(base, offset));
        let reg = (base + offset) as *mut u32;
        // SAFETY: address is inside the always-mapped GPIO peripheral,
        // and `new` made the caller responsible for exclusive ownership
        unsafe { reg.write_volatile(value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpio_window() {
        // P0 IN, P0 PIN_CNF[5]
        assert!(in_gpio_window(0x5000_0000, 0x510));
        assert!(in_gpio_window(0x5000_0000, 0x714));
        // P1 PIN_CNF[15]
        assert!(in_gpio_window(0x5000_0300, 0x73C));

        // Outside the peripheral
        assert!(!in_gpio_window(0x4000_0000, 0x510));
        assert!(!in_gpio_window(0x5000_0000, 0x1000));
        // Unaligned
        assert!(!in_gpio_window(0x5000_0000, 0x511));
        // Overflow
        assert!(!in_gpio_window(u32::MAX, 4));
    }
}
