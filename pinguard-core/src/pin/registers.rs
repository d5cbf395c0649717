//! nRF52 GPIO register map
//!
//! Offsets are relative to a port base address. `DIRSET`/`DIRCLR` and
//! `PIN_CNF[n].DIR` alias the same direction bit.

/// P0 register block base address
pub const P0_BASE: u32 = 0x5000_0000;
/// P1 register block base address
pub const P1_BASE: u32 = 0x5000_0300;

/// Output latch
pub const OUT: u32 = 0x504;
/// Write 1 to set output latch bits
pub const OUTSET: u32 = 0x508;
/// Write 1 to clear output latch bits
pub const OUTCLR: u32 = 0x50C;
/// Input sample
pub const IN: u32 = 0x510;
/// Direction (1 = output)
pub const DIR: u32 = 0x514;
/// Write 1 to switch pins to output
pub const DIRSET: u32 = 0x518;
/// Write 1 to switch pins to input
pub const DIRCLR: u32 = 0x51C;
/// First per-pin configuration register
pub const PIN_CNF: u32 = 0x700;

/// Offset of `PIN_CNF[pin]`
pub const fn pin_cnf(pin: u8) -> u32 {
    PIN_CNF + pin as u32 * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_cnf_offsets() {
        assert_eq!(pin_cnf(0), 0x700);
        assert_eq!(pin_cnf(5), 0x714);
        assert_eq!(pin_cnf(31), 0x77C);
    }
}
