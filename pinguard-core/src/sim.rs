//! Simulated GPIO port for host testing
//!
//! Models one nRF52 GPIO port closely enough to exercise the engine:
//!
//! - `DIRSET`/`DIRCLR` alias `PIN_CNF[n].DIR`
//! - `IN` resolves from direction, input buffer, external drivers,
//!   residual charge and the pull resistor
//! - A pin released from output keeps the driven level as residual
//!   charge until it is driven again
//! - Other subsystems can overwrite pin registers behind the engine's back
//! - Pull writes can be rejected, and the block can report not-ready

use embedded_hal::delay::DelayNs;
use pinguard_hal::RegisterAccess;

use crate::pin::registers::{DIR, DIRCLR, DIRSET, IN, OUT, OUTCLR, OUTSET, PIN_CNF};
use crate::pin::{Level, Port};

const PINS: usize = 32;
const PULL_MASK: u32 = 0b1100;

/// Simulated register block for one GPIO port
#[derive(Debug, Clone)]
pub struct SimulatedPort {
    base: u32,
    pin_count: u8,
    out: u32,
    pin_cnf: [u32; PINS],
    external: [Option<Level>; PINS],
    residual: [Option<Level>; PINS],
    floating: Level,
    ready: bool,
    reject_pull: bool,
    total_writes: u32,
    config_writes: [u32; PINS],
    excursions: [u32; PINS],
}

impl SimulatedPort {
    /// Create a port in reset state, every pin an undriven input
    pub fn new(port: Port) -> Self {
        Self {
            base: port.base_address(),
            pin_count: port.pin_count(),
            out: 0,
            pin_cnf: [0; PINS],
            external: [None; PINS],
            residual: [None; PINS],
            floating: Level::High,
            ready: true,
            reject_pull: false,
            total_writes: 0,
            config_writes: [0; PINS],
            excursions: [0; PINS],
        }
    }

    /// Set whether the register block reports ready
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Drop the PULL field from every `PIN_CNF` write
    pub fn reject_pull_writes(&mut self, reject: bool) {
        self.reject_pull = reject;
    }

    /// Level an undriven, unpulled input floats to
    pub fn set_floating_level(&mut self, level: Level) {
        self.floating = level;
    }

    /// Leave charge on a pin, as if it had just been released from a drive
    pub fn set_residual(&mut self, pin: u8, level: Level) {
        self.residual[pin as usize] = Some(level);
    }

    /// Attach or remove a driver outside the chip
    ///
    /// An external driver overpowers both the pull and the pin's own driver.
    pub fn set_external_driver(&mut self, pin: u8, level: Option<Level>) {
        self.external[pin as usize] = level;
    }

    /// Another subsystem turns the pin into a driven output
    pub fn external_drive_output(&mut self, pin: u8, level: Level) {
        let mask = 1 << pin;
        match level {
            Level::Low => self.out &= !mask,
            Level::High => self.out |= mask,
        }
        self.pin_cnf[pin as usize] |= 1;
        self.residual[pin as usize] = None;
    }

    /// Another subsystem writes a raw `PIN_CNF` value
    pub fn external_configure(&mut self, pin: u8, raw: u32) {
        self.set_config(pin, raw);
    }

    /// Check if the pin is currently an output
    pub fn is_output(&self, pin: u8) -> bool {
        self.pin_cnf[pin as usize] & 1 != 0
    }

    /// Raw `PIN_CNF` of a pin
    pub fn pin_config(&self, pin: u8) -> u32 {
        self.pin_cnf[pin as usize]
    }

    /// Output latch
    pub fn out_latch(&self) -> u32 {
        self.out
    }

    /// Register writes issued through `RegisterAccess`
    pub fn total_writes(&self) -> u32 {
        self.total_writes
    }

    /// `PIN_CNF` writes issued for a pin
    pub fn config_writes(&self, pin: u8) -> u32 {
        self.config_writes[pin as usize]
    }

    /// Input-to-output switches of a pin
    pub fn output_excursions(&self, pin: u8) -> u32 {
        self.excursions[pin as usize]
    }

    fn set_config(&mut self, pin: u8, raw: u32) {
        let was_output = self.is_output(pin);
        self.pin_cnf[pin as usize] = raw;
        self.track_direction(pin, was_output);
    }

    fn set_direction(&mut self, mask: u32, output: bool) {
        for pin in 0..self.pin_count {
            if mask & (1 << pin) == 0 {
                continue;
            }
            let was_output = self.is_output(pin);
            if output {
                self.pin_cnf[pin as usize] |= 1;
            } else {
                self.pin_cnf[pin as usize] &= !1;
            }
            self.track_direction(pin, was_output);
        }
    }

    fn track_direction(&mut self, pin: u8, was_output: bool) {
        let is_output = self.is_output(pin);
        if is_output && !was_output {
            self.excursions[pin as usize] += 1;
            self.residual[pin as usize] = None;
        } else if was_output && !is_output {
            self.residual[pin as usize] = Some(self.driven_level(pin));
        }
    }

    fn driven_level(&self, pin: u8) -> Level {
        Level::from_bit(self.out & (1 << pin) != 0)
    }

    fn input_level(&self, pin: u8) -> Level {
        let cnf = self.pin_cnf[pin as usize];
        let i = pin as usize;

        if cnf & 1 != 0 {
            return self.external[i].unwrap_or_else(|| self.driven_level(pin));
        }
        // Disconnected input buffer always samples 0
        if cnf & 0b10 != 0 {
            return Level::Low;
        }
        if let Some(level) = self.external[i] {
            return level;
        }
        if let Some(level) = self.residual[i] {
            return level;
        }
        match (cnf & PULL_MASK) >> 2 {
            1 => Level::Low,
            3 => Level::High,
            _ => self.floating,
        }
    }

    fn read_in(&self) -> u32 {
        (0..self.pin_count)
            .filter(|&pin| self.input_level(pin).is_high())
            .fold(0, |acc, pin| acc | (1 << pin))
    }

    fn read_dir(&self) -> u32 {
        (0..self.pin_count)
            .filter(|&pin| self.is_output(pin))
            .fold(0, |acc, pin| acc | (1 << pin))
    }

    fn pin_for_offset(&self, offset: u32) -> Option<u8> {
        if offset < PIN_CNF || offset % 4 != 0 {
            return None;
        }
        let pin = (offset - PIN_CNF) / 4;
        if pin < self.pin_count as u32 {
            Some(pin as u8)
        } else {
            None
        }
    }
}

impl RegisterAccess for SimulatedPort {
    fn read_register(&self, base: u32, offset: u32) -> u32 {
        if base != self.base {
            return 0;
        }
        match offset {
            OUT => self.out,
            IN => self.read_in(),
            DIR => self.read_dir(),
            _ => self
                .pin_for_offset(offset)
                .map(|pin| self.pin_cnf[pin as usize])
                .unwrap_or(0),
        }
    }

    fn write_register(&mut self, base: u32, offset: u32, value: u32) {
        if base != self.base {
            return;
        }
        self.total_writes += 1;
        match offset {
            OUT => self.out = value,
            OUTSET => self.out |= value,
            OUTCLR => self.out &= !value,
            DIRSET => self.set_direction(value, true),
            DIRCLR => self.set_direction(value, false),
            _ => {
                if let Some(pin) = self.pin_for_offset(offset) {
                    let value = if self.reject_pull {
                        value & !PULL_MASK
                    } else {
                        value
                    };
                    self.config_writes[pin as usize] += 1;
                    self.set_config(pin, value);
                }
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Delay that only counts the requested busy-wait
#[derive(Debug, Clone, Default)]
pub struct CountingDelay {
    total_ns: u64,
    calls: u32,
}

impl CountingDelay {
    /// Create a delay with nothing counted
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in microseconds
    pub fn total_us(&self) -> u64 {
        self.total_ns / 1000
    }

    /// Number of non-zero delay requests
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        if ns > 0 {
            self.total_ns += ns as u64;
            self.calls += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::registers::pin_cnf;

    const BASE: u32 = 0x5000_0000;

    #[test]
    fn test_dir_aliases_pin_cnf() {
        let mut port = SimulatedPort::new(Port::P0);

        port.write_register(BASE, DIRSET, 1 << 5);
        assert_eq!(port.read_register(BASE, pin_cnf(5)) & 1, 1);
        assert_eq!(port.read_register(BASE, DIR), 1 << 5);

        port.write_register(BASE, DIRCLR, 1 << 5);
        assert_eq!(port.read_register(BASE, pin_cnf(5)) & 1, 0);
        assert_eq!(port.output_excursions(5), 1);
    }

    #[test]
    fn test_input_resolution() {
        let mut port = SimulatedPort::new(Port::P0);

        // Floating input reads the floating level
        assert_eq!(port.read_register(BASE, IN) & (1 << 5), 1 << 5);

        // Pull-down wins over floating
        port.write_register(BASE, pin_cnf(5), 1 << 2);
        assert_eq!(port.read_register(BASE, IN) & (1 << 5), 0);

        // Disconnected buffer samples 0 regardless
        port.set_floating_level(Level::High);
        port.write_register(BASE, pin_cnf(5), 0b10);
        assert_eq!(port.read_register(BASE, IN) & (1 << 5), 0);
    }

    #[test]
    fn test_release_leaves_residual_charge() {
        let mut port = SimulatedPort::new(Port::P0);
        port.write_register(BASE, pin_cnf(5), 1 << 2);

        port.write_register(BASE, OUTSET, 1 << 5);
        port.write_register(BASE, DIRSET, 1 << 5);
        port.write_register(BASE, DIRCLR, 1 << 5);

        // Pull-down is too weak against the charge left behind
        assert_eq!(port.read_register(BASE, IN) & (1 << 5), 1 << 5);
    }

    #[test]
    fn test_reject_pull_and_other_ports() {
        let mut port = SimulatedPort::new(Port::P0);
        port.reject_pull_writes(true);

        port.write_register(BASE, pin_cnf(5), (1 << 2) | (3 << 8));
        assert_eq!(port.pin_config(5), 3 << 8);
        assert_eq!(port.config_writes(5), 1);

        // Writes to another port's block are ignored
        port.write_register(0x5000_0300, OUTSET, 1);
        assert_eq!(port.out_latch(), 0);
        assert_eq!(port.total_writes(), 1);
    }

    #[test]
    fn test_counting_delay() {
        let mut delay = CountingDelay::new();
        delay.delay_us(30);
        delay.delay_us(0);
        delay.delay_ms(1);
        assert_eq!(delay.total_us(), 1030);
        assert_eq!(delay.calls(), 2);
    }
}
