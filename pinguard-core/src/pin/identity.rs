//! Physical pin identity
//!
//! A `PinIdentity` names exactly one pin: a GPIO port and a pin index
//! within that port. It is fixed at construction and never changes.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::registers::{pin_cnf, P0_BASE, P1_BASE};

/// Errors from building a pin identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Port index does not exist on this chip
    InvalidPort(u8),
    /// Pin index is beyond the port width
    InvalidPin {
        /// Port the pin was requested on
        port: Port,
        /// Requested pin index
        pin: u8,
    },
    /// Pin string could not be parsed
    Malformed,
}

/// GPIO port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Port {
    /// Port 0 (32 pins)
    P0,
    /// Port 1 (16 pins on nRF52840)
    P1,
}

impl Port {
    /// Look up a port by index
    pub const fn from_index(index: u8) -> Result<Self, PinError> {
        match index {
            0 => Ok(Port::P0),
            1 => Ok(Port::P1),
            other => Err(PinError::InvalidPort(other)),
        }
    }

    /// Port index (0 or 1)
    pub const fn index(self) -> u8 {
        match self {
            Port::P0 => 0,
            Port::P1 => 1,
        }
    }

    /// Base address of the port's register block
    pub const fn base_address(self) -> u32 {
        match self {
            Port::P0 => P0_BASE,
            Port::P1 => P1_BASE,
        }
    }

    /// Number of pins on this port
    pub const fn pin_count(self) -> u8 {
        match self {
            Port::P0 => 32,
            Port::P1 => 16,
        }
    }
}

/// One physical pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinIdentity {
    port: Port,
    pin: u8,
}

impl PinIdentity {
    /// Create a pin identity
    ///
    /// Fails if `pin` is not a valid index on `port`.
    pub const fn new(port: Port, pin: u8) -> Result<Self, PinError> {
        if pin >= port.pin_count() {
            return Err(PinError::InvalidPin { port, pin });
        }
        Ok(Self { port, pin })
    }

    /// Parse a pin string from config
    ///
    /// Supports formats:
    /// - "P0.05" -> (P0, 5)
    /// - "p1.10" -> (P1, 10)
    /// - "P0_05" -> (P0, 5)
    pub fn parse(s: &str) -> Result<Self, PinError> {
        let s = s.trim();

        let s = s
            .strip_prefix('P')
            .or_else(|| s.strip_prefix('p'))
            .ok_or(PinError::Malformed)?;

        let (port_str, pin_str) = s
            .split_once('.')
            .or_else(|| s.split_once('_'))
            .ok_or(PinError::Malformed)?;

        if port_str.is_empty() || pin_str.is_empty() {
            return Err(PinError::Malformed);
        }

        let port: u8 = port_str.parse().map_err(|_| PinError::Malformed)?;
        let pin: u8 = pin_str.parse().map_err(|_| PinError::Malformed)?;

        Self::new(Port::from_index(port)?, pin)
    }

    /// GPIO port
    pub const fn port(&self) -> Port {
        self.port
    }

    /// Pin index within the port
    pub const fn pin(&self) -> u8 {
        self.pin
    }

    /// Single-bit mask for the port-wide registers (IN, DIRSET, ...)
    pub const fn mask(&self) -> u32 {
        1 << self.pin
    }

    /// Base address of the owning port
    pub const fn base_address(&self) -> u32 {
        self.port.base_address()
    }

    /// Offset of this pin's `PIN_CNF` register
    pub const fn config_offset(&self) -> u32 {
        pin_cnf(self.pin)
    }
}

impl fmt::Display for PinIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}.{:02}", self.port.index(), self.pin)
    }
}
