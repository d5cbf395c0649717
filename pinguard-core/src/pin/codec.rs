//! Pin configuration codec
//!
//! Packs a [`PinConfiguration`] into the `PIN_CNF` register layout and
//! back:
//!
//! | Field | Bits  | Values                                   |
//! |-------|-------|------------------------------------------|
//! | DIR   | 0     | 0 input, 1 output                        |
//! | INPUT | 1     | 0 connect, 1 disconnect                  |
//! | PULL  | 3:2   | 0 disabled, 1 pull-down, 3 pull-up       |
//! | DRIVE | 10:8  | 0 S0S1 .. 7 H0D1                         |
//! | SENSE | 17:16 | 0 disabled, 2 high, 3 low                |
//!
//! Every other bit is reserved. `encode` always leaves them zero.

use core::ops::RangeInclusive;

use bit_field::BitField;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::configuration::{Direction, DriveStrength, PinConfiguration, Pull, SenseMode};

const DIR_BIT: usize = 0;
const INPUT_BIT: usize = 1;
const PULL_BITS: RangeInclusive<usize> = 2..=3;
const DRIVE_BITS: RangeInclusive<usize> = 8..=10;
const SENSE_BITS: RangeInclusive<usize> = 16..=17;

/// Mask of every defined `PIN_CNF` bit
pub const DEFINED_MASK: u32 = 0x0003_070F;

/// Errors decoding a register value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// PULL field holds the reserved value
    ReservedPull(u8),
    /// SENSE field holds the reserved value
    ReservedSense(u8),
}

/// Bit-packed `PIN_CNF` value
///
/// Built by [`encode`] or from a register read-back, never by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegisterEncoding(u32);

impl RegisterEncoding {
    /// Wrap a raw value read back from the register
    pub(crate) const fn from_read_back(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw register value
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Direction bit, readable even when other fields are reserved values
    pub fn direction(self) -> Direction {
        if self.0.get_bit(DIR_BIT) {
            Direction::Output
        } else {
            Direction::Input
        }
    }

    /// Compare the defined fields, ignoring reserved bits
    pub const fn matches(self, other: RegisterEncoding) -> bool {
        self.0 & DEFINED_MASK == other.0 & DEFINED_MASK
    }
}

impl From<Pull> for u32 {
    fn from(pull: Pull) -> Self {
        match pull {
            Pull::None => 0,
            Pull::PullDown => 1,
            Pull::PullUp => 3,
        }
    }
}

impl TryFrom<u32> for Pull {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Pull::None),
            1 => Ok(Pull::PullDown),
            3 => Ok(Pull::PullUp),
            other => Err(CodecError::ReservedPull(other as u8)),
        }
    }
}

impl From<DriveStrength> for u32 {
    fn from(drive: DriveStrength) -> Self {
        match drive {
            DriveStrength::Standard => 0,
            DriveStrength::HighSink => 1,
            DriveStrength::HighSource => 2,
            DriveStrength::High => 3,
            DriveStrength::OpenSource => 4,
            DriveStrength::OpenSourceHigh => 5,
            DriveStrength::OpenDrain => 6,
            DriveStrength::OpenDrainHigh => 7,
        }
    }
}

impl From<u32> for DriveStrength {
    /// Only the low three bits are meaningful; the field has no reserved values.
    fn from(value: u32) -> Self {
        match value & 0b111 {
            0 => DriveStrength::Standard,
            1 => DriveStrength::HighSink,
            2 => DriveStrength::HighSource,
            3 => DriveStrength::High,
            4 => DriveStrength::OpenSource,
            5 => DriveStrength::OpenSourceHigh,
            6 => DriveStrength::OpenDrain,
            _ => DriveStrength::OpenDrainHigh,
        }
    }
}

impl From<SenseMode> for u32 {
    fn from(sense: SenseMode) -> Self {
        match sense {
            SenseMode::Disabled => 0,
            SenseMode::High => 2,
            SenseMode::Low => 3,
        }
    }
}

impl TryFrom<u32> for SenseMode {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SenseMode::Disabled),
            2 => Ok(SenseMode::High),
            3 => Ok(SenseMode::Low),
            other => Err(CodecError::ReservedSense(other as u8)),
        }
    }
}

/// Pack a configuration into its register representation
///
/// Pull and sense are written even for an output configuration; the
/// hardware ignores them there and they survive the excursion.
pub fn encode(config: &PinConfiguration) -> RegisterEncoding {
    let mut raw = 0u32;
    raw.set_bit(DIR_BIT, config.direction == Direction::Output);
    // The INPUT field is active-low: 0 connects the buffer
    raw.set_bit(INPUT_BIT, !config.input_buffer_enabled);
    raw.set_bits(PULL_BITS, config.pull.into());
    raw.set_bits(DRIVE_BITS, config.drive.into());
    raw.set_bits(SENSE_BITS, config.sense.into());
    RegisterEncoding(raw)
}

/// Unpack a register value into a configuration
///
/// Reserved bits are ignored. Reserved field values are an error.
pub fn decode(encoding: RegisterEncoding) -> Result<PinConfiguration, CodecError> {
    let raw = encoding.0;
    Ok(PinConfiguration {
        direction: encoding.direction(),
        input_buffer_enabled: !raw.get_bit(INPUT_BIT),
        pull: raw.get_bits(PULL_BITS).try_into()?,
        drive: raw.get_bits(DRIVE_BITS).into(),
        sense: raw.get_bits(SENSE_BITS).try_into()?,
    })
}
