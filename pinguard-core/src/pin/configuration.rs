//! Semantic pin configuration
//!
//! These types describe what a pin should look like electrically,
//! independent of how the register packs it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Pin is sampled, never driven
    #[default]
    Input,
    /// Pin is driven from the output latch
    Output,
}

/// Internal pull resistor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Pull {
    /// No pull resistor
    #[default]
    None,
    /// Weak pull to ground
    PullDown,
    /// Weak pull to supply
    PullUp,
}

/// Output driver strength
///
/// Names follow the low/high drive pair: `S` standard, `H` high,
/// `D` disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DriveStrength {
    /// S0S1: standard '0', standard '1'
    #[default]
    Standard,
    /// H0S1: high drive '0', standard '1'
    HighSink,
    /// S0H1: standard '0', high drive '1'
    HighSource,
    /// H0H1: high drive '0', high drive '1'
    High,
    /// D0S1: disconnect '0', standard '1'
    OpenSource,
    /// D0H1: disconnect '0', high drive '1'
    OpenSourceHigh,
    /// S0D1: standard '0', disconnect '1'
    OpenDrain,
    /// H0D1: high drive '0', disconnect '1'
    OpenDrainHigh,
}

/// Pin sense (wake/interrupt) mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SenseMode {
    /// No sense event
    #[default]
    Disabled,
    /// Sense a high level
    High,
    /// Sense a low level
    Low,
}

/// Logical pin level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// Level from a register bit
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }

    /// Check if the level is high
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    /// Level as 0/1
    pub const fn as_u8(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

/// Configuration combinations this hardware cannot hold as a guarded input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Unsupported {
    /// The engine only holds input states
    OutputTarget,
    /// Sense detection needs the input buffer connected
    SenseWithoutInputBuffer,
}

/// Electrical configuration of one pin
///
/// When `direction` is `Output`, `pull` and `sense` have no effect on
/// the pin but are kept as-is, so an output excursion can return to the
/// exact input settings it left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinConfiguration {
    /// Input or output
    pub direction: Direction,
    /// Input buffer connected
    pub input_buffer_enabled: bool,
    /// Pull resistor
    pub pull: Pull,
    /// Output drive strength
    pub drive: DriveStrength,
    /// Sense mode
    pub sense: SenseMode,
}

impl Default for PinConfiguration {
    fn default() -> Self {
        Self::input(Pull::None)
    }
}

impl PinConfiguration {
    /// Input with connected buffer, standard drive and sense disabled
    pub const fn input(pull: Pull) -> Self {
        Self {
            direction: Direction::Input,
            input_buffer_enabled: true,
            pull,
            drive: DriveStrength::Standard,
            sense: SenseMode::Disabled,
        }
    }

    /// Input with pull-down (the usual matrix row configuration)
    pub const fn pull_down() -> Self {
        Self::input(Pull::PullDown)
    }

    /// Same configuration with a different pull
    pub const fn with_pull(self, pull: Pull) -> Self {
        Self { pull, ..self }
    }

    /// Same configuration with a different drive strength
    pub const fn with_drive(self, drive: DriveStrength) -> Self {
        Self { drive, ..self }
    }

    /// Same configuration with a different sense mode
    pub const fn with_sense(self, sense: SenseMode) -> Self {
        Self { sense, ..self }
    }

    /// Same configuration with a different direction
    pub const fn with_direction(self, direction: Direction) -> Self {
        Self { direction, ..self }
    }

    /// Level the pull resistor rests the pin at, if any
    pub const fn resting_level(&self) -> Option<Level> {
        match self.pull {
            Pull::None => None,
            Pull::PullDown => Some(Level::Low),
            Pull::PullUp => Some(Level::High),
        }
    }

    /// Check that this configuration can be held as a guarded input
    pub const fn validate(&self) -> Result<(), Unsupported> {
        if matches!(self.direction, Direction::Output) {
            return Err(Unsupported::OutputTarget);
        }
        if !self.input_buffer_enabled && !matches!(self.sense, SenseMode::Disabled) {
            return Err(Unsupported::SenseWithoutInputBuffer);
        }
        Ok(())
    }
}
