//! Guard configuration
//!
//! Everything the engine needs besides the pin and the register handle.
//! The firmware builds this from constants generated at build time.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::diagnostics::DEFAULT_CONTENTION_THRESHOLD;
use crate::enforce::{FallbackPolicy, PulseConfig};
use crate::pin::{PinConfiguration, Unsupported};
use crate::scheduler::BackoffTable;

/// Default diagnostics sampling cadence (ms)
pub const DEFAULT_MONITOR_INTERVAL_MS: u32 = 5000;

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GuardConfig {
    /// Configuration to hold the pin in
    pub target: PinConfiguration,
    /// Re-assertion intervals
    pub backoff: BackoffTable,
    /// Pull-strengthening pulse timing
    pub pulse: PulseConfig,
    /// What to try when the target does not hold
    pub fallback: FallbackPolicy,
    /// Diagnostics sampling cadence (ms)
    pub monitor_interval_ms: u32,
    /// Consecutive failures reported as contention
    pub contention_threshold: u8,
}

/// Why a configuration cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Target is not a state the engine can hold
    Target(Unsupported),
    /// Zero interval, or medium band ending before the fast band
    InvalidBackoff,
}

impl From<Unsupported> for ConfigError {
    fn from(reason: Unsupported) -> Self {
        ConfigError::Target(reason)
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            target: PinConfiguration::pull_down(),
            backoff: BackoffTable::default(),
            pulse: PulseConfig::default(),
            fallback: FallbackPolicy::default(),
            monitor_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
            contention_threshold: DEFAULT_CONTENTION_THRESHOLD,
        }
    }
}

impl GuardConfig {
    /// Default configuration holding `target`
    pub fn for_target(target: PinConfiguration) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Check the configuration can be run
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        if !self.backoff.is_valid() {
            return Err(ConfigError::InvalidBackoff);
        }
        Ok(())
    }
}
