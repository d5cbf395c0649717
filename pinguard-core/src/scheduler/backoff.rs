//! Backoff table
//!
//! Re-assertion starts aggressive to outlast early-boot initialization
//! that may overwrite the pin, then decays to a background guard.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default fast interval (ms)
pub const DEFAULT_FAST_MS: u32 = 100;
/// Default medium interval (ms)
pub const DEFAULT_MEDIUM_MS: u32 = 500;
/// Default slow interval (ms)
pub const DEFAULT_SLOW_MS: u32 = 1500;

/// Interval band a cycle falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleBand {
    /// Early cycles, short interval
    Fast,
    /// Intermediate cycles
    Medium,
    /// Long interval, continues indefinitely
    Slow,
}

/// Declared backoff table
///
/// | Cycles                          | Interval    |
/// |---------------------------------|-------------|
/// | `0 .. fast_cycles`              | `fast_ms`   |
/// | `fast_cycles .. medium_cycles`  | `medium_ms` |
/// | `medium_cycles ..`              | `slow_ms`   |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BackoffTable {
    /// Interval while in the fast band (ms)
    pub fast_ms: u32,
    /// Interval while in the medium band (ms)
    pub medium_ms: u32,
    /// Interval once settled (ms)
    pub slow_ms: u32,
    /// First cycle of the medium band
    pub fast_cycles: u32,
    /// First cycle of the slow band
    pub medium_cycles: u32,
}

impl Default for BackoffTable {
    fn default() -> Self {
        Self {
            fast_ms: DEFAULT_FAST_MS,
            medium_ms: DEFAULT_MEDIUM_MS,
            slow_ms: DEFAULT_SLOW_MS,
            fast_cycles: 10,
            medium_cycles: 30,
        }
    }
}

impl BackoffTable {
    /// Band the given cycle falls in
    pub const fn band_for(&self, cycle: u32) -> ScheduleBand {
        if cycle < self.fast_cycles {
            ScheduleBand::Fast
        } else if cycle < self.medium_cycles {
            ScheduleBand::Medium
        } else {
            ScheduleBand::Slow
        }
    }

    /// Delay following the given cycle (ms)
    pub const fn interval_for(&self, cycle: u32) -> u32 {
        match self.band_for(cycle) {
            ScheduleBand::Fast => self.fast_ms,
            ScheduleBand::Medium => self.medium_ms,
            ScheduleBand::Slow => self.slow_ms,
        }
    }

    /// Check that intervals are non-zero and bands are ordered
    pub const fn is_valid(&self) -> bool {
        self.fast_ms > 0
            && self.medium_ms > 0
            && self.slow_ms > 0
            && self.fast_cycles <= self.medium_cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        let table = BackoffTable::default();
        assert_eq!(table.band_for(0), ScheduleBand::Fast);
        assert_eq!(table.band_for(9), ScheduleBand::Fast);
        assert_eq!(table.band_for(10), ScheduleBand::Medium);
        assert_eq!(table.band_for(29), ScheduleBand::Medium);
        assert_eq!(table.band_for(30), ScheduleBand::Slow);
        assert_eq!(table.band_for(u32::MAX), ScheduleBand::Slow);
    }

    #[test]
    fn test_no_medium_band() {
        let table = BackoffTable {
            medium_cycles: 10,
            ..BackoffTable::default()
        };
        assert_eq!(table.interval_for(9), DEFAULT_FAST_MS);
        assert_eq!(table.interval_for(10), DEFAULT_SLOW_MS);
    }

    #[test]
    fn test_validity() {
        assert!(BackoffTable::default().is_valid());

        let zero = BackoffTable {
            fast_ms: 0,
            ..BackoffTable::default()
        };
        assert!(!zero.is_valid());

        let inverted = BackoffTable {
            fast_cycles: 40,
            ..BackoffTable::default()
        };
        assert!(!inverted.is_valid());
    }
}
