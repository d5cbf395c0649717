//! Guard configuration
//!
//! Built from the constants `build.rs` generates out of guard.toml, so an
//! invalid configuration never reaches the target.

use pinguard_core::enforce::{FallbackPolicy, PulseConfig};
use pinguard_core::pin::{
    Direction, DriveStrength, PinConfiguration, PinError, PinIdentity, Port, Pull, SenseMode,
};
use pinguard_core::scheduler::BackoffTable;
use pinguard_core::GuardConfig;

include!(concat!(env!("OUT_DIR"), "/guard_config.rs"));

/// Guarded pin
pub fn guard_pin() -> Result<PinIdentity, PinError> {
    PinIdentity::new(Port::from_index(PIN_PORT)?, PIN_NUMBER)
}

/// Engine configuration
pub fn guard_config() -> GuardConfig {
    GuardConfig {
        target: PinConfiguration {
            direction: Direction::Input,
            input_buffer_enabled: TARGET_INPUT_BUFFER,
            pull: TARGET_PULL,
            drive: TARGET_DRIVE,
            sense: TARGET_SENSE,
        },
        backoff: BackoffTable {
            fast_ms: BACKOFF_FAST_MS,
            medium_ms: BACKOFF_MEDIUM_MS,
            slow_ms: BACKOFF_SLOW_MS,
            fast_cycles: BACKOFF_FAST_CYCLES,
            medium_cycles: BACKOFF_MEDIUM_CYCLES,
        },
        pulse: PulseConfig {
            hold_us: PULSE_HOLD_US,
            gap_us: PULSE_GAP_US,
            repetitions: PULSE_REPETITIONS,
        },
        fallback: FALLBACK,
        monitor_interval_ms: MONITOR_INTERVAL_MS,
        contention_threshold: CONTENTION_THRESHOLD,
    }
}
