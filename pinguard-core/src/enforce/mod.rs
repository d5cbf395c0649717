//! Pin enforcement
//!
//! One enforcement cycle forces the pin to input, writes the target,
//! strengthens the pull, verifies the read-back and falls back once.

pub mod attempt;
pub mod controller;

pub use attempt::{Applied, EnforceError, EnforcementAttempt};
pub use controller::{
    DriveTest, EnforcementController, FallbackPolicy, PulseConfig, DRIVE_TEST_SETTLE_US,
    MAX_PULSE_REPETITIONS, MAX_PULSE_US,
};
