//! Diagnostics
//!
//! Exposes the pin's level, configuration and recent enforcement history
//! for inspection, without ever writing to the pin.

pub mod history;
pub mod monitor;

pub use history::{AttemptHistory, HISTORY_DEPTH};
pub use monitor::{DiagnosticsMonitor, Health, Sample, DEFAULT_CONTENTION_THRESHOLD};
