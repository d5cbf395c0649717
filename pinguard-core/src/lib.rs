//! Board-agnostic core logic for the pin enforcement firmware
//!
//! This crate contains all application logic that does not depend on
//! a specific register implementation:
//!
//! - Pin identity and semantic pin configuration
//! - Configuration codec (semantic value <-> `PIN_CNF` bit layout)
//! - Enforcement controller (apply, pull-strengthening pulse, verify, fallback)
//! - Re-assertion scheduler with a declared backoff table
//! - Diagnostics monitor and attempt history
//! - The engine facade that ties them together

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod enforce;
pub mod engine;
pub mod pin;
pub mod scheduler;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::{ConfigError, GuardConfig};
pub use engine::{GuardStatus, InitStatus, PinGuard};
