//! nRF52-specific HAL for the Pinguard firmware
//!
//! This crate provides the nRF52 implementation of the shared
//! `pinguard-hal` register contract:
//!
//! - Volatile memory-mapped access to the GPIO port register blocks
//! - Address window checks for the P0/P1 peripheral range
//!
//! The GPIO peripheral on nRF52 has no separate clock gate, so the
//! register block is always ready once the core is running.

#![no_std]

pub mod mmio;

// Re-export the shared trait for convenience
pub use mmio::MmioRegisters;
pub use pinguard_hal::RegisterAccess;
