//! Pinguard Hardware Abstraction Layer
//!
//! This crate defines the register access contract that chip-specific
//! HALs implement. The enforcement engine in `pinguard-core` only ever
//! touches hardware through this trait, so it can run against a
//! simulated register file on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (pinguard-firmware)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pinguard-core (engine, codec)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pinguard-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ pinguard-hal- │       │ SimulatedPort │
//! │    nrf52      │       │   (tests)     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`register::RegisterAccess`] - 32-bit control register reads and writes

#![no_std]
#![deny(unsafe_code)]

pub mod register;

pub use register::RegisterAccess;
