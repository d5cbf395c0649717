//! Shared engine handle
//!
//! The engine is built once in `main` and moved into a [`GuardControl`]
//! that lives in a `StaticCell`. Tasks get a `&'static GuardControl`;
//! the mutex serializes every call into the engine, so two enforcement
//! cycles never overlap.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::Delay;

use pinguard_core::pin::Level;
use pinguard_core::PinGuard;
use pinguard_hal_nrf52::MmioRegisters;

/// Engine type running on the target
pub type Engine = PinGuard<MmioRegisters, Delay>;

/// Queued commands before `request` starts dropping
const COMMAND_QUEUE_SIZE: usize = 4;

/// Administrative commands for the enforcement task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum GuardCommand {
    /// Enforce immediately, outside the schedule
    Reconfigure,
    /// Cancel scheduled ticks
    Stop,
    /// Restart the schedule from the fast band
    Resume,
    /// Log a status snapshot
    DumpStatus,
    /// Drive the pin and check for an external conflict
    DriveTest(Level),
}

/// Engine plus its command queue
pub struct GuardControl {
    engine: Mutex<CriticalSectionRawMutex, Engine>,
    commands: Channel<CriticalSectionRawMutex, GuardCommand, COMMAND_QUEUE_SIZE>,
}

impl GuardControl {
    /// Wrap an initialized engine
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Mutex::new(engine),
            commands: Channel::new(),
        }
    }

    /// Lock the engine
    pub async fn engine(&self) -> MutexGuard<'_, CriticalSectionRawMutex, Engine> {
        self.engine.lock().await
    }

    /// Current logical level as 0/1
    pub async fn level(&self) -> u8 {
        self.engine.lock().await.level()
    }

    /// Queue a command without waiting
    ///
    /// Drops the command when the queue is full.
    pub fn request(&self, command: GuardCommand) {
        if self.commands.try_send(command).is_err() {
            warn!("Guard command queue full, dropping {}", command);
        }
    }

    /// Wait for the next command
    pub async fn next_command(&self) -> GuardCommand {
        self.commands.receive().await
    }
}
