//! Pinguard - Pin Ownership Enforcement Firmware
//!
//! Holds one contended GPIO input of an nRF52840 in a known state. The
//! pin is programmed directly through its registers, its pull is
//! strengthened with short output pulses, and the configuration is
//! re-asserted on a backoff schedule for as long as the firmware runs.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Pull};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use pinguard_core::pin::Level;
use pinguard_core::{InitStatus, PinGuard};
use pinguard_hal_nrf52::MmioRegisters;

use crate::guard::{GuardCommand, GuardControl};

mod config;
mod guard;
mod tasks;

/// Heartbeat period of the main task
const HEARTBEAT_SECS: u64 = 60;

// Engine and command queue (must live forever for task references)
static GUARD: StaticCell<GuardControl> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pinguard firmware starting...");

    // The guarded pin is never handed to an embassy-nrf driver; the
    // engine is the only writer of its registers
    let p = embassy_nrf::init(Default::default());
    info!("Peripherals initialized");

    // nRF52840-DK Button 1
    let button = Input::new(p.P0_11, Pull::Up);

    let pin = unwrap!(config::guard_pin());
    let guard_config = config::guard_config();
    info!("Guarding {} as {}", config::PIN_NAME, guard_config.target);

    // SAFETY: no other driver owns the guarded pin, and this is the only
    // register handle used to write it
    let regs = unsafe { MmioRegisters::new() };

    let (engine, status) = unwrap!(PinGuard::init(pin, regs, Delay, &guard_config));
    match status {
        InitStatus::Ready => info!("Initial enforcement done, level {}", engine.level()),
        InitStatus::DeviceNotReady => warn!("GPIO not ready at init, scheduler will retry"),
    }

    let control: &'static GuardControl = GUARD.init(GuardControl::new(engine));

    spawner.spawn(unwrap!(tasks::enforcement_task(control)));
    spawner.spawn(unwrap!(tasks::monitor_task(control)));
    spawner.spawn(unwrap!(tasks::button_task(button, control)));

    // One drive test at boot to surface external conflicts early
    control.request(GuardCommand::DriveTest(Level::Low));

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(HEARTBEAT_SECS).await;
        trace!("Main loop heartbeat, level {}", control.level().await);
        control.request(GuardCommand::DumpStatus);
    }
}
