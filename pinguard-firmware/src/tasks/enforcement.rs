//! Enforcement task
//!
//! Hosts the re-assertion schedule: sleeps until the next tick is due,
//! runs it, and handles administrative commands in between. Every engine
//! call happens under the engine mutex, so ticks and commands are
//! serialized.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};

use pinguard_core::diagnostics::Health;
use pinguard_core::enforce::{EnforceError, EnforcementAttempt};
use pinguard_core::scheduler::Tick;

use crate::guard::{Engine, GuardCommand, GuardControl};

/// Enforcement task
///
/// Runs until reset. While stopped it only waits for commands.
#[embassy_executor::task]
pub async fn enforcement_task(control: &'static GuardControl) {
    info!("Enforcement task started");

    let (mut running, mut deadline) = {
        let engine = control.engine().await;
        (engine.is_running(), after_ms(engine.next_delay_ms()))
    };
    let mut health = Health::Unknown;

    loop {
        let event = if running {
            select(Timer::at(deadline), control.next_command()).await
        } else {
            Either::Second(control.next_command().await)
        };

        let mut engine = control.engine().await;

        match event {
            Either::First(()) => match engine.tick() {
                Some(tick) => {
                    log_tick(&tick);
                    deadline = after_ms(tick.next_delay_ms);
                }
                None => running = false,
            },
            Either::Second(command) => {
                if let Some(next) = handle_command(&mut engine, command) {
                    running = next.running;
                    if let Some(delay_ms) = next.delay_ms {
                        deadline = after_ms(delay_ms);
                    }
                }
            }
        }

        let now = engine.health();
        if now != health {
            match now {
                Health::Contended => warn!(
                    "Pin {} contended: persistent enforcement failures, likely a hardware conflict",
                    engine.pin()
                ),
                Health::Stable => info!("Pin held stably"),
                other => debug!("Health: {}", other),
            }
            health = now;
        }
    }
}

/// Schedule change requested by a command
struct ScheduleChange {
    running: bool,
    delay_ms: Option<u32>,
}

fn handle_command(engine: &mut Engine, command: GuardCommand) -> Option<ScheduleChange> {
    debug!("Guard command: {}", command);

    match command {
        GuardCommand::Reconfigure => {
            let attempt = engine.reconfigure();
            log_attempt(&attempt);
            None
        }
        GuardCommand::Stop => {
            engine.stop();
            info!("Re-assertion stopped");
            Some(ScheduleChange {
                running: false,
                delay_ms: None,
            })
        }
        GuardCommand::Resume => {
            let delay_ms = engine.resume();
            info!("Re-assertion resumed, first tick in {} ms", delay_ms);
            Some(ScheduleChange {
                running: true,
                delay_ms: Some(delay_ms),
            })
        }
        GuardCommand::DumpStatus => {
            let status = engine.status();
            info!("Guard status: {}", status);
            None
        }
        GuardCommand::DriveTest(level) => {
            match engine.drive_test(level) {
                Ok(result) if result.conflict() => warn!(
                    "Drive test conflict: drove {} but read {}",
                    result.driven, result.measured
                ),
                Ok(result) => info!("Drive test passed ({})", result.measured),
                Err(e) => warn!("Drive test failed: {}", e),
            }
            // Settle the pull again after the excursion
            let attempt = engine.reconfigure();
            log_attempt(&attempt);
            None
        }
    }
}

fn log_tick(tick: &Tick) {
    debug!(
        "Tick {}: next in {} ms ({})",
        tick.cycle, tick.next_delay_ms, tick.band
    );
    log_attempt(&tick.attempt);
}

fn log_attempt(attempt: &EnforcementAttempt) {
    match attempt.error {
        None => trace!("Target held, level {}", attempt.level),
        Some(EnforceError::DeviceNotReady) => warn!("GPIO not ready, will retry"),
        Some(EnforceError::ConfigurationMismatch) if attempt.used_fallback() => warn!(
            "Target rejected, fallback {} ({})",
            attempt.applied,
            if attempt.fallback_held() { "held" } else { "not held" }
        ),
        Some(EnforceError::ConfigurationMismatch) => warn!(
            "Read-back mismatch: PIN_CNF {=u32:#x}",
            attempt.read_back.map(|r| r.bits()).unwrap_or(0)
        ),
        Some(EnforceError::UnsupportedConfiguration(reason)) => {
            error!("Unsupported target configuration: {}", reason)
        }
    }
}

fn after_ms(ms: u32) -> Instant {
    Instant::now() + Duration::from_millis(ms as u64)
}
