//! Enforcement engine
//!
//! Owns everything needed to guard one pin: the controller (and through
//! it the register handle), the scheduler and the diagnostics monitor.
//! One instance is built at boot and handed to whatever hosts the
//! deferred work; there are no statics.
//!
//! The host must serialize calls. Two `tick`/`reconfigure` calls for the
//! same pin must never overlap.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use pinguard_hal::RegisterAccess;

use crate::config::{ConfigError, GuardConfig};
use crate::diagnostics::{DiagnosticsMonitor, Health, Sample, HISTORY_DEPTH};
use crate::enforce::{DriveTest, EnforceError, EnforcementAttempt, EnforcementController};
use crate::pin::{CodecError, Level, PinConfiguration, PinIdentity, RegisterEncoding};
use crate::scheduler::{ReassertionScheduler, ScheduleState, SchedulerPhase, Tick};

/// Outcome of initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStatus {
    /// First enforcement reached the hardware
    Ready,
    /// Register block not available yet; the scheduler will retry
    DeviceNotReady,
}

/// Snapshot for the administrative interface
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuardStatus {
    /// Guarded pin
    pub pin: PinIdentity,
    /// Configuration being held
    pub target: PinConfiguration,
    /// Configuration currently in the register
    pub configuration: Result<PinConfiguration, CodecError>,
    /// Raw `PIN_CNF`
    pub raw: RegisterEncoding,
    /// Current input level
    pub level: Level,
    /// Scheduler phase
    pub phase: SchedulerPhase,
    /// Scheduler bookkeeping
    pub schedule: ScheduleState,
    /// Health verdict
    pub health: Health,
    /// Recent attempts, most recent first
    pub attempts: Vec<EnforcementAttempt, HISTORY_DEPTH>,
    /// Attempts since boot
    pub total_attempts: u32,
    /// Failed attempts since boot
    pub failed_attempts: u32,
}

/// Pin ownership enforcement engine
pub struct PinGuard<R, D> {
    controller: EnforcementController<R, D>,
    target: PinConfiguration,
    scheduler: ReassertionScheduler,
    monitor: DiagnosticsMonitor,
    contention_threshold: u8,
    monitor_interval_ms: u32,
}

impl<R: RegisterAccess, D: DelayNs> PinGuard<R, D> {
    /// Build the engine, enforce once and start the scheduler
    ///
    /// A target the hardware cannot hold, or a backoff table with a zero
    /// interval or inverted bands, is a construction error. A register block that is not ready yet is not: the engine is
    /// returned with [`InitStatus::DeviceNotReady`] and the first
    /// scheduled tick retries.
    pub fn init(
        pin: PinIdentity,
        regs: R,
        delay: D,
        config: &GuardConfig,
    ) -> Result<(Self, InitStatus), ConfigError> {
        config.validate()?;

        let controller = EnforcementController::new(pin, regs, delay)
            .with_pulse(config.pulse)
            .with_fallback(config.fallback);

        let mut guard = Self {
            controller,
            target: config.target,
            scheduler: ReassertionScheduler::new(config.backoff),
            monitor: DiagnosticsMonitor::new(pin),
            contention_threshold: config.contention_threshold.clamp(1, HISTORY_DEPTH as u8),
            monitor_interval_ms: config.monitor_interval_ms,
        };

        let attempt = guard.reconfigure();
        guard.scheduler.start();

        let status = if attempt.error == Some(EnforceError::DeviceNotReady) {
            InitStatus::DeviceNotReady
        } else {
            InitStatus::Ready
        };
        Ok((guard, status))
    }

    /// Run one scheduled cycle
    ///
    /// Returns `None` when the scheduler is stopped.
    pub fn tick(&mut self) -> Option<Tick> {
        let tick = self.scheduler.tick(&mut self.controller, &self.target)?;
        self.monitor.record(tick.attempt);
        Some(tick)
    }

    /// Enforce immediately, outside the schedule
    pub fn reconfigure(&mut self) -> EnforcementAttempt {
        let attempt = self.controller.enforce(&self.target);
        self.monitor.record(attempt);
        attempt
    }

    /// Cancel future ticks
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Restart the backoff table and return the delay before the next tick
    pub fn resume(&mut self) -> u32 {
        self.scheduler.resume()
    }

    /// Check if ticks are being scheduled
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Delay before the next tick (ms)
    pub fn next_delay_ms(&self) -> u32 {
        self.scheduler.state().interval_ms
    }

    /// Diagnostics sampling cadence (ms)
    pub fn monitor_interval_ms(&self) -> u32 {
        self.monitor_interval_ms
    }

    /// Guarded pin
    pub fn pin(&self) -> PinIdentity {
        self.controller.pin()
    }

    /// Configuration being held
    pub fn target(&self) -> PinConfiguration {
        self.target
    }

    /// Logical level as 0/1, for the matrix scan
    pub fn level(&self) -> u8 {
        self.current_level().as_u8()
    }

    /// Current logical level
    pub fn current_level(&self) -> Level {
        self.monitor.current_level(self.controller.registers())
    }

    /// Configuration currently in the register
    pub fn current_configuration(&self) -> Result<PinConfiguration, CodecError> {
        self.monitor.current_configuration(self.controller.registers())
    }

    /// Recent attempts, most recent first
    pub fn last_attempts(&self) -> impl Iterator<Item = &EnforcementAttempt> {
        self.monitor.last_attempts()
    }

    /// Health verdict from recent attempts
    pub fn health(&self) -> Health {
        self.monitor.health(self.contention_threshold)
    }

    /// Take a diagnostics sample
    pub fn sample(&mut self) -> Sample {
        self.monitor.sample(self.controller.registers(), &self.target)
    }

    /// Drive the pin briefly and check nothing external overpowers it
    ///
    /// The pin is back in input direction when this returns. The next
    /// tick or `reconfigure` restores the pull settling.
    pub fn drive_test(&mut self, level: Level) -> Result<DriveTest, EnforceError> {
        self.controller.drive_test(level)
    }

    /// Snapshot of configuration, schedule and history
    pub fn status(&self) -> GuardStatus {
        let regs = self.controller.registers();
        GuardStatus {
            pin: self.pin(),
            target: self.target,
            configuration: self.monitor.current_configuration(regs),
            raw: self.monitor.raw(regs),
            level: self.monitor.current_level(regs),
            phase: self.scheduler.phase(),
            schedule: self.scheduler.state(),
            health: self.health(),
            attempts: self.monitor.last_attempts().copied().collect(),
            total_attempts: self.monitor.history().total(),
            failed_attempts: self.monitor.history().failed(),
        }
    }

    #[cfg(test)]
    pub(crate) fn registers_mut(&mut self) -> &mut R {
        self.controller.registers_mut()
    }
}
