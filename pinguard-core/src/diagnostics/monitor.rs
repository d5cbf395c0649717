//! Diagnostics monitor
//!
//! Read-only view of the guarded pin. Never writes a register; the only
//! state it mutates is its own history and transition counter.

use pinguard_hal::RegisterAccess;

use super::history::{AttemptHistory, HISTORY_DEPTH};
use crate::enforce::EnforcementAttempt;
use crate::pin::registers::IN;
use crate::pin::{
    decode, encode, CodecError, Level, PinConfiguration, PinIdentity, RegisterEncoding,
};

/// Consecutive failures that mark the pin as contended
pub const DEFAULT_CONTENTION_THRESHOLD: u8 = 5;

/// Verdict on how well the pin is being held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Health {
    /// No attempt recorded yet
    Unknown,
    /// Last attempt held the target
    Stable,
    /// Last attempt failed, but not often enough to call it a conflict
    Recovering,
    /// Persistent failures: a hardware conflict, not a software bug
    Contended,
}

/// One monitor observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Input level
    pub level: Level,
    /// Raw `PIN_CNF`
    pub raw: RegisterEncoding,
    /// Decoded configuration, or why it could not be decoded
    pub configuration: Result<PinConfiguration, CodecError>,
    /// Register still holds the target encoding
    pub holds_target: bool,
    /// Level transitions seen across samples
    pub level_changes: u32,
}

/// Diagnostics monitor for one pin
#[derive(Debug, Clone)]
pub struct DiagnosticsMonitor {
    pin: PinIdentity,
    history: AttemptHistory,
    last_level: Option<Level>,
    level_changes: u32,
}

impl DiagnosticsMonitor {
    /// Create a monitor with empty history
    pub const fn new(pin: PinIdentity) -> Self {
        Self {
            pin,
            history: AttemptHistory::new(),
            last_level: None,
            level_changes: 0,
        }
    }

    /// Record the outcome of an enforcement cycle
    pub fn record(&mut self, attempt: EnforcementAttempt) {
        self.history.record(attempt);
    }

    /// Current logical level of the pin
    pub fn current_level<R: RegisterAccess>(&self, regs: &R) -> Level {
        Level::from_bit(regs.read_register(self.pin.base_address(), IN) & self.pin.mask() != 0)
    }

    /// Raw configuration register
    pub fn raw<R: RegisterAccess>(&self, regs: &R) -> RegisterEncoding {
        RegisterEncoding::from_read_back(
            regs.read_register(self.pin.base_address(), self.pin.config_offset()),
        )
    }

    /// Current configuration, decoded from the register
    pub fn current_configuration<R: RegisterAccess>(
        &self,
        regs: &R,
    ) -> Result<PinConfiguration, CodecError> {
        decode(self.raw(regs))
    }

    /// Recent attempts, most recent first
    pub fn last_attempts(&self) -> impl Iterator<Item = &EnforcementAttempt> {
        self.history.iter()
    }

    /// Attempt history
    pub fn history(&self) -> &AttemptHistory {
        &self.history
    }

    /// Take a sample and track level transitions
    pub fn sample<R: RegisterAccess>(&mut self, regs: &R, target: &PinConfiguration) -> Sample {
        let level = self.current_level(regs);
        let raw = self.raw(regs);

        if let Some(previous) = self.last_level {
            if previous != level {
                self.level_changes = self.level_changes.saturating_add(1);
            }
        }
        self.last_level = Some(level);

        Sample {
            level,
            raw,
            configuration: decode(raw),
            holds_target: raw.matches(encode(target)),
            level_changes: self.level_changes,
        }
    }

    /// Health verdict from the attempt history
    ///
    /// # Arguments
    /// - `threshold`: consecutive failures that count as contention,
    ///   clamped to `1..=HISTORY_DEPTH` since the history cannot see more
    pub fn health(&self, threshold: u8) -> Health {
        let Some(latest) = self.history.latest() else {
            return Health::Unknown;
        };
        if latest.success() {
            return Health::Stable;
        }
        let threshold = (threshold as usize).clamp(1, HISTORY_DEPTH);
        if self.history.consecutive_failures() >= threshold {
            Health::Contended
        } else {
            Health::Recovering
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforce::EnforcementController;
    use crate::pin::{Direction, Port, Pull};
    use crate::sim::{CountingDelay, SimulatedPort};

    fn p0_05() -> PinIdentity {
        PinIdentity::new(Port::P0, 5).unwrap()
    }

    #[test]
    fn test_reads_do_not_write() {
        let mut port = SimulatedPort::new(Port::P0);
        port.external_configure(5, 1 << 2);
        let mut monitor = DiagnosticsMonitor::new(p0_05());

        assert_eq!(monitor.current_level(&port), Level::Low);
        assert_eq!(
            monitor.current_configuration(&port),
            Ok(PinConfiguration::pull_down())
        );
        let sample = monitor.sample(&port, &PinConfiguration::pull_down());
        assert!(sample.holds_target);
        assert_eq!(port.total_writes(), 0);
    }

    #[test]
    fn test_sample_detects_drift_and_transitions() {
        let mut port = SimulatedPort::new(Port::P0);
        port.external_configure(5, 1 << 2);
        let target = PinConfiguration::pull_down();
        let mut monitor = DiagnosticsMonitor::new(p0_05());

        let first = monitor.sample(&port, &target);
        assert_eq!(first.level, Level::Low);
        assert_eq!(first.level_changes, 0);

        port.external_drive_output(5, Level::High);
        let second = monitor.sample(&port, &target);
        assert_eq!(second.level, Level::High);
        assert!(!second.holds_target);
        assert_eq!(
            second.configuration.map(|c| c.direction),
            Ok(Direction::Output)
        );
        assert_eq!(second.level_changes, 1);
    }

    #[test]
    fn test_reserved_value_reported() {
        let mut port = SimulatedPort::new(Port::P0);
        port.external_configure(5, 2 << 2);
        let monitor = DiagnosticsMonitor::new(p0_05());

        assert_eq!(
            monitor.current_configuration(&port),
            Err(CodecError::ReservedPull(2))
        );
    }

    #[test]
    fn test_health() {
        let mut port = SimulatedPort::new(Port::P0);
        port.reject_pull_writes(true);
        let mut ctl = EnforcementController::new(p0_05(), port, CountingDelay::new());
        let mut monitor = DiagnosticsMonitor::new(p0_05());
        assert_eq!(monitor.health(3), Health::Unknown);

        let target = PinConfiguration::pull_down();
        monitor.record(ctl.enforce(&target));
        assert_eq!(monitor.health(3), Health::Recovering);

        monitor.record(ctl.enforce(&target));
        monitor.record(ctl.enforce(&target));
        assert_eq!(monitor.health(3), Health::Contended);

        monitor.record(ctl.enforce(&PinConfiguration::input(Pull::None)));
        assert_eq!(monitor.health(3), Health::Stable);
        assert_eq!(monitor.last_attempts().count(), 4);
    }

    #[test]
    fn test_health_threshold_beyond_history() {
        let mut port = SimulatedPort::new(Port::P0);
        port.reject_pull_writes(true);
        let mut ctl = EnforcementController::new(p0_05(), port, CountingDelay::new());
        let mut monitor = DiagnosticsMonitor::new(p0_05());

        let target = PinConfiguration::pull_down();
        for _ in 0..HISTORY_DEPTH - 1 {
            monitor.record(ctl.enforce(&target));
        }
        assert_eq!(monitor.health(u8::MAX), Health::Recovering);

        monitor.record(ctl.enforce(&target));
        assert_eq!(monitor.health(u8::MAX), Health::Contended);
        assert_eq!(monitor.health(0), Health::Contended);
    }
}
