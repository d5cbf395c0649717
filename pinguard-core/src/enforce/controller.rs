//! Enforcement controller
//!
//! Applies a target configuration to one pin, strengthens its pull with
//! short output pulses, verifies the result and falls back once if the
//! hardware refuses the target.
//!
//! The controller knows nothing about time beyond the fixed pulse
//! busy-wait. Re-running it is the scheduler's job.

use embedded_hal::delay::DelayNs;
use pinguard_hal::RegisterAccess;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::attempt::{Applied, EnforceError, EnforcementAttempt};
use crate::pin::registers::{DIRCLR, DIRSET, IN, OUTCLR, OUTSET};
use crate::pin::{encode, Level, PinConfiguration, PinIdentity, Pull, RegisterEncoding};

/// Ceiling for a single pulse hold or gap (µs)
pub const MAX_PULSE_US: u32 = 100;

/// Ceiling for pulse repetitions per enforcement
pub const MAX_PULSE_REPETITIONS: u8 = 8;

/// Settle time before sampling during a drive test (µs)
pub const DRIVE_TEST_SETTLE_US: u32 = 100;

/// Pull-strengthening pulse timing
///
/// The pin is driven to the pull's resting level for `hold_us`,
/// released, and the cycle repeats `repetitions` times with `gap_us`
/// between pulses. Values are empirical and clamped so the busy-wait
/// stays bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PulseConfig {
    /// Time the pin is driven per pulse (µs)
    pub hold_us: u32,
    /// Released time between pulses (µs)
    pub gap_us: u32,
    /// Number of pulses
    pub repetitions: u8,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            hold_us: 30,
            gap_us: 10,
            repetitions: 3,
        }
    }
}

impl PulseConfig {
    /// No pulses at all
    pub const fn disabled() -> Self {
        Self {
            hold_us: 0,
            gap_us: 0,
            repetitions: 0,
        }
    }

    /// Clamp every field to its ceiling
    pub const fn clamped(self) -> Self {
        Self {
            hold_us: min_u32(self.hold_us, MAX_PULSE_US),
            gap_us: min_u32(self.gap_us, MAX_PULSE_US),
            repetitions: if self.repetitions > MAX_PULSE_REPETITIONS {
                MAX_PULSE_REPETITIONS
            } else {
                self.repetitions
            },
        }
    }

    /// Total busy-wait of one pulse train after clamping (µs)
    pub const fn busy_us(&self) -> u32 {
        let pulse = self.clamped();
        if pulse.repetitions == 0 {
            return 0;
        }
        let n = pulse.repetitions as u32;
        n * pulse.hold_us + (n - 1) * pulse.gap_us
    }
}

const fn min_u32(a: u32, b: u32) -> u32 {
    if a < b {
        a
    } else {
        b
    }
}

/// What to try when the target does not hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FallbackPolicy {
    /// Retry once with the pull resistor disabled
    #[default]
    DisablePull,
    /// Report the mismatch without retrying
    NoFallback,
}

impl FallbackPolicy {
    /// Fallback configuration for `target`, if the policy has one
    pub fn fallback_for(self, target: &PinConfiguration) -> Option<PinConfiguration> {
        match self {
            FallbackPolicy::DisablePull if target.pull != Pull::None => {
                Some(target.with_pull(Pull::None))
            }
            _ => None,
        }
    }
}

/// Result of driving the pin and sampling it back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveTest {
    /// Level the pin was driven to
    pub driven: Level,
    /// Level sampled while driving
    pub measured: Level,
}

impl DriveTest {
    /// Something outside the chip is stronger than the pin driver
    pub fn conflict(&self) -> bool {
        self.driven != self.measured
    }
}

/// Temporary output drive on one pin
///
/// Switching back to input happens on drop, so every exit path leaves
/// the pin undriven.
struct OutputExcursion<'a, R: RegisterAccess> {
    regs: &'a mut R,
    base: u32,
    mask: u32,
}

impl<'a, R: RegisterAccess> OutputExcursion<'a, R> {
    fn begin(regs: &'a mut R, pin: &PinIdentity, level: Level) -> Self {
        let base = pin.base_address();
        let mask = pin.mask();
        // Latch the level before enabling the driver so the pin never
        // glitches to the opposite level
        let latch = match level {
            Level::Low => OUTCLR,
            Level::High => OUTSET,
        };
        regs.write_register(base, latch, mask);
        regs.write_register(base, DIRSET, mask);
        Self { regs, base, mask }
    }

    fn level(&self) -> Level {
        Level::from_bit(self.regs.read_register(self.base, IN) & self.mask != 0)
    }
}

impl<R: RegisterAccess> Drop for OutputExcursion<'_, R> {
    fn drop(&mut self) {
        self.regs.write_register(self.base, DIRCLR, self.mask);
    }
}

/// Enforcement controller for a single pin
///
/// Owns the register handle for its pin. Calls must be serialized by the
/// host; the controller does no locking of its own.
#[derive(Debug)]
pub struct EnforcementController<R, D> {
    pin: PinIdentity,
    regs: R,
    delay: D,
    pulse: PulseConfig,
    fallback: FallbackPolicy,
}

impl<R: RegisterAccess, D: DelayNs> EnforcementController<R, D> {
    /// Create a controller with the default pulse and fallback policy
    pub fn new(pin: PinIdentity, regs: R, delay: D) -> Self {
        Self {
            pin,
            regs,
            delay,
            pulse: PulseConfig::default(),
            fallback: FallbackPolicy::default(),
        }
    }

    /// Use different pulse timing (clamped to the ceilings)
    pub fn with_pulse(mut self, pulse: PulseConfig) -> Self {
        self.pulse = pulse.clamped();
        self
    }

    /// Use a different fallback policy
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Pin this controller owns
    pub fn pin(&self) -> PinIdentity {
        self.pin
    }

    /// Active pulse timing
    pub fn pulse(&self) -> PulseConfig {
        self.pulse
    }

    /// Read-only access to the register handle
    pub fn registers(&self) -> &R {
        &self.regs
    }

    #[cfg(test)]
    pub(crate) fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    #[cfg(test)]
    pub(crate) fn delay(&self) -> &D {
        &self.delay
    }

    /// Run one enforcement cycle
    ///
    /// 1. Force the pin to input
    /// 2. Write the target encoding
    /// 3. Pulse the pin to the pull's resting level, if there is a pull
    /// 4. Read back the configuration and the input level
    /// 5. On mismatch, apply the fallback configuration once
    ///
    /// Never blocks beyond the pulse train and always leaves the pin in
    /// input direction.
    pub fn enforce(&mut self, target: &PinConfiguration) -> EnforcementAttempt {
        if let Err(reason) = target.validate() {
            return EnforcementAttempt::rejected(
                *target,
                EnforceError::UnsupportedConfiguration(reason),
            );
        }
        if !self.regs.is_ready() {
            return EnforcementAttempt::rejected(*target, EnforceError::DeviceNotReady);
        }

        let wanted = encode(target);
        let (read_back, level) = self.apply(target);

        if read_back.matches(wanted) {
            return EnforcementAttempt {
                target: *target,
                applied: Applied::Target,
                read_back: Some(read_back),
                level: Some(level),
                error: None,
            };
        }

        match self.fallback.fallback_for(target) {
            Some(fallback) => {
                let (read_back, level) = self.apply(&fallback);
                EnforcementAttempt {
                    target: *target,
                    applied: Applied::Fallback(fallback),
                    read_back: Some(read_back),
                    level: Some(level),
                    error: Some(EnforceError::ConfigurationMismatch),
                }
            }
            None => EnforcementAttempt {
                target: *target,
                applied: Applied::Target,
                read_back: Some(read_back),
                level: Some(level),
                error: Some(EnforceError::ConfigurationMismatch),
            },
        }
    }

    /// Drive the pin to `level`, sample it, and return it to input
    ///
    /// A conflict means something outside the chip is holding the line.
    pub fn drive_test(&mut self, level: Level) -> Result<DriveTest, EnforceError> {
        if !self.regs.is_ready() {
            return Err(EnforceError::DeviceNotReady);
        }

        let excursion = OutputExcursion::begin(&mut self.regs, &self.pin, level);
        self.delay.delay_us(DRIVE_TEST_SETTLE_US);
        let measured = excursion.level();
        drop(excursion);

        Ok(DriveTest {
            driven: level,
            measured,
        })
    }

    fn apply(&mut self, config: &PinConfiguration) -> (RegisterEncoding, Level) {
        let base = self.pin.base_address();

        // Never drive against an external signal while reconfiguring
        self.regs.write_register(base, DIRCLR, self.pin.mask());
        self.regs
            .write_register(base, self.pin.config_offset(), encode(config).bits());

        if let Some(level) = config.resting_level() {
            self.strengthen_pull(level);
        }

        (self.read_back(), self.level())
    }

    fn strengthen_pull(&mut self, level: Level) {
        for i in 0..self.pulse.repetitions {
            if i > 0 {
                self.delay.delay_us(self.pulse.gap_us);
            }
            let excursion = OutputExcursion::begin(&mut self.regs, &self.pin, level);
            self.delay.delay_us(self.pulse.hold_us);
            drop(excursion);
        }
    }

    fn read_back(&self) -> RegisterEncoding {
        RegisterEncoding::from_read_back(
            self.regs
                .read_register(self.pin.base_address(), self.pin.config_offset()),
        )
    }

    fn level(&self) -> Level {
        Level::from_bit(self.regs.read_register(self.pin.base_address(), IN) & self.pin.mask() != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::registers::pin_cnf;
    use crate::pin::{Direction, DriveStrength, Port, SenseMode, Unsupported};
    use crate::sim::{CountingDelay, SimulatedPort};
    use heapless::Vec;

    fn p0_05() -> PinIdentity {
        PinIdentity::new(Port::P0, 5).unwrap()
    }

    fn controller(port: SimulatedPort) -> EnforcementController<SimulatedPort, CountingDelay> {
        EnforcementController::new(p0_05(), port, CountingDelay::new())
    }

    #[test]
    fn test_enforce_pull_down() {
        let mut ctl = controller(SimulatedPort::new(Port::P0));
        let target = PinConfiguration::pull_down();

        let attempt = ctl.enforce(&target);

        assert!(attempt.success());
        assert_eq!(attempt.applied, Applied::Target);
        assert_eq!(attempt.resulting(), Some(target));
        assert_eq!(attempt.level, Some(Level::Low));
        assert!(!ctl.registers().is_output(5));
    }

    #[test]
    fn test_enforce_is_idempotent() {
        let mut ctl = controller(SimulatedPort::new(Port::P0));
        let target = PinConfiguration::pull_down().with_drive(DriveStrength::High);

        let first = ctl.enforce(&target);
        let second = ctl.enforce(&target);

        assert!(first.success());
        assert!(second.success());
        assert_eq!(first.read_back, second.read_back);
        assert_eq!(second.resulting(), Some(target));
    }

    #[test]
    fn test_pulse_discharges_residual_charge() {
        let mut port = SimulatedPort::new(Port::P0);
        port.set_residual(5, Level::High);
        let mut ctl = controller(port);

        let attempt = ctl.enforce(&PinConfiguration::pull_down());

        assert_eq!(attempt.level, Some(Level::Low));
        assert_eq!(ctl.registers().output_excursions(5), 3);
    }

    #[test]
    fn test_without_pulse_residual_charge_remains() {
        let mut port = SimulatedPort::new(Port::P0);
        port.set_residual(5, Level::High);
        let mut ctl = controller(port).with_pulse(PulseConfig::disabled());

        let attempt = ctl.enforce(&PinConfiguration::pull_down());

        // Configuration holds, but the weak pull has not won yet
        assert!(attempt.success());
        assert_eq!(attempt.level, Some(Level::High));
        assert_eq!(ctl.registers().output_excursions(5), 0);
    }

    #[test]
    fn test_pull_up_pulses_high() {
        let mut ctl = controller(SimulatedPort::new(Port::P0));

        let attempt = ctl.enforce(&PinConfiguration::input(Pull::PullUp));

        assert!(attempt.success());
        assert_eq!(attempt.level, Some(Level::High));
        assert!(ctl.registers().out_latch() & (1 << 5) != 0);
    }

    #[test]
    fn test_no_pull_skips_pulse() {
        let mut ctl = controller(SimulatedPort::new(Port::P0));

        let attempt = ctl.enforce(&PinConfiguration::default());

        assert!(attempt.success());
        assert_eq!(ctl.registers().output_excursions(5), 0);
        assert_eq!(ctl.delay().total_us(), 0);
    }

    #[test]
    fn test_pulse_busy_wait_is_fixed() {
        let mut ctl = controller(SimulatedPort::new(Port::P0));

        ctl.enforce(&PinConfiguration::pull_down());

        // 3 x 30us hold + 2 x 10us gap
        assert_eq!(ctl.delay().total_us(), 110);
        assert_eq!(PulseConfig::default().busy_us(), 110);
    }

    #[test]
    fn test_pulse_config_clamped() {
        let pulse = PulseConfig {
            hold_us: 10_000,
            gap_us: 5,
            repetitions: 200,
        }
        .clamped();
        assert_eq!(pulse.hold_us, MAX_PULSE_US);
        assert_eq!(pulse.gap_us, 5);
        assert_eq!(pulse.repetitions, MAX_PULSE_REPETITIONS);
        assert_eq!(PulseConfig::disabled().busy_us(), 0);
    }

    #[test]
    fn test_busy_us_uses_clamped_values() {
        let pulse = PulseConfig {
            hold_us: u32::MAX,
            gap_us: u32::MAX,
            repetitions: 2,
        };
        assert_eq!(pulse.busy_us(), 3 * MAX_PULSE_US);
    }

    /// Register file that logs every write in order
    struct WriteLog {
        writes: Vec<(u32, u32), 32>,
        pin_cnf: u32,
    }

    impl WriteLog {
        fn new() -> Self {
            Self {
                writes: Vec::new(),
                pin_cnf: 0,
            }
        }
    }

    impl RegisterAccess for WriteLog {
        fn read_register(&self, _base: u32, offset: u32) -> u32 {
            if offset == pin_cnf(5) {
                self.pin_cnf
            } else {
                0
            }
        }

        fn write_register(&mut self, _base: u32, offset: u32, value: u32) {
            if offset == pin_cnf(5) {
                self.pin_cnf = value;
            }
            self.writes.push((offset, value)).unwrap();
        }
    }

    #[test]
    fn test_enforce_write_order() {
        let mut ctl = EnforcementController::new(p0_05(), WriteLog::new(), CountingDelay::new());

        let attempt = ctl.enforce(&PinConfiguration::pull_down());
        assert!(attempt.success());

        let mask = 1 << 5;
        let mut expected: Vec<(u32, u32), 32> = Vec::new();
        expected.push((DIRCLR, mask)).unwrap();
        expected.push((pin_cnf(5), 0x4)).unwrap();
        for _ in 0..3 {
            expected.push((OUTCLR, mask)).unwrap();
            expected.push((DIRSET, mask)).unwrap();
            expected.push((DIRCLR, mask)).unwrap();
        }
        assert_eq!(ctl.registers().writes, expected);
    }

    #[test]
    fn test_drive_test_write_order() {
        let mut ctl = EnforcementController::new(p0_05(), WriteLog::new(), CountingDelay::new());

        ctl.drive_test(Level::High).unwrap();

        let mask = 1 << 5;
        assert_eq!(
            ctl.registers().writes.as_slice(),
            &[(OUTSET, mask), (DIRSET, mask), (DIRCLR, mask)]
        );
    }

    #[test]
    fn test_fallback_when_pull_rejected() {
        let mut port = SimulatedPort::new(Port::P0);
        port.reject_pull_writes(true);
        let mut ctl = controller(port);

        let attempt = ctl.enforce(&PinConfiguration::pull_down());

        assert!(!attempt.success());
        assert_eq!(attempt.error, Some(EnforceError::ConfigurationMismatch));
        assert!(attempt.used_fallback());
        assert!(attempt.fallback_held());
        assert_eq!(attempt.resulting().map(|c| c.pull), Some(Pull::None));
        // Target write plus exactly one fallback write
        assert_eq!(ctl.registers().config_writes(5), 2);
        assert!(!ctl.registers().is_output(5));
    }

    #[test]
    fn test_no_fallback_policy() {
        let mut port = SimulatedPort::new(Port::P0);
        port.reject_pull_writes(true);
        let mut ctl = controller(port).with_fallback(FallbackPolicy::NoFallback);

        let attempt = ctl.enforce(&PinConfiguration::pull_down());

        assert_eq!(attempt.error, Some(EnforceError::ConfigurationMismatch));
        assert_eq!(attempt.applied, Applied::Target);
        assert_eq!(ctl.registers().config_writes(5), 1);
    }

    #[test]
    fn test_fallback_for() {
        let target = PinConfiguration::pull_down().with_sense(SenseMode::High);
        assert_eq!(
            FallbackPolicy::DisablePull.fallback_for(&target),
            Some(target.with_pull(Pull::None))
        );
        assert_eq!(
            FallbackPolicy::DisablePull.fallback_for(&PinConfiguration::default()),
            None
        );
        assert_eq!(FallbackPolicy::NoFallback.fallback_for(&target), None);
    }

    #[test]
    fn test_device_not_ready() {
        let mut port = SimulatedPort::new(Port::P0);
        port.set_ready(false);
        let mut ctl = controller(port);

        let attempt = ctl.enforce(&PinConfiguration::pull_down());

        assert_eq!(attempt.error, Some(EnforceError::DeviceNotReady));
        assert_eq!(attempt.applied, Applied::Nothing);
        assert_eq!(ctl.registers().total_writes(), 0);
    }

    #[test]
    fn test_unsupported_target_not_written() {
        let mut ctl = controller(SimulatedPort::new(Port::P0));
        let target = PinConfiguration::pull_down().with_direction(Direction::Output);

        let attempt = ctl.enforce(&target);

        assert_eq!(
            attempt.error,
            Some(EnforceError::UnsupportedConfiguration(
                Unsupported::OutputTarget
            ))
        );
        assert_eq!(ctl.registers().total_writes(), 0);
    }

    #[test]
    fn test_recovers_from_external_overwrite() {
        let mut ctl = controller(SimulatedPort::new(Port::P0));
        let target = PinConfiguration::pull_down();
        ctl.enforce(&target);

        // Another subsystem takes the pin as a driven-high output
        ctl.registers_mut().external_drive_output(5, Level::High);
        assert!(ctl.registers().is_output(5));

        let attempt = ctl.enforce(&target);

        assert!(attempt.success());
        assert_eq!(attempt.level, Some(Level::Low));
        assert!(!ctl.registers().is_output(5));
    }

    #[test]
    fn test_drive_test_detects_conflict() {
        let mut port = SimulatedPort::new(Port::P0);
        port.set_external_driver(5, Some(Level::High));
        let mut ctl = controller(port);

        let result = ctl.drive_test(Level::Low).unwrap();

        assert!(result.conflict());
        assert!(!ctl.registers().is_output(5));
    }

    #[test]
    fn test_drive_test_clean_pin() {
        let mut ctl = controller(SimulatedPort::new(Port::P0));

        let result = ctl.drive_test(Level::Low).unwrap();

        assert!(!result.conflict());
        assert_eq!(result.measured, Level::Low);
        assert!(!ctl.registers().is_output(5));
    }
}
