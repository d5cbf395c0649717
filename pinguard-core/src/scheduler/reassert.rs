//! Re-assertion state machine
//!
//! ```text
//! Idle --start--> Active --medium_cycles reached--> Settled
//!                   ^                                  |
//!                   |                         stop (from either)
//!                   |                                  v
//!                   +-------------resume----------- Stopped
//! ```
//!
//! Each tick runs one enforcement cycle, advances the cycle count and
//! returns the delay until the next tick. Ticks never stop on their own.

use embedded_hal::delay::DelayNs;
use pinguard_hal::RegisterAccess;

use super::backoff::{BackoffTable, ScheduleBand};
use crate::enforce::{EnforcementAttempt, EnforcementController};
use crate::pin::PinConfiguration;

/// Scheduler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerPhase {
    /// Not started
    Idle,
    /// Fast or medium band, contention still expected
    Active,
    /// Slow band, background guard
    Settled,
    /// Cancelled; no further ticks until resumed
    Stopped,
}

/// Scheduler bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleState {
    /// Completed ticks since start or resume
    pub cycle: u32,
    /// Delay until the next tick (ms)
    pub interval_ms: u32,
}

/// Outcome of one scheduled tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick {
    /// Cycle index of this tick (0-based)
    pub cycle: u32,
    /// Enforcement result
    pub attempt: EnforcementAttempt,
    /// Delay until the next tick (ms)
    pub next_delay_ms: u32,
    /// Band the delay was taken from
    pub band: ScheduleBand,
}

/// Periodic re-assertion scheduler
#[derive(Debug, Clone)]
pub struct ReassertionScheduler {
    table: BackoffTable,
    phase: SchedulerPhase,
    state: ScheduleState,
}

impl ReassertionScheduler {
    /// Create an idle scheduler
    pub const fn new(table: BackoffTable) -> Self {
        Self {
            table,
            phase: SchedulerPhase::Idle,
            state: ScheduleState {
                cycle: 0,
                interval_ms: 0,
            },
        }
    }

    /// Start ticking
    ///
    /// Returns the delay before the first tick. Starting a running
    /// scheduler leaves it unchanged.
    pub fn start(&mut self) -> u32 {
        if self.is_running() {
            return self.state.interval_ms;
        }
        self.restart()
    }

    /// Run one tick
    ///
    /// Returns `None` without touching the pin when idle or stopped.
    pub fn tick<R, D>(
        &mut self,
        controller: &mut EnforcementController<R, D>,
        target: &PinConfiguration,
    ) -> Option<Tick>
    where
        R: RegisterAccess,
        D: DelayNs,
    {
        if !self.is_running() {
            return None;
        }

        let cycle = self.state.cycle;
        let attempt = controller.enforce(target);

        let band = self.table.band_for(cycle);
        let next_delay_ms = self.table.interval_for(cycle);
        self.state = ScheduleState {
            cycle: cycle.saturating_add(1),
            interval_ms: next_delay_ms,
        };
        if self.state.cycle >= self.table.medium_cycles {
            self.phase = SchedulerPhase::Settled;
        }

        Some(Tick {
            cycle,
            attempt,
            next_delay_ms,
            band,
        })
    }

    /// Cancel future ticks
    ///
    /// An in-flight tick has already returned by the time this can be
    /// called, so the pin is never left mid-pulse.
    pub fn stop(&mut self) {
        self.phase = SchedulerPhase::Stopped;
    }

    /// Restart from cycle 0 and return the delay before the first tick
    pub fn resume(&mut self) -> u32 {
        self.restart()
    }

    /// Check if ticks are being scheduled
    pub fn is_running(&self) -> bool {
        matches!(self.phase, SchedulerPhase::Active | SchedulerPhase::Settled)
    }

    /// Current phase
    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Current bookkeeping
    pub fn state(&self) -> ScheduleState {
        self.state
    }

    /// Backoff table in use
    pub fn table(&self) -> &BackoffTable {
        &self.table
    }

    fn restart(&mut self) -> u32 {
        self.state = ScheduleState {
            cycle: 0,
            interval_ms: self.table.interval_for(0),
        };
        self.phase = SchedulerPhase::Active;
        self.state.interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::{PinIdentity, Port};
    use crate::sim::{CountingDelay, SimulatedPort};

    fn controller() -> EnforcementController<SimulatedPort, CountingDelay> {
        EnforcementController::new(
            PinIdentity::new(Port::P0, 5).unwrap(),
            SimulatedPort::new(Port::P0),
            CountingDelay::new(),
        )
    }

    #[test]
    fn test_backoff_over_sixty_ticks() {
        let mut ctl = controller();
        let target = PinConfiguration::pull_down();
        let mut sched = ReassertionScheduler::new(BackoffTable::default());

        assert_eq!(sched.start(), 100);

        for k in 0..60u32 {
            let tick = sched.tick(&mut ctl, &target).unwrap();
            assert_eq!(tick.cycle, k);
            assert!(tick.attempt.success());

            let expected = match k {
                0..=9 => 100,
                10..=29 => 500,
                _ => 1500,
            };
            assert_eq!(tick.next_delay_ms, expected, "tick {}", k);
        }

        assert_eq!(sched.state().cycle, 60);
        assert_eq!(sched.phase(), SchedulerPhase::Settled);
    }

    #[test]
    fn test_phase_transitions() {
        let mut ctl = controller();
        let target = PinConfiguration::pull_down();
        let mut sched = ReassertionScheduler::new(BackoffTable::default());
        assert_eq!(sched.phase(), SchedulerPhase::Idle);

        sched.start();
        assert_eq!(sched.phase(), SchedulerPhase::Active);

        for _ in 0..29 {
            sched.tick(&mut ctl, &target);
        }
        assert_eq!(sched.phase(), SchedulerPhase::Active);

        sched.tick(&mut ctl, &target);
        assert_eq!(sched.phase(), SchedulerPhase::Settled);
    }

    #[test]
    fn test_idle_does_not_tick() {
        let mut ctl = controller();
        let mut sched = ReassertionScheduler::new(BackoffTable::default());

        assert!(sched.tick(&mut ctl, &PinConfiguration::pull_down()).is_none());
        assert_eq!(ctl.registers().total_writes(), 0);
    }

    #[test]
    fn test_stop_and_resume() {
        let mut ctl = controller();
        let target = PinConfiguration::pull_down();
        let mut sched = ReassertionScheduler::new(BackoffTable::default());
        sched.start();
        for _ in 0..40 {
            sched.tick(&mut ctl, &target);
        }

        sched.stop();
        let writes = ctl.registers().total_writes();
        assert!(sched.tick(&mut ctl, &target).is_none());
        assert_eq!(ctl.registers().total_writes(), writes);
        // Pin was left as input by the last completed tick
        assert!(!ctl.registers().is_output(5));

        assert_eq!(sched.resume(), 100);
        assert_eq!(sched.state().cycle, 0);
        let tick = sched.tick(&mut ctl, &target).unwrap();
        assert_eq!(tick.band, ScheduleBand::Fast);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut ctl = controller();
        let mut sched = ReassertionScheduler::new(BackoffTable::default());
        sched.start();
        for _ in 0..12 {
            sched.tick(&mut ctl, &PinConfiguration::pull_down());
        }

        assert_eq!(sched.start(), 500);
        assert_eq!(sched.state().cycle, 12);
    }
}
