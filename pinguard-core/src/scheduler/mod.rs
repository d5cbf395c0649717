//! Re-assertion scheduler
//!
//! Decides when the next enforcement cycle runs. The scheduler never
//! waits itself; the host sleeps for the delay it returns.

pub mod backoff;
pub mod reassert;

pub use backoff::{BackoffTable, ScheduleBand};
pub use reassert::{ReassertionScheduler, ScheduleState, SchedulerPhase, Tick};
