//! Diagnostics monitor task
//!
//! Samples the pin on a slow cadence and logs drift. Sampling never
//! writes the pin; when the configuration has drifted the task asks the
//! enforcement task to re-assert instead.

use defmt::*;
use embassy_time::{Duration, Ticker};

use crate::guard::{GuardCommand, GuardControl};

/// Monitor task
#[embassy_executor::task]
pub async fn monitor_task(control: &'static GuardControl) {
    let interval_ms = control.engine().await.monitor_interval_ms();
    info!("Monitor task started ({} ms cadence)", interval_ms);

    let mut ticker = Ticker::every(Duration::from_millis(interval_ms as u64));
    let mut level_changes = 0;

    loop {
        ticker.next().await;

        let (sample, running) = {
            let mut engine = control.engine().await;
            (engine.sample(), engine.is_running())
        };

        if sample.level_changes != level_changes {
            debug!(
                "Level now {} ({} transitions seen)",
                sample.level, sample.level_changes
            );
            level_changes = sample.level_changes;
        }

        if !sample.holds_target {
            match sample.configuration {
                Ok(config) => warn!("Pin drifted to {}", config),
                Err(e) => warn!(
                    "Pin drifted to undecodable PIN_CNF {=u32:#x} ({})",
                    sample.raw.bits(),
                    e
                ),
            }
            if running {
                control.request(GuardCommand::Reconfigure);
            }
        } else {
            trace!("Sample: level {}, PIN_CNF {=u32:#x}", sample.level, sample.raw.bits());
        }
    }
}
