//! Admin button task
//!
//! Short press re-asserts the pin immediately. Long press toggles the
//! re-assertion schedule between stopped and running.

use defmt::*;
use embassy_nrf::gpio::Input;
use embassy_time::{Duration, Instant, Timer};

use crate::guard::{GuardCommand, GuardControl};

/// Press length that counts as a long press
const LONG_PRESS_MS: u64 = 1000;

/// Contact bounce settle time
const DEBOUNCE_MS: u64 = 20;

/// Admin button task (button is active low)
#[embassy_executor::task]
pub async fn button_task(mut button: Input<'static>, control: &'static GuardControl) {
    info!("Button task started");

    loop {
        button.wait_for_low().await;
        let pressed = Instant::now();
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
        if button.is_high() {
            continue;
        }

        button.wait_for_high().await;
        let held = pressed.elapsed();

        let command = if held >= Duration::from_millis(LONG_PRESS_MS) {
            if control.engine().await.is_running() {
                GuardCommand::Stop
            } else {
                GuardCommand::Resume
            }
        } else {
            GuardCommand::Reconfigure
        };
        debug!("Button held {} ms -> {}", held.as_millis(), command);
        control.request(command);

        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
    }
}
