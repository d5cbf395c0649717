//! Embassy async tasks
//!
//! Each task shares the engine through `GuardControl`.

pub mod button;
pub mod enforcement;
pub mod monitor;

pub use button::button_task;
pub use enforcement::enforcement_task;
pub use monitor::monitor_task;
