//! Peripheral drivers and thread helpers.

pub mod lcd;
pub mod relay;
pub mod status_led;
pub mod task_pin;
