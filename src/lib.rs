//! RTDMS site agent.
//!
//! Samples a BMP280, shows readings on a character LCD, publishes
//! telemetry to an IoT Hub style endpoint, and switches an HVAC relay on
//! operator or remote command.  The orchestration lives in [`app`];
//! hardware and network access sit behind the port traits in
//! [`app::ports`].

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod sensors;
pub mod telemetry;
pub mod uplink;
