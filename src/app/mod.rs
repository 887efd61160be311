//! Agent core: the orchestration layer.
//!
//! Four concurrent activities share two lock domains:
//!
//! | Activity              | Thread              | Locks taken                 |
//! |-----------------------|---------------------|-----------------------------|
//! | telemetry publisher   | `publisher`         | transmit (per-cycle sleep)  |
//! | display refresher     | `display`           | display (per render)        |
//! | remote command        | transport callback  | display (status dwell)      |
//! | operator console      | `console`           | both, one at a time         |
//!
//! All interaction with hardware happens through the port traits in
//! [`ports`], so every component here is testable without peripherals.

pub mod actuator;
pub mod agent;
pub mod commands;
pub mod dispatcher;
pub mod display;
pub mod events;
pub mod ports;
pub mod publisher;
pub mod refresher;
pub mod remote;
pub mod sensor;
pub mod transmit;

pub use agent::{Agent, AgentHardware, AgentStatus};
