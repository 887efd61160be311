//! `ControlRelay` remote method handler.
//!
//! Invoked by the transport on its own thread, possibly concurrently
//! with other invocations and with console actuation.  A bad payload is
//! answered with 400 and touches nothing.

use std::sync::Arc;

use log::warn;

use super::actuator::ActuatorController;
use super::commands::{MethodResponse, RelayCommand};
use super::ports::CommandHandler;

#[derive(Clone)]
pub struct RemoteCommandHandler {
    actuator: Arc<ActuatorController>,
}

impl RemoteCommandHandler {
    pub fn new(actuator: Arc<ActuatorController>) -> Self {
        Self { actuator }
    }

    pub fn handle(&self, payload: &[u8]) -> MethodResponse {
        let cmd = match RelayCommand::decode(payload) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("ControlRelay rejected: {}", e);
                return MethodResponse::bad_request(e.to_string());
            }
        };

        let message = format!(
            "{} Remote {}",
            self.actuator.name(),
            if cmd.onoff { "On" } else { "Off" }
        );
        self.actuator.set_state(cmd.onoff, &message);
        MethodResponse::ok(message)
    }

    /// Wrap as a transport callback.
    pub fn into_handler(self) -> CommandHandler {
        Arc::new(move |payload: &[u8]| self.handle(payload))
    }
}
