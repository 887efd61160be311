//! Actuator controller: the single owner of the on/off state of the
//! controlled unit and of the indicator LED.
//!
//! `set_state` drives both outputs first, then flashes the status message
//! on the shared display for the dwell period.  Pin writes happen under
//! the controller's own mutex, so local and remote actuation never
//! interleave half-way; the display flash happens after that mutex is
//! released, so concurrent callers serialize on the display only.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::info;

use super::display::SharedDisplay;
use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink};

struct Outputs {
    port: Box<dyn ActuatorPort>,
    on: bool,
}

pub struct ActuatorController {
    outputs: Mutex<Outputs>,
    name: String,
    display: Arc<SharedDisplay>,
    dwell: Duration,
    events: Arc<dyn EventSink>,
}

impl ActuatorController {
    /// Takes the outputs and drives them both low.
    pub fn new(
        mut port: Box<dyn ActuatorPort>,
        name: impl Into<String>,
        display: Arc<SharedDisplay>,
        dwell: Duration,
        events: Arc<dyn EventSink>,
    ) -> Self {
        port.all_off();
        Self {
            outputs: Mutex::new(Outputs { port, on: false }),
            name: name.into(),
            display,
            dwell,
            events,
        }
    }

    fn outputs(&self) -> MutexGuard<'_, Outputs> {
        self.outputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_on(&self) -> bool {
        self.outputs().on
    }

    /// Switch the unit, mirror the state on the indicator, then show
    /// `message` for the dwell period.
    pub fn set_state(&self, on: bool, message: &str) {
        {
            let mut out = self.outputs();
            out.port.set_relay(on);
            out.port.set_indicator(on);
            out.on = on;
        }
        info!("{}", message);
        self.events.emit(&AppEvent::ActuatorChanged { on });
        self.display.hold(message, self.dwell);
    }

    /// Flip the state (console `h`).  Returns the new state.
    pub fn toggle(&self) -> bool {
        let on = {
            let mut out = self.outputs();
            let on = !out.on;
            out.port.set_relay(on);
            out.port.set_indicator(on);
            out.on = on;
            on
        };
        let message = format!("{} {}", self.name, if on { "On" } else { "Off" });
        info!("{}", message);
        self.events.emit(&AppEvent::ActuatorChanged { on });
        self.display.hold(&message, self.dwell);
        on
    }

    /// Drive the indicator alone (publish flash).  Leaves the state alone.
    pub fn set_indicator(&self, on: bool) {
        self.outputs().port.set_indicator(on);
    }

    /// Both outputs low; used by shutdown.
    pub fn release_all(&self) {
        let mut out = self.outputs();
        if out.on {
            info!("Shutting down {} unit", self.name);
        }
        out.port.all_off();
        out.on = false;
    }
}
