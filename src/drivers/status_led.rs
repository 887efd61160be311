//! Single-colour indicator LED.
//!
//! Lit while the actuator is on and flashed once per telemetry publish.
//! Pin failures are logged and otherwise ignored.

use embedded_hal::digital::{OutputPin, PinState};
use log::warn;

pub struct IndicatorLed<P> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> IndicatorLed<P> {
    pub fn new(mut pin: P) -> Self {
        if let Err(e) = pin.set_low() {
            warn!("LED | initial write failed: {:?}", e);
        }
        Self { pin, lit: false }
    }

    pub fn set(&mut self, lit: bool) {
        match self.pin.set_state(PinState::from(lit)) {
            Ok(()) => self.lit = lit,
            Err(e) => warn!("LED | pin write failed: {:?}", e),
        }
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
