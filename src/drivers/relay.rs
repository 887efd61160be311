//! Relay output driver for the controlled unit (HVAC contactor).
//!
//! Generic over any `embedded-hal` [`OutputPin`], so the same driver runs
//! on an ESP-IDF `PinDriver` and on a simulated pin.  Active HIGH.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct RelayDriver<P> {
    pin: P,
    energised: bool,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Take the pin and drive it low.
    pub fn new(pin: P) -> Self {
        let mut relay = Self {
            pin,
            energised: true,
        };
        relay.set(false);
        relay
    }

    pub fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            warn!("RELAY | pin write failed: {:?}", e);
            return;
        }
        self.energised = on;
    }

    pub fn is_energised(&self) -> bool {
        self.energised
    }
}
