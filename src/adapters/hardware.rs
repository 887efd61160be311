//! Hardware adapters: bridge the peripheral drivers to the port traits.
//!
//! Everything here is generic over `embedded-hal` traits, so the same
//! adapters wrap ESP-IDF drivers on the device and simulated pins/buses
//! on the host.  Driver errors stop here: they are logged and the port
//! call returns normally.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{ActuatorPort, DisplayPort, SensorPort};
use crate::drivers::lcd::CharacterLcd;
use crate::drivers::relay::RelayDriver;
use crate::drivers::status_led::IndicatorLed;
use crate::sensors::{ClimateSensor, Reading};

/// Relay plus indicator LED behind [`ActuatorPort`].
pub struct HardwareAdapter<R, L> {
    relay: RelayDriver<R>,
    led: IndicatorLed<L>,
}

impl<R: OutputPin, L: OutputPin> HardwareAdapter<R, L> {
    pub fn new(relay: RelayDriver<R>, led: IndicatorLed<L>) -> Self {
        Self { relay, led }
    }

    pub fn relay_energised(&self) -> bool {
        self.relay.is_energised()
    }

    pub fn led_lit(&self) -> bool {
        self.led.is_lit()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<R, L> ActuatorPort for HardwareAdapter<R, L>
where
    R: OutputPin + Send,
    L: OutputPin + Send,
{
    fn set_relay(&mut self, on: bool) {
        self.relay.set(on);
    }

    fn set_indicator(&mut self, on: bool) {
        self.led.set(on);
    }

    fn all_off(&mut self) {
        self.relay.set(false);
        self.led.off();
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I2C: I2c + Send> SensorPort for ClimateSensor<I2C> {
    fn read_sample(&mut self) -> Reading {
        self.read()
    }
}

// ── DisplayPort implementation ────────────────────────────────

/// Character LCD behind [`DisplayPort`].
pub struct LcdDisplay<I2C, D> {
    lcd: CharacterLcd<I2C, D>,
}

impl<I2C: I2c, D: DelayNs> LcdDisplay<I2C, D> {
    pub fn new(lcd: CharacterLcd<I2C, D>) -> Self {
        Self { lcd }
    }
}

impl<I2C, D> DisplayPort for LcdDisplay<I2C, D>
where
    I2C: I2c + Send,
    D: DelayNs + Send,
{
    fn render(&mut self, text: &str) {
        if let Err(e) = self.lcd.write_text(text) {
            warn!("LCD | write failed: {:?}", e);
        }
    }

    fn clear(&mut self) {
        if let Err(e) = self.lcd.clear() {
            warn!("LCD | clear failed: {:?}", e);
        }
    }

    fn set_power(&mut self, on: bool) {
        if let Err(e) = self.lcd.set_power(on) {
            warn!("LCD | power {} failed: {:?}", if on { "on" } else { "off" }, e);
        }
    }
}
