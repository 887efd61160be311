//! Environmental sensing: the BMP280 driver and the [`ClimateSensor`]
//! wrapper that turns its SI measurements into site units.
//!
//! Temperature is reported in degrees Fahrenheit and pressure in
//! kilopascals, which is what the display and the cloud consumer expect.

pub mod bmp280;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

use bmp280::{Bmp280, Bmp280Error, Measurement};

/// One environmental reading in site units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub temperature_f: f64,
    pub pressure_kpa: f64,
}

impl From<Measurement> for Reading {
    fn from(m: Measurement) -> Self {
        Self {
            temperature_f: celsius_to_fahrenheit(m.celsius),
            pressure_kpa: m.pascals / 1_000.0,
        }
    }
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// BMP280 wrapper that never fails a read.
///
/// A bus error is logged and the last good reading is returned, so one
/// flaky transaction cannot stall the publisher or the refresher.
pub struct ClimateSensor<I2C> {
    bmp: Bmp280<I2C>,
    last_good: Reading,
    consecutive_failures: u32,
}

impl<I2C: I2c> ClimateSensor<I2C> {
    pub fn new(
        i2c: I2C,
        delay: &mut impl DelayNs,
        address: u8,
    ) -> Result<Self, Bmp280Error<I2C::Error>> {
        let mut bmp = Bmp280::new(i2c, delay, address)?;
        // Zeros until the first conversion lands.
        let last_good = bmp.measure().map(Reading::from).unwrap_or_default();
        Ok(Self {
            bmp,
            last_good,
            consecutive_failures: 0,
        })
    }

    pub fn read(&mut self) -> Reading {
        match self.bmp.measure() {
            Ok(m) => {
                self.consecutive_failures = 0;
                self.last_good = Reading::from(m);
            }
            Err(e) => {
                self.consecutive_failures += 1;
                warn!(
                    "BMP280 read failed ({} in a row): {}, keeping last reading",
                    self.consecutive_failures, e
                );
            }
        }
        self.last_good
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
