//! Fixed peripheral wiring for the ESP32 site node.
//!
//! The relay and indicator GPIOs are configurable (`HVACPin` / `LEDPin`
//! in `appsettings.json`); the I²C buses are fixed by the carrier board.

// ---------------------------------------------------------------------------
// Sensor bus (I2C0): BMP280
// ---------------------------------------------------------------------------

pub const SENSOR_I2C_SDA_GPIO: i32 = 21;
pub const SENSOR_I2C_SCL_GPIO: i32 = 22;
pub const SENSOR_I2C_BAUD_HZ: u32 = 400_000;

// ---------------------------------------------------------------------------
// Display bus (I2C1): PCF8574 LCD backpack
// ---------------------------------------------------------------------------

pub const DISPLAY_I2C_SDA_GPIO: i32 = 18;
pub const DISPLAY_I2C_SCL_GPIO: i32 = 19;
/// The PCF8574 is rated for 100 kHz.
pub const DISPLAY_I2C_BAUD_HZ: u32 = 100_000;

/// GPIOs reserved by the I²C buses; output pins must avoid them.
pub const RESERVED_GPIOS: [i32; 4] = [
    SENSOR_I2C_SDA_GPIO,
    SENSOR_I2C_SCL_GPIO,
    DISPLAY_I2C_SDA_GPIO,
    DISPLAY_I2C_SCL_GPIO,
];

/// True if `gpio` can drive the relay or the indicator.
pub fn is_assignable_output(gpio: i32) -> bool {
    (0..=33).contains(&gpio) && !RESERVED_GPIOS.contains(&gpio)
}
