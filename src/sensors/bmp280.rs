//! Bosch BMP280 temperature / pressure sensor over I²C.
//!
//! Runs the part in normal mode with x1 oversampling on both channels
//! and applies the datasheet's floating-point compensation to each burst
//! read.  Generic over any `embedded-hal` 1.0 I²C bus.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Default I²C address (SDO pulled high).
pub const DEFAULT_ADDRESS: u8 = 0x77;

const CHIP_ID: u8 = 0x58;

const REG_CALIB: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

const RESET_WORD: u8 = 0xB6;
/// status.im_update: NVM trimming data is being copied to the registers.
const STATUS_IM_UPDATE: u8 = 0x01;
/// Datasheet start-up time after power-on or soft reset.
const STARTUP_MS: u32 = 2;
const NVM_POLL_LIMIT: u32 = 10;
/// osrs_t = x1, osrs_p = x1, mode = normal.
const CTRL_MEAS_NORMAL: u8 = 0b001_001_11;
/// t_standby = 125 ms, filter off.
const CONFIG_STANDBY_125MS: u8 = 0b010_000_00;

#[derive(Debug)]
pub enum Bmp280Error<E> {
    /// Underlying bus error.
    Bus(E),
    /// The chip at the address is not a BMP280.
    WrongChip(u8),
    /// The NVM copy after reset never finished.
    NotReady,
}

impl<E: fmt::Debug> fmt::Display for Bmp280Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "I2C bus error: {e:?}"),
            Self::WrongChip(id) => write!(f, "unexpected chip id 0x{id:02X}"),
            Self::NotReady => write!(f, "calibration copy did not finish after reset"),
        }
    }
}

/// Factory trimming parameters (registers 0x88..0x9F).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

impl Calibration {
    pub fn from_registers(raw: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Self {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p1: u(6),
            p2: s(8),
            p3: s(10),
            p4: s(12),
            p5: s(14),
            p6: s(16),
            p7: s(18),
            p8: s(20),
            p9: s(22),
        }
    }

    /// Returns `(celsius, t_fine)`.
    pub fn compensate_temperature(&self, adc_t: i32) -> (f64, f64) {
        let adc_t = f64::from(adc_t);
        let t1 = f64::from(self.t1);
        let var1 = (adc_t / 16_384.0 - t1 / 1_024.0) * f64::from(self.t2);
        let d = adc_t / 131_072.0 - t1 / 8_192.0;
        let var2 = d * d * f64::from(self.t3);
        let t_fine = var1 + var2;
        (t_fine / 5_120.0, t_fine)
    }

    /// Pressure in pascals.  Returns 0 when the calibration would divide by zero.
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: f64) -> f64 {
        let mut var1 = t_fine / 2.0 - 64_000.0;
        let mut var2 = var1 * var1 * f64::from(self.p6) / 32_768.0;
        var2 += var1 * f64::from(self.p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.p4) * 65_536.0;
        var1 = (f64::from(self.p3) * var1 * var1 / 524_288.0 + f64::from(self.p2) * var1)
            / 524_288.0;
        var1 = (1.0 + var1 / 32_768.0) * f64::from(self.p1);
        if var1 == 0.0 {
            return 0.0;
        }
        let mut p = 1_048_576.0 - f64::from(adc_p);
        p = (p - var2 / 4_096.0) * 6_250.0 / var1;
        let var1 = f64::from(self.p9) * p * p / 2_147_483_648.0;
        let var2 = p * f64::from(self.p8) / 32_768.0;
        p + (var1 + var2 + f64::from(self.p7)) / 16.0
    }
}

/// One compensated measurement in SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub celsius: f64,
    pub pascals: f64,
}

pub struct Bmp280<I2C> {
    i2c: I2C,
    address: u8,
    calibration: Calibration,
}

impl<I2C: I2c> Bmp280<I2C> {
    /// Check the chip id, reset the sensor, wait for its trimming data, load the
    /// calibration, then start normal mode.
    pub fn new(
        mut i2c: I2C,
        delay: &mut impl DelayNs,
        address: u8,
    ) -> Result<Self, Bmp280Error<I2C::Error>> {
        let mut id = [0u8; 1];
        i2c.write_read(address, &[REG_CHIP_ID], &mut id)
            .map_err(Bmp280Error::Bus)?;
        if id[0] != CHIP_ID {
            return Err(Bmp280Error::WrongChip(id[0]));
        }

        i2c.write(address, &[REG_RESET, RESET_WORD])
            .map_err(Bmp280Error::Bus)?;
        delay.delay_ms(STARTUP_MS);
        wait_for_nvm(&mut i2c, delay, address)?;

        let mut raw = [0u8; 24];
        i2c.write_read(address, &[REG_CALIB], &mut raw)
            .map_err(Bmp280Error::Bus)?;

        i2c.write(address, &[REG_CONFIG, CONFIG_STANDBY_125MS])
            .map_err(Bmp280Error::Bus)?;
        i2c.write(address, &[REG_CTRL_MEAS, CTRL_MEAS_NORMAL])
            .map_err(Bmp280Error::Bus)?;

        Ok(Self {
            i2c,
            address,
            calibration: Calibration::from_registers(&raw),
        })
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Burst-read the latest conversion and compensate it.
    pub fn measure(&mut self) -> Result<Measurement, Bmp280Error<I2C::Error>> {
        let mut data = [0u8; 6];
        self.i2c
            .write_read(self.address, &[REG_DATA], &mut data)
            .map_err(Bmp280Error::Bus)?;

        let adc_p = raw20(data[0], data[1], data[2]);
        let adc_t = raw20(data[3], data[4], data[5]);
        let (celsius, t_fine) = self.calibration.compensate_temperature(adc_t);
        let pascals = self.calibration.compensate_pressure(adc_p, t_fine);
        Ok(Measurement { celsius, pascals })
    }
}

/// Poll status until im_update clears.  Calibration read earlier can be all zeros.
fn wait_for_nvm<I2C: I2c>(
    i2c: &mut I2C,
    delay: &mut impl DelayNs,
    address: u8,
) -> Result<(), Bmp280Error<I2C::Error>> {
    let mut status = [0u8; 1];
    for _ in 0..NVM_POLL_LIMIT {
        i2c.write_read(address, &[REG_STATUS], &mut status)
            .map_err(Bmp280Error::Bus)?;
        if status[0] & STATUS_IM_UPDATE == 0 {
            return Ok(());
        }
        delay.delay_ms(1);
    }
    Err(Bmp280Error::NotReady)
}

fn raw20(msb: u8, lsb: u8, xlsb: u8) -> i32 {
    (i32::from(msb) << 12) | (i32::from(lsb) << 4) | (i32::from(xlsb) >> 4)
}
