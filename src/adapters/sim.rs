//! Host simulation adapters.
//!
//! Lets the full agent run on a workstation: a BMP280 register model on
//! a fake I²C bus (so the real driver and compensation code run), GPIO
//! pins that remember their level, a display that logs its frames, and a
//! loopback transport that logs telemetry and lets callers invoke
//! registered remote methods.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType as I2cErrorType, I2c, Operation};
use log::{debug, info};

use crate::app::commands::MethodResponse;
use crate::app::ports::{CommandHandler, DisplayPort, TelemetryTransport};
use crate::drivers::lcd::layout;
use crate::error::TransportError;

// ── GPIO ──────────────────────────────────────────────────────

/// Output pin that records its level.  Clones share the level, so a
/// test or the simulator can keep a handle after handing the pin off.
#[derive(Debug, Clone)]
pub struct SimPin {
    gpio: i32,
    level: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            level: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.level.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.level.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// `DelayNs` over `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimDelay;

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

// ── BMP280 bus model ──────────────────────────────────────────

/// Datasheet trimming values (BMP280 datasheet §3.11.3 example).
const SIM_CALIBRATION: [i32; 12] = [
    27504, 26435, -1000, 36477, -10685, 3024, 2855, 140, -7, 15500, -14600, 6000,
];
const SIM_ADC_T: f64 = 519_888.0;
const SIM_ADC_P: f64 = 415_148.0;
/// How long the modelled NVM copy runs after a soft reset.
const SIM_NVM_COPY: Duration = Duration::from_micros(1_500);

/// I²C bus with a BMP280 register file behind it.
///
/// After a soft reset the part spends a moment copying its trimming data:
/// status reports im_update and the calibration block reads as zeros
/// until the copy is done.
///
/// Raw conversions wander slowly around the datasheet example point
/// (about 77 °F / 100.7 kPa) so the display and telemetry visibly move.
pub struct SimBmp280Bus {
    regs: [u8; 256],
    ptr: usize,
    epoch: Instant,
    reset_at: Option<Instant>,
}

impl SimBmp280Bus {
    pub fn new() -> Self {
        let mut regs = [0u8; 256];
        regs[0xD0] = 0x58;
        for (i, v) in SIM_CALIBRATION.iter().enumerate() {
            let bytes = (*v as i16 as u16).to_le_bytes();
            regs[0x88 + i * 2] = bytes[0];
            regs[0x89 + i * 2] = bytes[1];
        }
        Self {
            regs,
            ptr: 0,
            epoch: Instant::now(),
            reset_at: None,
        }
    }

    fn copying_nvm(&self) -> bool {
        self.reset_at
            .is_some_and(|at| at.elapsed() < SIM_NVM_COPY)
    }

    fn read_reg(&self, reg: usize) -> u8 {
        match reg {
            0xF3 if self.copying_nvm() => 0x01,
            0x88..=0x9F if self.copying_nvm() => 0,
            _ => self.regs.get(reg).copied().unwrap_or(0),
        }
    }

    fn latch_conversion(&mut self) {
        let t = self.epoch.elapsed().as_secs_f64();
        let adc_t = (SIM_ADC_T + 4_000.0 * (t / 45.0).sin()) as u32;
        let adc_p = (SIM_ADC_P + 600.0 * (t / 70.0).cos()) as u32;
        let (p, tt) = (adc_p << 4, adc_t << 4);
        self.regs[0xF7..0xFD].copy_from_slice(&[
            (p >> 16) as u8,
            (p >> 8) as u8,
            p as u8,
            (tt >> 16) as u8,
            (tt >> 8) as u8,
            tt as u8,
        ]);
    }
}

impl Default for SimBmp280Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cErrorType for SimBmp280Bus {
    type Error = ErrorKind;
}

impl I2c for SimBmp280Bus {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        if address != crate::sensors::bmp280::DEFAULT_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    self.ptr = usize::from(reg);
                    if self.ptr == 0xF7 {
                        self.latch_conversion();
                    }
                    if self.ptr == 0xE0 && data.first() == Some(&0xB6) {
                        self.reset_at = Some(Instant::now());
                        continue;
                    }
                    for (i, b) in data.iter().enumerate() {
                        if let Some(slot) = self.regs.get_mut(self.ptr + i) {
                            *slot = *b;
                        }
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = self.read_reg(self.ptr);
                        self.ptr += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

// ── Display ───────────────────────────────────────────────────

/// Display that logs each frame, laid out like the LCD would show it.
pub struct ConsoleDisplay {
    lines: usize,
    width: usize,
    powered: bool,
}

impl ConsoleDisplay {
    pub fn new(lines: u8, width: u8) -> Self {
        Self {
            lines: usize::from(lines),
            width: usize::from(width),
            powered: false,
        }
    }
}

impl DisplayPort for ConsoleDisplay {
    fn render(&mut self, text: &str) {
        if !self.powered {
            return;
        }
        debug!("LCD | {}", layout(text, self.lines, self.width).join(" | "));
    }

    fn clear(&mut self) {
        debug!("LCD | <clear>");
    }

    fn set_power(&mut self, on: bool) {
        self.powered = on;
        info!("LCD | backlight {}", if on { "on" } else { "off" });
    }
}

// ── Transport ─────────────────────────────────────────────────

/// In-process transport: publishes go to the log, remote methods can be
/// invoked with [`LoopbackTransport::invoke`].
#[derive(Default)]
pub struct LoopbackTransport {
    connected: AtomicBool,
    published: AtomicU64,
    handlers: Mutex<HashMap<String, CommandHandler>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Call a registered remote method as the cloud would.
    pub fn invoke(&self, method: &str, payload: &[u8]) -> Option<MethodResponse> {
        let handler = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .cloned()?;
        let response = handler(payload);
        info!("C2D | {} -> {} {}", method, response.status, response.message);
        Some(response)
    }
}

impl TelemetryTransport for LoopbackTransport {
    fn connect(&self) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn publish(&self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        info!("D2C | {}", String::from_utf8_lossy(payload));
        Ok(())
    }

    fn register_command_handler(
        &self,
        name: &str,
        handler: CommandHandler,
    ) -> Result<(), TransportError> {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(name) {
            return Err(TransportError::RegistrationFailed(format!(
                "{name} already has a handler"
            )));
        }
        handlers.insert(name.to_string(), handler);
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
