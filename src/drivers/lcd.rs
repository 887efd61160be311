//! HD44780 character LCD behind a PCF8574 I²C backpack.
//!
//! The expander's eight outputs map onto the LCD as
//! `P0=RS  P1=RW  P2=EN  P3=backlight  P4..P7=D4..D7`, so every LCD
//! transfer is two 4-bit nibbles, each latched with an EN pulse.
//!
//! [`layout`] is the pure text-wrapping half of the driver and is what
//! the host console display uses too.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Default PCF8574 backpack address.
pub const DEFAULT_ADDRESS: u8 = 0x27;

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE_INC: u8 = 0x06;
const CMD_DISPLAY_CONTROL: u8 = 0x08;
const DISPLAY_ON: u8 = 0x04;
const CMD_FUNCTION_SET_4BIT: u8 = 0x20;
const FUNCTION_TWO_LINE: u8 = 0x08;
const CMD_SET_DDRAM: u8 = 0x80;

/// DDRAM start address of each physical row (20x4 / 16x2 geometry).
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Split `text` into at most `lines` rows of at most `width` characters.
///
/// Each row takes the next `width` characters; a `\n` inside that window
/// ends the row early and is consumed.  Whatever does not fit on the last
/// row is dropped.
pub fn layout(text: &str, lines: usize, width: usize) -> Vec<String> {
    let mut rows = Vec::with_capacity(lines);
    if width == 0 {
        return rows;
    }
    let mut rest = text;
    while rows.len() < lines && !rest.is_empty() {
        let window_end = rest
            .char_indices()
            .nth(width)
            .map_or(rest.len(), |(i, _)| i);
        let window = &rest[..window_end];
        match window.find('\n') {
            Some(nl) => {
                rows.push(window[..nl].to_string());
                rest = &rest[nl + 1..];
            }
            None => {
                rows.push(window.to_string());
                rest = &rest[window_end..];
            }
        }
    }
    rows
}

pub struct CharacterLcd<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    lines: u8,
    width: u8,
    backlight: u8,
    display_on: bool,
}

impl<I2C: I2c, D: DelayNs> CharacterLcd<I2C, D> {
    /// Run the 4-bit initialisation sequence and leave the display
    /// cleared, powered, and backlit.
    pub fn new(i2c: I2C, delay: D, address: u8, lines: u8, width: u8) -> Result<Self, I2C::Error> {
        let mut lcd = Self {
            i2c,
            delay,
            address,
            lines: lines.clamp(1, ROW_OFFSETS.len() as u8),
            width,
            backlight: BACKLIGHT,
            display_on: true,
        };
        lcd.init()?;
        Ok(lcd)
    }

    fn init(&mut self) -> Result<(), I2C::Error> {
        self.delay.delay_ms(50);
        // Force 8-bit mode three times, then drop to 4-bit.
        self.write_nibble(0x03, 0)?;
        self.delay.delay_us(4_500);
        self.write_nibble(0x03, 0)?;
        self.delay.delay_us(150);
        self.write_nibble(0x03, 0)?;
        self.write_nibble(0x02, 0)?;

        let function = if self.lines > 1 {
            CMD_FUNCTION_SET_4BIT | FUNCTION_TWO_LINE
        } else {
            CMD_FUNCTION_SET_4BIT
        };
        self.command(function)?;
        self.command(CMD_DISPLAY_CONTROL | DISPLAY_ON)?;
        self.clear()?;
        self.command(CMD_ENTRY_MODE_INC)
    }

    fn expander_write(&mut self, byte: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &[byte | self.backlight])
    }

    fn write_nibble(&mut self, nibble: u8, mode: u8) -> Result<(), I2C::Error> {
        let byte = (nibble << 4) | mode;
        self.expander_write(byte | EN)?;
        self.delay.delay_us(1);
        self.expander_write(byte)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn send(&mut self, value: u8, mode: u8) -> Result<(), I2C::Error> {
        self.write_nibble(value >> 4, mode)?;
        self.write_nibble(value & 0x0F, mode)
    }

    fn command(&mut self, cmd: u8) -> Result<(), I2C::Error> {
        self.send(cmd, 0)
    }

    pub fn clear(&mut self) -> Result<(), I2C::Error> {
        self.command(CMD_CLEAR)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    pub fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), I2C::Error> {
        let row = row.min(self.lines - 1);
        self.command(CMD_SET_DDRAM | (ROW_OFFSETS[row as usize] + col))
    }

    /// Clear and write `text` laid out with [`layout`].
    /// Characters outside printable ASCII are shown as `?`.
    pub fn write_text(&mut self, text: &str) -> Result<(), I2C::Error> {
        self.clear()?;
        let rows = layout(text, usize::from(self.lines), usize::from(self.width));
        for (row, line) in rows.iter().enumerate() {
            self.set_cursor(row as u8, 0)?;
            for c in line.chars() {
                let b = if c.is_ascii() && !c.is_ascii_control() {
                    c as u8
                } else {
                    b'?'
                };
                self.send(b, RS)?;
            }
        }
        Ok(())
    }

    /// Backlight and display enable together.
    pub fn set_power(&mut self, on: bool) -> Result<(), I2C::Error> {
        self.backlight = if on { BACKLIGHT } else { 0 };
        self.display_on = on;
        let control = if on { DISPLAY_ON } else { 0 };
        self.command(CMD_DISPLAY_CONTROL | control)
    }

    pub fn is_powered(&self) -> bool {
        self.display_on
    }

    pub fn geometry(&self) -> (u8, u8) {
        (self.lines, self.width)
    }
}
