//! The 16x2 display as callers see it.

use crate::keypad::ShieldKeypad;
use crate::lcd::hd44780::backlight::Backlight;
use crate::lcd::hd44780::driver::{
    ControllerState, CursorDirection, HD44780Driver, PortHD44780Driver, ShiftTarget,
};
use crate::lcd::hd44780::pins::LCD_KEYPAD_SHIELD;
use crate::pwm::Timer2Pwm;
use crate::{IoSpace, LcdError, LcdResult};
use embedded_hal::delay::DelayNs;
use log::{debug, warn};
use std::fmt;

/// A 5x8 custom character, one byte per row, the low 5 bits of each row being the pixels.
pub type Glyph = [u8; 8];

/// Handle to the one attached LCD.
///
/// Every operation needs [Lcd162::init] to have completed and fails with
/// [LcdError::NotInitialized] otherwise.
///
/// ```no_run
/// use lcd162_gpio::lcd::hd44780::display::Lcd162;
/// use lcd162_gpio::sim::SimIoSpace;
/// use std::fmt::Write;
///
/// let io = SimIoSpace::default();
/// let mut lcd = Lcd162::shield(&io, io.delay())?;
/// lcd.init()?;
/// lcd.print_at(0, 0, "Hello")?;
/// lcd.goto_xy(0, 1)?;
/// write!(lcd, "{:>5}", 42)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Lcd162<'a> {
    driver: PortHD44780Driver<'a>,
    keypad: ShieldKeypad,
}

impl<'a> Lcd162<'a> {
    pub const COLUMNS: u8 = 16;
    pub const ROWS: u8 = 2;
    /// DDRAM address of the first column of each row.
    pub const ROW_ADDRESSES: [u8; 2] = [0x00, 0x40];
    pub const GLYPH_SLOTS: u8 = 8;

    /// Builds the display as wired on the LCD Keypad Shield, with the Timer2 backlight.
    pub fn shield(io: &'a dyn IoSpace, delay: impl DelayNs + 'a) -> LcdResult<Self> {
        let backlight = Backlight::new(Timer2Pwm::new(io, LCD_KEYPAD_SHIELD.backlight)?);
        let driver =
            PortHD44780Driver::new(io, LCD_KEYPAD_SHIELD, delay)?.with_backlight(backlight);
        Ok(Self::new(driver))
    }

    pub fn new(driver: PortHD44780Driver<'a>) -> Self {
        Lcd162 {
            driver,
            keypad: ShieldKeypad::new(),
        }
    }

    pub fn driver(&self) -> &PortHD44780Driver<'a> {
        &self.driver
    }

    pub fn state(&self) -> ControllerState {
        self.driver.state()
    }

    fn ensure_ready(&self) -> LcdResult<()> {
        if self.driver.is_ready() {
            Ok(())
        } else {
            Err(LcdError::NotInitialized)
        }
    }

    /// Brings up the controller: two lines, 5x8 font, display on, cursor off, backlight at its
    /// default level.
    pub fn init(&mut self) -> LcdResult<()> {
        self.driver.init(true, false)?;
        debug!("{:?} ready", self.driver);
        Ok(())
    }

    /// Blanks the display and moves the cursor to the top left.
    pub fn clear(&mut self) -> LcdResult<()> {
        self.driver.clear_display()
    }

    /// Moves the cursor to the top left and undoes any shift.
    pub fn home(&mut self) -> LcdResult<()> {
        self.driver.return_home()
    }

    /// Moves the cursor to column `x` of row `y`.
    ///
    /// A column past the last one is ignored and the cursor goes to the start of the row.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if `y` is not 0 or 1.
    pub fn goto_xy(&mut self, x: u8, y: u8) -> LcdResult<()> {
        self.ensure_ready()?;
        let base = *Self::ROW_ADDRESSES
            .get(y as usize)
            .ok_or(LcdError::InvalidArgument)?;
        let offset = if x < Self::COLUMNS {
            x
        } else {
            warn!("Column {} out of range, going to the start of row {}", x, y);
            0
        };
        self.driver.set_ddram_address(base + offset)
    }

    /// Writes one character code at the cursor.
    pub fn write_char(&mut self, c: u8) -> LcdResult<()> {
        self.driver.send_data(c)
    }

    /// Writes character codes up to the first `0`.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> LcdResult<()> {
        self.ensure_ready()?;
        for &byte in bytes.iter().take_while(|&&byte| byte != 0) {
            self.driver.send_data(byte)?;
        }
        Ok(())
    }

    /// Writes text at the cursor, up to the first NUL. `None` writes nothing.
    ///
    /// The character ROM only matches ASCII, anything else is written as `?`.
    pub fn write_string(&mut self, text: Option<&str>) -> LcdResult<()> {
        self.ensure_ready()?;
        let Some(text) = text else {
            return Ok(());
        };

        for c in text.chars().take_while(|&c| c != '\0') {
            let byte = if c.is_ascii() {
                c as u8
            } else {
                warn!("'{}' has no LCD character, writing '?'", c);
                b'?'
            };
            self.driver.send_data(byte)?;
        }
        Ok(())
    }

    /// Writes `value` in base 10.
    pub fn write_integer(&mut self, value: i16) -> LcdResult<()> {
        let mut buffer = itoa::Buffer::new();
        self.write_bytes(buffer.format(value).as_bytes())
    }

    pub fn print_at(&mut self, x: u8, y: u8, text: &str) -> LcdResult<()> {
        self.goto_xy(x, y)?;
        self.write_string(Some(text))
    }

    /// Stores a custom character in `slot`. It's then written with [Lcd162::write_char] of the
    /// slot number.
    ///
    /// The address counter is left in the glyph memory; call [Lcd162::goto_xy] before writing
    /// text again.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if `slot` is 8 or more.
    pub fn load_udc(&mut self, slot: u8, glyph: &Glyph) -> LcdResult<()> {
        self.ensure_ready()?;
        if slot >= Self::GLYPH_SLOTS {
            return Err(LcdError::InvalidArgument);
        }

        for (row, &bits) in (0u8..).zip(glyph.iter()) {
            self.driver.set_cgram_address((slot << 3) | row)?;
            self.driver.send_data(bits)?;
        }
        debug!("Glyph {} loaded", slot);
        Ok(())
    }

    /// Keeps the display on and sets the cursor and blinking.
    pub fn on_off_control(&mut self, cursor: bool, blink: bool) -> LcdResult<()> {
        self.driver.set_display_control(true, cursor, blink)
    }

    pub fn cursor_left(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(ShiftTarget::Cursor, CursorDirection::Left)
    }

    pub fn cursor_right(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(ShiftTarget::Cursor, CursorDirection::Right)
    }

    /// Scrolls the visible window one column left.
    pub fn shift_left(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(ShiftTarget::Display, CursorDirection::Left)
    }

    pub fn shift_right(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(ShiftTarget::Display, CursorDirection::Right)
    }

    /// Sets the backlight brightness in percent. Values above 100 are treated as 100.
    ///
    /// # Errors
    /// - `LcdError::NotSupported` if the driver has no backlight.
    pub fn set_backlight(&mut self, percent: u8) -> LcdResult<()> {
        self.ensure_ready()?;
        self.driver
            .backlight_mut()
            .ok_or(LcdError::NotSupported)?
            .set_percent(percent)
    }

    /// Reads the pressed keys as a [ShieldKey](crate::keypad::ShieldKey) mask.
    ///
    /// # Errors
    /// - `LcdError::NotImplemented` always, for now.
    pub fn read_keys(&self) -> LcdResult<u8> {
        self.keypad.read_keys()
    }
}

impl fmt::Write for Lcd162<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(Some(s)).map_err(|err| {
            warn!("Formatted write failed: {}", err);
            fmt::Error
        })
    }
}
