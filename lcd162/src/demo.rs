use crate::config::Config;
use lcd162_gpio::LcdError;
use lcd162_gpio::keypad::ShieldKey;
use lcd162_gpio::lcd::hd44780::display::{Glyph, Lcd162};
use log::{debug, info, warn};
use std::fmt::Write;

/// A small heart.
pub const HEART: Glyph = [
    0b00000, 0b01010, 0b11111, 0b11111, 0b01110, 0b00100, 0b00000, 0b00000,
];

const HEART_SLOT: u8 = 0;

/// Runs the demonstration on an initialized display.
pub fn run(config: &Config, lcd: &mut Lcd162) -> eyre::Result<()> {
    info!("Greeting: {:?}", config.greeting);
    lcd.clear()?;
    lcd.print_at(0, 0, &config.greeting)?;

    lcd.load_udc(HEART_SLOT, &HEART)?;
    lcd.goto_xy(Lcd162::COLUMNS - 1, 0)?;
    lcd.write_char(HEART_SLOT)?;

    for i in 0..=config.counter {
        lcd.goto_xy(0, 1)?;
        write!(lcd, "Count {:>6}", "")?;
        lcd.goto_xy(Lcd162::COLUMNS - 6, 1)?;
        lcd.write_integer(i)?;
        debug!("Count {}", i);
    }

    info!("Fading the backlight");
    for percent in (0..=100).step_by(20) {
        lcd.set_backlight(percent)?;
    }
    lcd.set_backlight(config.backlight)?;

    lcd.on_off_control(true, true)?;

    match lcd.read_keys() {
        Ok(mask) => info!("Keys held: {:?}", ShieldKey::from_mask(mask)),
        Err(LcdError::NotImplemented) => warn!("Key reading is not available on this build"),
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
