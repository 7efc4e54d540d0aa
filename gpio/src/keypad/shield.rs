use crate::keypad::Keypad;
use crate::{LcdError, LcdResult};
use log::debug;

/// The five push buttons of the LCD Keypad Shield.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShieldKey {
    Right,
    Up,
    Down,
    Left,
    Select,
}

impl ShieldKey {
    pub const ALL: [ShieldKey; 5] = [
        ShieldKey::Right,
        ShieldKey::Up,
        ShieldKey::Down,
        ShieldKey::Left,
        ShieldKey::Select,
    ];

    /// Gets the bit of the key in the mask returned by [ShieldKeypad::read_keys].
    pub fn mask(self) -> u8 {
        match self {
            ShieldKey::Right => 0b00001,
            ShieldKey::Up => 0b00010,
            ShieldKey::Down => 0b00100,
            ShieldKey::Left => 0b01000,
            ShieldKey::Select => 0b10000,
        }
    }

    /// Decodes a key mask back into keys, in [ShieldKey::ALL] order.
    pub fn from_mask(mask: u8) -> Vec<ShieldKey> {
        Self::ALL
            .into_iter()
            .filter(|key| mask & key.mask() != 0)
            .collect()
    }
}

/// Key reader of the shield.
///
/// The keys sit on a resistor ladder read through the ADC, which this crate doesn't drive yet,
/// so reading always fails with [LcdError::NotImplemented]. Callers can tell that apart from
/// "no key pressed", which is an empty list (or a zero mask).
#[derive(Debug, Default)]
pub struct ShieldKeypad;

impl ShieldKeypad {
    pub fn new() -> Self {
        ShieldKeypad
    }

    /// Reads the pressed keys as a mask of [ShieldKey::mask] bits, `0` meaning none.
    pub fn read_keys(&self) -> LcdResult<u8> {
        let keys = self.read()?;
        Ok(keys.iter().fold(0, |mask, key| mask | key.mask()))
    }
}

impl Keypad for ShieldKeypad {
    type Key = ShieldKey;

    fn read(&self) -> LcdResult<Vec<Self::Key>> {
        debug!("Key reading requested, but the ADC ladder isn't wired up");
        Err(LcdError::NotImplemented)
    }
}
