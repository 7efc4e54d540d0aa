//! Pin map of the display.
//!
//! The map is fixed when the driver is built and can't be changed afterwards.

use crate::port::{PinBinding, PortId};
use crate::{LcdError, LcdResult};
use bitvec::vec::BitVec;
use log::debug;
use std::fmt::{Display, Formatter};

/// The logical signals of a 4-bit HD44780 connection with a PWM backlight.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Signal {
    Rs,
    E,
    Db4,
    Db5,
    Db6,
    Db7,
    Backlight,
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Signal::Rs => "RS",
            Signal::E => "E",
            Signal::Db4 => "DB4",
            Signal::Db5 => "DB5",
            Signal::Db6 => "DB6",
            Signal::Db7 => "DB7",
            Signal::Backlight => "BL",
        };
        write!(f, "{}", name)
    }
}

/// Binds each [Signal] to a physical pin. R/W is not part of the map, it's tied to GND.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinMap {
    pub rs: PinBinding,
    pub e: PinBinding,
    /// `DB4`, `DB5`, `DB6`, `DB7`, in that order. Nibble bit `i` goes to `data[i]`.
    pub data: [PinBinding; 4],
    pub backlight: PinBinding,
}

/// Wiring of the "LCD Keypad Shield" on an ATmega2560 board.
///
/// ```text
/// RS  ---- PH5     DB4 ---- PG5
/// RW  ---- GND     DB5 ---- PE3
/// E   ---- PH6     DB6 ---- PH3
/// BL  ---- PB4     DB7 ---- PH4
/// ```
pub const LCD_KEYPAD_SHIELD: PinMap = PinMap {
    rs: PinBinding::new(PortId::H, 5),
    e: PinBinding::new(PortId::H, 6),
    data: [
        PinBinding::new(PortId::G, 5),
        PinBinding::new(PortId::E, 3),
        PinBinding::new(PortId::H, 3),
        PinBinding::new(PortId::H, 4),
    ],
    backlight: PinBinding::new(PortId::B, 4),
};

impl PinMap {
    /// Lists every signal with its pin.
    pub fn signals(&self) -> [(Signal, PinBinding); 7] {
        [
            (Signal::Rs, self.rs),
            (Signal::E, self.e),
            (Signal::Db4, self.data[0]),
            (Signal::Db5, self.data[1]),
            (Signal::Db6, self.data[2]),
            (Signal::Db7, self.data[3]),
            (Signal::Backlight, self.backlight),
        ]
    }

    /// Checks that every signal has a valid bit and that no two signals share a pin.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if a bit index is 8 or more.
    /// - `LcdError::AlreadyInUse` if two signals are bound to the same pin.
    pub fn validate(&self) -> LcdResult<()> {
        let mut claimed: BitVec<u8> = BitVec::repeat(false, PortId::ALL.len() * 8);

        for (signal, pin) in self.signals() {
            if pin.bit >= 8 {
                debug!("{} bound to invalid bit {}", signal, pin.bit);
                return Err(LcdError::InvalidArgument);
            }
            let index = pin.port.index() * 8 + pin.bit as usize;
            if claimed[index] {
                debug!("{} bound to {}, which is already taken", signal, pin);
                return Err(LcdError::AlreadyInUse);
            }
            claimed.set(index, true);
        }

        Ok(())
    }

    /// Gets the ports carrying the logic signals (RS, E, data), in [PortId::ALL] order.
    pub fn logic_ports(&self) -> Vec<PortId> {
        PortId::ALL
            .into_iter()
            .filter(|&port| self.output_mask(port) != 0)
            .collect()
    }

    /// Gets the mask of the logic signal pins on `port`.
    pub fn output_mask(&self, port: PortId) -> u8 {
        self.signals()
            .into_iter()
            .filter(|(signal, pin)| *signal != Signal::Backlight && pin.port == port)
            .fold(0, |mask, (_, pin)| mask | pin.mask())
    }

    /// Gets the mask of the data pins on `port`.
    pub fn data_mask(&self, port: PortId) -> u8 {
        self.data
            .iter()
            .filter(|pin| pin.port == port)
            .fold(0, |mask, pin| mask | pin.mask())
    }

    /// Spreads the low 4 bits of `nibble` to their physical positions on `port`.
    /// Bits for data pins on other ports are dropped.
    pub fn nibble_bits(&self, port: PortId, nibble: u8) -> u8 {
        self.data
            .iter()
            .enumerate()
            .filter(|(i, pin)| pin.port == port && nibble & (1 << i) != 0)
            .fold(0, |bits, (_, pin)| bits | pin.mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shield_map_is_valid() {
        assert_eq!(LCD_KEYPAD_SHIELD.validate(), Ok(()));
        assert_eq!(
            LCD_KEYPAD_SHIELD.logic_ports(),
            vec![PortId::E, PortId::G, PortId::H]
        );
    }

    #[test]
    fn shield_masks() {
        let map = LCD_KEYPAD_SHIELD;
        assert_eq!(map.output_mask(PortId::H), 0b0111_1000);
        assert_eq!(map.output_mask(PortId::E), 0b0000_1000);
        assert_eq!(map.output_mask(PortId::G), 0b0010_0000);
        assert_eq!(map.output_mask(PortId::B), 0);
        assert_eq!(map.data_mask(PortId::H), 0b0001_1000);
    }

    #[test]
    fn nibble_bits_follow_the_wiring() {
        let map = LCD_KEYPAD_SHIELD;
        for nibble in 0..16u8 {
            assert_eq!(map.nibble_bits(PortId::H, nibble), (nibble << 1) & 0b0001_1000);
            assert_eq!(map.nibble_bits(PortId::E, nibble), (nibble << 2) & 0b0000_1000);
            assert_eq!(map.nibble_bits(PortId::G, nibble), (nibble << 5) & 0b0010_0000);
        }
    }

    #[test]
    fn collisions_are_rejected() {
        let mut map = LCD_KEYPAD_SHIELD;
        map.e = map.data[3];
        assert_eq!(map.validate(), Err(LcdError::AlreadyInUse));
    }

    #[test]
    fn invalid_bits_are_rejected() {
        let mut map = LCD_KEYPAD_SHIELD;
        map.rs = PinBinding::new(PortId::H, 8);
        assert_eq!(map.validate(), Err(LcdError::InvalidArgument));
    }
}
