//! HD44780 instruction set and drivers.
//!
//! See [HD44780Driver] for the write-side instruction set. [PortHD44780Driver] implements it by
//! bit-banging a 4-bit bus over AVR port registers.

mod port;

use crate::{LcdError, LcdResult};
use log::trace;
pub use port::*;
use std::fmt::{Debug, Display, Formatter};

/// The instructions of the HD44780 that don't read anything back.
///
/// | Instruction       | Encoding   |
/// |-------------------|------------|
/// | Clear display     | `00000001` |
/// | Return home       | `0000001?` |
/// | Entry mode set    | `000001IS` |
/// | Display control   | `00001DCB` |
/// | Cursor/display shift | `0001SR??` |
/// | Function set      | `001DNF??` |
/// | Set CGRAM address | `01AAAAAA` |
/// | Set DDRAM address | `1AAAAAAA` |
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    ClearDisplay,
    ReturnHome,
    EntryModeSet {
        direction: CursorDirection,
        shift: bool,
    },
    DisplayControl {
        display: bool,
        cursor: bool,
        blink: bool,
    },
    CursorShift {
        target: ShiftTarget,
        direction: CursorDirection,
    },
    FunctionSet {
        eight_bit: bool,
        two_lines: bool,
        alt_font: bool,
    },
    SetCgramAddress(u8),
    SetDdramAddress(u8),
}

impl Instruction {
    pub const CLEAR_DISPLAY: u8 = 0b0000_0001;
    pub const RETURN_HOME: u8 = 0b0000_0010;
    pub const ENTRY_MODE_SET: u8 = 0b0000_0100;
    pub const DISPLAY_CONTROL: u8 = 0b0000_1000;
    pub const CURSOR_SHIFT: u8 = 0b0001_0000;
    pub const FUNCTION_SET: u8 = 0b0010_0000;
    pub const SET_CGRAM_ADDRESS: u8 = 0b0100_0000;
    pub const SET_DDRAM_ADDRESS: u8 = 0b1000_0000;

    /// Highest CGRAM address (8 glyphs of 8 rows).
    pub const MAX_CGRAM_ADDRESS: u8 = 0b0011_1111;
    /// Highest DDRAM address.
    pub const MAX_DDRAM_ADDRESS: u8 = 0b0111_1111;

    /// Encodes the instruction as a command byte.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if an address doesn't fit its field.
    pub fn encode(self) -> LcdResult<u8> {
        let command = match self {
            Instruction::ClearDisplay => Self::CLEAR_DISPLAY,
            Instruction::ReturnHome => Self::RETURN_HOME,
            Instruction::EntryModeSet { direction, shift } => {
                Self::ENTRY_MODE_SET
                    | flag(direction == CursorDirection::Right, 0b10)
                    | flag(shift, 0b01)
            }
            Instruction::DisplayControl {
                display,
                cursor,
                blink,
            } => {
                Self::DISPLAY_CONTROL
                    | flag(display, 0b100)
                    | flag(cursor, 0b010)
                    | flag(blink, 0b001)
            }
            Instruction::CursorShift { target, direction } => {
                Self::CURSOR_SHIFT
                    | flag(target == ShiftTarget::Display, 0b1000)
                    | flag(direction == CursorDirection::Right, 0b0100)
            }
            Instruction::FunctionSet {
                eight_bit,
                two_lines,
                alt_font,
            } => {
                Self::FUNCTION_SET
                    | flag(eight_bit, 0b1_0000)
                    | flag(two_lines, 0b0_1000)
                    | flag(alt_font, 0b0_0100)
            }
            Instruction::SetCgramAddress(address) => {
                if address > Self::MAX_CGRAM_ADDRESS {
                    return Err(LcdError::InvalidArgument);
                }
                Self::SET_CGRAM_ADDRESS | address
            }
            Instruction::SetDdramAddress(address) => {
                if address > Self::MAX_DDRAM_ADDRESS {
                    return Err(LcdError::InvalidArgument);
                }
                Self::SET_DDRAM_ADDRESS | address
            }
        };
        Ok(command)
    }
}

fn flag(set: bool, bit: u8) -> u8 {
    if set { bit } else { 0 }
}

/// Where the cursor goes after a write, or which way a shift goes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Decrements the address / shifts left.
    Left,
    /// Increments the address / shifts right.
    Right,
}

/// What a shift instruction moves.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShiftTarget {
    /// Moves only the cursor.
    Cursor,
    /// Moves the whole visible window, cursor included.
    Display,
}

/// Steps of the bring-up sequence. Everything but init needs [ControllerState::Ready].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ControllerState {
    Uninitialized,
    PoweringOn,
    /// One of the three 8-bit function set pulses (1..=3).
    EightBitBootstrap(u8),
    FourBitModeSwitch,
    FunctionSet,
    DisplayOff,
    Cleared,
    EntryModeSet,
    DisplayOn,
    Ready,
}

impl Display for ControllerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::EightBitBootstrap(step) => write!(f, "EightBitBootstrap({}/3)", step),
            other => Debug::fmt(other, f),
        }
    }
}

/// Write-only interface to an HD44780 controller.
pub trait HD44780Driver: Debug {
    /// Runs the bring-up sequence. Afterwards the display is blank, the cursor hidden and at the
    /// top left, and the driver is ready.
    fn init(&mut self, multiline: bool, alt_font: bool) -> LcdResult<()>;

    /// Encodes and sends an instruction.
    fn execute(&mut self, instruction: Instruction) -> LcdResult<()> {
        let command = instruction.encode()?;
        trace!("{:?} -> {:08b}", instruction, command);
        self.send_command(command)
    }

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> LcdResult<()> {
        self.execute(Instruction::ClearDisplay)
    }

    /// Sets the cursor to the home position and undoes display shifts.
    fn return_home(&mut self) -> LcdResult<()> {
        self.execute(Instruction::ReturnHome)
    }

    fn set_entry_mode(&mut self, direction: CursorDirection, shift: bool) -> LcdResult<()> {
        self.execute(Instruction::EntryModeSet { direction, shift })
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(&mut self, display: bool, cursor: bool, blink: bool) -> LcdResult<()> {
        self.execute(Instruction::DisplayControl {
            display,
            cursor,
            blink,
        })
    }

    /// Moves the cursor or shifts the display by one position.
    fn cursor_shift(&mut self, target: ShiftTarget, direction: CursorDirection) -> LcdResult<()> {
        self.execute(Instruction::CursorShift { target, direction })
    }

    fn function_set(&mut self, eight_bit: bool, two_lines: bool, alt_font: bool) -> LcdResult<()> {
        self.execute(Instruction::FunctionSet {
            eight_bit,
            two_lines,
            alt_font,
        })
    }

    /// Sets the CGRAM address. Following data bytes go to the glyph memory.
    fn set_cgram_address(&mut self, address: u8) -> LcdResult<()> {
        self.execute(Instruction::SetCgramAddress(address))
    }

    /// Sets the DDRAM address. Following data bytes go to the display memory.
    fn set_ddram_address(&mut self, address: u8) -> LcdResult<()> {
        self.execute(Instruction::SetDdramAddress(address))
    }

    // Low-level transfers. The high-level functions above go through these.

    /// Sends a command byte with RS = 0.
    fn send_command(&mut self, command: u8) -> LcdResult<()>;

    /// Sends a data byte with RS = 1.
    fn send_data(&mut self, data: u8) -> LcdResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings() {
        use CursorDirection::*;
        use ShiftTarget::*;

        let cases = [
            (Instruction::ClearDisplay, 0x01),
            (Instruction::ReturnHome, 0x02),
            (
                Instruction::EntryModeSet {
                    direction: Right,
                    shift: false,
                },
                0x06,
            ),
            (
                Instruction::DisplayControl {
                    display: false,
                    cursor: false,
                    blink: false,
                },
                0x08,
            ),
            (
                Instruction::DisplayControl {
                    display: true,
                    cursor: true,
                    blink: true,
                },
                0x0F,
            ),
            (
                Instruction::CursorShift {
                    target: Cursor,
                    direction: Left,
                },
                0x10,
            ),
            (
                Instruction::CursorShift {
                    target: Cursor,
                    direction: Right,
                },
                0x14,
            ),
            (
                Instruction::CursorShift {
                    target: Display,
                    direction: Left,
                },
                0x18,
            ),
            (
                Instruction::CursorShift {
                    target: Display,
                    direction: Right,
                },
                0x1C,
            ),
            (
                Instruction::FunctionSet {
                    eight_bit: false,
                    two_lines: true,
                    alt_font: false,
                },
                0x28,
            ),
            (Instruction::SetCgramAddress(0x3F), 0x7F),
            (Instruction::SetDdramAddress(0x40), 0xC0),
        ];

        for (instruction, expected) in cases {
            assert_eq!(instruction.encode(), Ok(expected), "{:?}", instruction);
        }
    }

    #[test]
    fn addresses_out_of_range() {
        assert_eq!(
            Instruction::SetCgramAddress(0x40).encode(),
            Err(LcdError::InvalidArgument)
        );
        assert_eq!(
            Instruction::SetDdramAddress(0x80).encode(),
            Err(LcdError::InvalidArgument)
        );
    }

    #[test]
    fn state_display() {
        assert_eq!(
            ControllerState::EightBitBootstrap(2).to_string(),
            "EightBitBootstrap(2/3)"
        );
        assert_eq!(ControllerState::Ready.to_string(), "Ready");
    }
}
