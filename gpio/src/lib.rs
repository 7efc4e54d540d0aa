//! Driver for the HD44780-compatible 16x2 character LCD on the "LCD Keypad Shield".
//!
//! The display is wired in 4-bit mode with its control and data lines scattered over three
//! unrelated 8-bit AVR port registers, which are shared with other peripherals on the board.
//! Everything here therefore goes through [Register] handles that only ever touch the bits they
//! were asked to touch.
//!
//! The layers, leaf to root:
//! - [IoSpace] / [Register]: the data address space holding the port and timer registers,
//!   either [simulated](sim::SimIoSpace) or [memory-mapped](raw::RawIoSpace),
//! - [port]: ports as owned register abstractions with masked read-modify-write,
//! - [pwm]: the backlight timer,
//! - [lcd::hd44780]: pin map, nibble transport, instruction channel, bring-up state machine
//!   and the public [display API](lcd::hd44780::display::Lcd162),
//! - [keypad]: the (unimplemented) key reader of the shield.
pub mod keypad;
pub mod lcd;
pub mod port;
pub mod pwm;
pub mod raw;
pub mod sim;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the display is not initialized")]
    NotInitialized,
    #[error("the feature is not supported by this wiring")]
    NotSupported,
    #[error("the feature is not implemented")]
    NotImplemented,
    #[error("controller still busy after {0} polls")]
    BusyTimeout(u32),
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for LcdError {
    fn from(err: std::io::Error) -> Self {
        LcdError::Io(err.kind())
    }
}

pub type LcdResult<T> = Result<T, LcdError>;

/// An 8-bit register in the data address space.
///
/// Registers are shared: several handles may point at the same address, and the other bits of a
/// port usually belong to someone else. Use [Register::modify] (or the helpers built on it) for
/// anything that isn't a whole-register write.
pub trait Register: Debug {
    /// Reads the current value of the register.
    fn read(&self) -> LcdResult<u8>;

    /// Overwrites the whole register.
    fn write(&self, value: u8) -> LcdResult<()>;

    /// Replaces the bits selected by `mask` with the matching bits of `bits`.
    /// Bits outside `mask` keep their current value.
    fn modify(&self, mask: u8, bits: u8) -> LcdResult<()> {
        let value = self.read()?;
        self.write((value & !mask) | (bits & mask))
    }

    /// Sets the bits in `mask`.
    fn set_bits(&self, mask: u8) -> LcdResult<()> {
        self.modify(mask, mask)
    }

    /// Clears the bits in `mask`.
    fn clear_bits(&self, mask: u8) -> LcdResult<()> {
        self.modify(mask, 0)
    }
}

/// A byte-addressed space of 8-bit registers, like the AVR data space.
pub trait IoSpace: Debug {
    /// Gets the number of addressable bytes.
    fn size(&self) -> usize;

    /// Gets a handle to the register at the given address.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if the address is outside the space.
    fn get_register(&self, address: u16) -> LcdResult<Box<dyn Register + '_>>;
}
