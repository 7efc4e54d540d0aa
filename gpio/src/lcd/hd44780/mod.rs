//! HD44780 LCD module.
//!
//! - [pins]: where the shield wires each signal,
//! - [driver]: the instruction set ([HD44780Driver](driver::HD44780Driver)) and the 4-bit
//!   port implementation ([PortHD44780Driver](driver::PortHD44780Driver)) that bit-bangs it,
//! - [timing]: delay constants and the wait-for-ready strategies,
//! - [backlight]: percent to PWM mapping,
//! - [display]: the public API callers use ([Lcd162](display::Lcd162)),
//! - [probe]: decodes a simulated bus timeline back into transfers.

pub mod backlight;
pub mod display;
pub mod driver;
pub mod pins;
pub mod probe;
pub mod timing;
