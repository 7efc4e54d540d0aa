mod shield;

use crate::LcdResult;
use std::fmt::Debug;
pub use shield::*;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Reads the keys currently held down. An empty list means no key is pressed.
    fn read(&self) -> LcdResult<Vec<Self::Key>>;
}
