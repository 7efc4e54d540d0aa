mod timer2;

use crate::LcdResult;
use std::fmt::Debug;
pub use timer2::*;

/// An 8-bit PWM output, duty cycle given as the raw compare value (`0..=255`).
pub trait PwmPin: Debug {
    /// Gets the current compare value.
    fn duty(&self) -> LcdResult<u8>;
    /// Sets the compare value. Takes effect at the next timer overflow.
    fn set_duty(&mut self, duty: u8) -> LcdResult<()>;

    fn polarity(&self) -> LcdResult<PwmPolarity>;
    fn set_polarity(&mut self, polarity: PwmPolarity) -> LcdResult<()>;

    fn is_enabled(&self) -> LcdResult<bool>;
    /// Configures the timer and the output pin, and connects the pin to the timer.
    fn enable(&mut self) -> LcdResult<()>;
    /// Disconnects the pin from the timer and stops it. The pin is left driven low.
    fn disable(&mut self) -> LcdResult<()>;
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PwmPolarity {
    /// Output is high while the counter is below the compare value.
    #[default]
    Normal,
    /// Output is low while the counter is below the compare value.
    Inversed,
}
