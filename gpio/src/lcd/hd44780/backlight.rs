use crate::pwm::PwmPin;
use crate::{LcdError, LcdResult};
use log::{debug, warn};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Brightness the display comes up with after init.
pub const DEFAULT_BACKLIGHT_PERCENT: u8 = 60;

/// How a brightness in percent becomes an 8-bit compare value.
///
/// Both curves use `((256 * percent) / 100) - 1`. They only differ at 0 %, where the formula
/// gives -1.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BacklightCurve {
    /// -1 becomes 0. The curve is monotonic and 0 % is as dark as it gets.
    #[default]
    Clamped,
    /// -1 wraps around to 255, so 0 % is full brightness. Kept for boards that relied on it.
    Wrapping,
}

impl BacklightCurve {
    /// Maps `percent` (already limited to `0..=100`) to a compare value.
    pub fn compare_value(self, percent: u8) -> u8 {
        let scaled = 256 * i32::from(percent.min(100)) / 100 - 1;
        match self {
            BacklightCurve::Clamped => scaled.max(0) as u8,
            BacklightCurve::Wrapping => scaled as u8,
        }
    }
}

impl FromStr for BacklightCurve {
    type Err = LcdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clamped" => Ok(BacklightCurve::Clamped),
            "wrapping" => Ok(BacklightCurve::Wrapping),
            _ => Err(LcdError::Other(format!("unknown backlight curve `{}`", s))),
        }
    }
}

impl Display for BacklightCurve {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            BacklightCurve::Clamped => "clamped",
            BacklightCurve::Wrapping => "wrapping",
        };
        write!(f, "{}", str)
    }
}

/// Backlight brightness over a PWM output.
pub struct Backlight<'a> {
    pwm: Box<dyn PwmPin + 'a>,
    curve: BacklightCurve,
    default_percent: u8,
    percent: u8,
}

impl<'a> Backlight<'a> {
    pub fn new(pwm: impl PwmPin + 'a) -> Self {
        Backlight {
            pwm: Box::new(pwm),
            curve: BacklightCurve::default(),
            default_percent: DEFAULT_BACKLIGHT_PERCENT,
            percent: 0,
        }
    }

    pub fn with_curve(mut self, curve: BacklightCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Sets the brightness applied by [Backlight::apply_default], clamped to 100.
    pub fn with_default_percent(mut self, percent: u8) -> Self {
        if percent > 100 {
            warn!("Default backlight {}% out of range, using 100%", percent);
        }
        self.default_percent = percent.min(100);
        self
    }

    pub fn curve(&self) -> BacklightCurve {
        self.curve
    }

    /// Gets the last brightness set.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn default_percent(&self) -> u8 {
        self.default_percent
    }

    /// Sets up the timer and output pin.
    pub fn configure(&mut self) -> LcdResult<()> {
        self.pwm.enable()
    }

    /// Sets the brightness. Values above 100 are clamped to 100.
    pub fn set_percent(&mut self, percent: u8) -> LcdResult<()> {
        let percent = if percent > 100 {
            warn!("Backlight {}% out of range, using 100%", percent);
            100
        } else {
            percent
        };

        let duty = self.curve.compare_value(percent);
        debug!("Backlight {}% -> duty {} ({})", percent, duty, self.curve);
        self.pwm.set_duty(duty)?;
        self.percent = percent;
        Ok(())
    }

    pub fn apply_default(&mut self) -> LcdResult<()> {
        self.set_percent(self.default_percent)
    }

    /// Gets the compare value currently in the PWM.
    pub fn duty(&self) -> LcdResult<u8> {
        self.pwm.duty()
    }
}

impl Debug for Backlight<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Backlight({:?}, {}%, {})", self.pwm, self.percent, self.curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pwm::Timer2Pwm;
    use crate::sim::SimIoSpace;

    #[test]
    fn clamped_curve_is_monotonic() {
        let mut previous = 0;
        for percent in 0..=100 {
            let value = BacklightCurve::Clamped.compare_value(percent);
            assert!(value >= previous, "{}% gave {} after {}", percent, value, previous);
            previous = value;
        }
    }

    #[test]
    fn boundaries() {
        assert_eq!(BacklightCurve::Clamped.compare_value(0), 0);
        assert_eq!(BacklightCurve::Clamped.compare_value(1), 1);
        assert_eq!(BacklightCurve::Clamped.compare_value(100), 255);

        assert_eq!(BacklightCurve::Wrapping.compare_value(0), 255);
        assert_eq!(BacklightCurve::Wrapping.compare_value(1), 1);
        assert_eq!(BacklightCurve::Wrapping.compare_value(100), 255);

        assert_eq!(BacklightCurve::Clamped.compare_value(60), 152);
    }

    #[test]
    fn curve_parses() {
        assert_eq!("wrapping".parse::<BacklightCurve>(), Ok(BacklightCurve::Wrapping));
        assert_eq!(
            BacklightCurve::Clamped.to_string().parse::<BacklightCurve>(),
            Ok(BacklightCurve::Clamped)
        );
        assert!("linear".parse::<BacklightCurve>().is_err());
    }

    #[test]
    fn set_percent_writes_ocr2a_and_clamps() {
        let io = SimIoSpace::default();
        let mut backlight = Backlight::new(Timer2Pwm::new(&io, Timer2Pwm::OC2A).unwrap());
        backlight.configure().unwrap();

        backlight.apply_default().unwrap();
        assert_eq!(io.peek(Timer2Pwm::OCR2A), 152);
        assert_eq!(backlight.percent(), 60);

        backlight.set_percent(250).unwrap();
        assert_eq!(io.peek(Timer2Pwm::OCR2A), 255);
        assert_eq!(backlight.percent(), 100);
        assert_eq!(backlight.duty().unwrap(), 255);
    }

    #[test]
    fn default_percent_is_clamped() {
        let io = SimIoSpace::default();
        let mut backlight =
            Backlight::new(Timer2Pwm::new(&io, Timer2Pwm::OC2A).unwrap()).with_default_percent(150);
        assert_eq!(backlight.default_percent(), 100);

        backlight.configure().unwrap();
        backlight.apply_default().unwrap();
        assert_eq!(io.peek(Timer2Pwm::OCR2A), 255);
        assert_eq!(backlight.percent(), 100);
    }

    #[test]
    fn wrapping_curve_reaches_the_register() {
        let io = SimIoSpace::default();
        let mut backlight = Backlight::new(Timer2Pwm::new(&io, Timer2Pwm::OC2A).unwrap())
            .with_curve(BacklightCurve::Wrapping);

        backlight.set_percent(0).unwrap();
        assert_eq!(io.peek(Timer2Pwm::OCR2A), 255);
    }
}
