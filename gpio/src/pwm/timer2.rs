use crate::port::{GpioPort, PinBinding, PortId};
use crate::pwm::{PwmPin, PwmPolarity};
use crate::{IoSpace, LcdError, LcdResult, Register};
use log::{debug, trace};
use std::fmt::{Debug, Formatter};

/// Channel A of the ATmega2560 8-bit Timer/Counter2, driving the `OC2A` pin.
///
/// The timer runs in fast PWM mode (`WGM2 = 011`) straight off the CPU clock (`CS2 = 001`),
/// which is about 62.5 kHz at 16 MHz. Only the bits belonging to channel A, the waveform
/// generation mode and the clock select are touched; channel B is left as it was.
///
/// | Register | Address | Bits used                         |
/// |----------|---------|-----------------------------------|
/// | `TCCR2A` | `0xB0`  | `COM2A1:0` (7:6), `WGM21:0` (1:0) |
/// | `TCCR2B` | `0xB1`  | `WGM22` (3), `CS22:0` (2:0)       |
/// | `OCR2A`  | `0xB3`  | whole register                    |
pub struct Timer2Pwm<'a> {
    tccr_a: Box<dyn Register + 'a>,
    tccr_b: Box<dyn Register + 'a>,
    ocr: Box<dyn Register + 'a>,
    port: GpioPort<'a>,
    polarity: PwmPolarity,
}

impl<'a> Timer2Pwm<'a> {
    pub const TCCR2A: u16 = 0xB0;
    pub const TCCR2B: u16 = 0xB1;
    pub const OCR2A: u16 = 0xB3;

    /// The only pin Timer2 channel A can drive.
    pub const OC2A: PinBinding = PinBinding::new(PortId::B, 4);

    const COM2A_MASK: u8 = 0b1100_0000;
    const COM2A_NON_INVERTING: u8 = 0b1000_0000;
    const COM2A_INVERTING: u8 = 0b1100_0000;
    const WGM2_LOW_MASK: u8 = 0b0000_0011;
    const WGM2_FAST_PWM: u8 = 0b0000_0011;
    const WGM22: u8 = 0b0000_1000;
    const CS2_MASK: u8 = 0b0000_0111;
    const CS2_NO_PRESCALING: u8 = 0b0000_0001;

    /// Creates the channel for the given output pin.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if `pin` isn't [Self::OC2A].
    pub fn new(io: &'a dyn IoSpace, pin: PinBinding) -> LcdResult<Self> {
        if pin != Self::OC2A {
            return Err(LcdError::InvalidArgument);
        }

        Ok(Timer2Pwm {
            tccr_a: io.get_register(Self::TCCR2A)?,
            tccr_b: io.get_register(Self::TCCR2B)?,
            ocr: io.get_register(Self::OCR2A)?,
            port: GpioPort::new(io, pin.port)?,
            polarity: PwmPolarity::Normal,
        })
    }

    fn com_bits(&self) -> u8 {
        match self.polarity {
            PwmPolarity::Normal => Self::COM2A_NON_INVERTING,
            PwmPolarity::Inversed => Self::COM2A_INVERTING,
        }
    }
}

impl Debug for Timer2Pwm<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Timer2Pwm(OC2A @ {})", Self::OC2A)
    }
}

impl PwmPin for Timer2Pwm<'_> {
    fn duty(&self) -> LcdResult<u8> {
        self.ocr.read()
    }

    fn set_duty(&mut self, duty: u8) -> LcdResult<()> {
        trace!("OCR2A = {}", duty);
        self.ocr.write(duty)
    }

    fn polarity(&self) -> LcdResult<PwmPolarity> {
        Ok(self.polarity)
    }

    fn set_polarity(&mut self, polarity: PwmPolarity) -> LcdResult<()> {
        self.polarity = polarity;
        if self.is_enabled()? {
            self.tccr_a.modify(Self::COM2A_MASK, self.com_bits())?;
        }
        Ok(())
    }

    fn is_enabled(&self) -> LcdResult<bool> {
        let connected = self.tccr_a.read()? & Self::COM2A_MASK != 0;
        let clocked = self.tccr_b.read()? & Self::CS2_MASK != 0;
        Ok(connected && clocked)
    }

    fn enable(&mut self) -> LcdResult<()> {
        self.port.make_output(Self::OC2A.mask())?;
        self.port.write_pin(Self::OC2A, false)?;

        self.tccr_a.modify(
            Self::COM2A_MASK | Self::WGM2_LOW_MASK,
            self.com_bits() | Self::WGM2_FAST_PWM,
        )?;
        self.tccr_b.modify(Self::WGM22 | Self::CS2_MASK, Self::CS2_NO_PRESCALING)?;

        debug!("{:?} enabled ({:?})", self, self.polarity);
        Ok(())
    }

    fn disable(&mut self) -> LcdResult<()> {
        self.tccr_a.clear_bits(Self::COM2A_MASK)?;
        self.tccr_b.clear_bits(Self::CS2_MASK)?;
        self.port.write_pin(Self::OC2A, false)?;
        debug!("{:?} disabled", self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimIoSpace;

    #[test]
    fn rejects_other_pins() {
        let io = SimIoSpace::default();
        let err = Timer2Pwm::new(&io, PinBinding::new(PortId::B, 5)).unwrap_err();
        assert_eq!(err, LcdError::InvalidArgument);
    }

    #[test]
    fn enable_sets_fast_pwm_without_prescaler() {
        let io = SimIoSpace::default();
        let mut pwm = Timer2Pwm::new(&io, Timer2Pwm::OC2A).unwrap();
        assert!(!pwm.is_enabled().unwrap());

        pwm.enable().unwrap();

        assert_eq!(io.peek(Timer2Pwm::TCCR2A), 0b1000_0011);
        assert_eq!(io.peek(Timer2Pwm::TCCR2B), 0b0000_0001);
        assert_eq!(io.peek(PortId::B.ddr_address()), 0b0001_0000);
        assert!(pwm.is_enabled().unwrap());
    }

    #[test]
    fn enable_leaves_channel_b_and_port_b_alone() {
        let io = SimIoSpace::default();
        io.poke(Timer2Pwm::TCCR2A, 0b0010_0000);
        io.poke(PortId::B.port_address(), 0b1001_0001);
        let mut pwm = Timer2Pwm::new(&io, Timer2Pwm::OC2A).unwrap();

        pwm.enable().unwrap();

        assert_eq!(io.peek(Timer2Pwm::TCCR2A), 0b1010_0011);
        assert_eq!(io.peek(PortId::B.port_address()), 0b1000_0001);
    }

    #[test]
    fn inverted_polarity_and_disable() {
        let io = SimIoSpace::default();
        let mut pwm = Timer2Pwm::new(&io, Timer2Pwm::OC2A).unwrap();
        pwm.enable().unwrap();

        pwm.set_polarity(PwmPolarity::Inversed).unwrap();
        assert_eq!(io.peek(Timer2Pwm::TCCR2A), 0b1100_0011);

        pwm.set_duty(200).unwrap();
        assert_eq!(pwm.duty().unwrap(), 200);

        pwm.disable().unwrap();
        assert!(!pwm.is_enabled().unwrap());
        assert_eq!(io.peek(Timer2Pwm::TCCR2A), 0b0000_0011);
    }
}
