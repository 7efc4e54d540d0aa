use crate::lcd::hd44780::backlight::Backlight;
use crate::lcd::hd44780::driver::{ControllerState, CursorDirection, HD44780Driver, Instruction};
use crate::lcd::hd44780::pins::PinMap;
use crate::lcd::hd44780::timing::{FixedDelay, Timing, WaitStrategy};
use crate::port::Ports;
use crate::{IoSpace, LcdError, LcdResult};
use embedded_hal::delay::DelayNs;
use log::{debug, trace};
use std::fmt::{Debug, Formatter};

/// HD44780 on a 4-bit bus bit-banged over AVR ports.
///
/// The data lines may be spread over several ports. Each nibble is written with one masked
/// read-modify-write per port, so pins outside the [PinMap] keep whatever they were driving.
/// R/W is assumed to be tied low, so nothing is ever read back; the default [WaitStrategy] is a
/// [FixedDelay].
pub struct PortHD44780Driver<'a> {
    pins: PinMap,
    ports: Ports<'a>,
    delay: Box<dyn DelayNs + 'a>,
    wait: Box<dyn WaitStrategy + 'a>,
    timing: Timing,
    backlight: Option<Backlight<'a>>,
    state: ControllerState,
}

impl<'a> PortHD44780Driver<'a> {
    /// Creates a driver with default [Timing] and no backlight.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` or `LcdError::AlreadyInUse` if the pin map is invalid.
    /// - Any error from opening the port registers.
    pub fn new(io: &'a dyn IoSpace, pins: PinMap, delay: impl DelayNs + 'a) -> LcdResult<Self> {
        pins.validate()?;
        let timing = Timing::default();

        Ok(PortHD44780Driver {
            pins,
            ports: Ports::open(io, pins.logic_ports())?,
            delay: Box::new(delay),
            wait: Box::new(FixedDelay::from_timing(&timing)),
            timing,
            backlight: None,
            state: ControllerState::Uninitialized,
        })
    }

    /// Replaces the timing. Also resets the wait strategy to a [FixedDelay] built from it.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self.wait = Box::new(FixedDelay::from_timing(&timing));
        self
    }

    pub fn with_wait_strategy(mut self, wait: impl WaitStrategy + 'a) -> Self {
        self.wait = Box::new(wait);
        self
    }

    /// Attaches a backlight. It's configured and set to its default brightness during init.
    pub fn with_backlight(mut self, backlight: Backlight<'a>) -> Self {
        self.backlight = Some(backlight);
        self
    }

    pub fn pins(&self) -> &PinMap {
        &self.pins
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ControllerState::Ready
    }

    pub fn backlight_mut(&mut self) -> Option<&mut Backlight<'a>> {
        self.backlight.as_mut()
    }

    fn enter(&mut self, state: ControllerState) {
        debug!("HD44780: {} -> {}", self.state, state);
        self.state = state;
    }

    fn require_ready(&self) -> LcdResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(LcdError::NotInitialized)
        }
    }

    fn settle(&mut self) {
        self.delay.delay_ns(self.timing.settle_ns());
    }

    /// Puts the low 4 bits of `nibble` on DB4..DB7.
    fn set_nibble(&self, nibble: u8) -> LcdResult<()> {
        for port in self.ports.iter() {
            let mask = self.pins.data_mask(port.id());
            if mask != 0 {
                port.write_masked(mask, self.pins.nibble_bits(port.id(), nibble))?;
            }
        }
        Ok(())
    }

    /// Latches whatever is on the data lines.
    fn pulse_enable(&mut self) -> LcdResult<()> {
        self.ports.write_pin(self.pins.e, true)?;
        self.delay.delay_ns(self.timing.enable_pulse_ns());
        self.ports.write_pin(self.pins.e, false)
    }

    fn send(&mut self, byte: u8, data: bool) -> LcdResult<()> {
        trace!("Sending {:08b}, RS: {}", byte, data);

        self.wait.wait_ready(&mut *self.delay)?;

        self.ports.write_pin(self.pins.rs, data)?;
        self.settle();

        self.set_nibble(byte >> 4)?;
        self.pulse_enable()?;
        self.settle();

        self.set_nibble(byte & 0x0F)?;
        self.pulse_enable()?;
        self.settle();

        if data {
            self.wait.settle_after_data(&mut *self.delay)?;
        }
        Ok(())
    }

    fn send_instruction(&mut self, instruction: Instruction) -> LcdResult<()> {
        let command = instruction.encode()?;
        self.send(command, false)
    }

    /// Drives the logic pins as outputs, idle low.
    fn configure_pins(&mut self) -> LcdResult<()> {
        for port in self.ports.iter() {
            port.make_output(self.pins.output_mask(port.id()))?;
        }
        self.ports.write_pin(self.pins.e, false)?;
        self.ports.write_pin(self.pins.rs, false)
    }
}

impl Debug for PortHD44780Driver<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PortHD44780Driver({:?}, {}, wait: {:?}, backlight: {:?})",
            self.ports, self.state, self.wait, self.backlight
        )
    }
}

impl HD44780Driver for PortHD44780Driver<'_> {
    fn init(&mut self, multiline: bool, alt_font: bool) -> LcdResult<()> {
        self.enter(ControllerState::PoweringOn);
        self.configure_pins()?;
        if let Some(backlight) = self.backlight.as_mut() {
            backlight.configure()?;
        }
        self.delay.delay_ms(self.timing.power_on_ms);

        // Three "8-bit function set" pulses get the controller into a known state whatever mode
        // it was left in. Only the upper nibble is wired, so each is a single nibble.
        self.enter(ControllerState::EightBitBootstrap(1));
        self.ports.write_pin(self.pins.rs, false)?;
        self.set_nibble(0b0011)?;
        self.pulse_enable()?;
        for step in 2..=3 {
            self.delay.delay_ms(self.timing.bootstrap_ms);
            self.enter(ControllerState::EightBitBootstrap(step));
            self.pulse_enable()?;
        }

        self.delay.delay_ms(self.timing.bootstrap_ms);
        self.enter(ControllerState::FourBitModeSwitch);
        self.set_nibble(0b0010)?;
        self.pulse_enable()?;

        self.enter(ControllerState::FunctionSet);
        self.send_instruction(Instruction::FunctionSet {
            eight_bit: false,
            two_lines: multiline,
            alt_font,
        })?;

        self.enter(ControllerState::DisplayOff);
        self.send_instruction(Instruction::DisplayControl {
            display: false,
            cursor: false,
            blink: false,
        })?;

        self.enter(ControllerState::Cleared);
        self.send_instruction(Instruction::ClearDisplay)?;

        self.enter(ControllerState::EntryModeSet);
        self.send_instruction(Instruction::EntryModeSet {
            direction: CursorDirection::Right,
            shift: false,
        })?;

        self.enter(ControllerState::DisplayOn);
        self.send_instruction(Instruction::DisplayControl {
            display: true,
            cursor: false,
            blink: false,
        })?;

        if let Some(backlight) = self.backlight.as_mut() {
            backlight.apply_default()?;
        }

        self.enter(ControllerState::Ready);
        Ok(())
    }

    /// # Errors
    /// - `LcdError::NotInitialized` before [HD44780Driver::init] completed.
    fn send_command(&mut self, command: u8) -> LcdResult<()> {
        self.require_ready()?;
        self.send(command, false)
    }

    /// # Errors
    /// - `LcdError::NotInitialized` before [HD44780Driver::init] completed.
    fn send_data(&mut self, data: u8) -> LcdResult<()> {
        self.require_ready()?;
        self.send(data, true)
    }
}
