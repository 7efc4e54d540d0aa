//! In-memory register space that records every write and delay on one timeline.
//!
//! Used by the tests and by the demo binary to observe what the driver puts on the wires
//! without a board. See [crate::lcd::hd44780::probe::BusProbe] for decoding the timeline back
//! into nibble transfers.

use crate::{IoSpace, LcdError, LcdResult, Register};
use embedded_hal::delay::DelayNs;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};

/// Something that happened on the simulated board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimEvent {
    /// A register was written (whole-register writes and read-modify-writes alike).
    Write { address: u16, value: u8 },
    /// The driver blocked for the given time.
    Delay { ns: u32 },
}

/// A simulated data space. Not `Sync`: one thread drives it, like the real board.
pub struct SimIoSpace {
    memory: RefCell<Vec<u8>>,
    timeline: RefCell<Vec<SimEvent>>,
}

impl SimIoSpace {
    /// Size of the ATmega2560 register area (I/O and extended I/O registers).
    pub const ATMEGA2560_SIZE: usize = 0x200;

    pub fn new(size: usize) -> Self {
        SimIoSpace {
            memory: RefCell::new(vec![0; size]),
            timeline: RefCell::new(Vec::new()),
        }
    }

    /// Gets the current value at `address`, or `0` if out of range.
    pub fn peek(&self, address: u16) -> u8 {
        self.memory
            .borrow()
            .get(address as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Sets a value without recording it, as another peripheral would.
    pub fn poke(&self, address: u16, value: u8) {
        if let Some(byte) = self.memory.borrow_mut().get_mut(address as usize) {
            *byte = value;
        }
    }

    /// Gets a copy of everything recorded so far.
    pub fn timeline(&self) -> Vec<SimEvent> {
        self.timeline.borrow().clone()
    }

    pub fn clear_timeline(&self) {
        self.timeline.borrow_mut().clear();
    }

    /// Sums all recorded delays.
    pub fn total_delay_ns(&self) -> u64 {
        self.timeline
            .borrow()
            .iter()
            .map(|event| match event {
                SimEvent::Delay { ns } => u64::from(*ns),
                SimEvent::Write { .. } => 0,
            })
            .sum()
    }

    /// Gets a delay provider that records into this space's timeline instead of blocking.
    pub fn delay(&self) -> SimDelay<'_> {
        SimDelay { space: self }
    }

    fn record(&self, event: SimEvent) {
        self.timeline.borrow_mut().push(event);
    }
}

impl Default for SimIoSpace {
    fn default() -> Self {
        SimIoSpace::new(Self::ATMEGA2560_SIZE)
    }
}

impl Debug for SimIoSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SimIoSpace({} bytes, {} events)",
            self.memory.borrow().len(),
            self.timeline.borrow().len()
        )
    }
}

impl IoSpace for SimIoSpace {
    fn size(&self) -> usize {
        self.memory.borrow().len()
    }

    fn get_register(&self, address: u16) -> LcdResult<Box<dyn Register + '_>> {
        if address as usize >= self.size() {
            return Err(LcdError::InvalidArgument);
        }
        Ok(Box::new(SimRegister {
            space: self,
            address,
        }))
    }
}

struct SimRegister<'a> {
    space: &'a SimIoSpace,
    address: u16,
}

impl Debug for SimRegister<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimRegister({:#05x})", self.address)
    }
}

impl Register for SimRegister<'_> {
    fn read(&self) -> LcdResult<u8> {
        Ok(self.space.peek(self.address))
    }

    fn write(&self, value: u8) -> LcdResult<()> {
        self.space.poke(self.address, value);
        self.space.record(SimEvent::Write {
            address: self.address,
            value,
        });
        Ok(())
    }
}

/// Delay provider for [SimIoSpace]; returns immediately.
pub struct SimDelay<'a> {
    space: &'a SimIoSpace,
}

impl Debug for SimDelay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDelay")
    }
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.space.record(SimEvent::Delay { ns });
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_ns(us.saturating_mul(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_ns(ms.saturating_mul(1_000_000));
    }
}
