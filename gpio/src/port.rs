//! AVR ports as owned register abstractions.
//!
//! A [GpioPort] wraps the `DDRx` and `PORTx` registers of one port. Pins are addressed by
//! [PinBinding]s and every write is a masked read-modify-write, so bits owned by other
//! peripherals survive.

use crate::{IoSpace, LcdError, LcdResult, Register};
use log::trace;
use std::fmt::{Debug, Display, Formatter};

/// The ATmega2560 ports used by the LCD Keypad Shield.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PortId {
    B,
    E,
    G,
    H,
}

impl PortId {
    pub const ALL: [PortId; 4] = [PortId::B, PortId::E, PortId::G, PortId::H];

    /// Gets the position of the port in [PortId::ALL].
    pub const fn index(self) -> usize {
        match self {
            PortId::B => 0,
            PortId::E => 1,
            PortId::G => 2,
            PortId::H => 3,
        }
    }

    /// Data-space address of the `PINx` register.
    pub const fn pin_address(self) -> u16 {
        match self {
            PortId::B => 0x23,
            PortId::E => 0x2C,
            PortId::G => 0x32,
            PortId::H => 0x100,
        }
    }

    /// Data-space address of the `DDRx` register.
    pub const fn ddr_address(self) -> u16 {
        self.pin_address() + 1
    }

    /// Data-space address of the `PORTx` register.
    pub const fn port_address(self) -> u16 {
        self.pin_address() + 2
    }
}

impl Display for PortId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            PortId::B => 'B',
            PortId::E => 'E',
            PortId::G => 'G',
            PortId::H => 'H',
        };
        write!(f, "PORT{}", letter)
    }
}

/// One physical pin: a port and a bit index within it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinBinding {
    pub port: PortId,
    pub bit: u8,
}

impl PinBinding {
    pub const fn new(port: PortId, bit: u8) -> Self {
        PinBinding { port, bit }
    }

    /// Gets the single-bit mask of the pin within its port, or `0` if the bit index is invalid.
    pub const fn mask(&self) -> u8 {
        if self.bit < 8 { 1 << self.bit } else { 0 }
    }
}

impl Display for PinBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.port, self.bit)
    }
}

/// The direction and output registers of one port.
pub struct GpioPort<'a> {
    id: PortId,
    ddr: Box<dyn Register + 'a>,
    port: Box<dyn Register + 'a>,
}

impl<'a> GpioPort<'a> {
    pub fn new(io: &'a dyn IoSpace, id: PortId) -> LcdResult<Self> {
        Ok(GpioPort {
            id,
            ddr: io.get_register(id.ddr_address())?,
            port: io.get_register(id.port_address())?,
        })
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    /// Switches the pins in `mask` to output. The direction of other pins is left alone.
    pub fn make_output(&self, mask: u8) -> LcdResult<()> {
        trace!("{}: DDR |= {:08b}", self.id, mask);
        self.ddr.set_bits(mask)
    }

    /// Drives the pins in `mask` to the matching bits of `bits`.
    pub fn write_masked(&self, mask: u8, bits: u8) -> LcdResult<()> {
        self.port.modify(mask, bits)
    }

    /// Drives a single pin of this port.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if the pin belongs to another port.
    pub fn write_pin(&self, pin: PinBinding, high: bool) -> LcdResult<()> {
        if pin.port != self.id {
            return Err(LcdError::InvalidArgument);
        }
        if high {
            self.port.set_bits(pin.mask())
        } else {
            self.port.clear_bits(pin.mask())
        }
    }

    /// Reads back the output latch.
    pub fn output(&self) -> LcdResult<u8> {
        self.port.read()
    }
}

impl Debug for GpioPort<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioPort({})", self.id)
    }
}

/// The set of ports a driver has opened, indexed by [PortId].
#[derive(Debug)]
pub struct Ports<'a> {
    ports: [Option<GpioPort<'a>>; PortId::ALL.len()],
}

impl<'a> Ports<'a> {
    /// Opens each of the given ports once.
    pub fn open(io: &'a dyn IoSpace, ids: impl IntoIterator<Item = PortId>) -> LcdResult<Self> {
        let mut ports: [Option<GpioPort<'a>>; PortId::ALL.len()] = Default::default();
        for id in ids {
            if ports[id.index()].is_none() {
                ports[id.index()] = Some(GpioPort::new(io, id)?);
            }
        }
        Ok(Ports { ports })
    }

    /// Gets an opened port.
    ///
    /// # Errors
    /// - `LcdError::InvalidArgument` if the port wasn't opened.
    pub fn get(&self, id: PortId) -> LcdResult<&GpioPort<'a>> {
        self.ports[id.index()].as_ref().ok_or(LcdError::InvalidArgument)
    }

    /// Iterates over the opened ports in [PortId::ALL] order.
    pub fn iter(&self) -> impl Iterator<Item = &GpioPort<'a>> {
        self.ports.iter().flatten()
    }

    /// Drives a single pin on whichever port it belongs to.
    pub fn write_pin(&self, pin: PinBinding, high: bool) -> LcdResult<()> {
        self.get(pin.port)?.write_pin(pin, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimIoSpace;

    #[test]
    fn addresses_match_atmega2560() {
        assert_eq!(PortId::B.port_address(), 0x25);
        assert_eq!(PortId::E.ddr_address(), 0x2D);
        assert_eq!(PortId::G.port_address(), 0x34);
        assert_eq!(PortId::H.port_address(), 0x102);
    }

    #[test]
    fn write_pin_preserves_other_bits() {
        let io = SimIoSpace::default();
        io.poke(PortId::H.port_address(), 0b1000_0001);
        let port = GpioPort::new(&io, PortId::H).unwrap();

        port.write_pin(PinBinding::new(PortId::H, 5), true).unwrap();
        assert_eq!(io.peek(PortId::H.port_address()), 0b1010_0001);

        port.write_pin(PinBinding::new(PortId::H, 0), false).unwrap();
        assert_eq!(io.peek(PortId::H.port_address()), 0b1010_0000);
    }

    #[test]
    fn write_pin_rejects_foreign_pin() {
        let io = SimIoSpace::default();
        let port = GpioPort::new(&io, PortId::H).unwrap();
        assert_eq!(
            port.write_pin(PinBinding::new(PortId::G, 5), true),
            Err(LcdError::InvalidArgument)
        );
    }

    #[test]
    fn make_output_only_adds_directions() {
        let io = SimIoSpace::default();
        io.poke(PortId::G.ddr_address(), 0b0000_0011);
        let port = GpioPort::new(&io, PortId::G).unwrap();
        port.make_output(0b0010_0000).unwrap();
        assert_eq!(io.peek(PortId::G.ddr_address()), 0b0010_0011);
    }

    #[test]
    fn ports_open_each_port_once() {
        let io = SimIoSpace::default();
        let ports = Ports::open(&io, [PortId::H, PortId::G, PortId::H]).unwrap();
        let ids: Vec<_> = ports.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![PortId::G, PortId::H]);
        assert_eq!(ports.get(PortId::B).unwrap_err(), LcdError::InvalidArgument);
    }
}
