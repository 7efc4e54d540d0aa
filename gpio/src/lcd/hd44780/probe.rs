//! Decodes a [SimIoSpace](crate::sim::SimIoSpace) timeline into what the controller saw.
//!
//! The controller latches the data lines and RS on the falling edge of E. [BusProbe] replays the
//! recorded port writes and emits a [BusEvent::Nibble] at each such edge.

use crate::lcd::hd44780::pins::PinMap;
use crate::port::{PinBinding, PortId};
use crate::sim::SimEvent;
use crate::{LcdError, LcdResult};
use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusEvent {
    /// A nibble was latched. `data` is the RS level.
    Nibble { data: bool, value: u8 },
    Delay { ns: u32 },
}

/// A complete byte transfer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transfer {
    Command(u8),
    Data(u8),
}

impl Display for Transfer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Transfer::Command(command) => write!(f, "CMD  {:#04x} ({:08b})", command, command),
            Transfer::Data(data) if data.is_ascii_graphic() || *data == b' ' => {
                write!(f, "DATA {:#04x} '{}'", data, *data as char)
            }
            Transfer::Data(data) => write!(f, "DATA {:#04x}", data),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct BusProbe {
    pins: PinMap,
}

impl BusProbe {
    /// Nibbles latched by the bring-up sequence before the controller is in 4-bit mode.
    pub const BOOTSTRAP_NIBBLES: usize = 4;

    pub fn new(pins: PinMap) -> Self {
        BusProbe { pins }
    }

    /// Replays `timeline`. Port latches and E are assumed low before the first event.
    pub fn decode(&self, timeline: &[SimEvent]) -> Vec<BusEvent> {
        let mut latches = [0u8; PortId::ALL.len()];
        let mut events = Vec::new();

        for event in timeline {
            match *event {
                SimEvent::Delay { ns } => events.push(BusEvent::Delay { ns }),
                SimEvent::Write { address, value } => {
                    let Some(port) = PortId::ALL
                        .into_iter()
                        .find(|port| port.port_address() == address)
                    else {
                        continue;
                    };

                    let e_was_high = self.level(&latches, self.pins.e);
                    latches[port.index()] = value;
                    if e_was_high && !self.level(&latches, self.pins.e) {
                        events.push(BusEvent::Nibble {
                            data: self.level(&latches, self.pins.rs),
                            value: self.nibble(&latches),
                        });
                    }
                }
            }
        }

        events
    }

    /// Gets every latched nibble as `(rs, value)`.
    pub fn nibbles(&self, timeline: &[SimEvent]) -> Vec<(bool, u8)> {
        self.decode(timeline)
            .into_iter()
            .filter_map(|event| match event {
                BusEvent::Nibble { data, value } => Some((data, value)),
                BusEvent::Delay { .. } => None,
            })
            .collect()
    }

    /// Pairs the latched nibbles of `timeline` into bytes. See [BusProbe::pair].
    pub fn transfers(&self, timeline: &[SimEvent]) -> LcdResult<Vec<Transfer>> {
        Self::pair(&self.nibbles(timeline))
    }

    /// Pairs nibbles into bytes, high nibble first.
    ///
    /// Only meaningful after the 4-bit switch of the bring-up sequence, which latches
    /// [BusProbe::BOOTSTRAP_NIBBLES] single nibbles.
    ///
    /// # Errors
    /// - `LcdError::Other` if a nibble is left over or the two halves of a byte disagree on RS.
    pub fn pair(nibbles: &[(bool, u8)]) -> LcdResult<Vec<Transfer>> {
        if nibbles.len() % 2 != 0 {
            return Err(LcdError::Other(format!(
                "{} nibbles don't pair into bytes",
                nibbles.len()
            )));
        }

        nibbles
            .chunks_exact(2)
            .map(|pair| {
                let [(rs_high, high), (rs_low, low)] = [pair[0], pair[1]];
                if rs_high != rs_low {
                    return Err(LcdError::Other("RS changed within a byte".to_string()));
                }
                let byte = (high << 4) | low;
                Ok(if rs_high {
                    Transfer::Data(byte)
                } else {
                    Transfer::Command(byte)
                })
            })
            .collect()
    }

    fn level(&self, latches: &[u8], pin: PinBinding) -> bool {
        latches[pin.port.index()] & pin.mask() != 0
    }

    fn nibble(&self, latches: &[u8]) -> u8 {
        self.pins
            .data
            .iter()
            .enumerate()
            .filter(|(_, pin)| self.level(latches, **pin))
            .fold(0, |nibble, (i, _)| nibble | (1 << i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::hd44780::pins::LCD_KEYPAD_SHIELD;

    const PORTH: u16 = 0x102;
    const PORTE: u16 = 0x2E;
    const PORTG: u16 = 0x34;

    fn write(address: u16, value: u8) -> SimEvent {
        SimEvent::Write { address, value }
    }

    #[test]
    fn latches_on_falling_edge_only() {
        let probe = BusProbe::new(LCD_KEYPAD_SHIELD);
        let timeline = [
            // RS high, DB6 + DB7 (H3, H4), DB4 (G5)
            write(PORTH, 0b0011_1000),
            write(PORTG, 0b0010_0000),
            write(PORTH, 0b0111_1000),
            SimEvent::Delay { ns: 250 },
            write(PORTH, 0b0011_1000),
            // Unrelated register
            write(0xB3, 0xFF),
        ];

        assert_eq!(
            probe.decode(&timeline),
            vec![
                BusEvent::Delay { ns: 250 },
                BusEvent::Nibble {
                    data: true,
                    value: 0b1101
                },
            ]
        );
    }

    #[test]
    fn transfers_pair_nibbles() {
        let probe = BusProbe::new(LCD_KEYPAD_SHIELD);
        // 0x41 as data: high nibble 0100 (DB6 = H3), low nibble 0001 (DB4 = G5)
        let timeline = [
            write(PORTH, 0b0010_1000),
            write(PORTH, 0b0110_1000),
            write(PORTH, 0b0010_1000),
            write(PORTH, 0b0010_0000),
            write(PORTG, 0b0010_0000),
            write(PORTH, 0b0110_0000),
            write(PORTH, 0b0010_0000),
        ];

        assert_eq!(probe.transfers(&timeline), Ok(vec![Transfer::Data(b'A')]));
        assert_eq!(Transfer::Data(b'A').to_string(), "DATA 0x41 'A'");
        assert_eq!(Transfer::Command(0x0C).to_string(), "CMD  0x0c (00001100)");
    }

    #[test]
    fn odd_nibbles_dont_pair() {
        let probe = BusProbe::new(LCD_KEYPAD_SHIELD);
        let timeline = [
            write(PORTE, 0b0000_1000),
            write(PORTH, 0b0100_0000),
            write(PORTH, 0b0000_0000),
        ];

        assert_eq!(probe.nibbles(&timeline), vec![(false, 0b0010)]);
        assert!(probe.transfers(&timeline).is_err());
    }

    #[test]
    fn rs_must_match_within_a_byte() {
        assert!(BusProbe::pair(&[(true, 0x4), (false, 0x1)]).is_err());
        assert_eq!(
            BusProbe::pair(&[(false, 0x0), (false, 0x1)]),
            Ok(vec![Transfer::Command(0x01)])
        );
    }
}
