//! Delay constants and wait-for-ready strategies.
//!
//! R/W is tied to GND on the shield, so the busy flag can't be read and every byte is preceded
//! by a fixed wait long enough for the slowest instruction ([FixedDelay]). Wirings that can
//! read the flag may use [BusyPoll] instead.

use crate::{LcdError, LcdResult};
use embedded_hal::delay::DelayNs;
use std::fmt::{Debug, Formatter};
use std::hint::spin_loop;
use std::time::{Duration, Instant};

/// Timing of the bring-up sequence and of every transfer.
///
/// Millisecond and microsecond values are absolute. Values given in CPU cycles are converted
/// with [Timing::clock_hz], so changing the clock rescales them.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    pub clock_hz: u32,
    /// Wait after power-up before the first bootstrap pulse. The controller needs at least 15 ms.
    pub power_on_ms: u32,
    /// Wait before each of the remaining bootstrap pulses (at least 4.1 ms, then 100 µs).
    pub bootstrap_ms: u32,
    /// Fixed wait-for-ready before every byte.
    pub ready_wait_ms: u32,
    /// Extra wait after a data byte.
    pub data_settle_us: u32,
    /// Width of the enable pulse.
    pub enable_pulse_cycles: u32,
    /// Settle time between RS changes and nibble writes.
    pub settle_cycles: u32,
}

impl Timing {
    pub const DEFAULT_CLOCK_HZ: u32 = 16_000_000;

    /// Gets the timing for a CPU running at `clock_hz`.
    pub const fn for_clock(clock_hz: u32) -> Self {
        Timing {
            clock_hz,
            power_on_ms: 50,
            bootstrap_ms: 10,
            ready_wait_ms: 2,
            data_settle_us: 50,
            enable_pulse_cycles: 4,
            settle_cycles: 1,
        }
    }

    /// Converts CPU cycles to nanoseconds, rounding up.
    pub fn cycles_ns(&self, cycles: u32) -> u32 {
        let ns = u64::from(cycles) * 1_000_000_000;
        ns.div_ceil(u64::from(self.clock_hz.max(1)))
            .try_into()
            .unwrap_or(u32::MAX)
    }

    pub fn enable_pulse_ns(&self) -> u32 {
        self.cycles_ns(self.enable_pulse_cycles)
    }

    pub fn settle_ns(&self) -> u32 {
        self.cycles_ns(self.settle_cycles)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing::for_clock(Self::DEFAULT_CLOCK_HZ)
    }
}

/// Decides how long to block before the controller accepts the next byte.
pub trait WaitStrategy: Debug {
    /// Blocks until the controller is done with the previous instruction.
    fn wait_ready(&mut self, delay: &mut dyn DelayNs) -> LcdResult<()>;

    /// Called right after a data byte went out.
    fn settle_after_data(&mut self, _delay: &mut dyn DelayNs) -> LcdResult<()> {
        Ok(())
    }
}

/// Blind fixed waits. Silently corrupts the display if the controller is slower than assumed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FixedDelay {
    pub ready_wait_ms: u32,
    pub data_settle_us: u32,
}

impl FixedDelay {
    pub fn from_timing(timing: &Timing) -> Self {
        FixedDelay {
            ready_wait_ms: timing.ready_wait_ms,
            data_settle_us: timing.data_settle_us,
        }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        FixedDelay::from_timing(&Timing::default())
    }
}

impl WaitStrategy for FixedDelay {
    fn wait_ready(&mut self, delay: &mut dyn DelayNs) -> LcdResult<()> {
        delay.delay_ms(self.ready_wait_ms);
        Ok(())
    }

    fn settle_after_data(&mut self, delay: &mut dyn DelayNs) -> LcdResult<()> {
        delay.delay_us(self.data_settle_us);
        Ok(())
    }
}

/// Polls a busy flag until it clears.
///
/// `flag` returns `Ok(true)` while the controller is busy. Reading it is up to the wiring
/// (R/W high, DB7 as input, pulse E), so it's passed in as a closure.
pub struct BusyPoll<F> {
    flag: F,
    poll_interval_us: u32,
    max_polls: u32,
}

impl<F> BusyPoll<F>
where
    F: FnMut() -> LcdResult<bool>,
{
    pub fn new(flag: F) -> Self {
        BusyPoll {
            flag,
            poll_interval_us: 10,
            max_polls: 1_000,
        }
    }

    pub fn with_poll_interval_us(mut self, poll_interval_us: u32) -> Self {
        self.poll_interval_us = poll_interval_us;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }
}

impl<F> Debug for BusyPoll<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BusyPoll(every {} us, up to {} polls)",
            self.poll_interval_us, self.max_polls
        )
    }
}

impl<F> WaitStrategy for BusyPoll<F>
where
    F: FnMut() -> LcdResult<bool>,
{
    /// # Errors
    /// - `LcdError::BusyTimeout` if the flag is still set after the maximum number of polls.
    fn wait_ready(&mut self, delay: &mut dyn DelayNs) -> LcdResult<()> {
        for _ in 0..self.max_polls {
            if !(self.flag)()? {
                return Ok(());
            }
            delay.delay_us(self.poll_interval_us);
        }
        Err(LcdError::BusyTimeout(self.max_polls))
    }
}

/// Busy-waits on the monotonic clock. Nothing else runs while it waits.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let deadline = Instant::now() + Duration::from_nanos(ns.into());
        while Instant::now() < deadline {
            spin_loop();
        }
    }
}
