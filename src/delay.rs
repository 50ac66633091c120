//! Delay providers
//!
//! [Delay](Delay) uses the Cortex-M system timer (SysTick) clocked from the
//! CPU clock. It is the delay the EMAC driver uses for its PHY polling loops.
//!
//! # Examples
//!
//! ```no_run
//! use lpc17xx_hal::delay::Delay;
//! use lpc17xx_hal::prelude::*;
//!
//! let core = cortex_m::Peripherals::take().unwrap();
//! let mut delay = Delay::new(core.SYST, 100.mhz().into());
//!
//! delay.delay_ms(500_u32);
//!
//! // Release SYST from the delay
//! let syst = delay.free();
//! ```

use cast::u32;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use embedded_hal::blocking::delay::{DelayMs, DelayUs};

use crate::time::Hertz;

pub trait DelayExt {
    fn delay(self, core_clock: Hertz) -> Delay;
}

impl DelayExt for SYST {
    fn delay(self, core_clock: Hertz) -> Delay {
        Delay::new(self, core_clock)
    }
}

/// System timer (SysTick) as a delay provider
pub struct Delay {
    core_clock: Hertz,
    syst: SYST,
}

impl Delay {
    /// Configures the system timer (SysTick) as a delay provider
    pub fn new(mut syst: SYST, core_clock: Hertz) -> Self {
        syst.set_clock_source(SystClkSource::Core);

        Delay { syst, core_clock }
    }

    /// Releases the system timer (SysTick) resource
    pub fn free(self) -> SYST {
        self.syst
    }
}

/// Number of SysTick reloads of at most `max_rvr` ticks needed for `us`
/// microseconds at `core_clock`, returned as (full reloads, remainder).
fn reload_plan(us: u32, core_clock: Hertz, max_rvr: u32) -> (u64, u32) {
    let total = u64::from(us) * u64::from(core_clock.ticks_per_us());
    (total / u64::from(max_rvr), (total % u64::from(max_rvr)) as u32)
}

impl DelayMs<u32> for Delay {
    fn delay_ms(&mut self, ms: u32) {
        // Split so that `ms * 1_000` never overflows
        const MAX_MS: u32 = u32::MAX / 1_000;
        let mut ms = ms;
        while ms > MAX_MS {
            self.delay_us(MAX_MS * 1_000);
            ms -= MAX_MS;
        }
        self.delay_us(ms * 1_000);
    }
}

impl DelayMs<u16> for Delay {
    fn delay_ms(&mut self, ms: u16) {
        self.delay_ms(u32(ms));
    }
}

impl DelayMs<u8> for Delay {
    fn delay_ms(&mut self, ms: u8) {
        self.delay_ms(u32(ms));
    }
}

impl DelayUs<u32> for Delay {
    fn delay_us(&mut self, us: u32) {
        // The SysTick Reload Value register supports values between 1 and
        // 0x00FFFFFF.
        const MAX_RVR: u32 = 0x00FF_FFFF;

        let (full, rest) = reload_plan(us, self.core_clock, MAX_RVR);
        let reloads = (0..full).map(|_| MAX_RVR).chain(Some(rest));

        for rvr in reloads.filter(|&rvr| rvr != 0) {
            self.syst.set_reload(rvr);
            self.syst.clear_current();
            self.syst.enable_counter();

            while !self.syst.has_wrapped() {}

            self.syst.disable_counter();
        }
    }
}

impl DelayUs<u16> for Delay {
    fn delay_us(&mut self, us: u16) {
        self.delay_us(u32(us))
    }
}

impl DelayUs<u8> for Delay {
    fn delay_us(&mut self, us: u8) {
        self.delay_us(u32(us))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_plan_splits_long_delays() {
        // 1 ms at 100 MHz fits one reload
        assert_eq!(
            reload_plan(1_000, Hertz(100_000_000), 0x00FF_FFFF),
            (0, 100_000)
        );

        // 1 s at 100 MHz needs several full reloads
        let (full, rest) =
            reload_plan(1_000_000, Hertz(100_000_000), 0x00FF_FFFF);
        assert_eq!(full * 0x00FF_FFFF + u64::from(rest), 100_000_000);
        assert_eq!(full, 5);
    }

    #[test]
    fn zero_delay_needs_no_reload() {
        assert_eq!(reload_plan(0, Hertz(100_000_000), 0x00FF_FFFF), (0, 0));
    }
}
