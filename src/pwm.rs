//! Pulse Width Modulation (PWM)
//!
//! PWM1 has six single edge outputs sharing one period. Match register 0
//! holds the period and resets the counter; match registers 1 to 6 hold the
//! duty cycle of each output. Writes to the match registers take effect at
//! the start of the next period, once latched through `LER`.
//!
//! ## Usage
//!
//! ```no_run
//! use lpc17xx_hal::gpio::{GpioExt, GPIO};
//! use lpc17xx_hal::prelude::*;
//! use lpc17xx_hal::pwm::{Channel, Pwm1};
//!
//! let gpio = GPIO::take().unwrap().split();
//! let _green = gpio.p2_3.into_alternate::<1>();
//!
//! // Period of 1000 counter ticks
//! let mut pwm = Pwm1::take(1000).unwrap();
//! pwm.set_duty(Channel::C4, pwm.get_max_duty() / 2);
//! pwm.enable(Channel::C4);
//! ```
//!
//! The pins able to carry each output implement [PwmPin].

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal as hal;
use volatile_register::RW;

use crate::gpio::{self, Alternate};

/// Base address of PWM1
const PWM1_BASE: usize = 0x4001_8000;

/// TCR: counter enable
const TCR_CNT_EN: u32 = 1 << 0;
/// TCR: counter reset
const TCR_CNT_RST: u32 = 1 << 1;
/// TCR: PWM mode enable
const TCR_PWM_EN: u32 = 1 << 3;

/// MCR: interrupt on MR0 match
const MCR_MR0I: u32 = 1 << 0;
/// MCR: reset on MR0 match
const MCR_MR0R: u32 = 1 << 1;

/// IR: MR0 match interrupt
const IR_MR0: u32 = 1 << 0;

/// LER: latch MR0 to MR6
const LER_ALL: u32 = 0x7F;

/// PWM1 registers
#[repr(C)]
#[allow(dead_code)]
pub(crate) struct RegisterBlock {
    ir: RW<u32>,
    tcr: RW<u32>,
    tc: RW<u32>,
    pr: RW<u32>,
    pc: RW<u32>,
    mcr: RW<u32>,
    /// MR0 to MR3
    mr0_3: [RW<u32>; 4],
    ccr: RW<u32>,
    cr: [RW<u32>; 4],
    _reserved: u32,
    /// MR4 to MR6
    mr4_6: [RW<u32>; 3],
    pcr: RW<u32>,
    ler: RW<u32>,
}

impl RegisterBlock {
    fn mr(&self, index: usize) -> &RW<u32> {
        if index < 4 {
            &self.mr0_3[index]
        } else {
            &self.mr4_6[index - 4]
        }
    }
}

/// PWM1 output channel
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    C1 = 1,
    C2 = 2,
    C3 = 3,
    C4 = 4,
    C5 = 5,
    C6 = 6,
}

impl Channel {
    /// Match register and latch bit number
    fn index(self) -> usize {
        self as usize
    }

    /// `PCR.PWMENAn`
    fn enable_bit(self) -> u32 {
        1 << (8 + self.index())
    }
}

/// Pins that can carry a PWM1 output
pub trait PwmPin {
    const CHANNEL: Channel;
}

macro_rules! pwm_pins {
    ($($PIN:ident => $CH:ident,)+) => {
        $(
            impl PwmPin for gpio::$PIN<Alternate<1>> {
                const CHANNEL: Channel = Channel::$CH;
            }
        )+
    };
}

pwm_pins!(
    P2_0 => C1,
    P2_1 => C2,
    P2_2 => C3,
    P2_3 => C4,
    P2_4 => C5,
    P2_5 => C6,
);

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Marks `taken`, returning `false` if it was already marked
fn claim(taken: &AtomicBool) -> bool {
    !taken.swap(true, Ordering::AcqRel)
}

/// PWM1 in single edge mode
pub struct Pwm1<'a> {
    rb: &'a RegisterBlock,
    period: u32,
    matches: u32,
}

impl Pwm1<'static> {
    /// Stops and resets the counter and sets up a period of `period` counter
    /// ticks. All outputs start disabled.
    ///
    /// Returns the driver the first time it is called, `None` after.
    pub fn take(period: u32) -> Option<Self> {
        if claim(&TAKEN) {
            // NOTE(unsafe) first and only owner of PWM1
            Some(unsafe { Self::steal(period) })
        } else {
            None
        }
    }

    /// Unchecked version of [`take`](Self::take).
    ///
    /// # Safety
    ///
    /// Drivers obtained more than once alias the same registers.
    pub unsafe fn steal(period: u32) -> Self {
        let rb = &*(PWM1_BASE as *const RegisterBlock);
        Pwm1::init(rb, period)
    }
}

impl<'a> Pwm1<'a> {
    fn init(rb: &'a RegisterBlock, period: u32) -> Self {
        // NOTE(unsafe) this instance owns the PWM1 registers
        unsafe {
            rb.tcr.write(TCR_CNT_RST);
            rb.pr.write(0);
            rb.mcr.write(MCR_MR0I | MCR_MR0R);
            rb.mr(0).write(period);
            rb.ler.write(LER_ALL);
        }
        debug!("PWM1 period {} ticks", period);

        Pwm1 {
            rb,
            period,
            matches: 0,
        }
    }

    /// Channel carried by `pin`
    pub fn channel_for<PIN: PwmPin>(&self, _pin: &PIN) -> Channel {
        PIN::CHANNEL
    }

    /// Disables all outputs and stops the counter
    pub fn stop(&mut self) {
        // NOTE(unsafe) this instance owns the PWM1 registers
        unsafe {
            self.rb.pcr.write(0);
            self.rb.tcr.write(0);
        }
    }

    /// Acknowledge a pending period match. Returns true and counts the match
    /// if one was pending. Call from the PWM1 interrupt handler.
    pub fn clear_match_interrupt(&mut self) -> bool {
        if self.rb.ir.read() & IR_MR0 == 0 {
            return false;
        }
        // NOTE(unsafe) write 1 to clear
        unsafe { self.rb.ir.write(IR_MR0) };
        self.matches = self.matches.wrapping_add(1);
        true
    }

    /// Number of period matches acknowledged so far
    pub fn match_count(&self) -> u32 {
        self.matches
    }

    fn latch(&self, index: usize) {
        // NOTE(unsafe) this instance owns the PWM1 registers
        unsafe { self.rb.ler.modify(|w| w | (1 << index)) }
    }
}

impl hal::Pwm for Pwm1<'_> {
    type Channel = Channel;
    type Time = u32;
    type Duty = u32;

    fn disable(&mut self, channel: Channel) {
        // NOTE(unsafe) this instance owns the PWM1 registers
        unsafe { self.rb.pcr.modify(|w| w & !channel.enable_bit()) }
    }

    fn enable(&mut self, channel: Channel) {
        // NOTE(unsafe) this instance owns the PWM1 registers
        unsafe {
            self.rb.pcr.modify(|w| w | channel.enable_bit());
            self.rb.tcr.write(TCR_CNT_EN | TCR_PWM_EN);
        }
    }

    fn get_period(&self) -> u32 {
        self.period
    }

    fn get_duty(&self, channel: Channel) -> u32 {
        self.rb.mr(channel.index()).read()
    }

    fn get_max_duty(&self) -> u32 {
        self.period
    }

    /// A duty cycle above the period keeps the output high
    fn set_duty(&mut self, channel: Channel, duty: u32) {
        // NOTE(unsafe) this instance owns the PWM1 registers
        unsafe { self.rb.mr(channel.index()).write(duty) };
        self.latch(channel.index());
    }

    fn set_period<P>(&mut self, period: P)
    where
        P: Into<Self::Time>,
    {
        self.period = period.into();
        // NOTE(unsafe) this instance owns the PWM1 registers
        unsafe { self.rb.mr(0).write(self.period) };
        self.latch(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::Pwm as _;

    const IR: usize = 0;
    const TCR: usize = 1;
    const PR: usize = 3;
    const MCR: usize = 5;
    const MR0: usize = 6;
    const MR3: usize = 9;
    const MR4: usize = 16;
    const MR6: usize = 18;
    const PCR: usize = 19;
    const LER: usize = 20;

    fn block(words: &mut [u32; 21]) -> &RegisterBlock {
        // NOTE(unsafe) the block is made of `u32` sized volatile cells
        unsafe { &*(words.as_mut_ptr() as *const RegisterBlock) }
    }

    #[test]
    fn driver_is_claimed_once() {
        let taken = AtomicBool::new(false);
        assert!(claim(&taken));
        assert!(!claim(&taken));
        assert!(!claim(&taken));
    }

    #[test]
    fn register_layout() {
        assert_eq!(core::mem::size_of::<RegisterBlock>(), 0x54);
    }

    #[test]
    fn init_sets_period() {
        let mut words = [0xFFFF_FFFFu32; 21];
        let pwm = Pwm1::init(block(&mut words), 1000);
        assert_eq!(pwm.get_period(), 1000);
        assert_eq!(pwm.get_max_duty(), 1000);
        drop(pwm);

        assert_eq!(words[TCR], TCR_CNT_RST);
        assert_eq!(words[PR], 0);
        assert_eq!(words[MCR], MCR_MR0I | MCR_MR0R);
        assert_eq!(words[MR0], 1000);
        assert_eq!(words[LER], 0x7F);
    }

    #[test]
    fn duty_goes_to_the_channel_match_register() {
        let mut words = [0u32; 21];
        let mut pwm = Pwm1::init(block(&mut words), 1000);
        // Clear the initial latch to see the per channel bits
        unsafe { pwm.rb.ler.write(0) };

        pwm.set_duty(Channel::C3, 250);
        pwm.set_duty(Channel::C4, 500);
        pwm.set_duty(Channel::C6, 1000);
        assert_eq!(pwm.get_duty(Channel::C4), 500);
        drop(pwm);

        assert_eq!(words[MR3], 250);
        assert_eq!(words[MR4], 500);
        assert_eq!(words[MR6], 1000);
        assert_eq!(words[LER], (1 << 3) | (1 << 4) | (1 << 6));
    }

    #[test]
    fn enable_disable_and_stop() {
        let mut words = [0u32; 21];
        let mut pwm = Pwm1::init(block(&mut words), 1000);

        pwm.enable(Channel::C4);
        pwm.enable(Channel::C5);
        pwm.disable(Channel::C4);
        assert_eq!(pwm.rb.pcr.read(), 1 << 13);
        assert_eq!(pwm.rb.tcr.read(), TCR_CNT_EN | TCR_PWM_EN);

        pwm.set_period(2000u32);
        assert_eq!(pwm.get_period(), 2000);
        assert_eq!(pwm.rb.mr(0).read(), 2000);

        pwm.stop();
        drop(pwm);
        assert_eq!(words[PCR], 0);
        assert_eq!(words[TCR], 0);
    }

    #[test]
    fn match_interrupts_are_counted() {
        let mut words = [0u32; 21];
        let mut pwm = Pwm1::init(block(&mut words), 1000);
        assert!(!pwm.clear_match_interrupt());

        unsafe { pwm.rb.ir.write(IR_MR0) };
        assert!(pwm.clear_match_interrupt());
        assert!(pwm.clear_match_interrupt());
        assert_eq!(pwm.match_count(), 2);
        drop(pwm);
        assert_eq!(words[IR], IR_MR0);
    }

    #[test]
    fn pins_map_to_channels() {
        assert_eq!(<gpio::P2_0<Alternate<1>> as PwmPin>::CHANNEL, Channel::C1);
        assert_eq!(<gpio::P2_5<Alternate<1>> as PwmPin>::CHANNEL, Channel::C6);
        assert_eq!(Channel::C4.enable_bit(), 1 << 12);
    }
}
