//! RGB LED fade for the LPC1769 accessory board
//!
//! PWM1.4 (P2.3) drives the green LED, PWM1.5 (P2.4) blue and PWM1.6 (P2.5)
//! red. The LEDs are active low: a duty of 1000 is off, 0 is fully on.
#![deny(warnings)]
#![no_main]
#![no_std]

use panic_halt as _;

use cortex_m_rt::entry;
use lpc17xx_hal::gpio::{GpioExt, GPIO};
use lpc17xx_hal::prelude::*;
use lpc17xx_hal::pwm::Pwm1;

/// PWM period in counter ticks
const PERIOD: u32 = 1000;

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    let gpio = GPIO::take().unwrap().split();

    // 1 ms steps from SysTick
    let mut delay = cp.SYST.delay(100.mhz().into());

    let green = gpio.p2_3.into_alternate::<1>();
    let blue = gpio.p2_4.into_alternate::<1>();
    let red = gpio.p2_5.into_alternate::<1>();

    let mut pwm = Pwm1::take(PERIOD).unwrap();
    let channels = [
        pwm.channel_for(&green),
        pwm.channel_for(&blue),
        pwm.channel_for(&red),
    ];
    for channel in channels {
        pwm.set_duty(channel, PERIOD);
        pwm.enable(channel);
    }

    loop {
        // Slowly fade each colour from off to on
        for channel in channels {
            for duty in (2..=PERIOD).rev() {
                pwm.set_duty(channel, duty);
                delay.delay_ms(1_u32);
            }
        }

        // and back off again
        for channel in channels {
            for duty in 0..PERIOD {
                pwm.set_duty(channel, duty);
                delay.delay_ms(1_u32);
            }
        }
    }
}
