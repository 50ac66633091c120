//! Ethernet link monitor for the LPC1769 accessory board
//!
//! The descriptor rings are placed in AHB SRAM, where they can be accessed
//! by the EMAC DMA. Link changes are logged from the main loop. Received
//! frames are drained from the ENET interrupt after the RX done callback has
//! fired.
//!
//! This demo doesn't use smoltcp.
#![deny(warnings)]
#![no_main]
#![no_std]

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m::interrupt::{InterruptNumber, Mutex};
use cortex_m::peripheral::NVIC;
use cortex_m_rt::{entry, exception};

#[allow(unused)]
mod utilities;

use log::{info, warn};

use lpc17xx_hal::delay::Delay;
use lpc17xx_hal::ethernet::{self, Interrupt, Interrupts, LinkState, RxError};
use lpc17xx_hal::gpio::{GpioExt, GPIO};
use lpc17xx_hal::prelude::*;

/// Locally administered MAC address
const MAC_ADDRESS: [u8; 6] = [0x02, 0x00, 0x11, 0x22, 0x33, 0x44];

/// Core clock after the boot ROM PLL setup
const CORE_CLOCK_MHZ: u32 = 100;

type Eth = ethernet::Emac<'static, ethernet::EmacBlock, Delay>;

/// Ethernet descriptor rings are a global singleton
#[link_section = ".ahb_sram"]
static mut DES_RING: ethernet::DesRing<4, 4> = ethernet::DesRing::new();

static ETH: Mutex<RefCell<Option<Eth>>> = Mutex::new(RefCell::new(None));

/// Set by the RX done callback
static RX_PENDING: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy)]
struct Enet;

// NOTE(unsafe) ENET is interrupt 28 on all LPC17xx parts
unsafe impl InterruptNumber for Enet {
    fn number(self) -> u16 {
        28
    }
}

fn on_rx_done() {
    RX_PENDING.store(true, Ordering::Relaxed);
}

#[entry]
fn main() -> ! {
    utilities::logger::init();
    let cp = cortex_m::Peripherals::take().unwrap();
    let gpio = GPIO::take().unwrap().split();

    // Status LED, active low
    let mut link_led = gpio.p0_22.into_push_pull_output();
    link_led.set_high();

    let pins = (
        gpio.p1_15.into_alternate::<1>(),
        gpio.p1_17.into_alternate::<1>(),
        gpio.p1_16.into_alternate::<1>(),
        gpio.p1_8.into_alternate::<1>(),
        gpio.p1_9.into_alternate::<1>(),
        gpio.p1_10.into_alternate::<1>(),
        gpio.p1_14.into_alternate::<1>(),
        gpio.p1_4.into_alternate::<1>(),
        gpio.p1_0.into_alternate::<1>(),
        gpio.p1_1.into_alternate::<1>(),
    );

    let delay = cp.SYST.delay(CORE_CLOCK_MHZ.mhz().into());
    let config = ethernet::EmacConfig::new()
        .mac_address(MAC_ADDRESS)
        .core_clock(CORE_CLOCK_MHZ.mhz().into());

    // NOTE(unsafe) the rings are only borrowed here, once
    let ring = unsafe { &mut *core::ptr::addr_of_mut!(DES_RING) };
    let mut eth =
        ethernet::Emac::new(ethernet::EmacBlock::new(pins), delay, ring);

    match eth.init(&config) {
        Ok(link) => info!("EMAC up, PHY {:?}, link {:?}", eth.phy_id(), link),
        Err(e) => {
            warn!("EMAC init failed: {} ({:?})", e, eth.state());
            loop {
                cortex_m::asm::wfi();
            }
        }
    }

    eth.setup_callback(Interrupt::RxDone, Some(on_rx_done));
    eth.enable_interrupts(Interrupts::RX_DONE, true);
    cortex_m::interrupt::free(|cs| *ETH.borrow(cs).borrow_mut() = Some(eth));

    // NOTE(unsafe) the handler only touches ETH inside critical sections
    unsafe { NVIC::unmask(Enet) };

    // ----------------------------------------------------------
    // Main application loop

    let mut link = LinkState::Down;
    loop {
        let last = link;
        link = cortex_m::interrupt::free(|cs| {
            ETH.borrow(cs)
                .borrow_mut()
                .as_mut()
                .and_then(|eth| eth.update_status().ok())
                .unwrap_or(LinkState::Down)
        });

        match link {
            LinkState::Up { .. } => link_led.set_low(),
            LinkState::Down => link_led.set_high(),
        }
        if link != last {
            // Interface state change
            info!("Ethernet {:?}", link);
        }

        cortex_m::asm::delay(CORE_CLOCK_MHZ * 100_000);
    }
}

fn enet_interrupt() {
    cortex_m::interrupt::free(|cs| {
        let mut eth = ETH.borrow(cs).borrow_mut();
        let Some(eth) = eth.as_mut() else {
            return;
        };

        eth.interrupt_handler();
        if !RX_PENDING.swap(false, Ordering::Relaxed) {
            return;
        }

        let mut frame = [0u8; ethernet::MAX_FRAME_LEN];
        loop {
            match eth.recv(&mut frame) {
                Ok(len) => {
                    info!("RX {} bytes from {:02x?}", len, &frame[6..12])
                }
                Err(RxError::WouldBlock) => break,
                Err(e) => warn!("RX {}", e),
            }
        }
    });
}

#[exception]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    if irqn == Enet.number() as i16 {
        enet_interrupt();
    } else {
        panic!("Unhandled exception (IRQn = {})", irqn);
    }
}
