//! General Purpose Input / Output
//!
//! The LPC17xx has five GPIO ports of up to 32 pins. Each pin is routed by
//! the pin connect block (PINCON) to either GPIO or one of three alternate
//! functions, and has its own resistor and open drain configuration.
//!
//! To get access to the pins, take the [`GPIO`] token and split it:
//!
//! ```no_run
//! use lpc17xx_hal::gpio::{GpioExt, GPIO};
//!
//! let gpio = GPIO::take().unwrap().split();
//! let mut led = gpio.p0_22.into_push_pull_output();
//! led.set_high();
//! ```
//!
//! ## Modes
//!
//! Each GPIO pin can be set to various modes:
//!
//! - **Alternate**: Pin driven by another peripheral (functions 1 to 3)
//! - Input
//!     - **PullUp**: Input with the internal pull up. This is the reset state
//!     - **PullDown**: Input with the internal pull down
//!     - **Floating**: Input with neither resistor enabled
//! - Output
//!     - **PushPull**: Output which either drives the pin high or low
//!     - **OpenDrain**: Output which only drives low. It can be read back as
//!     an input
//!
//! Change modes with the `into_<mode>` functions, which consume the pin and
//! return it in the new mode.
//!
//! ## Polarity
//!
//! Board LEDs and relays are often wired active low. [`Switch`] wraps an
//! output pin and maps `on`/`off` to the right level.

use core::convert::Infallible;
use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::v2::{
    InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin,
};
use volatile_register::RW;

pub use embedded_hal::digital::v2::PinState;

/// Base address of the fast GPIO block of port 0
const FIO_BASE: usize = 0x2009_C000;

/// Distance between the fast GPIO blocks of consecutive ports
const FIO_PORT_STRIDE: usize = 0x20;

/// Base address of the pin connect block
const PINCON_BASE: usize = 0x4002_C000;

/// Fast GPIO registers of one port
#[repr(C)]
pub(crate) struct Fio {
    /// Direction, 1 is output
    dir: RW<u32>,
    _reserved: [u32; 3],
    /// Pins masked off from FIOPIN, FIOSET and FIOCLR accesses, left at zero
    #[allow(dead_code)]
    mask: RW<u32>,
    /// Pin levels
    pin: RW<u32>,
    /// Write 1 to drive high
    set: RW<u32>,
    /// Write 1 to drive low
    clr: RW<u32>,
}

impl Fio {
    fn port(port: u8) -> &'static Fio {
        let addr = FIO_BASE + FIO_PORT_STRIDE * port as usize;
        // NOTE(unsafe) fixed, aligned MMIO address
        unsafe { &*(addr as *const Fio) }
    }

    fn set_output(&self, pin: u8, output: bool) {
        // NOTE(unsafe) read-modify-write, callers serialise
        unsafe {
            self.dir.modify(|w| {
                if output {
                    w | (1 << pin)
                } else {
                    w & !(1 << pin)
                }
            })
        }
    }

    fn set_high(&self, pin: u8) {
        // NOTE(unsafe) atomic write to a stateless register
        unsafe { self.set.write(1 << pin) }
    }

    fn set_low(&self, pin: u8) {
        // NOTE(unsafe) atomic write to a stateless register
        unsafe { self.clr.write(1 << pin) }
    }

    fn is_set_low(&self, pin: u8) -> bool {
        // FIOSET reads back the output latch
        self.set.read() & (1 << pin) == 0
    }

    fn is_low(&self, pin: u8) -> bool {
        self.pin.read() & (1 << pin) == 0
    }
}

/// Pin connect block
#[repr(C)]
pub(crate) struct PinConnect {
    /// Function select, two bits per pin
    pinsel: [RW<u32>; 16],
    /// Resistor mode, two bits per pin
    pinmode: [RW<u32>; 10],
    /// Open drain, one bit per pin
    pinmode_od: [RW<u32>; 5],
}

/// Register index and bit shift of a pin in PINSEL and PINMODE, which hold
/// sixteen pins per register.
pub const fn pinsel_slot(port: u8, pin: u8) -> (usize, u32) {
    let index = port as usize * 2 + pin as usize / 16;
    let shift = (pin as u32 % 16) * 2;
    (index, shift)
}

impl PinConnect {
    fn get() -> &'static PinConnect {
        // NOTE(unsafe) fixed, aligned MMIO address
        unsafe { &*(PINCON_BASE as *const PinConnect) }
    }

    fn set_function(&self, port: u8, pin: u8, function: u8) {
        let (index, shift) = pinsel_slot(port, pin);
        // NOTE(unsafe) read-modify-write, callers serialise
        unsafe {
            self.pinsel[index].modify(|w| {
                (w & !(0b11 << shift)) | (u32::from(function & 0b11) << shift)
            })
        }
    }

    fn set_resistor(&self, port: u8, pin: u8, pull: Pull) {
        let (index, shift) = pinsel_slot(port, pin);
        // NOTE(unsafe) read-modify-write, callers serialise
        unsafe {
            self.pinmode[index]
                .modify(|w| (w & !(0b11 << shift)) | ((pull as u32) << shift))
        }
    }

    fn set_open_drain(&self, port: u8, pin: u8, on: bool) {
        // NOTE(unsafe) read-modify-write, callers serialise
        unsafe {
            self.pinmode_od[port as usize].modify(|w| {
                if on {
                    w | (1 << pin)
                } else {
                    w & !(1 << pin)
                }
            })
        }
    }
}

/// Pin resistor mode, as encoded in PINMODE
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Pull {
    Up = 0,
    /// Keeps the last driven level
    Repeater = 1,
    None = 2,
    Down = 3,
}

/// Extension trait to split the GPIO block into independent pins
pub trait GpioExt {
    /// The parts to split the GPIO into
    type Parts;

    /// Splits the GPIO block into Zero-Sized Types (ZSTs) representing
    /// individual pins. These are public members of the return type.
    fn split(self) -> Self::Parts;
}

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Ownership of all GPIO ports and the pin connect block
pub struct GPIO {
    _private: (),
}

impl GPIO {
    /// Returns the GPIO token the first time it is called, `None` after.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(GPIO { _private: () })
        }
    }

    /// Unchecked version of [`take`](Self::take).
    ///
    /// # Safety
    ///
    /// Pins obtained from more than one token alias each other.
    pub unsafe fn steal() -> Self {
        GPIO { _private: () }
    }
}

impl GpioExt for GPIO {
    type Parts = Parts;

    fn split(self) -> Parts {
        Parts::new()
    }
}

pub trait PinExt {
    type Mode;
    /// Return pin number
    fn pin_id(&self) -> u8;
    /// Return port number
    fn port_id(&self) -> u8;
}

/// Some alternate mode (type state)
pub struct Alternate<const F: u8, Otype = PushPull>(PhantomData<Otype>);

/// Input mode (type state)
pub struct Input<MODE = PullUp> {
    _mode: PhantomData<MODE>,
}

/// Floating input (type state)
pub struct Floating;

/// Pulled down input (type state)
pub struct PullDown;

/// Pulled up input (type state)
pub struct PullUp;

/// Open drain input or output (type state)
pub struct OpenDrain;

/// Output mode (type state)
pub struct Output<MODE = PushPull> {
    _mode: PhantomData<MODE>,
}

/// Push pull output (type state)
pub struct PushPull;

/// Generic pin type
///
/// - `MODE` is one of the pin modes (see [Modes](crate::gpio#modes) section).
/// - `P` is the port number, from `0` to `4`.
/// - `N` is pin number: from `0` to `31`.
pub struct Pin<const P: u8, const N: u8, MODE = Input<PullUp>> {
    _mode: PhantomData<MODE>,
}

impl<const P: u8, const N: u8, MODE> Pin<P, N, MODE> {
    const fn new() -> Self {
        Self { _mode: PhantomData }
    }
}

impl<const P: u8, const N: u8, MODE> fmt::Debug for Pin<P, N, MODE> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_fmt(format_args!(
            "P{}.{}<{}>",
            P,
            N,
            crate::stripped_type_name::<MODE>()
        ))
    }
}

#[cfg(feature = "defmt")]
impl<const P: u8, const N: u8, MODE> defmt::Format for Pin<P, N, MODE> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "P{}.{}<{}>",
            P,
            N,
            crate::stripped_type_name::<MODE>()
        );
    }
}

impl<const P: u8, const N: u8, MODE> PinExt for Pin<P, N, MODE> {
    type Mode = MODE;

    #[inline(always)]
    fn pin_id(&self) -> u8 {
        N
    }
    #[inline(always)]
    fn port_id(&self) -> u8 {
        P
    }
}

/// Mode changes
impl<const P: u8, const N: u8, MODE> Pin<P, N, MODE> {
    fn configure(
        function: u8,
        pull: Option<Pull>,
        open_drain: bool,
        output: bool,
    ) {
        cortex_m::interrupt::free(|_| {
            let pincon = PinConnect::get();
            pincon.set_function(P, N, function);
            if let Some(pull) = pull {
                pincon.set_resistor(P, N, pull);
            }
            pincon.set_open_drain(P, N, open_drain);
            Fio::port(P).set_output(N, output);
        });
    }

    /// Configures the pin to operate as a floating input pin
    pub fn into_floating_input(self) -> Pin<P, N, Input<Floating>> {
        Self::configure(0, Some(Pull::None), false, false);
        Pin::new()
    }

    /// Configures the pin to operate as a pulled down input pin
    pub fn into_pull_down_input(self) -> Pin<P, N, Input<PullDown>> {
        Self::configure(0, Some(Pull::Down), false, false);
        Pin::new()
    }

    /// Configures the pin to operate as a pulled up input pin
    pub fn into_pull_up_input(self) -> Pin<P, N, Input<PullUp>> {
        Self::configure(0, Some(Pull::Up), false, false);
        Pin::new()
    }

    /// Configures the pin to operate as an open drain output pin.
    /// Initial state will be low.
    pub fn into_open_drain_output(self) -> Pin<P, N, Output<OpenDrain>> {
        self.into_open_drain_output_in_state(PinState::Low)
    }

    /// Configures the pin to operate as an open drain output pin.
    /// `initial_state` specifies whether the pin should be initially high or
    /// low.
    pub fn into_open_drain_output_in_state(
        self,
        initial_state: PinState,
    ) -> Pin<P, N, Output<OpenDrain>> {
        Self::set_state_raw(initial_state);
        Self::configure(0, Some(Pull::None), true, true);
        Pin::new()
    }

    /// Configures the pin to operate as a push pull output pin.
    /// Initial state will be low.
    pub fn into_push_pull_output(self) -> Pin<P, N, Output<PushPull>> {
        self.into_push_pull_output_in_state(PinState::Low)
    }

    /// Configures the pin to operate as a push pull output pin.
    /// `initial_state` specifies whether the pin should be initially high or
    /// low.
    pub fn into_push_pull_output_in_state(
        self,
        initial_state: PinState,
    ) -> Pin<P, N, Output<PushPull>> {
        Self::set_state_raw(initial_state);
        Self::configure(0, None, false, true);
        Pin::new()
    }

    /// Routes the pin to alternate function `F` (1 to 3, masked to two
    /// bits). The resistor setting is kept.
    pub fn into_alternate<const F: u8>(
        self,
    ) -> Pin<P, N, Alternate<F, PushPull>> {
        Self::configure(F, None, false, false);
        Pin::new()
    }

    /// Set the output latch regardless of the mode, so that a pin becomes
    /// an output at the right level
    fn set_state_raw(state: PinState) {
        match state {
            PinState::High => Fio::port(P).set_high(N),
            PinState::Low => Fio::port(P).set_low(N),
        }
    }
}

impl<const P: u8, const N: u8, MODE> Pin<P, N, Output<MODE>> {
    /// Selects the resistor that stays active while the pin drives
    pub fn set_resistor(self, pull: Pull) -> Self {
        cortex_m::interrupt::free(|_| {
            PinConnect::get().set_resistor(P, N, pull)
        });
        self
    }
}

impl<const P: u8, const N: u8, const F: u8> Pin<P, N, Alternate<F, PushPull>> {
    /// Selects the resistor used while the peripheral drives the pin
    pub fn set_resistor(self, pull: Pull) -> Self {
        cortex_m::interrupt::free(|_| {
            PinConnect::get().set_resistor(P, N, pull)
        });
        self
    }

    /// Turns pin alternate configuration pin into open drain
    pub fn set_open_drain(self) -> Pin<P, N, Alternate<F, OpenDrain>> {
        cortex_m::interrupt::free(|_| {
            PinConnect::get().set_open_drain(P, N, true)
        });
        Pin::new()
    }
}

impl<const P: u8, const N: u8, MODE> Pin<P, N, Output<MODE>> {
    #[inline(always)]
    pub fn set_high(&mut self) {
        Fio::port(P).set_high(N)
    }

    #[inline(always)]
    pub fn set_low(&mut self) {
        Fio::port(P).set_low(N)
    }

    #[inline(always)]
    pub fn get_state(&self) -> PinState {
        if self.is_set_low() {
            PinState::Low
        } else {
            PinState::High
        }
    }

    #[inline(always)]
    pub fn set_state(&mut self, state: PinState) {
        match state {
            PinState::Low => self.set_low(),
            PinState::High => self.set_high(),
        }
    }

    #[inline(always)]
    pub fn is_set_high(&self) -> bool {
        !self.is_set_low()
    }

    #[inline(always)]
    pub fn is_set_low(&self) -> bool {
        Fio::port(P).is_set_low(N)
    }

    #[inline(always)]
    pub fn toggle(&mut self) {
        if self.is_set_low() {
            self.set_high()
        } else {
            self.set_low()
        }
    }
}

impl<const P: u8, const N: u8> Pin<P, N, Output<OpenDrain>> {
    #[inline(always)]
    pub fn is_high(&self) -> bool {
        !self.is_low()
    }

    #[inline(always)]
    pub fn is_low(&self) -> bool {
        Fio::port(P).is_low(N)
    }
}

impl<const P: u8, const N: u8, MODE> Pin<P, N, Input<MODE>> {
    #[inline(always)]
    pub fn is_high(&self) -> bool {
        !self.is_low()
    }

    #[inline(always)]
    pub fn is_low(&self) -> bool {
        Fio::port(P).is_low(N)
    }
}

impl<const P: u8, const N: u8, MODE> OutputPin for Pin<P, N, Output<MODE>> {
    type Error = Infallible;

    #[inline(always)]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_high();
        Ok(())
    }

    #[inline(always)]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_low();
        Ok(())
    }
}

impl<const P: u8, const N: u8, MODE> StatefulOutputPin
    for Pin<P, N, Output<MODE>>
{
    #[inline(always)]
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(self.is_set_high())
    }

    #[inline(always)]
    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(self.is_set_low())
    }
}

impl<const P: u8, const N: u8, MODE> ToggleableOutputPin
    for Pin<P, N, Output<MODE>>
{
    type Error = Infallible;

    #[inline(always)]
    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.toggle();
        Ok(())
    }
}

impl<const P: u8, const N: u8> InputPin for Pin<P, N, Output<OpenDrain>> {
    type Error = Infallible;

    #[inline(always)]
    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.is_high())
    }

    #[inline(always)]
    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.is_low())
    }
}

impl<const P: u8, const N: u8, MODE> InputPin for Pin<P, N, Input<MODE>> {
    type Error = Infallible;

    #[inline(always)]
    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.is_high())
    }

    #[inline(always)]
    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.is_low())
    }
}

/// Output level meaning "on"
pub trait Polarity {
    const ACTIVE: PinState;
}

/// On is high (type state)
pub struct ActiveHigh;

/// On is low (type state)
pub struct ActiveLow;

impl Polarity for ActiveHigh {
    const ACTIVE: PinState = PinState::High;
}

impl Polarity for ActiveLow {
    const ACTIVE: PinState = PinState::Low;
}

/// An output switched on and off with a fixed polarity
pub struct Switch<PIN, POL> {
    pin: PIN,
    _polarity: PhantomData<POL>,
}

impl<PIN, POL> Switch<PIN, POL>
where
    PIN: OutputPin,
    POL: Polarity,
{
    pub fn new(pin: PIN) -> Self {
        Switch {
            pin,
            _polarity: PhantomData,
        }
    }

    pub fn on(&mut self) -> Result<(), PIN::Error> {
        self.pin.set_state(POL::ACTIVE)
    }

    pub fn off(&mut self) -> Result<(), PIN::Error> {
        self.pin.set_state(!POL::ACTIVE)
    }

    pub fn set(&mut self, on: bool) -> Result<(), PIN::Error> {
        if on {
            self.on()
        } else {
            self.off()
        }
    }

    /// Releases the pin
    pub fn free(self) -> PIN {
        self.pin
    }
}

impl<PIN, POL> Switch<PIN, POL>
where
    PIN: StatefulOutputPin,
    POL: Polarity,
{
    pub fn is_on(&self) -> Result<bool, PIN::Error> {
        match POL::ACTIVE {
            PinState::High => self.pin.is_set_high(),
            PinState::Low => self.pin.is_set_low(),
        }
    }
}

macro_rules! gpio {
    ($($port:literal: [$($pin:literal),+ $(,)?],)+) => {
        paste::paste! {
            /// GPIO parts
            pub struct Parts {
                $($(
                    /// Pin
                    pub [<p $port _ $pin>]: [<P $port _ $pin>],
                )+)+
            }

            impl Parts {
                const fn new() -> Self {
                    Parts {
                        $($(
                            [<p $port _ $pin>]: Pin::new(),
                        )+)+
                    }
                }
            }

            $($(
                #[doc = concat!("Pin P", $port, ".", $pin)]
                pub type [<P $port _ $pin>]<MODE = Input<PullUp>> =
                    Pin<$port, $pin, MODE>;
            )+)+
        }
    };
}

// Pins bonded out on the LPC1769 (LQFP100)
gpio!(
    0: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 15, 16, 17, 18, 19, 20, 21,
        22, 23, 24, 25, 26, 27, 28, 29, 30],
    1: [0, 1, 4, 8, 9, 10, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
        26, 27, 28, 29, 30, 31],
    2: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13],
    3: [25, 26],
    4: [28, 29],
);

#[cfg(test)]
mod tests {
    use super::*;

    /// Memory standing in for a register block
    fn with_block<T, const W: usize>(words: &mut [u32; W], f: impl FnOnce(&T)) {
        assert!(core::mem::size_of::<T>() <= W * 4);
        // NOTE(unsafe) the block is made of `u32` sized volatile cells
        let block = unsafe { &*(words.as_mut_ptr() as *const T) };
        f(block)
    }

    #[test]
    fn register_layout() {
        assert_eq!(core::mem::size_of::<Fio>(), FIO_PORT_STRIDE);
        assert_eq!(core::mem::size_of::<PinConnect>(), 0x7C);
    }

    #[test]
    fn pinsel_slots() {
        assert_eq!(pinsel_slot(0, 0), (0, 0));
        assert_eq!(pinsel_slot(0, 15), (0, 30));
        assert_eq!(pinsel_slot(0, 16), (1, 0));
        assert_eq!(pinsel_slot(1, 17), (3, 2));
        // PWM1.4 on P2.3
        assert_eq!(pinsel_slot(2, 3), (4, 6));
        assert_eq!(pinsel_slot(4, 29), (9, 26));
    }

    #[test]
    fn pin_connect_fields() {
        let mut words = [0u32; 31];
        with_block(&mut words, |pincon: &PinConnect| {
            pincon.set_function(2, 3, 1);
            pincon.set_function(1, 17, 3);
            pincon.set_function(1, 17, 1);
            pincon.set_resistor(0, 22, Pull::Down);
            pincon.set_resistor(0, 22, Pull::None);
            pincon.set_open_drain(4, 28, true);
            pincon.set_open_drain(4, 29, true);
            pincon.set_open_drain(4, 28, false);
        });

        assert_eq!(words[4], 1 << 6);
        assert_eq!(words[3], 1 << 2);
        // PINMODE1 holds P0.16 to P0.31
        assert_eq!(words[16 + 1], 2 << 12);
        assert_eq!(words[16 + 10 + 4], 1 << 29);
    }

    #[test]
    fn fio_direction_and_levels() {
        let mut words = [0u32; 8];
        with_block(&mut words, |fio: &Fio| {
            fio.set_output(22, true);
            fio.set_output(3, true);
            fio.set_output(3, false);
            fio.set_high(22);
            assert!(!fio.is_set_low(22));
            assert!(fio.is_low(22));
        });
        assert_eq!(words[0], 1 << 22);
        assert_eq!(words[6], 1 << 22);
    }

    #[test]
    fn debug_names_port_pin_and_mode() {
        let pin: P0_22<Output<PushPull>> = Pin::new();
        assert_eq!(format!("{:?}", pin), "P0.22<Output>");
        let pin: P2_3<Alternate<1>> = Pin::new();
        assert_eq!(format!("{:?}", pin), "P2.3<Alternate>");
    }

    #[derive(Default)]
    struct Latch {
        high: bool,
    }

    impl OutputPin for Latch {
        type Error = Infallible;
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            Ok(())
        }
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            Ok(())
        }
    }

    impl StatefulOutputPin for Latch {
        fn is_set_high(&self) -> Result<bool, Infallible> {
            Ok(self.high)
        }
        fn is_set_low(&self) -> Result<bool, Infallible> {
            Ok(!self.high)
        }
    }

    #[test]
    fn switch_polarity() {
        let mut led: Switch<_, ActiveLow> = Switch::new(Latch::default());
        led.on().unwrap();
        assert!(led.is_on().unwrap());
        assert!(!led.free().high);

        let mut relay: Switch<_, ActiveHigh> = Switch::new(Latch::default());
        relay.set(true).unwrap();
        assert!(relay.is_on().unwrap());
        relay.off().unwrap();
        assert!(!relay.free().high);
    }
}
