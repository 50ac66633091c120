//! Hardware Abstraction Layer for NXP LPC17xx microcontrollers
//!
//! This crate covers the on-chip peripherals used by the LPC1769 accessory
//! boards:
//!
//! * [Ethernet MAC](crate::ethernet) with DMA descriptor rings, PHY control
//!   and interrupt callbacks
//! * [General Purpose Input / Output](crate::gpio)
//! * [Pulse Width Modulation](crate::pwm)
//! * [Android Open Accessory negotiation](crate::aoa)
//! * [Cyclic Redundancy Check](crate::crc) for the Ethernet hash filter
//! * [SysTick delays](crate::delay)
#![cfg_attr(not(test), no_std)]
#![allow(non_camel_case_types)]

#[macro_use]
mod fmt;

pub use embedded_hal as hal;

pub use nb;
pub use nb::block;

pub mod aoa;
pub mod crc;
pub mod delay;
pub mod ethernet;
pub mod gpio;
pub mod prelude;
pub mod pwm;
pub mod time;

/// Last path segment of a type name, for `Debug` output of type states
fn stripped_type_name<T>() -> &'static str {
    let name = core::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}
