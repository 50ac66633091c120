//! Ethernet MAC (EMAC) driver for the LPC17xx
//!
//! The EMAC moves frames through two DMA descriptor rings in AHB SRAM and
//! talks to an external RMII PHY over its MII management interface.
//! [`Emac`] owns the register block, a delay provider for the PHY polling
//! loops, both rings and the interrupt callback table.
//!
//! Supported PHYs:
//! - TI/National DP83848C
//! - SMSC LAN8720
//!
//! When the `smoltcp` feature is enabled, [`Emac`] also implements the
//! [smoltcp][] `phy::Device` interface.
//!
//! [smoltcp]: https://github.com/smoltcp-rs/smoltcp
//!
//! # Examples
//!
//! - [Link checker with interrupt driven receive](../../demos/ethernet_link.rs)

use core::fmt;

use crate::gpio::{self, Alternate};

mod descriptor;
mod emac;
mod filter;
mod interrupt;
pub mod phy;
mod registers;
mod ring;
mod rx;
#[cfg(test)]
mod sim;
#[cfg(feature = "smoltcp")]
mod smoltcp;
mod tx;

pub use descriptor::{Descriptor, RxInfo, RxStatus, TxControl, TxInfo, TxStatus};
pub use emac::{Emac, EmacConfig, State, Timeouts};
pub use filter::{HashSlot, RxFilter, WolStatus};
pub use interrupt::{Callback, CallbackTable, Interrupt, Interrupts};
pub use phy::{Duplex, LinkState, PhyId, PhyMode, PhyStatus, Speed};
pub use registers::{EmacBlock, EmacRegisters, Register};
pub use ring::DesRing;
pub use rx::{RxError, RxPacket, RxRing};
pub use tx::{TxError, TxPacket, TxRing};

/// Largest frame the driver sends or receives, including the FCS
pub const MAX_FRAME_LEN: usize = 1536;

/// Ethernet payload size
pub const MTU: usize = 1500;

/// Errors reported by the EMAC and PHY control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The MII management interface stayed busy
    MiiTimeout,
    /// The PHY did not leave reset or power-down
    PhyResetTimeout,
    /// The PHY identifier is not one of the supported parts
    UnsupportedPhy(u32),
    /// Raw link mode number out of range
    UnsupportedMode(u8),
    /// Raw PHY status selector out of range
    UnsupportedStatusKind(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MiiTimeout => {
                f.write_str("MII management interface timeout")
            }
            Error::PhyResetTimeout => f.write_str("PHY reset timeout"),
            Error::UnsupportedPhy(id) => {
                write!(f, "unsupported PHY {:#010x}", id)
            }
            Error::UnsupportedMode(mode) => {
                write!(f, "unsupported PHY mode {}", mode)
            }
            Error::UnsupportedStatusKind(kind) => {
                write!(f, "unsupported PHY status selector {}", kind)
            }
        }
    }
}

/// Station Management Interface (SMI) on an ethernet PHY
pub trait StationManagement {
    /// Read a register over SMI.
    fn smi_read(&mut self, reg: u8) -> Result<u16, Error>;
    /// Write a register over SMI.
    fn smi_write(&mut self, reg: u8, val: u16) -> Result<(), Error>;
}

impl<T: StationManagement> StationManagement for &mut T {
    fn smi_read(&mut self, reg: u8) -> Result<u16, Error> {
        (**self).smi_read(reg)
    }

    fn smi_write(&mut self, reg: u8, val: u16) -> Result<(), Error> {
        (**self).smi_write(reg, val)
    }
}

/// Traits for an Ethernet PHY
pub trait PHY {
    /// Reset PHY and wait for it to come out of reset.
    fn phy_reset(&mut self) -> Result<(), Error>;
    /// PHY initialisation.
    fn phy_init(&mut self) -> Result<(), Error>;
}

/// Marks a set of pins used to communicate to a PHY with a Reduced Media
/// Independent Interface (RMII)
pub trait PinsRMII {}

impl<REF_CLK, MDIO, MDC, CRS_DV, RXD0, RXD1, RX_ER, TX_EN, TXD0, TXD1> PinsRMII
    for (REF_CLK, MDIO, MDC, CRS_DV, RXD0, RXD1, RX_ER, TX_EN, TXD0, TXD1)
where
    REF_CLK: RefClk,
    MDIO: Mdio,
    MDC: Mdc,
    CRS_DV: CrsDv,
    RXD0: Rxd0,
    RXD1: Rxd1,
    RX_ER: RxEr,
    TX_EN: TxEn,
    TXD0: Txd0,
    TXD1: Txd1,
{
}

/// Marks a type as a REF_CLK pin
pub trait RefClk {}
/// Marks a type as a MDIO pin
pub trait Mdio {}
/// Marks a type as a MDC pin
pub trait Mdc {}
/// Marks a type as a CRS_DV pin
pub trait CrsDv {}
/// Marks a type as a RX_ER pin
pub trait RxEr {}
/// Marks a type as a TX_EN pin
pub trait TxEn {}
/// Marks a type as a RXD0 pin
pub trait Rxd0 {}
/// Marks a type as a RXD1 pin
pub trait Rxd1 {}
/// Marks a type as a TXD0 pin
pub trait Txd0 {}
/// Marks a type as a TXD1 pin
pub trait Txd1 {}

macro_rules! impl_rmii_pin {
    ($TRAIT:ident, [$($PIN:ty),*]) => {
        $(
            impl $TRAIT for $PIN {}
        )*
    };
}

impl_rmii_pin!(Txd0, [gpio::P1_0<Alternate<1>>]);
impl_rmii_pin!(Txd1, [gpio::P1_1<Alternate<1>>]);
impl_rmii_pin!(TxEn, [gpio::P1_4<Alternate<1>>]);
impl_rmii_pin!(CrsDv, [gpio::P1_8<Alternate<1>>]);
impl_rmii_pin!(Rxd0, [gpio::P1_9<Alternate<1>>]);
impl_rmii_pin!(Rxd1, [gpio::P1_10<Alternate<1>>]);
impl_rmii_pin!(RxEr, [gpio::P1_14<Alternate<1>>]);
impl_rmii_pin!(RefClk, [gpio::P1_15<Alternate<1>>]);
impl_rmii_pin!(Mdc, [gpio::P1_16<Alternate<1>>, gpio::P2_8<Alternate<3>>]);
impl_rmii_pin!(Mdio, [gpio::P1_17<Alternate<1>>, gpio::P2_9<Alternate<3>>]);
