//! Ethernet PHY control
//!
//! IEEE 802.3 clause 22 registers shared by all supported PHYs, the link
//! modes the driver can configure, and drivers for the PHYs found on LPC17xx
//! boards:
//! - TI/National DP83848C
//! - SMSC LAN8720
//!
//! Register access goes through
//! [`StationManagement`](super::StationManagement), which the
//! [`Emac`](super::Emac) implements over its MII management interface.

use core::fmt;

use super::Error;

mod dp83848c;
mod lan8720;

pub use dp83848c::DP83848C;
pub use lan8720::LAN8720;

/// Basic mode control register
pub const PHY_REG_BMCR: u8 = 0x00;
/// Basic mode status register
pub const PHY_REG_BMSR: u8 = 0x01;
/// PHY identifier 1
pub const PHY_REG_IDR1: u8 = 0x02;
/// PHY identifier 2
pub const PHY_REG_IDR2: u8 = 0x03;
/// Auto-negotiation advertisement
pub const PHY_REG_ANAR: u8 = 0x04;
/// Auto-negotiation link partner ability
pub const PHY_REG_ANLPAR: u8 = 0x05;
/// Auto-negotiation expansion
pub const PHY_REG_ANER: u8 = 0x06;

/// BMCR bits
#[allow(dead_code)]
pub mod bmcr {
    pub const RESET: u16 = 1 << 15;
    pub const LOOPBACK: u16 = 1 << 14;
    pub const SPEED_100: u16 = 1 << 13;
    pub const AN: u16 = 1 << 12;
    pub const POWER_DOWN: u16 = 1 << 11;
    pub const ISOLATE: u16 = 1 << 10;
    pub const RESTART_AN: u16 = 1 << 9;
    pub const FULL_DUPLEX: u16 = 1 << 8;
    pub const COLLISION_TEST: u16 = 1 << 7;
}

/// BMSR bits
#[allow(dead_code)]
pub mod bmsr {
    pub const CAP_100BASE_T4: u16 = 1 << 15;
    pub const CAP_100TX_FULL: u16 = 1 << 14;
    pub const CAP_100TX_HALF: u16 = 1 << 13;
    pub const CAP_10_FULL: u16 = 1 << 12;
    pub const CAP_10_HALF: u16 = 1 << 11;
    pub const MF_PREAMBLE_SUPPRESS: u16 = 1 << 6;
    pub const AUTO_DONE: u16 = 1 << 5;
    pub const REMOTE_FAULT: u16 = 1 << 4;
    pub const AUTO_ABILITY: u16 = 1 << 3;
    pub const LINK: u16 = 1 << 2;
    pub const JABBER: u16 = 1 << 1;
    pub const EXTENDED: u16 = 1 << 0;

    /// Any of these means the link runs at 100 Mbit/s
    pub const SPEED_100: u16 = CAP_100BASE_T4 | CAP_100TX_FULL | CAP_100TX_HALF;
    /// Any of these means the link runs full duplex
    pub const FULL_DUPLEX: u16 = CAP_100TX_FULL | CAP_10_FULL;
}

/// PHY parts the driver knows how to run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhyId {
    /// TI/National DP83848C
    Dp83848c,
    /// SMSC LAN8720
    Lan8720,
}

impl PhyId {
    /// Mask applied to the combined identifier registers, dropping the
    /// revision number
    pub const MASK: u32 = 0xFFFF_FFF0;

    /// Identifier as read from IDR1:IDR2 with the revision masked off
    pub const fn oui_model(self) -> u32 {
        match self {
            PhyId::Dp83848c => 0x2000_5C90,
            PhyId::Lan8720 => 0x0007_C0F0,
        }
    }

    /// Combines the two identifier registers into a masked identifier.
    pub const fn combine(idr1: u16, idr2: u16) -> u32 {
        ((idr1 as u32) << 16 | idr2 as u32) & Self::MASK
    }

    /// Looks up a masked identifier.
    pub fn from_id(id: u32) -> Result<Self, Error> {
        [PhyId::Dp83848c, PhyId::Lan8720]
            .iter()
            .copied()
            .find(|phy| phy.oui_model() == id & Self::MASK)
            .ok_or(Error::UnsupportedPhy(id))
    }
}

impl fmt::Display for PhyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhyId::Dp83848c => f.write_str("DP83848C"),
            PhyId::Lan8720 => f.write_str("LAN8720"),
        }
    }
}

/// Link speed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// 10 Mbit/s
    Mbps10,
    /// 100 Mbit/s
    Mbps100,
}

/// Link duplex
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Duplex {
    Half,
    Full,
}

/// Outcome of waiting for the PHY to report a link
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// No link within the retry budget. The MAC keeps running with its
    /// previous speed and duplex settings.
    Down,
    /// Link established and the MAC configured to match
    Up { speed: Speed, duplex: Duplex },
}

impl LinkState {
    pub fn is_up(&self) -> bool {
        matches!(self, LinkState::Up { .. })
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Down => f.write_str("link down"),
            LinkState::Up { speed, duplex } => {
                let mbps = match speed {
                    Speed::Mbps10 => 10,
                    Speed::Mbps100 => 100,
                };
                let duplex = match duplex {
                    Duplex::Half => "half",
                    Duplex::Full => "full",
                };
                write!(f, "link up, {} Mbit/s {} duplex", mbps, duplex)
            }
        }
    }
}

/// Link mode programmed into the PHY
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhyMode {
    /// Auto-negotiation
    Auto,
    /// Forced 10 Mbit/s full duplex
    FullDuplex10M,
    /// Forced 10 Mbit/s half duplex
    HalfDuplex10M,
    /// Forced 100 Mbit/s full duplex
    FullDuplex100M,
    /// Forced 100 Mbit/s half duplex
    HalfDuplex100M,
}

impl PhyMode {
    /// BMCR value selecting this mode
    pub const fn bmcr(self) -> u16 {
        match self {
            PhyMode::Auto => bmcr::SPEED_100 | bmcr::AN,
            PhyMode::FullDuplex10M => bmcr::FULL_DUPLEX,
            PhyMode::HalfDuplex10M => 0,
            PhyMode::FullDuplex100M => bmcr::SPEED_100 | bmcr::FULL_DUPLEX,
            PhyMode::HalfDuplex100M => bmcr::SPEED_100,
        }
    }
}

impl Default for PhyMode {
    fn default() -> Self {
        PhyMode::Auto
    }
}

/// Raw mode numbers as stored in board configuration
impl TryFrom<u8> for PhyMode {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Error> {
        match raw {
            0 => Ok(PhyMode::Auto),
            1 => Ok(PhyMode::FullDuplex10M),
            2 => Ok(PhyMode::HalfDuplex10M),
            3 => Ok(PhyMode::FullDuplex100M),
            4 => Ok(PhyMode::HalfDuplex100M),
            _ => Err(Error::UnsupportedMode(raw)),
        }
    }
}

/// Which part of the basic status to interpret
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhyStatus {
    /// Link established
    Link,
    /// Running at 100 Mbit/s
    Speed,
    /// Running full duplex
    FullDuplex,
}

impl PhyStatus {
    /// Interprets one BMSR reading.
    pub const fn decode(self, bmsr: u16) -> bool {
        match self {
            PhyStatus::Link => bmsr & bmsr::LINK != 0,
            PhyStatus::Speed => bmsr & bmsr::SPEED_100 != 0,
            PhyStatus::FullDuplex => bmsr & bmsr::FULL_DUPLEX != 0,
        }
    }
}

impl TryFrom<u8> for PhyStatus {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Error> {
        match raw {
            0 => Ok(PhyStatus::Link),
            1 => Ok(PhyStatus::Speed),
            2 => Ok(PhyStatus::FullDuplex),
            _ => Err(Error::UnsupportedStatusKind(raw)),
        }
    }
}
