//! SMSC LAN8720 Ethernet PHY

use super::{bmcr, bmsr, Duplex, LinkState, Speed};
use super::{PHY_REG_BMCR, PHY_REG_BMSR};
use crate::ethernet::{Error, StationManagement, PHY};

#[allow(dead_code)]
mod phy_consts {
    pub const PHY_REG_MCSR: u8 = 0x11; // Mode Control/Status
    pub const PHY_REG_SMR: u8 = 0x12; // Special Modes
    pub const PHY_REG_ISR: u8 = 0x1D; // Interrupt Source
    pub const PHY_REG_IMR: u8 = 0x1E; // Interrupt Mask
    pub const PHY_REG_SSR: u8 = 0x1F; // Special Status Register

    pub const PHY_REG_MCSR_ENERGYON: u16 = 1 << 1;

    pub const PHY_REG_SSR_ANDONE: u16 = 1 << 12;
    pub const PHY_REG_SSR_SPEED: u16 = 0b111 << 2;
    pub const PHY_REG_SSR_10BASE_HD: u16 = 0b001 << 2;
    pub const PHY_REG_SSR_10BASE_FD: u16 = 0b101 << 2;
    pub const PHY_REG_SSR_100BASE_HD: u16 = 0b010 << 2;
    pub const PHY_REG_SSR_100BASE_FD: u16 = 0b110 << 2;

    pub const RESET_POLLS: u32 = 0x1_0000;
}
use self::phy_consts::*;

/// SMSC LAN8720 Ethernet PHY
pub struct LAN8720<MAC: StationManagement> {
    mac: MAC,
}

impl<MAC: StationManagement> PHY for LAN8720<MAC> {
    /// Reset PHY and wait for it to come out of reset.
    fn phy_reset(&mut self) -> Result<(), Error> {
        self.mac.smi_write(PHY_REG_BMCR, bmcr::RESET)?;
        for _ in 0..RESET_POLLS {
            if self.mac.smi_read(PHY_REG_BMCR)? & bmcr::RESET == 0 {
                return Ok(());
            }
        }
        Err(Error::PhyResetTimeout)
    }

    /// PHY initialisation.
    fn phy_init(&mut self) -> Result<(), Error> {
        // Enable auto-negotiation
        self.mac.smi_write(
            PHY_REG_BMCR,
            bmcr::AN | bmcr::RESTART_AN | bmcr::SPEED_100,
        )
    }
}

/// Public functions for the LAN8720
impl<MAC: StationManagement> LAN8720<MAC> {
    /// Create LAN8720 instance from a MII management interface
    pub fn new(mac: MAC) -> Self {
        LAN8720 { mac }
    }
    /// Returns a reference to the inner management interface
    pub fn inner(&self) -> &MAC {
        &self.mac
    }
    /// Returns a mutable reference to the inner management interface
    pub fn inner_mut(&mut self) -> &mut MAC {
        &mut self.mac
    }
    /// Releases the management interface
    pub fn free(self) -> MAC {
        self.mac
    }

    /// Poll PHY to determine the negotiated link.
    pub fn poll_link(&mut self) -> Result<LinkState, Error> {
        let bsr = self.mac.smi_read(PHY_REG_BMSR)?;
        let ssr = self.mac.smi_read(PHY_REG_SSR)?;

        // No link without autonegotiate
        if bsr & bmsr::AUTO_DONE == 0 {
            return Ok(LinkState::Down);
        }
        // No link if link is down
        if bsr & bmsr::LINK == 0 {
            return Ok(LinkState::Down);
        }
        // No link if autonegotiate incomplete
        if ssr & PHY_REG_SSR_ANDONE == 0 {
            return Ok(LinkState::Down);
        }

        let (speed, duplex) = match ssr & PHY_REG_SSR_SPEED {
            PHY_REG_SSR_10BASE_HD => (Speed::Mbps10, Duplex::Half),
            PHY_REG_SSR_10BASE_FD => (Speed::Mbps10, Duplex::Full),
            PHY_REG_SSR_100BASE_HD => (Speed::Mbps100, Duplex::Half),
            PHY_REG_SSR_100BASE_FD => (Speed::Mbps100, Duplex::Full),
            _ => return Ok(LinkState::Down),
        };
        Ok(LinkState::Up { speed, duplex })
    }

    pub fn link_established(&mut self) -> Result<bool, Error> {
        Ok(self.poll_link()?.is_up())
    }

    /// Energy detected on the line, even without a link
    pub fn energy_on(&mut self) -> Result<bool, Error> {
        Ok(self.mac.smi_read(PHY_REG_MCSR)? & PHY_REG_MCSR_ENERGYON != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockMii {
        regs: [u16; 32],
        stuck: bool,
    }

    impl StationManagement for MockMii {
        fn smi_read(&mut self, reg: u8) -> Result<u16, Error> {
            Ok(self.regs[reg as usize])
        }
        fn smi_write(&mut self, reg: u8, val: u16) -> Result<(), Error> {
            self.regs[reg as usize] =
                if self.stuck { val } else { val & !bmcr::RESET };
            Ok(())
        }
    }

    #[test]
    fn speed_indication_decoding() {
        let mut mii = MockMii {
            regs: [0; 32],
            stuck: false,
        };
        mii.regs[PHY_REG_BMSR as usize] = bmsr::LINK | bmsr::AUTO_DONE;
        mii.regs[PHY_REG_SSR as usize] =
            PHY_REG_SSR_ANDONE | PHY_REG_SSR_100BASE_FD;

        let mut phy = LAN8720::new(mii);
        assert_eq!(
            phy.poll_link(),
            Ok(LinkState::Up {
                speed: Speed::Mbps100,
                duplex: Duplex::Full
            })
        );

        phy.inner_mut().regs[PHY_REG_SSR as usize] =
            PHY_REG_SSR_ANDONE | PHY_REG_SSR_10BASE_FD;
        assert_eq!(
            phy.poll_link(),
            Ok(LinkState::Up {
                speed: Speed::Mbps10,
                duplex: Duplex::Full
            })
        );

        phy.inner_mut().regs[PHY_REG_SSR as usize] = PHY_REG_SSR_10BASE_FD;
        assert_eq!(phy.link_established(), Ok(false));
    }

    #[test]
    fn reset_gives_up_eventually() {
        let mut phy = LAN8720::new(MockMii {
            regs: [0; 32],
            stuck: true,
        });
        assert_eq!(phy.phy_reset(), Err(Error::PhyResetTimeout));

        phy.inner_mut().stuck = false;
        assert_eq!(phy.phy_reset(), Ok(()));
        phy.phy_init().unwrap();
        assert_eq!(
            phy.inner().regs[PHY_REG_BMCR as usize],
            bmcr::AN | bmcr::RESTART_AN | bmcr::SPEED_100
        );
    }
}
