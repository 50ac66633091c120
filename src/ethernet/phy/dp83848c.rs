//! TI/National DP83848C Ethernet PHY

use super::{bmcr, bmsr, Duplex, LinkState, Speed};
use super::{PHY_REG_ANAR, PHY_REG_BMCR, PHY_REG_BMSR};
use crate::ethernet::{Error, StationManagement, PHY};

#[allow(dead_code)]
mod phy_consts {
    pub const PHY_REG_PHYSTS: u8 = 0x10; // PHY Status Register
    pub const PHY_REG_MICR: u8 = 0x11; // MII Interrupt Control
    pub const PHY_REG_MISR: u8 = 0x12; // MII Interrupt Status
    pub const PHY_REG_RBR: u8 = 0x17; // RMII and Bypass
    pub const PHY_REG_PHYCR: u8 = 0x19; // PHY Control

    pub const PHY_REG_PHYSTS_LINK: u16 = 1 << 0;
    pub const PHY_REG_PHYSTS_SPEED_10: u16 = 1 << 1;
    pub const PHY_REG_PHYSTS_FULL_DUPLEX: u16 = 1 << 2;
    pub const PHY_REG_PHYSTS_LOOPBACK: u16 = 1 << 3;
    pub const PHY_REG_PHYSTS_AN_DONE: u16 = 1 << 4;

    pub const PHY_REG_RBR_RMII_MODE: u16 = 1 << 5;

    // 802.3 selector plus 10/100 half/full abilities
    pub const PHY_REG_ANAR_ALL: u16 = 0x01E1;

    pub const RESET_POLLS: u32 = 0x1_0000;
}
use self::phy_consts::*;

/// TI/National DP83848C Ethernet PHY
pub struct DP83848C<MAC: StationManagement> {
    mac: MAC,
}

impl<MAC: StationManagement> PHY for DP83848C<MAC> {
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
        // Straps may leave the part in MII mode
        let rbr = self.mac.smi_read(PHY_REG_RBR)?;
        self.mac.smi_write(PHY_REG_RBR, rbr | PHY_REG_RBR_RMII_MODE)?;

        // Advertise everything and restart auto-negotiation
        self.mac.smi_write(PHY_REG_ANAR, PHY_REG_ANAR_ALL)?;
        self.mac
            .smi_write(PHY_REG_BMCR, bmcr::AN | bmcr::RESTART_AN)
    }
}

/// Public functions for the DP83848C
impl<MAC: StationManagement> DP83848C<MAC> {
    /// Create DP83848C instance from a MII management interface
    pub fn new(mac: MAC) -> Self {
        DP83848C { mac }
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
    ///
    /// Unlike the basic status register, PHYSTS reports the speed and
    /// duplex actually in use.
    pub fn poll_link(&mut self) -> Result<LinkState, Error> {
        let bsr = self.mac.smi_read(PHY_REG_BMSR)?;
        let sts = self.mac.smi_read(PHY_REG_PHYSTS)?;

        // No link if link is down
        if bsr & bmsr::LINK == 0 || sts & PHY_REG_PHYSTS_LINK == 0 {
            return Ok(LinkState::Down);
        }

        let speed = if sts & PHY_REG_PHYSTS_SPEED_10 != 0 {
            Speed::Mbps10
        } else {
            Speed::Mbps100
        };
        let duplex = if sts & PHY_REG_PHYSTS_FULL_DUPLEX != 0 {
            Duplex::Full
        } else {
            Duplex::Half
        };
        Ok(LinkState::Up { speed, duplex })
    }

    pub fn link_established(&mut self) -> Result<bool, Error> {
        Ok(self.poll_link()?.is_up())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockMii {
        regs: [u16; 32],
        writes: std::vec::Vec<(u8, u16)>,
    }

    impl StationManagement for MockMii {
        fn smi_read(&mut self, reg: u8) -> Result<u16, Error> {
            Ok(self.regs[reg as usize])
        }
        fn smi_write(&mut self, reg: u8, val: u16) -> Result<(), Error> {
            self.writes.push((reg, val));
            // reset self-clears
            self.regs[reg as usize] = val & !bmcr::RESET;
            Ok(())
        }
    }

    fn mock() -> MockMii {
        MockMii {
            regs: [0; 32],
            writes: std::vec::Vec::new(),
        }
    }

    #[test]
    fn negotiated_link_from_physts() {
        let mut mii = mock();
        mii.regs[PHY_REG_BMSR as usize] = bmsr::LINK;
        mii.regs[PHY_REG_PHYSTS as usize] = PHY_REG_PHYSTS_LINK
            | PHY_REG_PHYSTS_SPEED_10
            | PHY_REG_PHYSTS_AN_DONE;
        let mut phy = DP83848C::new(&mut mii);
        assert_eq!(
            phy.poll_link(),
            Ok(LinkState::Up {
                speed: Speed::Mbps10,
                duplex: Duplex::Half
            })
        );

        mii.regs[PHY_REG_BMSR as usize] = 0;
        let mut phy = DP83848C::new(&mut mii);
        assert_eq!(phy.link_established(), Ok(false));
    }

    #[test]
    fn init_selects_rmii_and_restarts_negotiation() {
        let mut phy = DP83848C::new(mock());
        phy.phy_reset().unwrap();
        phy.phy_init().unwrap();

        let mii = phy.free();
        assert_eq!(mii.writes[0], (PHY_REG_BMCR, bmcr::RESET));
        assert_eq!(mii.regs[PHY_REG_RBR as usize], PHY_REG_RBR_RMII_MODE);
        assert_eq!(
            mii.writes.last(),
            Some(&(PHY_REG_BMCR, bmcr::AN | bmcr::RESTART_AN))
        );
    }
}
