//! Simulated EMAC register file with an attached PHY model, used by the
//! host side tests.

use core::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::vec::Vec;

use super::phy::{
    bmcr, bmsr, PHY_REG_BMCR, PHY_REG_BMSR, PHY_REG_IDR1, PHY_REG_IDR2,
};
use super::registers::{bits::*, EmacRegisters, Register};

/// Global event counter. Register writes and test callbacks both draw from
/// it, so their relative order can be asserted.
static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn next_sequence() -> usize {
    SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

/// Register model of a PHY on the MII bus
pub(crate) struct SimPhy {
    pub address: u8,
    pub regs: [u16; 32],
    /// BMCR never leaves reset
    pub stuck_in_reset: bool,
    /// Number of BMSR reads that report no link; `None` never links
    pub link_after: Option<u32>,
    /// The MII bus stays busy after a BMCR write outside of reset
    pub hang_on_mode_write: bool,
    bmsr_reads: u32,
}

impl SimPhy {
    fn new(id: u32) -> Self {
        let mut regs = [0u16; 32];
        regs[PHY_REG_IDR1 as usize] = (id >> 16) as u16;
        // revision bits must be masked off by the driver
        regs[PHY_REG_IDR2 as usize] = (id as u16) | 0x0001;
        regs[PHY_REG_BMCR as usize] = bmcr::AN;
        regs[PHY_REG_BMSR as usize] = bmsr::CAP_100TX_FULL | bmsr::AUTO_DONE;
        SimPhy {
            address: 1,
            regs,
            stuck_in_reset: false,
            link_after: Some(0),
            hang_on_mode_write: false,
            bmsr_reads: 0,
        }
    }

    fn read(&mut self, reg: u8) -> u16 {
        let reg = reg & 0x1F;
        let value = self.regs[reg as usize];
        if reg == PHY_REG_BMSR {
            let link =
                matches!(self.link_after, Some(n) if self.bmsr_reads >= n);
            self.bmsr_reads += 1;
            if link {
                return value | bmsr::LINK;
            }
            return value & !bmsr::LINK;
        }
        value
    }

    fn write(&mut self, reg: u8, value: u16) {
        let reg = reg & 0x1F;
        if reg == PHY_REG_BMCR && !self.stuck_in_reset {
            // reset completes immediately
            self.regs[reg as usize] = value & !bmcr::RESET;
        } else {
            self.regs[reg as usize] = value;
        }
    }
}

/// In-memory EMAC
pub(crate) struct SimulatedEmac {
    regs: RefCell<[u32; 0x400]>,
    phy: RefCell<SimPhy>,
    log: RefCell<Vec<(usize, Register, u32)>>,
    powered: Cell<bool>,
    mii_stuck: Cell<bool>,
    raise_on_clear: Cell<u32>,
}

impl SimulatedEmac {
    /// A powered down EMAC with a DP83848C at PHY address 1
    pub fn new() -> Self {
        Self::with_phy_id(0x2000_5C90)
    }

    pub fn with_phy_id(id: u32) -> Self {
        SimulatedEmac {
            regs: RefCell::new([0; 0x400]),
            phy: RefCell::new(SimPhy::new(id)),
            log: RefCell::new(Vec::new()),
            powered: Cell::new(false),
            mii_stuck: Cell::new(false),
            raise_on_clear: Cell::new(0),
        }
    }

    pub fn phy(&self) -> core::cell::RefMut<'_, SimPhy> {
        self.phy.borrow_mut()
    }

    pub fn is_powered(&self) -> bool {
        self.powered.get()
    }

    /// Keep `MIND.BUSY` set forever
    pub fn set_mii_stuck(&self, stuck: bool) {
        self.mii_stuck.set(stuck);
    }

    /// Raise interrupt status bits as hardware would
    pub fn raise(&self, status: u32) {
        self.regs.borrow_mut()[Register::IntStatus.offset() / 4] |= status;
    }

    /// Raise `status` once more right after the next `IntClear`, as if an
    /// event arrived while the previous batch was being serviced.
    pub fn raise_after_clear(&self, status: u32) {
        self.raise_on_clear.set(status);
    }

    /// Set wake-on-LAN status bits as hardware would
    pub fn set_wol_status(&self, status: u32) {
        let offset = Register::RxFilterWoLStatus.offset() / 4;
        self.regs.borrow_mut()[offset] |= status;
    }

    /// All values written to `reg`, oldest first
    pub fn writes_to(&self, reg: Register) -> Vec<u32> {
        self.log
            .borrow()
            .iter()
            .filter(|(_, r, _)| *r == reg)
            .map(|(_, _, v)| *v)
            .collect()
    }

    /// Sequence number of the last write to `reg`
    pub fn last_write_sequence(&self, reg: Register) -> Option<usize> {
        self.log
            .borrow()
            .iter()
            .rev()
            .find(|(_, r, _)| *r == reg)
            .map(|(seq, _, _)| *seq)
    }

    /// Position of the first write of `value` to `reg` in the write log
    pub fn position_of(&self, reg: Register, value: u32) -> Option<usize> {
        self.log
            .borrow()
            .iter()
            .position(|(_, r, v)| *r == reg && *v == value)
    }

    fn store(&self, reg: Register, value: u32) {
        self.regs.borrow_mut()[reg.offset() / 4] = value;
    }

    fn load(&self, reg: Register) -> u32 {
        self.regs.borrow()[reg.offset() / 4]
    }

    fn addressed_phy_register(&self) -> Option<u8> {
        let madr = self.load(Register::MADR);
        let address = ((madr >> 8) & 0x1F) as u8;
        if address == self.phy.borrow().address {
            Some((madr & 0x1F) as u8)
        } else {
            None
        }
    }
}

impl EmacRegisters for SimulatedEmac {
    fn read(&self, reg: Register) -> u32 {
        match reg {
            Register::MIND => {
                if self.mii_stuck.get() {
                    MIND_BUSY
                } else {
                    0
                }
            }
            Register::IntClear
            | Register::IntSet
            | Register::RxFilterWoLClear => 0,
            _ => self.load(reg),
        }
    }

    fn write(&self, reg: Register, value: u32) {
        self.log.borrow_mut().push((next_sequence(), reg, value));

        match reg {
            Register::MCMD => {
                self.store(reg, value);
                if value & MCMD_READ != 0 {
                    let data = match self.addressed_phy_register() {
                        Some(phy_reg) => {
                            u32::from(self.phy.borrow_mut().read(phy_reg))
                        }
                        None => 0xFFFF,
                    };
                    self.store(Register::MRDD, data);
                }
            }
            Register::MWTD => {
                self.store(reg, value);
                if let Some(phy_reg) = self.addressed_phy_register() {
                    let mut phy = self.phy.borrow_mut();
                    phy.write(phy_reg, value as u16);
                    if phy.hang_on_mode_write
                        && phy_reg == PHY_REG_BMCR
                        && value as u16 & bmcr::RESET == 0
                    {
                        self.mii_stuck.set(true);
                    }
                }
            }
            Register::IntClear => {
                let status = self.load(Register::IntStatus) & !value;
                let late = self.raise_on_clear.replace(0);
                self.store(Register::IntStatus, status | late);
            }
            Register::IntSet => {
                let status = self.load(Register::IntStatus) | value;
                self.store(Register::IntStatus, status);
            }
            Register::RxFilterWoLClear => {
                let status = self.load(Register::RxFilterWoLStatus) & !value;
                self.store(Register::RxFilterWoLStatus, status);
            }
            _ => self.store(reg, value),
        }
    }

    fn set_power(&self, enable: bool) {
        self.powered.set(enable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mii_read_loads_phy_register() {
        let sim = SimulatedEmac::new();
        sim.write(Register::MADR, 0x0100 | u32::from(PHY_REG_IDR1));
        sim.write(Register::MCMD, MCMD_READ);
        assert_eq!(sim.read(Register::MRDD), 0x2000);

        // nobody at address 2
        sim.write(Register::MADR, 0x0200 | u32::from(PHY_REG_IDR1));
        sim.write(Register::MCMD, MCMD_READ);
        assert_eq!(sim.read(Register::MRDD), 0xFFFF);
    }

    #[test]
    fn interrupt_clear_is_write_one_to_clear() {
        let sim = SimulatedEmac::new();
        sim.raise(0b1011);
        sim.write(Register::IntClear, 0b0011);
        assert_eq!(sim.read(Register::IntStatus), 0b1000);
        assert_eq!(sim.read(Register::IntClear), 0);
    }
}
