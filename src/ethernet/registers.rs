//! EMAC register map and access layer
//!
//! All driver logic goes through [`EmacRegisters`], so it can run against
//! the memory mapped peripheral ([`EmacBlock`]) or a simulated register file.

use volatile_register::RW;

/// Base address of the EMAC register block
pub const EMAC_BASE: usize = 0x5000_0000;

/// Power control for peripherals (PCONP) in the system control block
pub const PCONP: usize = 0x400F_C0C4;

/// PCONP bit powering the EMAC
pub const PCONP_PCENET: u32 = 1 << 30;

/// A named 32-bit register of the EMAC
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::upper_case_acronyms)]
pub enum Register {
    // MAC registers
    MAC1,
    MAC2,
    IPGT,
    IPGR,
    CLRT,
    MAXF,
    SUPP,
    TEST,
    MCFG,
    MCMD,
    MADR,
    MWTD,
    MRDD,
    MIND,
    SA0,
    SA1,
    SA2,
    // Control registers
    Command,
    Status,
    RxDescriptor,
    RxStatus,
    RxDescriptorNumber,
    RxProduceIndex,
    RxConsumeIndex,
    TxDescriptor,
    TxStatus,
    TxDescriptorNumber,
    TxProduceIndex,
    TxConsumeIndex,
    TSV0,
    TSV1,
    RSV,
    FlowControlCounter,
    FlowControlStatus,
    // Receive filter registers
    RxFilterCtrl,
    RxFilterWoLStatus,
    RxFilterWoLClear,
    HashFilterL,
    HashFilterH,
    // Module control registers
    IntStatus,
    IntEnable,
    IntClear,
    IntSet,
    PowerDown,
}

impl Register {
    /// Byte offset from [`EMAC_BASE`]
    pub const fn offset(self) -> usize {
        use Register::*;
        match self {
            MAC1 => 0x000,
            MAC2 => 0x004,
            IPGT => 0x008,
            IPGR => 0x00C,
            CLRT => 0x010,
            MAXF => 0x014,
            SUPP => 0x018,
            TEST => 0x01C,
            MCFG => 0x020,
            MCMD => 0x024,
            MADR => 0x028,
            MWTD => 0x02C,
            MRDD => 0x030,
            MIND => 0x034,
            SA0 => 0x040,
            SA1 => 0x044,
            SA2 => 0x048,
            Command => 0x100,
            Status => 0x104,
            RxDescriptor => 0x108,
            RxStatus => 0x10C,
            RxDescriptorNumber => 0x110,
            RxProduceIndex => 0x114,
            RxConsumeIndex => 0x118,
            TxDescriptor => 0x11C,
            TxStatus => 0x120,
            TxDescriptorNumber => 0x124,
            TxProduceIndex => 0x128,
            TxConsumeIndex => 0x12C,
            TSV0 => 0x158,
            TSV1 => 0x15C,
            RSV => 0x160,
            FlowControlCounter => 0x170,
            FlowControlStatus => 0x174,
            RxFilterCtrl => 0x200,
            RxFilterWoLStatus => 0x204,
            RxFilterWoLClear => 0x208,
            HashFilterL => 0x210,
            HashFilterH => 0x214,
            IntStatus => 0xFE0,
            IntEnable => 0xFE4,
            IntClear => 0xFE8,
            IntSet => 0xFEC,
            PowerDown => 0xFF4,
        }
    }
}

/// Register level access to one EMAC instance.
///
/// Accesses take `&self`: every register write is a single volatile store
/// and the interrupt handler shares the block with foreground code.
pub trait EmacRegisters {
    /// Reads a register.
    fn read(&self, reg: Register) -> u32;

    /// Writes a register.
    fn write(&self, reg: Register, value: u32);

    /// Read-modify-write of a register.
    fn modify<F>(&self, reg: Register, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Switches the clock/power of the EMAC block on or off.
    fn set_power(&self, enable: bool);
}

/// The memory mapped EMAC of the LPC17xx
pub struct EmacBlock {
    _private: (),
}

impl EmacBlock {
    /// Takes the EMAC register block, consuming the RMII pins routed to it.
    ///
    /// The pins are not returned and can only be obtained once from
    /// [`GPIO::take`](crate::gpio::GPIO::take), so this works as the
    /// singleton guard: at most one block exists unless
    /// [`steal`](Self::steal) or [`GPIO::steal`](crate::gpio::GPIO::steal) is
    /// used.
    pub fn new<PINS: super::PinsRMII>(_pins: PINS) -> Self {
        EmacBlock { _private: () }
    }

    /// Takes the EMAC register block.
    ///
    /// # Safety
    ///
    /// There must be at most one `EmacBlock` in the program.
    pub unsafe fn steal() -> Self {
        EmacBlock { _private: () }
    }

    fn reg(&self, reg: Register) -> &RW<u32> {
        let addr = EMAC_BASE + reg.offset();
        // NOTE(unsafe) fixed, aligned MMIO address owned by this singleton
        unsafe { &*(addr as *const RW<u32>) }
    }
}

impl EmacRegisters for EmacBlock {
    fn read(&self, reg: Register) -> u32 {
        self.reg(reg).read()
    }

    fn write(&self, reg: Register, value: u32) {
        // NOTE(unsafe) single word volatile store
        unsafe { self.reg(reg).write(value) }
    }

    fn set_power(&self, enable: bool) {
        // NOTE(unsafe) PCONP is shared with other drivers; the update runs
        // with interrupts disabled
        cortex_m::interrupt::free(|_| unsafe {
            let pconp = &*(PCONP as *const RW<u32>);
            pconp.modify(|w| {
                if enable {
                    w | PCONP_PCENET
                } else {
                    w & !PCONP_PCENET
                }
            });
        });
    }
}

#[allow(dead_code)]
pub(crate) mod bits {
    // MAC1
    pub const MAC1_RECEIVE_EN: u32 = 1 << 0;
    pub const MAC1_PASS_ALL: u32 = 1 << 1;
    pub const MAC1_RX_FLOW: u32 = 1 << 2;
    pub const MAC1_TX_FLOW: u32 = 1 << 3;
    pub const MAC1_LOOPBACK: u32 = 1 << 4;
    pub const MAC1_RES_TX: u32 = 1 << 8;
    pub const MAC1_RES_MCS_TX: u32 = 1 << 9;
    pub const MAC1_RES_RX: u32 = 1 << 10;
    pub const MAC1_RES_MCS_RX: u32 = 1 << 11;
    pub const MAC1_SIM_RES: u32 = 1 << 14;
    pub const MAC1_SOFT_RES: u32 = 1 << 15;
    pub const MAC1_ALL_RESETS: u32 = MAC1_RES_TX
        | MAC1_RES_MCS_TX
        | MAC1_RES_RX
        | MAC1_RES_MCS_RX
        | MAC1_SIM_RES
        | MAC1_SOFT_RES;

    // MAC2
    pub const MAC2_FULL_DUP: u32 = 1 << 0;
    pub const MAC2_FRM_LEN_CHK: u32 = 1 << 1;
    pub const MAC2_HUGE_FRM_EN: u32 = 1 << 2;
    pub const MAC2_DLY_CRC: u32 = 1 << 3;
    pub const MAC2_CRC_EN: u32 = 1 << 4;
    pub const MAC2_PAD_EN: u32 = 1 << 5;

    // Back-to-back inter-packet gap
    pub const IPGT_FULL_DUP: u32 = 0x15;
    pub const IPGT_HALF_DUP: u32 = 0x12;

    // Non back-to-back inter-packet gap
    pub const IPGR_DEF: u32 = 0x12;

    // Collision window / retry
    pub const CLRT_DEF: u32 = 0x370F;

    // SUPP
    pub const SUPP_SPEED: u32 = 1 << 8;
    pub const SUPP_RES_RMII: u32 = 1 << 11;

    // MCFG
    pub const MCFG_SCAN_INC: u32 = 1 << 0;
    pub const MCFG_SUPP_PREAMBLE: u32 = 1 << 1;
    pub const MCFG_CLK_SEL_MASK: u32 = 0xF << 2;
    pub const MCFG_RES_MII: u32 = 1 << 15;

    pub const fn mcfg_clk_sel(code: u32) -> u32 {
        (code & 0xF) << 2
    }

    // MCMD
    pub const MCMD_READ: u32 = 1 << 0;
    pub const MCMD_SCAN: u32 = 1 << 1;

    // MIND
    pub const MIND_BUSY: u32 = 1 << 0;
    pub const MIND_SCAN: u32 = 1 << 1;
    pub const MIND_NOT_VAL: u32 = 1 << 2;
    pub const MIND_MII_LINK_FAIL: u32 = 1 << 3;

    // Command
    pub const CR_RX_EN: u32 = 1 << 0;
    pub const CR_TX_EN: u32 = 1 << 1;
    pub const CR_REG_RES: u32 = 1 << 3;
    pub const CR_TX_RES: u32 = 1 << 4;
    pub const CR_RX_RES: u32 = 1 << 5;
    pub const CR_PASS_RUNT_FRM: u32 = 1 << 6;
    pub const CR_PASS_RX_FILT: u32 = 1 << 7;
    pub const CR_TX_FLOW_CTRL: u32 = 1 << 8;
    pub const CR_RMII: u32 = 1 << 9;
    pub const CR_FULL_DUP: u32 = 1 << 10;

    // Status
    pub const SR_RX_EN: u32 = 1 << 0;
    pub const SR_TX_EN: u32 = 1 << 1;
}
