//! EMAC driver
//!
//! [`Emac::init`] brings the MAC up in a fixed order: power, MAC reset, MII
//! clock, RMII, PHY reset and identification, link mode, station address,
//! rings, filters and interrupts. Any step may fail, in which case the driver
//! is left in the state it reached and the error is returned. There is no
//! rollback; call [`Emac::deinit`] to power the block down again.

use embedded_hal::blocking::delay::DelayMs;

use super::descriptor::RxInfo;
use super::filter::{hash_class, HashSlot, RxFilter, WolStatus};
use super::interrupt::{Callback, CallbackTable, Interrupt, Interrupts};
use super::phy::{
    bmcr, Duplex, LinkState, PhyId, PhyMode, PhyStatus, Speed, PHY_REG_BMCR,
    PHY_REG_BMSR, PHY_REG_IDR1, PHY_REG_IDR2,
};
use super::registers::{bits::*, EmacRegisters, Register};
use super::ring::DesRing;
use super::rx::{RxError, RxRing};
use super::tx::{TxError, TxRing};
use super::{Error, StationManagement, MAX_FRAME_LEN};
use crate::time::Hertz;

/// Highest MDC frequency the PHYs accept
const MII_MAX_CLOCK: u32 = 2_500_000;

/// MDC dividers, indexed by `CLK_SEL - 1`
const MII_DIVIDERS: [u32; 15] =
    [4, 6, 8, 10, 14, 20, 28, 36, 40, 44, 48, 52, 56, 60, 64];

/// Every interrupt source in `IntClear`
const INT_CLEAR_ALL: u32 = 0xFFFF;

/// Bounds on the polling loops of the driver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeouts {
    /// Reads of `MIND` before an MII access is abandoned
    pub mii_busy_polls: u32,
    /// BMCR polls while waiting for the PHY to leave reset
    pub phy_reset_attempts: u32,
    /// Delay between BMCR polls
    pub phy_reset_poll_ms: u32,
    /// BMSR polls while waiting for a link
    pub link_attempts: u32,
    /// Delay between BMSR polls
    pub link_poll_ms: u32,
    /// Time the RMII logic is held in reset
    pub rmii_reset_ms: u32,
}

impl Timeouts {
    pub const fn new() -> Self {
        Timeouts {
            mii_busy_polls: 0x5_0000,
            phy_reset_attempts: 500,
            phy_reset_poll_ms: 10,
            link_attempts: 10,
            link_poll_ms: 100,
            rmii_reset_ms: 100,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::new()
    }
}

/// EMAC configuration
///
/// ```
/// use lpc17xx_hal::ethernet::{EmacConfig, PhyMode};
/// use lpc17xx_hal::time::U32Ext;
///
/// let config = EmacConfig::new()
///     .mac_address([0x02, 0x00, 0x00, 0x17, 0x69, 0x01])
///     .mode(PhyMode::FullDuplex100M)
///     .core_clock(96.mhz().into());
/// assert_eq!(config.phy_address, 1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmacConfig {
    /// Station address
    pub mac_address: [u8; 6],
    /// Link mode programmed into the PHY
    pub mode: PhyMode,
    /// CPU clock, from which the MII management clock is divided
    pub core_clock: Hertz,
    /// Address of the PHY on the MII bus
    pub phy_address: u8,
    pub timeouts: Timeouts,
}

impl EmacConfig {
    pub const fn new() -> Self {
        EmacConfig {
            mac_address: [0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
            mode: PhyMode::Auto,
            core_clock: Hertz(100_000_000),
            phy_address: 1,
            timeouts: Timeouts::new(),
        }
    }

    pub const fn mac_address(mut self, mac_address: [u8; 6]) -> Self {
        self.mac_address = mac_address;
        self
    }

    pub const fn mode(mut self, mode: PhyMode) -> Self {
        self.mode = mode;
        self
    }

    pub const fn core_clock(mut self, core_clock: Hertz) -> Self {
        self.core_clock = core_clock;
        self
    }

    pub const fn phy_address(mut self, phy_address: u8) -> Self {
        self.phy_address = phy_address;
        self
    }

    pub const fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

impl Default for EmacConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver life cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Powered down, or never initialised
    Uninitialized,
    /// MAC, MII and RMII reset, PHY reset
    Resetting,
    /// Reading the PHY identifier
    PhyDetect,
    /// Programming the link mode and waiting for a link
    PhyConfiguring,
    /// Setting up the descriptor rings
    RingInit,
    /// Receiving and transmitting
    Enabled,
    /// The PHY identifier is not supported
    PhyDetectFailed,
    /// The PHY did not come out of reset, or the MII bus hung
    PhyResetTimeout,
    /// The MII bus hung while programming the link mode
    PhyConfigFailed,
}

/// Index of the smallest MDC divider that keeps the management clock at or
/// below 2.5 MHz, and the divider itself. Falls back to the largest divider.
fn mii_clock_select(core_clock: Hertz) -> (u32, u32) {
    let needed = core_clock.0.div_ceil(MII_MAX_CLOCK);
    let index = MII_DIVIDERS
        .iter()
        .position(|&div| div >= needed)
        .unwrap_or(MII_DIVIDERS.len() - 1);
    (index as u32 + 1, MII_DIVIDERS[index])
}

/// Ethernet MAC with its descriptor rings
pub struct Emac<'ring, REGS, DELAY> {
    regs: REGS,
    delay: DELAY,
    rx_ring: RxRing<'ring>,
    tx_ring: TxRing<'ring>,
    callbacks: CallbackTable,
    phy_address: u8,
    timeouts: Timeouts,
    state: State,
    phy: Option<PhyId>,
    link: LinkState,
}

impl<'ring, REGS, DELAY> Emac<'ring, REGS, DELAY>
where
    REGS: EmacRegisters,
    DELAY: DelayMs<u32>,
{
    /// Create a driver over `regs`, using `ring` for DMA.
    ///
    /// Nothing is written to the hardware until [`init`](Self::init). The
    /// ring storage must be reachable by the EMAC DMA (AHB SRAM).
    pub fn new<const RD: usize, const TD: usize>(
        regs: REGS,
        delay: DELAY,
        ring: &'ring mut DesRing<RD, TD>,
    ) -> Self {
        let (rx, tx) = ring.split();
        Emac {
            regs,
            delay,
            rx_ring: RxRing::new(rx),
            tx_ring: TxRing::new(tx),
            callbacks: CallbackTable::new(),
            phy_address: 1,
            timeouts: Timeouts::new(),
            state: State::Uninitialized,
            phy: None,
            link: LinkState::Down,
        }
    }

    /// Bring up the MAC, the PHY and both rings.
    ///
    /// A link that does not come up in time is not an error: the result is
    /// [`LinkState::Down`] and the MAC is enabled anyway.
    pub fn init(&mut self, config: &EmacConfig) -> Result<LinkState, Error> {
        self.phy_address = config.phy_address;
        self.timeouts = config.timeouts;
        self.phy = None;
        self.link = LinkState::Down;

        self.regs.set_power(true);
        self.state = State::Resetting;
        self.reset_mac();
        self.configure_mii(config.core_clock);
        self.reset_rmii();

        if let Err(e) = self.reset_phy() {
            warn!("PHY reset failed");
            self.state = State::PhyResetTimeout;
            return Err(e);
        }

        self.state = State::PhyDetect;
        if let Err(e) = self.detect_phy() {
            self.state = State::PhyDetectFailed;
            return Err(e);
        }

        self.state = State::PhyConfiguring;
        let link = match self.set_mode(config.mode) {
            Ok(link) => link,
            Err(e) => {
                warn!("PHY mode setup failed");
                self.state = State::PhyConfigFailed;
                return Err(e);
            }
        };

        self.set_station_address(&config.mac_address);

        self.state = State::RingInit;
        self.rx_ring.init(&self.regs);
        self.tx_ring.init(&self.regs);
        debug!(
            "rings: {} RX, {} TX descriptors",
            self.rx_ring.len(),
            self.tx_ring.len()
        );

        let filter =
            RxFilter::MULTICAST | RxFilter::BROADCAST | RxFilter::PERFECT;
        self.regs.write(Register::RxFilterCtrl, filter.bits());
        let interrupts = Interrupts::RX_DONE | Interrupts::TX_DONE;
        self.regs.write(Register::IntEnable, interrupts.bits());
        self.regs.write(Register::IntClear, INT_CLEAR_ALL);

        self.regs.modify(Register::Command, |w| w | CR_RX_EN | CR_TX_EN);
        self.regs.modify(Register::MAC1, |w| w | MAC1_RECEIVE_EN);

        self.state = State::Enabled;
        info!("EMAC enabled");
        Ok(link)
    }

    fn reset_mac(&mut self) {
        self.regs.write(Register::MAC1, MAC1_ALL_RESETS);
        self.regs.write(
            Register::Command,
            CR_REG_RES | CR_TX_RES | CR_RX_RES | CR_PASS_RUNT_FRM,
        );
        self.delay.delay_ms(1);

        self.regs.write(Register::MAC1, MAC1_PASS_ALL);
        self.regs.write(Register::MAC2, MAC2_CRC_EN | MAC2_PAD_EN);
        self.regs.write(Register::MAXF, MAX_FRAME_LEN as u32);
    }

    fn configure_mii(&mut self, core_clock: Hertz) {
        let (code, divider) = mii_clock_select(core_clock);
        debug!("MDC: core clock / {} (CLK_SEL {})", divider, code);

        self.regs
            .write(Register::MCFG, mcfg_clk_sel(code) | MCFG_RES_MII);
        self.regs.modify(Register::MCFG, |w| w & !MCFG_RES_MII);
        self.regs.write(Register::CLRT, CLRT_DEF);
        self.regs.write(Register::IPGR, IPGR_DEF);
    }

    fn reset_rmii(&mut self) {
        self.regs.write(Register::Command, CR_RMII | CR_PASS_RUNT_FRM);
        self.regs.write(Register::SUPP, SUPP_RES_RMII);
        self.delay.delay_ms(self.timeouts.rmii_reset_ms);
        self.regs.write(Register::SUPP, 0);
    }

    /// Reset the PHY and wait for BMCR to show it out of reset and powered.
    fn reset_phy(&mut self) -> Result<(), Error> {
        self.smi_write(PHY_REG_BMCR, bmcr::RESET)?;

        for _ in 0..self.timeouts.phy_reset_attempts {
            self.delay.delay_ms(self.timeouts.phy_reset_poll_ms);
            // A failed read counts as still in reset
            match self.smi_read(PHY_REG_BMCR) {
                Ok(v) if v & (bmcr::RESET | bmcr::POWER_DOWN) == 0 => {
                    return Ok(())
                }
                _ => {}
            }
        }
        Err(Error::PhyResetTimeout)
    }

    /// Read the PHY identifier and check it is a supported part.
    pub fn detect_phy(&mut self) -> Result<PhyId, Error> {
        let idr1 = self.smi_read(PHY_REG_IDR1)?;
        let idr2 = self.smi_read(PHY_REG_IDR2)?;
        let id = PhyId::combine(idr1, idr2);

        match PhyId::from_id(id) {
            Ok(phy) => {
                info!("PHY {} at address {}", phy, self.phy_address);
                self.phy = Some(phy);
                Ok(phy)
            }
            Err(e) => {
                warn!("unsupported PHY identifier {:x}", id);
                Err(e)
            }
        }
    }

    /// Interpret one reading of the PHY basic status register.
    pub fn check_status(&mut self, kind: PhyStatus) -> Result<bool, Error> {
        let bmsr = self.smi_read(PHY_REG_BMSR)?;
        Ok(kind.decode(bmsr))
    }

    /// Program the PHY link mode, then wait for a link and configure the
    /// MAC to match it.
    pub fn set_mode(&mut self, mode: PhyMode) -> Result<LinkState, Error> {
        debug!("PHY mode {:?}", mode);
        self.smi_write(PHY_REG_BMCR, mode.bmcr())?;
        self.update_status()
    }

    /// Wait for the PHY to report a link, then match the MAC duplex and
    /// speed settings to it.
    ///
    /// Returns [`LinkState::Down`] without touching the MAC when no link
    /// shows up within the configured number of polls.
    pub fn update_status(&mut self) -> Result<LinkState, Error> {
        let mut linked = false;
        for _ in 0..self.timeouts.link_attempts {
            self.delay.delay_ms(self.timeouts.link_poll_ms);
            if self.check_status(PhyStatus::Link)? {
                linked = true;
                break;
            }
        }

        if !linked {
            warn!("no link");
            self.link = LinkState::Down;
            return Ok(LinkState::Down);
        }

        let duplex = if self.check_status(PhyStatus::FullDuplex)? {
            Duplex::Full
        } else {
            Duplex::Half
        };
        let speed = if self.check_status(PhyStatus::Speed)? {
            Speed::Mbps100
        } else {
            Speed::Mbps10
        };

        match duplex {
            Duplex::Full => {
                self.regs.modify(Register::MAC2, |w| w | MAC2_FULL_DUP);
                self.regs.modify(Register::Command, |w| w | CR_FULL_DUP);
                self.regs.write(Register::IPGT, IPGT_FULL_DUP);
            }
            Duplex::Half => {
                self.regs.modify(Register::MAC2, |w| w & !MAC2_FULL_DUP);
                self.regs.modify(Register::Command, |w| w & !CR_FULL_DUP);
                self.regs.write(Register::IPGT, IPGT_HALF_DUP);
            }
        }
        match speed {
            Speed::Mbps100 => self.regs.write(Register::SUPP, SUPP_SPEED),
            Speed::Mbps10 => self.regs.write(Register::SUPP, 0),
        }

        self.link = LinkState::Up { speed, duplex };
        info!("{}", self.link);
        Ok(self.link)
    }

    /// Disable and clear all interrupts and power the EMAC down.
    pub fn deinit(&mut self) {
        self.regs.write(Register::IntEnable, 0);
        self.regs.write(
            Register::IntClear,
            (Interrupts::MAC_EVENTS | Interrupts::SOFT | Interrupts::WAKEUP)
                .bits(),
        );
        self.regs.set_power(false);

        self.state = State::Uninitialized;
        self.link = LinkState::Down;
        debug!("EMAC powered down");
    }

    /// Set the station address used by the perfect address filter and for
    /// pause frames.
    pub fn set_station_address(&mut self, mac: &[u8; 6]) {
        let word = |hi: u8, lo: u8| u32::from(hi) << 8 | u32::from(lo);
        self.regs.write(Register::SA0, word(mac[5], mac[4]));
        self.regs.write(Register::SA1, word(mac[3], mac[2]));
        self.regs.write(Register::SA2, word(mac[1], mac[0]));
    }

    /// The station address currently programmed
    pub fn station_address(&self) -> [u8; 6] {
        let sa0 = self.regs.read(Register::SA0);
        let sa1 = self.regs.read(Register::SA1);
        let sa2 = self.regs.read(Register::SA2);
        [
            sa2 as u8,
            (sa2 >> 8) as u8,
            sa1 as u8,
            (sa1 >> 8) as u8,
            sa0 as u8,
            (sa0 >> 8) as u8,
        ]
    }

    /// A received frame is waiting
    pub fn check_receive_index(&self) -> bool {
        self.rx_ring.is_available(&self.regs)
    }

    /// A transmit slot is free
    pub fn check_transmit_index(&self) -> bool {
        self.tx_ring.is_available(&self.regs)
    }

    /// Copy `frame` into the slot at the transmit produce index. The frame
    /// is queued by [`advance_produce`](Self::advance_produce).
    pub fn write_tx_packet(&mut self, frame: &[u8]) -> Result<(), TxError> {
        self.tx_ring.write(&self.regs, frame)
    }

    /// Copy the frame at the receive consume index into `buf`, or nothing
    /// for `None`. The slot stays owned by software until
    /// [`advance_consume`](Self::advance_consume).
    pub fn read_rx_packet(&self, buf: Option<&mut [u8]>) -> usize {
        self.rx_ring.read(&self.regs, buf)
    }

    /// Hand the current receive slot back to the EMAC
    pub fn advance_consume(&self) {
        self.rx_ring.advance(&self.regs)
    }

    /// Queue the current transmit slot
    pub fn advance_produce(&self) {
        self.tx_ring.advance(&self.regs)
    }

    /// Any of `flags` is set in the status of the current receive slot
    pub fn receive_status(&self, flags: RxInfo) -> bool {
        self.rx_ring
            .current_status(&self.regs)
            .flags()
            .intersects(flags)
    }

    /// Length of the frame in the current receive slot, FCS included, at most
    /// [`MAX_FRAME_LEN`]
    pub fn receive_frame_len(&self) -> usize {
        self.rx_ring
            .current_status(&self.regs)
            .len()
            .min(MAX_FRAME_LEN)
    }

    /// Skip received frames with errors. Returns `true` when a good frame is
    /// waiting in the current slot.
    pub fn rx_available(&self) -> bool {
        while self.rx_ring.is_available(&self.regs) {
            let flags = self.rx_ring.current_status(&self.regs).flags();
            if flags.intersects(RxInfo::FRAME_ERRORS)
                || !flags.contains(RxInfo::LAST)
            {
                trace!("dropping bad frame");
                self.rx_ring.advance(&self.regs);
            } else {
                return true;
            }
        }
        false
    }

    /// Queue `frame` for transmission, or return [`Err`] immediately.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), TxError> {
        if !self.check_transmit_index() {
            return Err(TxError::WouldBlock);
        }
        self.write_tx_packet(frame)?;
        self.advance_produce();
        Ok(())
    }

    /// Receive the next frame into `buf`, or return [`Err`] immediately.
    ///
    /// Returns the frame length including the FCS. The slot is always
    /// released, also when the frame had errors or did not fit `buf`.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize, RxError> {
        if !self.check_receive_index() {
            return Err(RxError::WouldBlock);
        }

        let flags = self.rx_ring.current_status(&self.regs).flags();
        let len = self.receive_frame_len();
        let result = if flags.intersects(RxInfo::FRAME_ERRORS)
            || !flags.contains(RxInfo::LAST)
        {
            Err(RxError::Frame(flags))
        } else if buf.len() < len {
            self.read_rx_packet(Some(buf));
            Err(RxError::Truncated)
        } else {
            Ok(self.read_rx_packet(Some(buf)))
        };

        self.advance_consume();
        result
    }

    /// Add or remove `mac` from the imperfect hash filter.
    ///
    /// Frames accepted by the filter are passed on only when they pass, so
    /// this also disables `PASS_RX_FILTER`.
    pub fn set_hash_filter(&mut self, mac: &[u8; 6], enable: bool) {
        let slot = HashSlot::of(mac);
        let reg = match slot {
            HashSlot::Low(_) => Register::HashFilterL,
            HashSlot::High(_) => Register::HashFilterH,
        };
        trace!("hash filter {:?} {}", slot, enable);

        self.regs.modify(reg, |w| {
            if enable {
                w | slot.mask()
            } else {
                w & !slot.mask()
            }
        });
        if enable {
            self.regs
                .modify(Register::RxFilterCtrl, |w| w | hash_class(mac).bits());
        }
        self.regs.modify(Register::Command, |w| w & !CR_PASS_RX_FILT);
    }

    /// Enable or disable receive filter classes
    pub fn set_filter_mode(&mut self, filter: RxFilter, enable: bool) {
        self.regs.modify(Register::RxFilterCtrl, |w| {
            if enable {
                w | filter.bits()
            } else {
                w & !filter.bits()
            }
        });
    }

    /// Check and clear wake-up causes. Returns `true` if any of `status` was
    /// set.
    pub fn wol_status(&mut self, status: WolStatus) -> bool {
        if self.regs.read(Register::RxFilterWoLStatus) & status.bits() != 0 {
            self.regs.write(Register::RxFilterWoLClear, status.bits());
            true
        } else {
            false
        }
    }

    /// Enable or disable interrupt sources
    pub fn enable_interrupts(&mut self, interrupts: Interrupts, enable: bool) {
        self.regs.modify(Register::IntEnable, |w| {
            if enable {
                w | interrupts.bits()
            } else {
                w & !interrupts.bits()
            }
        });
    }

    /// Check and clear raw interrupt status. Returns `true` if any of
    /// `interrupts` was pending.
    pub fn interrupt_status(&mut self, interrupts: Interrupts) -> bool {
        if self.regs.read(Register::IntStatus) & interrupts.bits() != 0 {
            self.regs.write(Register::IntClear, interrupts.bits());
            true
        } else {
            false
        }
    }

    /// Raise the software interrupt
    pub fn trigger_soft_interrupt(&self) {
        self.regs.write(Register::IntSet, Interrupts::SOFT.bits());
    }

    /// Register `callback` for the single event `events` selects: the lowest
    /// MAC event, else the software interrupt, else wake-up. `None` removes
    /// the callback.
    ///
    /// Returns the event chosen, or `None` if `events` is empty.
    pub fn setup_callback<E>(
        &mut self,
        events: E,
        callback: Option<Callback>,
    ) -> Option<Interrupt>
    where
        E: Into<Interrupts>,
    {
        let interrupt = Interrupt::try_from(events.into()).ok()?;
        self.callbacks.set(interrupt, callback);
        Some(interrupt)
    }

    /// Service all pending enabled interrupts, running their callbacks.
    ///
    /// Call this from the `ENET` interrupt. Events raised while callbacks run
    /// are serviced before returning. Returns every event serviced.
    pub fn interrupt_handler(&self) -> Interrupts {
        let mut serviced = Interrupts::empty();
        loop {
            let pending = self.regs.read(Register::IntStatus)
                & self.regs.read(Register::IntEnable);
            if pending == 0 {
                break;
            }
            self.regs.write(Register::IntClear, pending);

            let status = Interrupts::from_bits_truncate(pending);
            serviced |= status;
            self.callbacks.dispatch(status, || {
                self.regs
                    .write(Register::RxFilterWoLClear, WolStatus::all().bits())
            });
        }
        serviced
    }

    /// Current life cycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// The PHY found by [`init`](Self::init)
    pub fn phy_id(&self) -> Option<PhyId> {
        self.phy
    }

    /// Link as last seen by [`update_status`](Self::update_status)
    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn regs(&self) -> &REGS {
        &self.regs
    }

    pub fn rx_ring(&self) -> &RxRing<'ring> {
        &self.rx_ring
    }

    pub fn tx_ring(&self) -> &TxRing<'ring> {
        &self.tx_ring
    }

    /// Release the register block and delay provider
    pub fn free(self) -> (REGS, DELAY) {
        (self.regs, self.delay)
    }

    #[cfg(feature = "smoltcp")]
    pub(crate) fn parts(
        &mut self,
    ) -> (&REGS, &mut RxRing<'ring>, &mut TxRing<'ring>) {
        (&self.regs, &mut self.rx_ring, &mut self.tx_ring)
    }

    #[cfg(test)]
    pub(crate) fn rx_ring_mut(&mut self) -> &mut RxRing<'ring> {
        &mut self.rx_ring
    }
}

/// PHY Operations
impl<REGS, DELAY> StationManagement for Emac<'_, REGS, DELAY>
where
    REGS: EmacRegisters,
    DELAY: DelayMs<u32>,
{
    /// Read a register over the MII management interface.
    fn smi_read(&mut self, reg: u8) -> Result<u16, Error> {
        self.regs.write(Register::MADR, self.mii_address(reg));
        self.regs.write(Register::MCMD, MCMD_READ);
        let done = self.wait_mii();
        self.regs.write(Register::MCMD, 0);
        done?;
        Ok(self.regs.read(Register::MRDD) as u16)
    }

    /// Write a register over the MII management interface.
    fn smi_write(&mut self, reg: u8, val: u16) -> Result<(), Error> {
        self.regs.write(Register::MADR, self.mii_address(reg));
        self.regs.write(Register::MWTD, u32::from(val));
        self.wait_mii()
    }
}

impl<REGS, DELAY> Emac<'_, REGS, DELAY>
where
    REGS: EmacRegisters,
{
    fn mii_address(&self, reg: u8) -> u32 {
        u32::from(self.phy_address & 0x1F) << 8 | u32::from(reg & 0x1F)
    }

    fn wait_mii(&self) -> Result<(), Error> {
        for _ in 0..self.timeouts.mii_busy_polls {
            if self.regs.read(Register::MIND) & MIND_BUSY == 0 {
                return Ok(());
            }
        }
        Err(Error::MiiTimeout)
    }
}
