//! DMA descriptor and status layouts
//!
//! The EMAC reads descriptors and writes status entries by DMA, so every
//! word is accessed through volatile operations. All arrays must live in
//! memory the EMAC DMA can reach (the AHB SRAM banks).

use volatile_register::{RO, RW};

use super::MAX_FRAME_LEN;

/// `N` little endian words shared with the EMAC DMA.
#[repr(C)]
#[repr(align(4))]
#[derive(Clone, Copy)]
pub struct RawDescriptor<const N: usize> {
    pub(crate) words: [u32; N],
}

impl<const N: usize> Default for RawDescriptor<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RawDescriptor<N> {
    pub const fn new() -> Self {
        Self { words: [0; N] }
    }

    fn r(&self, n: usize) -> &RO<u32> {
        let ro = &self.words[n] as *const _ as *const RO<u32>;
        unsafe { &*ro }
    }

    fn rw(&mut self, n: usize) -> &mut RW<u32> {
        let rw = &mut self.words[n] as *mut _ as *mut RW<u32>;
        unsafe { &mut *rw }
    }

    pub fn read(&self, n: usize) -> u32 {
        self.r(n).read()
    }

    pub fn write(&mut self, n: usize, value: u32) {
        // NOTE(unsafe) single word volatile store into memory we own
        unsafe { self.rw(n).write(value) }
    }
}

const PACKET: usize = 0;
const CONTROL: usize = 1;
const INFO: usize = 0;
const HASH_CRC: usize = 1;

/// Receive and transmit descriptor: buffer address and control word.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct Descriptor {
    raw: RawDescriptor<2>,
}

impl Descriptor {
    pub const fn new() -> Self {
        Self {
            raw: RawDescriptor::new(),
        }
    }

    /// Bus address of the frame buffer
    pub fn packet(&self) -> u32 {
        self.raw.read(PACKET)
    }

    pub(crate) fn set_packet(&mut self, address: u32) {
        self.raw.write(PACKET, address);
    }

    /// Control word: `size - 1` in the low bits, flags above
    pub fn control(&self) -> u32 {
        self.raw.read(CONTROL)
    }

    pub(crate) fn set_control(&mut self, control: u32) {
        self.raw.write(CONTROL, control);
    }
}

/// Receive status entry, written by the EMAC when a fragment is stored.
#[repr(C)]
#[repr(align(8))]
#[derive(Clone, Copy, Default)]
pub struct RxStatus {
    raw: RawDescriptor<2>,
}

impl RxStatus {
    pub const fn new() -> Self {
        Self {
            raw: RawDescriptor::new(),
        }
    }

    /// Raw status information word
    pub fn info(&self) -> u32 {
        self.raw.read(INFO)
    }

    /// Hash CRC of the source (bits 8:0) and destination (bits 24:16)
    /// addresses
    pub fn hash_crc(&self) -> u32 {
        self.raw.read(HASH_CRC)
    }

    /// Status flags of the fragment
    pub fn flags(&self) -> RxInfo {
        RxInfo::from_bits_truncate(self.info())
    }

    /// Number of bytes in the fragment, including the FCS
    pub fn len(&self) -> usize {
        (self.info() & RX_INFO_SIZE) as usize + 1
    }

    pub(crate) fn clear(&mut self) {
        self.raw.write(INFO, 0);
        self.raw.write(HASH_CRC, 0);
    }

    #[cfg(test)]
    pub(crate) fn set_info(&mut self, info: u32) {
        self.raw.write(INFO, info);
    }
}

/// Transmit status entry, written by the EMAC after transmission.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct TxStatus {
    raw: RawDescriptor<1>,
}

impl TxStatus {
    pub const fn new() -> Self {
        Self {
            raw: RawDescriptor::new(),
        }
    }

    /// Status flags of the transmission
    pub fn flags(&self) -> TxInfo {
        TxInfo::from_bits_truncate(self.raw.read(INFO))
    }

    /// Number of collisions before the frame was sent
    pub fn collisions(&self) -> u8 {
        ((self.raw.read(INFO) & TX_INFO_COL_CNT) >> 21) as u8
    }

    pub(crate) fn clear(&mut self) {
        self.raw.write(INFO, 0);
    }
}

/// One DMA frame buffer
#[repr(C)]
#[repr(align(4))]
#[derive(Clone, Copy)]
pub struct FrameBuffer(pub(crate) [u8; MAX_FRAME_LEN]);

impl FrameBuffer {
    pub const fn new() -> Self {
        FrameBuffer([0; MAX_FRAME_LEN])
    }
}

/// Size field of RX descriptor control and RX status info words
pub(crate) const RX_CTRL_SIZE: u32 = 0x7FF;
pub(crate) const RX_INFO_SIZE: u32 = 0x7FF;
/// Size field of the TX descriptor control word
pub(crate) const TX_CTRL_SIZE: u32 = 0x7FF;
pub(crate) const TX_INFO_COL_CNT: u32 = 0xF << 21;

/// Generate an interrupt when the RX fragment has been stored
pub(crate) const RX_CTRL_INT: u32 = 1 << 31;

bitflags::bitflags! {
    /// Flags of the TX descriptor control word
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct TxControl: u32 {
        /// Per-frame override of the MAC2 settings below
        const OVERRIDE = 1 << 26;
        /// Allow frames larger than MAXF
        const HUGE = 1 << 27;
        /// Pad short frames to 64 bytes
        const PAD = 1 << 28;
        /// Append the CRC
        const CRC = 1 << 29;
        /// Last fragment of the frame
        const LAST = 1 << 30;
        /// Generate an interrupt when sent
        const INTERRUPT = 1 << 31;
    }
}

bitflags::bitflags! {
    /// Flags of an RX status info word
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RxInfo: u32 {
        /// Control frame for flow control
        const CONTROL_FRAME = 1 << 18;
        /// VLAN tagged frame
        const VLAN = 1 << 19;
        /// Frame failed the RX filter
        const FAIL_FILTER = 1 << 20;
        /// Multicast frame
        const MULTICAST = 1 << 21;
        /// Broadcast frame
        const BROADCAST = 1 << 22;
        /// CRC error
        const CRC_ERROR = 1 << 23;
        /// PHY signalled a symbol error
        const SYMBOL_ERROR = 1 << 24;
        /// Length field does not match the frame
        const LENGTH_ERROR = 1 << 25;
        /// Length field out of range, also set for Ethernet II frames
        const RANGE_ERROR = 1 << 26;
        /// Alignment error
        const ALIGNMENT_ERROR = 1 << 27;
        /// Receive overrun
        const OVERRUN = 1 << 28;
        /// No new descriptor for the next fragment
        const NO_DESCRIPTOR = 1 << 29;
        /// Last fragment of the frame
        const LAST = 1 << 30;
        /// Error summary
        const ERROR = 1 << 31;

        /// Errors that make the frame unusable. A range error alone is not
        /// one: it flags every frame carrying an EtherType.
        const FRAME_ERRORS = Self::CRC_ERROR.bits
            | Self::SYMBOL_ERROR.bits
            | Self::LENGTH_ERROR.bits
            | Self::ALIGNMENT_ERROR.bits
            | Self::OVERRUN.bits;
    }
}

bitflags::bitflags! {
    /// Flags of a TX status info word
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct TxInfo: u32 {
        /// Deferred because the medium was busy
        const DEFER = 1 << 25;
        /// Aborted after excessive deferral
        const EXCESSIVE_DEFER = 1 << 26;
        /// Aborted after excessive collisions
        const EXCESSIVE_COLLISION = 1 << 27;
        /// Out of window collision
        const LATE_COLLISION = 1 << 28;
        /// Underrun due to an AHB error
        const UNDERRUN = 1 << 29;
        /// No new descriptor for the next fragment
        const NO_DESCRIPTOR = 1 << 30;
        /// Error summary
        const ERROR = 1 << 31;
    }
}
