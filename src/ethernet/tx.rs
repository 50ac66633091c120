//! Transmit ring
//!
//! Software owns `TxProduceIndex` and queues a frame by advancing it. The
//! EMAC owns `TxConsumeIndex` and advances it once a frame has been sent.

use core::fmt;
use core::sync::atomic::{self, Ordering};

use super::descriptor::{TxControl, TxStatus, TX_CTRL_SIZE};
use super::registers::{EmacRegisters, Register};
use super::ring::{bus_address, DescriptorRing};
use super::MAX_FRAME_LEN;

/// Errors that can occur during TX
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// Ring buffer is full
    WouldBlock,
    /// Frame is empty or longer than a DMA buffer
    FrameSize(usize),
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::WouldBlock => f.write_str("transmit ring full"),
            TxError::FrameSize(len) => {
                write!(f, "frame of {} bytes does not fit a buffer", len)
            }
        }
    }
}

/// A TX descriptor ring.
pub type TxDescriptorRing<'tx> = DescriptorRing<'tx, TxStatus>;

/// Tx DMA state
pub struct TxRing<'a> {
    ring: TxDescriptorRing<'a>,
}

impl<'a> TxRing<'a> {
    pub(crate) fn new(ring: TxDescriptorRing<'a>) -> Self {
        TxRing { ring }
    }

    /// Number of descriptors in the ring
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Point every descriptor at its buffer and hand the ring to the EMAC.
    pub(crate) fn init<R: EmacRegisters>(&mut self, regs: &R) {
        for (desc, status, buffer) in self.ring.entries_mut() {
            desc.set_packet(bus_address(buffer.0.as_ptr()));
            desc.set_control(0);
            status.clear();
        }

        regs.write(
            Register::TxDescriptor,
            bus_address(self.ring.descriptors_start_address()),
        );
        regs.write(
            Register::TxStatus,
            bus_address(self.ring.status_start_address()),
        );
        regs.write(Register::TxDescriptorNumber, self.ring.len() as u32 - 1);

        atomic::compiler_fence(Ordering::Release);
        regs.write(Register::TxProduceIndex, 0);
    }

    /// Slot software will fill next
    pub fn produce_index<R: EmacRegisters>(&self, regs: &R) -> usize {
        regs.read(Register::TxProduceIndex) as usize % self.ring.len()
    }

    /// Slot the EMAC will send next
    pub fn consume_index<R: EmacRegisters>(&self, regs: &R) -> usize {
        regs.read(Register::TxConsumeIndex) as usize % self.ring.len()
    }

    /// Check if a slot is free for a new frame.
    ///
    /// The ring is full when the produce index sits right behind the consume
    /// index, modulo the ring length.
    pub fn is_available<R: EmacRegisters>(&self, regs: &R) -> bool {
        let len = self.ring.len();
        let consume = self.consume_index(regs);
        self.produce_index(regs) != (consume + len - 1) % len
    }

    /// Copy `frame` into the buffer at the produce index and mark it as a
    /// complete frame. The caller checks [`is_available`](Self::is_available)
    /// first; only the frame length is checked here.
    pub fn write<R: EmacRegisters>(
        &mut self,
        regs: &R,
        frame: &[u8],
    ) -> Result<(), TxError> {
        let buffer = self.prepare(regs, frame.len())?;
        buffer.copy_from_slice(frame);
        self.commit(regs, frame.len());
        Ok(())
    }

    /// Buffer of `len` bytes at the produce index, to be filled in place and
    /// then passed to [`commit`](Self::commit).
    pub(crate) fn prepare<R: EmacRegisters>(
        &mut self,
        regs: &R,
        len: usize,
    ) -> Result<&mut [u8], TxError> {
        if len == 0 || len > MAX_FRAME_LEN {
            return Err(TxError::FrameSize(len));
        }
        Ok(self.frame_buffer(regs, len))
    }

    /// Buffer at the produce index, cut to `len` bytes or the buffer size.
    pub(crate) fn frame_buffer<R: EmacRegisters>(
        &mut self,
        regs: &R,
        len: usize,
    ) -> &mut [u8] {
        let index = self.produce_index(regs);
        let (_, buffer) = self.ring.get_mut(index);
        &mut buffer[..len.min(MAX_FRAME_LEN)]
    }

    /// Write the control word for a frame of `len` bytes at the produce index.
    pub(crate) fn commit<R: EmacRegisters>(&mut self, regs: &R, len: usize) {
        let index = self.produce_index(regs);
        let (desc, _) = self.ring.get_mut(index);
        let control = TxControl::INTERRUPT | TxControl::LAST;
        let size = len.clamp(1, MAX_FRAME_LEN) as u32 - 1;
        desc.set_control((size & TX_CTRL_SIZE) | control.bits());
    }

    /// Queue the slot at the produce index for transmission.
    pub fn advance<R: EmacRegisters>(&self, regs: &R) {
        let next = self.ring.next_index(self.produce_index(regs));

        // Frame data and control word before the index update
        atomic::compiler_fence(Ordering::Release);
        regs.write(Register::TxProduceIndex, next as u32);
    }

    /// Prepare the next frame of `length` bytes for sending, or return
    /// [`Err`] immediately.
    pub fn send_next<'r, R: EmacRegisters>(
        &'r mut self,
        regs: &'r R,
        length: usize,
    ) -> Result<TxPacket<'r, 'a, R>, TxError> {
        if !self.is_available(regs) {
            return Err(TxError::WouldBlock);
        }
        self.prepare(regs, length)?;
        Ok(TxPacket {
            ring: self,
            regs,
            length,
        })
    }

    /// Status of the frame most recently sent by the EMAC
    pub fn last_status<R: EmacRegisters>(&self, regs: &R) -> &TxStatus {
        let len = self.ring.len();
        let last = (self.consume_index(regs) + len - 1) % len;
        atomic::compiler_fence(Ordering::Acquire);
        self.ring.status(last)
    }

    /// Bus address of the buffer behind descriptor `index`
    pub fn buffer_address(&self, index: usize) -> u32 {
        self.ring.descriptor(index).packet()
    }

    #[cfg(test)]
    pub(crate) fn ring(&self) -> &TxDescriptorRing<'a> {
        &self.ring
    }
}

/// A frame being assembled in a TX buffer.
///
/// This packet implements [Deref<\[u8\]>](core::ops::Deref) and should be used
/// as a slice. Nothing is sent until [`send`](TxPacket::send) is called.
pub struct TxPacket<'r, 'a, R: EmacRegisters> {
    ring: &'r mut TxRing<'a>,
    regs: &'r R,
    length: usize,
}

impl<R: EmacRegisters> core::ops::Deref for TxPacket<'_, '_, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        let index = self.ring.produce_index(self.regs);
        &self.ring.ring.buffer(index)[..self.length]
    }
}

impl<R: EmacRegisters> core::ops::DerefMut for TxPacket<'_, '_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        let index = self.ring.produce_index(self.regs);
        let (_, buffer) = self.ring.ring.get_mut(index);
        &mut buffer[..self.length]
    }
}

impl<R: EmacRegisters> TxPacket<'_, '_, R> {
    /// Hand the frame to the EMAC.
    pub fn send(self) {
        self.ring.commit(self.regs, self.length);
        self.ring.advance(self.regs);
    }
}
