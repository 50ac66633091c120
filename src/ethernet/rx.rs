//! Receive ring
//!
//! The EMAC owns `RxProduceIndex` and advances it after storing a fragment.
//! Software owns `RxConsumeIndex` and hands a slot back by advancing it.

use core::fmt;
use core::sync::atomic::{self, Ordering};

use super::descriptor::{RxInfo, RxStatus, RX_CTRL_INT};
use super::registers::{EmacRegisters, Register};
use super::ring::{bus_address, DescriptorRing};
use super::MAX_FRAME_LEN;

/// Errors that can occur during RX
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    /// Receiving would block
    WouldBlock,
    /// The caller's buffer is shorter than the frame
    Truncated,
    /// The frame was received with errors and dropped
    Frame(RxInfo),
}

impl fmt::Display for RxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RxError::WouldBlock => f.write_str("no frame received"),
            RxError::Truncated => f.write_str("receive buffer too short"),
            RxError::Frame(info) => write!(f, "bad frame: {:?}", info),
        }
    }
}

/// An RX descriptor ring.
pub type RxDescriptorRing<'rx> = DescriptorRing<'rx, RxStatus>;

/// Rx DMA state
pub struct RxRing<'a> {
    ring: RxDescriptorRing<'a>,
}

impl<'a> RxRing<'a> {
    pub(crate) fn new(ring: RxDescriptorRing<'a>) -> Self {
        RxRing { ring }
    }

    /// Number of descriptors in the ring
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Point every descriptor at its buffer and hand the ring to the EMAC.
    pub(crate) fn init<R: EmacRegisters>(&mut self, regs: &R) {
        for (desc, status, buffer) in self.ring.entries_mut() {
            desc.set_packet(bus_address(buffer.0.as_ptr()));
            desc.set_control(RX_CTRL_INT | (MAX_FRAME_LEN as u32 - 1));
            status.clear();
        }

        regs.write(
            Register::RxDescriptor,
            bus_address(self.ring.descriptors_start_address()),
        );
        regs.write(
            Register::RxStatus,
            bus_address(self.ring.status_start_address()),
        );
        regs.write(Register::RxDescriptorNumber, self.ring.len() as u32 - 1);

        // Descriptors must be in memory before the EMAC fetches them
        atomic::compiler_fence(Ordering::Release);
        regs.write(Register::RxConsumeIndex, 0);
    }

    /// Slot software will read next
    pub fn consume_index<R: EmacRegisters>(&self, regs: &R) -> usize {
        regs.read(Register::RxConsumeIndex) as usize % self.ring.len()
    }

    /// Slot the EMAC will fill next
    pub fn produce_index<R: EmacRegisters>(&self, regs: &R) -> usize {
        regs.read(Register::RxProduceIndex) as usize % self.ring.len()
    }

    /// Check if a received frame is waiting in the ring
    pub fn is_available<R: EmacRegisters>(&self, regs: &R) -> bool {
        self.consume_index(regs) != self.produce_index(regs)
    }

    /// Status entry of the slot at the consume index
    pub fn current_status<R: EmacRegisters>(&self, regs: &R) -> &RxStatus {
        atomic::compiler_fence(Ordering::Acquire);
        self.ring.status(self.consume_index(regs))
    }

    /// Copy the frame at the consume index into `buf`. `None` copies nothing,
    /// which together with [`advance`](Self::advance) discards the frame.
    ///
    /// Returns the number of bytes copied: the frame length, or the length of
    /// `buf` if that is shorter. A length beyond the slot buffer is clamped to
    /// [`MAX_FRAME_LEN`].
    pub fn read<R: EmacRegisters>(
        &self,
        regs: &R,
        buf: Option<&mut [u8]>,
    ) -> usize {
        let index = self.consume_index(regs);
        atomic::compiler_fence(Ordering::Acquire);

        match buf {
            Some(buf) => {
                let len = buf
                    .len()
                    .min(self.ring.status(index).len())
                    .min(MAX_FRAME_LEN);
                buf[..len].copy_from_slice(&self.ring.buffer(index)[..len]);
                len
            }
            None => 0,
        }
    }

    /// Release the slot at the consume index back to the EMAC.
    pub fn advance<R: EmacRegisters>(&self, regs: &R) {
        let next = self.ring.next_index(self.consume_index(regs));

        // Reads of the buffer must complete before the EMAC may refill it
        atomic::compiler_fence(Ordering::Release);
        regs.write(Register::RxConsumeIndex, next as u32);
    }

    /// The frame at the consume index, in place. Only meaningful while
    /// [`is_available`](Self::is_available) holds.
    #[cfg_attr(not(feature = "smoltcp"), allow(dead_code))]
    pub(crate) fn frame_mut<R: EmacRegisters>(
        &mut self,
        regs: &R,
    ) -> &mut [u8] {
        let index = self.consume_index(regs);
        atomic::compiler_fence(Ordering::Acquire);
        let length = self.ring.status(index).len().min(MAX_FRAME_LEN);
        let (_, buffer) = self.ring.get_mut(index);
        &mut buffer[..length]
    }

    /// Receive the next frame in place, or return [`Err`] immediately.
    ///
    /// The slot is released when the returned [`RxPacket`] is dropped. Frames
    /// with errors are released at once and reported as
    /// [`RxError::Frame`].
    pub fn recv_next<'r, R: EmacRegisters>(
        &'r mut self,
        regs: &'r R,
    ) -> Result<RxPacket<'r, R>, RxError> {
        if !self.is_available(regs) {
            return Err(RxError::WouldBlock);
        }

        let index = self.consume_index(regs);
        let next = self.ring.next_index(index) as u32;
        let status = self.current_status(regs);
        let flags = status.flags();
        let length = status.len();

        if flags.intersects(RxInfo::FRAME_ERRORS)
            || !flags.contains(RxInfo::LAST)
        {
            self.advance(regs);
            return Err(RxError::Frame(flags));
        }

        let (_, buffer) = self.ring.get_mut(index);
        Ok(RxPacket {
            buffer,
            length: length.min(MAX_FRAME_LEN),
            regs,
            next,
        })
    }

    /// Bus address of the buffer behind descriptor `index`
    pub fn buffer_address(&self, index: usize) -> u32 {
        self.ring.descriptor(index).packet()
    }

    #[cfg(test)]
    pub(crate) fn ring(&self) -> &RxDescriptorRing<'a> {
        &self.ring
    }

    #[cfg(test)]
    pub(crate) fn deliver(&mut self, index: usize, frame: &[u8], info: RxInfo) {
        let (_, buffer) = self.ring.get_mut(index);
        buffer[..frame.len()].copy_from_slice(frame);
        self.ring
            .status_mut(index)
            .set_info(info.bits() | (frame.len() as u32 - 1));
    }
}

/// A received frame, including its FCS.
///
/// This packet implements [Deref<\[u8\]>](core::ops::Deref) and should be used
/// as a slice. Dropping it releases the slot to the EMAC.
pub struct RxPacket<'a, R: EmacRegisters> {
    buffer: &'a mut [u8],
    length: usize,
    regs: &'a R,
    next: u32,
}

impl<R: EmacRegisters> core::ops::Deref for RxPacket<'_, R> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buffer[..self.length]
    }
}

impl<R: EmacRegisters> core::ops::DerefMut for RxPacket<'_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer[..self.length]
    }
}

impl<R: EmacRegisters> Drop for RxPacket<'_, R> {
    fn drop(&mut self) {
        atomic::compiler_fence(Ordering::Release);
        self.regs.write(Register::RxConsumeIndex, self.next);
    }
}

impl<R: EmacRegisters> RxPacket<'_, R> {
    /// Pass the received packet back to the DMA engine.
    pub fn free(self) {
        drop(self)
    }

    /// The frame without its trailing frame check sequence
    pub fn payload(&self) -> &[u8] {
        &self.buffer[..self.length.saturating_sub(4)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethernet::ring::DesRing;
    use crate::ethernet::sim::SimulatedEmac;

    fn check_init<const N: usize>() {
        let mut storage: DesRing<N, 2> = DesRing::new();
        let (rx, _) = storage.split();
        let mut ring = RxRing::new(rx);
        let regs = SimulatedEmac::new();
        regs.write(Register::RxConsumeIndex, 1);

        ring.init(&regs);

        assert_eq!(regs.read(Register::RxConsumeIndex), 0);
        assert_eq!(regs.read(Register::RxDescriptorNumber), N as u32 - 1);

        for i in 0..N {
            let desc = ring.ring().descriptor(i);
            assert_eq!(
                desc.control(),
                RX_CTRL_INT | (MAX_FRAME_LEN as u32 - 1)
            );
            assert_eq!(ring.ring().status(i).info(), 0);

            // distinct, non-overlapping buffers
            let a = ring.buffer_address(i);
            assert_eq!(a, bus_address(ring.ring().buffer(i).as_ptr()));
            for j in (i + 1)..N {
                let b = ring.buffer_address(j);
                let distance = if a > b { a - b } else { b - a };
                assert!(distance as usize >= MAX_FRAME_LEN);
            }
        }
    }

    #[test]
    fn init_points_descriptors_at_distinct_buffers() {
        check_init::<2>();
        check_init::<4>();
        check_init::<8>();
    }

    fn check_wrap<const N: usize>() {
        let mut storage: DesRing<N, 2> = DesRing::new();
        let (rx, _) = storage.split();
        let mut ring = RxRing::new(rx);
        let regs = SimulatedEmac::new();
        ring.init(&regs);

        for step in 1..=N {
            ring.advance(&regs);
            assert_eq!(ring.consume_index(&regs), step % N);
        }
        assert_eq!(regs.read(Register::RxConsumeIndex), 0);
    }

    #[test]
    fn advance_wraps_after_n_steps() {
        check_wrap::<2>();
        check_wrap::<3>();
        check_wrap::<4>();
        check_wrap::<7>();
    }

    #[test]
    fn read_copies_frame_or_discards() {
        let mut storage: DesRing<4, 2> = DesRing::new();
        let (rx, _) = storage.split();
        let mut ring = RxRing::new(rx);
        let regs = SimulatedEmac::new();
        ring.init(&regs);
        assert!(!ring.is_available(&regs));

        ring.deliver(0, &[1, 2, 3, 4, 5, 6, 7, 8], RxInfo::LAST);
        regs.write(Register::RxProduceIndex, 1);
        assert!(ring.is_available(&regs));

        let mut buf = [0u8; 16];
        assert_eq!(ring.read(&regs, Some(&mut buf)), 8);
        assert_eq!(&buf[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut short = [0u8; 3];
        assert_eq!(ring.read(&regs, Some(&mut short)), 3);
        assert_eq!(short, [1, 2, 3]);

        assert_eq!(ring.read(&regs, None), 0);
        ring.advance(&regs);
        assert!(!ring.is_available(&regs));
    }

    #[test]
    fn read_clamps_oversized_length_to_slot_buffer() {
        let mut storage: DesRing<2, 2> = DesRing::new();
        let (rx, _) = storage.split();
        let mut ring = RxRing::new(rx);
        let regs = SimulatedEmac::new();
        ring.init(&regs);

        // the size field is 11 bits wide and can exceed the buffer
        ring.ring.status_mut(0).set_info(RxInfo::LAST.bits() | 0x7FF);
        regs.write(Register::RxProduceIndex, 1);
        assert_eq!(ring.current_status(&regs).len(), 0x800);

        let mut buf = [0u8; 2048];
        assert_eq!(ring.read(&regs, Some(&mut buf)), MAX_FRAME_LEN);
        assert_eq!(ring.frame_mut(&regs).len(), MAX_FRAME_LEN);
    }

    #[test]
    fn recv_next_releases_slot_on_drop() {
        let mut storage: DesRing<4, 2> = DesRing::new();
        let (rx, _) = storage.split();
        let mut ring = RxRing::new(rx);
        let regs = SimulatedEmac::new();
        ring.init(&regs);

        assert_eq!(ring.recv_next(&regs).err(), Some(RxError::WouldBlock));

        let frame = [0xAAu8; 64];
        ring.deliver(0, &frame, RxInfo::LAST | RxInfo::RANGE_ERROR);
        ring.deliver(
            1,
            &frame,
            RxInfo::LAST | RxInfo::CRC_ERROR | RxInfo::ERROR,
        );
        regs.write(Register::RxProduceIndex, 2);

        {
            let packet = ring.recv_next(&regs).unwrap();
            assert_eq!(packet.len(), 64);
            assert_eq!(packet.payload().len(), 60);
            assert_eq!(regs.read(Register::RxConsumeIndex), 0);
        }
        assert_eq!(regs.read(Register::RxConsumeIndex), 1);

        match ring.recv_next(&regs) {
            Err(RxError::Frame(info)) => {
                assert!(info.contains(RxInfo::CRC_ERROR))
            }
            _ => panic!("expected a frame error"),
        }
        assert_eq!(regs.read(Register::RxConsumeIndex), 2);
        assert!(!ring.is_available(&regs));
    }
}
