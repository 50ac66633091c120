//! Descriptor ring storage
//!
//! [`DesRing`] holds all descriptor, status and buffer memory for both
//! directions. It is usually placed in the AHB SRAM with a `#[link_section]`
//! attribute, since the EMAC DMA cannot reach the CPU local SRAM.

use super::descriptor::{Descriptor, FrameBuffer, RxStatus, TxStatus};

/// Descriptor, status and buffer memory for `RD` receive and `TD` transmit
/// descriptors.
#[repr(C)]
pub struct DesRing<const RD: usize, const TD: usize> {
    rx_descriptors: [Descriptor; RD],
    rx_status: [RxStatus; RD],
    tx_descriptors: [Descriptor; TD],
    tx_status: [TxStatus; TD],
    rx_buffers: [FrameBuffer; RD],
    tx_buffers: [FrameBuffer; TD],
}

impl<const RD: usize, const TD: usize> Default for DesRing<RD, TD> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const RD: usize, const TD: usize> DesRing<RD, TD> {
    pub const fn new() -> Self {
        // A ring of one descriptor can never hold a frame
        assert!(RD >= 2 && TD >= 2);

        DesRing {
            rx_descriptors: [Descriptor::new(); RD],
            rx_status: [RxStatus::new(); RD],
            tx_descriptors: [Descriptor::new(); TD],
            tx_status: [TxStatus::new(); TD],
            rx_buffers: [FrameBuffer::new(); RD],
            tx_buffers: [FrameBuffer::new(); TD],
        }
    }

    /// Splits the storage into its receive and transmit rings.
    pub(crate) fn split(
        &mut self,
    ) -> (DescriptorRing<'_, RxStatus>, DescriptorRing<'_, TxStatus>) {
        (
            DescriptorRing::new(
                &mut self.rx_descriptors,
                &mut self.rx_status,
                &mut self.rx_buffers,
            ),
            DescriptorRing::new(
                &mut self.tx_descriptors,
                &mut self.tx_status,
                &mut self.tx_buffers,
            ),
        )
    }
}

/// Descriptors with their status entries and buffers, all indexed alike.
pub struct DescriptorRing<'data, S> {
    descriptors: &'data mut [Descriptor],
    status: &'data mut [S],
    buffers: &'data mut [FrameBuffer],
}

impl<'data, S> DescriptorRing<'data, S> {
    pub fn new(
        descriptors: &'data mut [Descriptor],
        status: &'data mut [S],
        buffers: &'data mut [FrameBuffer],
    ) -> Self {
        assert!(descriptors.len() == status.len());
        assert!(descriptors.len() == buffers.len());
        assert!(descriptors.len() >= 2);

        Self {
            descriptors,
            status,
            buffers,
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Index following `index`, wrapping at the end of the ring
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.len()
    }

    pub fn descriptor(&self, index: usize) -> &Descriptor {
        &self.descriptors[index]
    }

    pub fn status(&self, index: usize) -> &S {
        &self.status[index]
    }

    pub fn status_mut(&mut self, index: usize) -> &mut S {
        &mut self.status[index]
    }

    pub fn buffer(&self, index: usize) -> &[u8] {
        &self.buffers[index].0
    }

    pub fn get_mut(&mut self, index: usize) -> (&mut Descriptor, &mut [u8]) {
        (&mut self.descriptors[index], &mut self.buffers[index].0)
    }

    pub fn entries_mut(
        &mut self,
    ) -> impl Iterator<Item = (&mut Descriptor, &mut S, &mut FrameBuffer)> {
        self.descriptors
            .iter_mut()
            .zip(self.status.iter_mut())
            .zip(self.buffers.iter_mut())
            .map(|((d, s), b)| (d, s, b))
    }

    pub fn descriptors_start_address(&self) -> *const Descriptor {
        self.descriptors.as_ptr()
    }

    pub fn status_start_address(&self) -> *const S {
        self.status.as_ptr()
    }
}

/// 32-bit bus address of a DMA visible object
pub(crate) fn bus_address<T>(ptr: *const T) -> u32 {
    ptr as usize as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lengths() {
        let mut storage: DesRing<4, 3> = DesRing::new();
        let (rx, tx) = storage.split();
        assert_eq!(rx.len(), 4);
        assert_eq!(tx.len(), 3);
        assert_eq!(rx.next_index(3), 0);
        assert_eq!(tx.next_index(1), 2);
        assert_eq!(tx.next_index(2), 0);
    }

    #[test]
    fn status_array_is_eight_byte_aligned() {
        let mut storage: DesRing<3, 2> = DesRing::new();
        let (rx, _) = storage.split();
        assert_eq!(rx.status_start_address() as usize % 8, 0);
        assert_eq!(rx.descriptors_start_address() as usize % 4, 0);
    }
}
