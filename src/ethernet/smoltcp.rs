//! smoltcp `phy::Device` implementation for the EMAC

use embedded_hal::blocking::delay::DelayMs;
use smoltcp::phy::{self, DeviceCapabilities, Medium, RxToken, TxToken};
use smoltcp::time::Instant;

use super::emac::Emac;
use super::registers::EmacRegisters;
use super::rx::RxRing;
use super::tx::TxRing;
use super::MTU;

/// Destination, source and EtherType
const ETHERNET_HEADER_LEN: usize = 14;

/// Frame check sequence appended by the MAC
const FCS_LEN: usize = 4;

/// An Ethernet RX token that can be consumed in order to receive
/// an ethernet packet.
pub struct EthRxToken<'a, 'ring, REGS> {
    rx_ring: &'a mut RxRing<'ring>,
    regs: &'a REGS,
}

impl<REGS: EmacRegisters> RxToken for EthRxToken<'_, '_, REGS> {
    fn consume<R, F>(self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        // An `EthRxToken` is only created when `rx_available()` found a
        // complete frame without errors at the consume index
        let frame = self.rx_ring.frame_mut(self.regs);
        let len = frame.len().saturating_sub(FCS_LEN);
        let result = f(&mut frame[..len]);
        self.rx_ring.advance(self.regs);
        result
    }
}

/// Just a reference to the transmit ring for sending a
/// packet later with [`TxToken::consume()`].
pub struct EthTxToken<'a, 'ring, REGS> {
    tx_ring: &'a mut TxRing<'ring>,
    regs: &'a REGS,
}

impl<REGS: EmacRegisters> TxToken for EthTxToken<'_, '_, REGS> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        // An `EthTxToken` is only created if there is a free slot
        let result = f(self.tx_ring.frame_buffer(self.regs, len));
        self.tx_ring.commit(self.regs, len);
        self.tx_ring.advance(self.regs);
        result
    }
}

impl<'a, 'ring, REGS, DELAY> phy::Device for &'a mut Emac<'ring, REGS, DELAY>
where
    REGS: EmacRegisters,
    DELAY: DelayMs<u32>,
{
    type RxToken<'token> = EthRxToken<'token, 'ring, REGS> where Self: 'token;
    type TxToken<'token> = EthTxToken<'token, 'ring, REGS> where Self: 'token;

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = MTU + ETHERNET_HEADER_LEN;
        caps.max_burst_size = Some(1);
        caps
    }

    fn receive(
        &mut self,
        _timestamp: Instant,
    ) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        if self.check_transmit_index() && self.rx_available() {
            let (regs, rx_ring, tx_ring) = self.parts();
            Some((EthRxToken { rx_ring, regs }, EthTxToken { tx_ring, regs }))
        } else {
            None
        }
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if self.check_transmit_index() {
            let (regs, _, tx_ring) = self.parts();
            Some(EthTxToken { tx_ring, regs })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethernet::descriptor::RxInfo;
    use crate::ethernet::registers::Register;
    use crate::ethernet::ring::DesRing;
    use crate::ethernet::sim::SimulatedEmac;
    use crate::ethernet::EmacConfig;
    use smoltcp::phy::Device;

    struct NoDelay;

    impl DelayMs<u32> for NoDelay {
        fn delay_ms(&mut self, _ms: u32) {}
    }

    #[test]
    fn tokens_move_frames_through_the_rings() {
        let mut storage: DesRing<4, 4> = DesRing::new();
        let mut emac = Emac::new(SimulatedEmac::new(), NoDelay, &mut storage);
        emac.init(&EmacConfig::new()).unwrap();
        let mut device = &mut emac;
        let now = Instant::from_millis(0);

        assert!(device.receive(now).is_none());
        assert_eq!(device.capabilities().max_transmission_unit, 1514);

        let mut frame = [0u8; 64];
        frame[..6].copy_from_slice(&[0xFF; 6]);
        device.rx_ring_mut().deliver(
            0,
            &frame,
            RxInfo::LAST | RxInfo::BROADCAST,
        );
        device.regs().write(Register::RxProduceIndex, 1);

        let (rx, tx) = device.receive(now).unwrap();
        let len = rx.consume(|payload| {
            assert_eq!(&payload[..6], &[0xFF; 6]);
            payload.len()
        });
        assert_eq!(len, 60);
        tx.consume(42, |buf| buf.fill(0xA5));

        let regs = device.regs();
        assert_eq!(regs.read(Register::RxConsumeIndex), 1);
        assert_eq!(regs.read(Register::TxProduceIndex), 1);
        assert_eq!(device.tx_ring().buffer_address(0) & 0x3, 0);
    }
}
