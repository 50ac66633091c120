//! Receive filter
//!
//! The EMAC accepts a frame when any enabled filter class matches. Besides
//! perfect matching against the station address it offers an imperfect
//! 64 bit hash table, indexed by bits [28:23] of the CRC-32 of the
//! destination address.

use crate::crc;

bitflags::bitflags! {
    /// Filter classes in `RxFilterCtrl`
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RxFilter: u32 {
        /// Accept all unicast frames
        const UNICAST = 1 << 0;
        /// Accept all broadcast frames
        const BROADCAST = 1 << 1;
        /// Accept all multicast frames
        const MULTICAST = 1 << 2;
        /// Accept unicast frames passing the hash table
        const UNICAST_HASH = 1 << 3;
        /// Accept multicast frames passing the hash table
        const MULTICAST_HASH = 1 << 4;
        /// Accept frames addressed to the station address
        const PERFECT = 1 << 5;
        /// Magic packets raise a wake-up event
        const MAGIC_PACKET_WOL = 1 << 12;
        /// Frames accepted by the filter raise a wake-up event
        const RX_FILTER_WOL = 1 << 13;
    }
}

bitflags::bitflags! {
    /// Cause of a wake-up in `RxFilterWoLStatus`
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct WolStatus: u32 {
        const UNICAST = 1 << 0;
        const BROADCAST = 1 << 1;
        const MULTICAST = 1 << 2;
        const UNICAST_HASH = 1 << 3;
        const MULTICAST_HASH = 1 << 4;
        const PERFECT = 1 << 5;
        /// Any receive filter match
        const RX_FILTER = 1 << 7;
        /// Magic packet
        const MAGIC_PACKET = 1 << 8;
    }
}

/// Location of an address in the hash table: which half and which bit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HashSlot {
    /// Bit of `HashFilterL` (hash 0 to 31)
    Low(u8),
    /// Bit of `HashFilterH` (hash 32 to 63)
    High(u8),
}

impl HashSlot {
    /// Hash table slot of a destination address
    pub fn of(mac: &[u8; 6]) -> Self {
        let index = crc::hash_index(mac);
        if index > 31 {
            HashSlot::High(index - 32)
        } else {
            HashSlot::Low(index)
        }
    }

    pub fn mask(self) -> u32 {
        match self {
            HashSlot::Low(bit) | HashSlot::High(bit) => 1 << bit,
        }
    }
}

/// Filter class a non-station address needs in the hash table
pub fn hash_class(mac: &[u8; 6]) -> RxFilter {
    if mac[0] & 0x01 != 0 {
        RxFilter::MULTICAST_HASH
    } else {
        RxFilter::UNICAST_HASH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_split_at_32() {
        assert_eq!(
            HashSlot::of(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            HashSlot::High(13)
        );
        assert_eq!(HashSlot::of(&[0xFF; 6]), HashSlot::High(30));
        assert_eq!(HashSlot::High(13).mask(), 1 << 13);
    }

    #[test]
    fn hash_class_follows_group_bit() {
        assert_eq!(
            hash_class(&[0x01, 0x00, 0x5E, 0x00, 0x00, 0x01]),
            RxFilter::MULTICAST_HASH
        );
        assert_eq!(
            hash_class(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            RxFilter::UNICAST_HASH
        );
    }

    #[test]
    fn wol_mask_matches_clear_register() {
        assert_eq!(WolStatus::all().bits(), 0x01BF);
    }
}
