//! Cyclic Redundancy Check (CRC)
//!
//! Software CRC-32 using the IEEE 802.3 polynomial, as computed by the
//! Ethernet MAC over the destination address of a frame. The EMAC hash
//! filter is indexed by bits [28:23] of this value.
//!
//! The register is kept MSB first while the data is shifted in LSB first,
//! one nibble at a time. No reflection and no final XOR are applied, so the
//! result is *not* the frame check sequence as transmitted on the wire.
//!
//! ```
//! use lpc17xx_hal::crc::{crc32, Crc32};
//!
//! let mac = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
//! assert_eq!(crc32(&mac), 0x16CF_FD0D);
//!
//! let mut crc = Crc32::new();
//! crc.update(&mac[..2]);
//! crc.update(&mac[2..]);
//! assert_eq!(crc.finish(), 0x16CF_FD0D);
//! ```

/// IEEE 802.3 generator polynomial
pub const POLYNOMIAL: u32 = 0x04C1_1DB7;

/// Initial value of the shift register
pub const INITIAL: u32 = 0xFFFF_FFFF;

/// Incremental CRC-32 state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    /// Starts a new calculation.
    pub const fn new() -> Self {
        Crc32 { state: INITIAL }
    }

    /// Feeds `data` into the calculation.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            // low nibble first
            self.state = feed_nibble(self.state, byte & 0xF);
            self.state = feed_nibble(self.state, byte >> 4);
        }
    }

    /// Returns the CRC of all data fed so far. The state is left untouched,
    /// so more data may be fed afterwards.
    pub const fn finish(&self) -> u32 {
        self.state
    }

    /// Restarts the calculation.
    pub fn reset(&mut self) {
        self.state = INITIAL;
    }
}

/// Shifts four data bits into `crc`, least significant bit first.
const fn feed_nibble(mut crc: u32, nibble: u8) -> u32 {
    let mut bit = 0;
    while bit < 4 {
        let feedback = (crc >> 31) ^ ((nibble as u32 >> bit) & 1);
        crc <<= 1;
        if feedback != 0 {
            crc ^= POLYNOMIAL;
        }
        bit += 1;
    }
    crc
}

/// Calculates the CRC-32 of `data` in one go.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finish()
}

/// Returns the 6-bit hash filter index of a MAC address: bits [28:23] of its
/// CRC.
pub fn hash_index(mac: &[u8; 6]) -> u8 {
    ((crc32(mac) >> 23) & 0x3F) as u8
}
