//! CRC-8 and CRC-16 checksums for frame validation.
//!
//! FLAC frame headers are protected by CRC-8 (polynomial 0x07) and whole
//! frames by CRC-16 (polynomial 0x8005), both with a zero initial value,
//! per RFC 9639 section 9. Lookup tables are generated at compile time.

const CRC8_POLY: u8 = 0x07;
const CRC16_POLY: u16 = 0x8005;

const CRC8_TABLE: [u8; 256] = build_crc8_table();
const CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC-8 of a byte slice.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc = CRC8_TABLE[(crc ^ byte) as usize];
    }
    crc
}

/// Compute the CRC-16 of a byte slice.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc = (crc << 8) ^ CRC16_TABLE[(((crc >> 8) as u8) ^ byte) as usize];
    }
    crc
}

/// Incremental CRC-8 and CRC-16 accumulator pair.
///
/// The frame CRC-16 covers every byte the header CRC-8 covers plus the rest
/// of the frame, so both accumulators usually advance together; the header's
/// trailing CRC-8 byte itself is fed to the CRC-16 only.
#[derive(Debug, Clone, Default)]
pub struct CrcValidator {
    crc8: u8,
    crc16: u16,
}

impl CrcValidator {
    /// Create a new validator with both accumulators zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset both accumulators to zero.
    pub fn reset(&mut self) {
        self.crc8 = 0;
        self.crc16 = 0;
    }

    /// Reset only the CRC-8 accumulator.
    pub fn reset_crc8(&mut self) {
        self.crc8 = 0;
    }

    /// Reset only the CRC-16 accumulator.
    pub fn reset_crc16(&mut self) {
        self.crc16 = 0;
    }

    /// Feed one byte into both accumulators.
    pub fn feed(&mut self, byte: u8) {
        self.crc8 = CRC8_TABLE[(self.crc8 ^ byte) as usize];
        self.feed_crc16(byte);
    }

    /// Feed one byte into the CRC-16 accumulator only.
    pub fn feed_crc16(&mut self, byte: u8) {
        self.crc16 =
            (self.crc16 << 8) ^ CRC16_TABLE[(((self.crc16 >> 8) as u8) ^ byte) as usize];
    }

    /// Feed a byte slice into both accumulators.
    pub fn feed_slice(&mut self, data: &[u8]) {
        for &byte in data {
            self.feed(byte);
        }
    }

    /// Get the current CRC-8 value.
    pub fn crc8(&self) -> u8 {
        self.crc8
    }

    /// Get the current CRC-16 value.
    pub fn crc16(&self) -> u16 {
        self.crc16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_empty_and_zeros() {
        assert_eq!(crc8(&[]), 0);
        assert_eq!(crc8(&[0, 0, 0, 0]), 0);
    }

    #[test]
    fn test_crc8_single_byte() {
        // 0x01 shifted through the polynomial by hand.
        assert_eq!(crc8(&[0x01]), 0x07);
    }

    #[test]
    fn test_crc16_single_byte() {
        assert_eq!(crc16(&[0x01]), 0x8005);
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = [0xFF, 0xF8, 0xC9, 0x18, 0x00];
        let mut validator = CrcValidator::new();
        validator.feed_slice(&data);
        assert_eq!(validator.crc8(), crc8(&data));
        assert_eq!(validator.crc16(), crc16(&data));
    }

    #[test]
    fn test_reset() {
        let mut validator = CrcValidator::new();
        validator.feed(0xAB);
        validator.reset();
        assert_eq!(validator.crc8(), 0);
        assert_eq!(validator.crc16(), 0);
    }

    #[test]
    fn test_crc16_only_feed() {
        let mut validator = CrcValidator::new();
        validator.feed(0x42);
        let crc8_before = validator.crc8();
        validator.feed_crc16(0x99);
        assert_eq!(validator.crc8(), crc8_before);
        assert_eq!(validator.crc16(), crc16(&[0x42, 0x99]));
    }

    #[test]
    fn test_bit_flip_changes_crc() {
        let good = [0xFF, 0xF8, 0xC9, 0x18];
        let bad = [0xFF, 0xF8, 0xC9, 0x19];
        assert_ne!(crc8(&good), crc8(&bad));
        assert_ne!(crc16(&good), crc16(&bad));
    }
}
