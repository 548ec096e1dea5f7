//! Frame sync scanning, header/footer parsing, and CRC validation.
//!
//! The parser borrows a caller-positioned [`BitReader`] and owns the running
//! CRC accumulators. Per RFC 9639 §9, a header CRC-8 mismatch is a hard
//! rejection while a frame CRC-16 mismatch is advisory.

use demuxkit_core::bitstream::BitReader;
use demuxkit_core::crc::CrcValidator;
use tracing::warn;

use crate::{ChannelAssignment, FlacError, FrameFooter, FrameHeader, Result};

/// Standard block sizes; 0 marks reserved codes and the two
/// uncommon-encoding codes (`0b0110`, `0b0111`) which read extra bits.
const BLOCK_SIZE_TABLE: [u32; 16] = [
    0, 192, 576, 1152, 2304, 4608, 0, 0, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768,
];

/// Standard sample rates; index 0 defers to STREAMINFO, indices 12-14 read
/// extra bits, index 15 is forbidden.
const SAMPLE_RATE_TABLE: [u32; 16] = [
    0, 88200, 176400, 192000, 8000, 16000, 22050, 24000, 32000, 44100, 48000, 96000, 0, 0, 0, 0,
];

/// Bit depths; 0 at index 0 defers to STREAMINFO, 0 elsewhere marks the
/// reserved codes `0b011` and `0b111`.
const BIT_DEPTH_TABLE: [u32; 8] = [0, 8, 12, 0, 16, 20, 24, 0];

/// FLAC frame parser.
///
/// Drives one frame at a time in strict order: [`FrameParser::find_sync`],
/// [`FrameParser::parse_frame_header`], external subframe decode,
/// [`FrameParser::parse_frame_footer`], [`FrameParser::validate_frame`].
pub struct FrameParser<'p, 'd> {
    reader: &'p mut BitReader<'d>,
    crc: CrcValidator,
    last_sync_position: u64,
}

impl<'p, 'd> FrameParser<'p, 'd> {
    /// Create a parser over a caller-positioned reader.
    pub fn new(reader: &'p mut BitReader<'d>) -> Self {
        Self {
            reader,
            crc: CrcValidator::new(),
            last_sync_position: 0,
        }
    }

    /// Byte offset of the last sync code found.
    pub fn last_sync_position(&self) -> u64 {
        self.last_sync_position
    }

    /// Running CRC accumulators; the subframe reader feeds frame body bytes
    /// through this so [`FrameParser::validate_frame`] covers them.
    pub fn crc_mut(&mut self) -> &mut CrcValidator {
        &mut self.crc
    }

    /// Scan forward for the next frame sync code (windows 0xFFF8-0xFFFF).
    ///
    /// Auto-aligns to a byte boundary, then peeks 16-bit windows one byte
    /// at a time; on a match the reader is left at the sync start so the
    /// header parser reads (and CRCs) the sync bytes itself.
    pub fn find_sync(&mut self) -> Result<()> {
        self.reader.align_to_byte();
        while self.reader.remaining_bits() >= 16 {
            let window = self.reader.peek_bits(16)?;
            if window & 0xFFF8 == 0xFFF8 {
                self.last_sync_position = (self.reader.position() / 8) as u64;
                return Ok(());
            }
            self.reader.skip(8)?;
        }
        Err(FlacError::SyncNotFound)
    }

    /// Decode one frame header, feeding every header byte through the CRC
    /// accumulators in wire order and checking the trailing CRC-8.
    pub fn parse_frame_header(&mut self) -> Result<FrameHeader> {
        self.crc.reset();

        let sync = self.reader.read_u16()?;
        // 14-bit sync code 0b11111111111110; the mandatory-zero reserved bit
        // is masked off rather than enforced.
        if sync & 0xFFFC != 0xFFF8 {
            return Err(FlacError::InvalidSyncCode);
        }
        let is_variable_block_size = sync & 0x0001 != 0;
        self.crc.feed((sync >> 8) as u8);
        self.crc.feed((sync & 0xFF) as u8);

        let block_size_code = self.reader.read_bits(4)? as u8;
        let sample_rate_code = self.reader.read_bits(4)? as u8;
        // Forbidden pattern, rejected before any uncommon-rate expansion.
        if sample_rate_code == 0b1111 {
            return Err(FlacError::ForbiddenSampleRate);
        }
        self.crc.feed((block_size_code << 4) | sample_rate_code);

        let channel_code = self.reader.read_bits(4)? as u8;
        let bit_depth_code = self.reader.read_bits(3)? as u8;
        if self.reader.read_bit()? {
            return Err(FlacError::ReservedBitSet);
        }
        self.crc.feed((channel_code << 4) | (bit_depth_code << 1));

        let coded_number = self.parse_coded_number()?;
        let block_size = self.resolve_block_size(block_size_code)?;
        let sample_rate = self.resolve_sample_rate(sample_rate_code)?;

        let channel_assignment = match channel_code {
            0..=7 => ChannelAssignment::Independent(channel_code + 1),
            8 => ChannelAssignment::LeftSide,
            9 => ChannelAssignment::RightSide,
            10 => ChannelAssignment::MidSide,
            code => return Err(FlacError::ReservedChannelAssignment(code)),
        };

        let bit_depth = BIT_DEPTH_TABLE[bit_depth_code as usize];
        if bit_depth == 0 && bit_depth_code != 0 {
            return Err(FlacError::ReservedBitDepth(bit_depth_code));
        }
        validate_bit_depth(bit_depth)?;

        let expected = self.crc.crc8();
        let crc8 = self.reader.read_u8()?;
        // The CRC-8 byte is covered by the frame CRC-16, not by itself.
        self.crc.feed_crc16(crc8);
        if crc8 != expected {
            return Err(FlacError::CrcMismatch {
                expected,
                actual: crc8,
            });
        }

        Ok(FrameHeader {
            block_size,
            sample_rate,
            channels: channel_assignment.channel_count(),
            channel_assignment,
            bit_depth,
            coded_number,
            is_variable_block_size,
            crc8,
        })
    }

    fn resolve_block_size(&mut self, code: u8) -> Result<u32> {
        let block_size = match code {
            0b0110 => {
                let raw = self.reader.read_u8()?;
                self.crc.feed(raw);
                raw as u32 + 1
            }
            0b0111 => {
                let raw = self.reader.read_u16()?;
                self.crc.feed((raw >> 8) as u8);
                self.crc.feed((raw & 0xFF) as u8);
                raw as u32 + 1
            }
            _ => {
                let size = BLOCK_SIZE_TABLE[code as usize];
                if size == 0 {
                    return Err(FlacError::ReservedBlockSize);
                }
                size
            }
        };

        // Forbidden pattern: only reachable through the 16-bit encoding.
        if block_size == 65536 {
            return Err(FlacError::ForbiddenBlockSize);
        }
        validate_block_size(block_size)?;
        Ok(block_size)
    }

    fn resolve_sample_rate(&mut self, code: u8) -> Result<u32> {
        let sample_rate = match code {
            0b1100 => {
                let raw = self.reader.read_u8()?;
                self.crc.feed(raw);
                raw as u32 * 1000
            }
            0b1101 => {
                let raw = self.reader.read_u16()?;
                self.crc.feed((raw >> 8) as u8);
                self.crc.feed((raw & 0xFF) as u8);
                raw as u32
            }
            0b1110 => {
                let raw = self.reader.read_u16()?;
                self.crc.feed((raw >> 8) as u8);
                self.crc.feed((raw & 0xFF) as u8);
                raw as u32 * 10
            }
            _ => SAMPLE_RATE_TABLE[code as usize],
        };

        if matches!(code, 0b1100..=0b1110) && sample_rate == 0 {
            return Err(FlacError::InvalidSampleRate(0));
        }
        validate_sample_rate(sample_rate)?;
        Ok(sample_rate)
    }

    /// Decode the UTF-8-style coded frame/sample number (1-7 bytes).
    ///
    /// The 7-byte form is keyed on the literal lead byte `0xFE`, not a mask.
    /// Every byte read feeds the CRC accumulators.
    pub fn parse_coded_number(&mut self) -> Result<u64> {
        let lead = self.reader.read_u8()?;
        self.crc.feed(lead);

        let (mut value, extra_bytes) = if lead & 0x80 == 0 {
            (lead as u64, 0)
        } else if lead & 0xE0 == 0xC0 {
            ((lead & 0x1F) as u64, 1)
        } else if lead & 0xF0 == 0xE0 {
            ((lead & 0x0F) as u64, 2)
        } else if lead & 0xF8 == 0xF0 {
            ((lead & 0x07) as u64, 3)
        } else if lead & 0xFC == 0xF8 {
            ((lead & 0x03) as u64, 4)
        } else if lead & 0xFE == 0xFC {
            ((lead & 0x01) as u64, 5)
        } else if lead == 0xFE {
            (0, 6)
        } else {
            return Err(FlacError::InvalidCodedNumber);
        };

        for _ in 0..extra_bytes {
            let byte = self.reader.read_u8()?;
            self.crc.feed(byte);
            if byte & 0xC0 != 0x80 {
                return Err(FlacError::InvalidCodedNumber);
            }
            value = (value << 6) | (byte & 0x3F) as u64;
        }
        Ok(value)
    }

    /// Read the frame footer: align to a byte boundary (non-zero padding is
    /// logged, not fatal, per RFC 9639), then the big-endian CRC-16.
    pub fn parse_frame_footer(&mut self) -> Result<FrameFooter> {
        if !self.reader.is_byte_aligned() {
            let padding_bits = (8 - (self.reader.position() % 8)) as u8;
            let padding = self.reader.read_bits(padding_bits)?;
            if padding != 0 {
                warn!(padding, "non-zero padding bits before frame CRC");
            }
        }
        let crc16 = self.reader.read_u16()?;
        Ok(FrameFooter { crc16 })
    }

    /// Compare the accumulated CRC-16 against the footer.
    ///
    /// A mismatch is advisory: callers may log it and still use the frame's
    /// decoded audio.
    pub fn validate_frame(&self, footer: &FrameFooter) -> Result<()> {
        let expected = self.crc.crc16();
        if expected != footer.crc16 {
            return Err(FlacError::Crc16Mismatch {
                expected,
                actual: footer.crc16,
            });
        }
        Ok(())
    }
}

fn validate_block_size(block_size: u32) -> Result<()> {
    if (16..=65535).contains(&block_size) {
        Ok(())
    } else {
        Err(FlacError::InvalidBlockSize(block_size))
    }
}

fn validate_sample_rate(sample_rate: u32) -> Result<()> {
    if sample_rate == 0 || sample_rate <= 1_048_575 {
        Ok(())
    } else {
        Err(FlacError::InvalidSampleRate(sample_rate))
    }
}

fn validate_bit_depth(bit_depth: u32) -> Result<()> {
    if bit_depth == 0 || bit_depth <= 32 {
        Ok(())
    } else {
        Err(FlacError::InvalidBitDepth(bit_depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demuxkit_core::crc::crc8;

    /// A minimal valid header: fixed blocking, block size 4096, 44.1 kHz,
    /// 2 independent channels, 16-bit, frame number 0, correct CRC-8.
    fn build_basic_header() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xF8, 0xC9, 0x18, 0x00];
        bytes.push(crc8(&bytes));
        bytes
    }

    #[test]
    fn test_parse_basic_header() {
        let data = build_basic_header();
        let mut reader = BitReader::new(&data);
        let mut parser = FrameParser::new(&mut reader);

        let header = parser.parse_frame_header().unwrap();
        assert_eq!(header.block_size, 4096);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.channels, 2);
        assert_eq!(
            header.channel_assignment,
            ChannelAssignment::Independent(2)
        );
        assert_eq!(header.bit_depth, 16);
        assert_eq!(header.coded_number, 0);
        assert!(!header.is_variable_block_size);
    }

    #[test]
    fn test_variable_blocking_strategy_bit() {
        let mut bytes = vec![0xFF, 0xF9, 0xC9, 0x18, 0x00];
        bytes.push(crc8(&bytes));
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        let header = parser.parse_frame_header().unwrap();
        assert!(header.is_variable_block_size);
    }

    #[test]
    fn test_invalid_sync_rejected() {
        // Last of the 14 sync bits cleared.
        let data = [0xFF, 0xFC, 0xC9, 0x18, 0x00, 0x00];
        let mut reader = BitReader::new(&data);
        let mut parser = FrameParser::new(&mut reader);
        assert!(matches!(
            parser.parse_frame_header(),
            Err(FlacError::InvalidSyncCode)
        ));
    }

    #[test]
    fn test_reserved_block_size_code() {
        let mut bytes = vec![0xFF, 0xF8, 0x09, 0x18, 0x00];
        bytes.push(crc8(&bytes));
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        assert!(matches!(
            parser.parse_frame_header(),
            Err(FlacError::ReservedBlockSize)
        ));
    }

    #[test]
    fn test_uncommon_block_size_8bit() {
        // Code 0b0110: one extra byte, value + 1. 191 -> 192 samples.
        let mut bytes = vec![0xFF, 0xF8, 0x69, 0x18, 0x00, 191];
        bytes.push(crc8(&bytes));
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        let header = parser.parse_frame_header().unwrap();
        assert_eq!(header.block_size, 192);
    }

    #[test]
    fn test_uncommon_block_size_too_small() {
        // 8-bit encoded 9 resolves to 10, below the minimum of 16.
        let bytes = [0xFF, 0xF8, 0x69, 0x18, 0x00, 9, 0x00];
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        assert!(matches!(
            parser.parse_frame_header(),
            Err(FlacError::InvalidBlockSize(10))
        ));
    }

    #[test]
    fn test_uncommon_sample_rate_khz() {
        // Code 0b1100: one extra byte in kHz. 32 -> 32000 Hz.
        let mut bytes = vec![0xFF, 0xF8, 0xCC, 0x18, 0x00, 32];
        bytes.push(crc8(&bytes));
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        let header = parser.parse_frame_header().unwrap();
        assert_eq!(header.sample_rate, 32000);
    }

    #[test]
    fn test_uncommon_sample_rate_tens_of_hz() {
        // Code 0b1110: 16 bits in tens of Hz. 4410 -> 44100 Hz.
        let mut bytes = vec![0xFF, 0xF8, 0xCE, 0x18, 0x00, 0x11, 0x3A];
        bytes.push(crc8(&bytes));
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        let header = parser.parse_frame_header().unwrap();
        assert_eq!(header.sample_rate, 44100);
    }

    #[test]
    fn test_reserved_channel_assignment() {
        // Channel code 0b1011 (11) is reserved.
        let bytes = [0xFF, 0xF8, 0xC9, 0xB8, 0x00, 0x00];
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        assert!(matches!(
            parser.parse_frame_header(),
            Err(FlacError::ReservedChannelAssignment(11))
        ));
    }

    #[test]
    fn test_reserved_bit_depth() {
        // Bit depth code 0b011 is reserved: byte 3 = (1 << 4) | (3 << 1).
        let bytes = [0xFF, 0xF8, 0xC9, 0x16, 0x00, 0x00];
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        assert!(matches!(
            parser.parse_frame_header(),
            Err(FlacError::ReservedBitDepth(3))
        ));
    }

    #[test]
    fn test_reserved_bit_set() {
        // Low bit of byte 3 is the reserved bit.
        let bytes = [0xFF, 0xF8, 0xC9, 0x19, 0x00, 0x00];
        let mut reader = BitReader::new(&bytes);
        let mut parser = FrameParser::new(&mut reader);
        assert!(matches!(
            parser.parse_frame_header(),
            Err(FlacError::ReservedBitSet)
        ));
    }

    #[test]
    fn test_stereo_decorrelation_modes() {
        for (code, expected) in [
            (8u8, ChannelAssignment::LeftSide),
            (9, ChannelAssignment::RightSide),
            (10, ChannelAssignment::MidSide),
        ] {
            let mut bytes = vec![0xFF, 0xF8, 0xC9, (code << 4) | 0x08, 0x00];
            bytes.push(crc8(&bytes));
            let mut reader = BitReader::new(&bytes);
            let mut parser = FrameParser::new(&mut reader);
            let header = parser.parse_frame_header().unwrap();
            assert_eq!(header.channel_assignment, expected);
            assert_eq!(header.channels, 2);
        }
    }

    #[test]
    fn test_footer_and_crc16_round_trip() {
        // A "frame" that is just a header: the CRC-16 covers the header
        // bytes including the CRC-8 byte.
        let header_bytes = build_basic_header();
        let frame_crc = demuxkit_core::crc::crc16(&header_bytes);

        let mut data = header_bytes;
        data.extend_from_slice(&frame_crc.to_be_bytes());

        let mut reader = BitReader::new(&data);
        let mut parser = FrameParser::new(&mut reader);
        parser.parse_frame_header().unwrap();
        let footer = parser.parse_frame_footer().unwrap();
        assert_eq!(footer.crc16, frame_crc);
        assert!(parser.validate_frame(&footer).is_ok());
    }

    #[test]
    fn test_crc16_mismatch_is_reported() {
        let header_bytes = build_basic_header();
        let mut data = header_bytes;
        data.extend_from_slice(&[0xDE, 0xAD]);

        let mut reader = BitReader::new(&data);
        let mut parser = FrameParser::new(&mut reader);
        parser.parse_frame_header().unwrap();
        let footer = parser.parse_frame_footer().unwrap();
        assert!(matches!(
            parser.validate_frame(&footer),
            Err(FlacError::Crc16Mismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let data = [0xFF, 0xF8, 0xC9];
        let mut reader = BitReader::new(&data);
        let mut parser = FrameParser::new(&mut reader);
        assert!(matches!(
            parser.parse_frame_header(),
            Err(FlacError::UnexpectedEof)
        ));
    }
}
