//! # demuxkit-flac
//!
//! FLAC frame-level bitstream parsing per RFC 9639.
//!
//! This crate finds frame sync codes in a byte stream, decodes frame headers
//! bit-exactly including every forbidden-pattern check the RFC mandates, and
//! validates the CRC-8 header checksum and the advisory CRC-16 frame
//! checksum. Subframe (audio sample) decoding is a separate concern and is
//! not part of this crate.

pub mod frame;

pub use frame::FrameParser;

use thiserror::Error;

/// FLAC frame parsing error types.
#[derive(Error, Debug)]
pub enum FlacError {
    #[error("Frame sync not found")]
    SyncNotFound,

    #[error("Invalid frame sync code")]
    InvalidSyncCode,

    #[error("Forbidden sample rate bits")]
    ForbiddenSampleRate,

    #[error("Forbidden block size 65536")]
    ForbiddenBlockSize,

    #[error("Reserved block size code")]
    ReservedBlockSize,

    #[error("Reserved channel assignment code {0}")]
    ReservedChannelAssignment(u8),

    #[error("Reserved bit depth code {0:#05b}")]
    ReservedBitDepth(u8),

    #[error("Reserved header bit set")]
    ReservedBitSet,

    #[error("Invalid coded frame/sample number")]
    InvalidCodedNumber,

    #[error("Block size {0} out of range")]
    InvalidBlockSize(u32),

    #[error("Sample rate {0} out of range")]
    InvalidSampleRate(u32),

    #[error("Bit depth {0} out of range")]
    InvalidBitDepth(u32),

    #[error("Header CRC-8 mismatch: expected {expected:#04x}, got {actual:#04x}")]
    CrcMismatch { expected: u8, actual: u8 },

    #[error("Frame CRC-16 mismatch: expected {expected:#06x}, got {actual:#06x}")]
    Crc16Mismatch { expected: u16, actual: u16 },

    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Bitstream error: {0}")]
    Bitstream(String),
}

impl From<demuxkit_core::Error> for FlacError {
    fn from(err: demuxkit_core::Error) -> Self {
        if err.is_eof() {
            FlacError::UnexpectedEof
        } else {
            FlacError::Bitstream(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, FlacError>;

/// Channel assignment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAssignment {
    /// Independent channels.
    Independent(u8),
    /// Left/side stereo.
    LeftSide,
    /// Right/side stereo.
    RightSide,
    /// Mid/side stereo.
    MidSide,
}

impl ChannelAssignment {
    /// Number of channels carried by the assignment.
    pub fn channel_count(&self) -> u8 {
        match self {
            ChannelAssignment::Independent(n) => *n,
            _ => 2,
        }
    }
}

/// A decoded frame header.
///
/// Value type re-created per frame; `sample_rate` or `bit_depth` of 0 means
/// "take the value from STREAMINFO".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Samples per channel in this frame.
    pub block_size: u32,
    /// Sample rate in Hz, 0 if deferred to STREAMINFO.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u8,
    /// How the channels are coded.
    pub channel_assignment: ChannelAssignment,
    /// Bits per sample, 0 if deferred to STREAMINFO.
    pub bit_depth: u32,
    /// Frame number (fixed block size) or first sample number (variable).
    pub coded_number: u64,
    /// Blocking strategy bit.
    pub is_variable_block_size: bool,
    /// CRC-8 read from the wire.
    pub crc8: u8,
}

/// The frame footer: a CRC-16 over the whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFooter {
    pub crc16: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_count() {
        assert_eq!(ChannelAssignment::Independent(1).channel_count(), 1);
        assert_eq!(ChannelAssignment::Independent(8).channel_count(), 8);
        assert_eq!(ChannelAssignment::LeftSide.channel_count(), 2);
        assert_eq!(ChannelAssignment::MidSide.channel_count(), 2);
    }

    #[test]
    fn test_core_error_conversion() {
        let err: FlacError = demuxkit_core::Error::EndOfStream.into();
        assert!(matches!(err, FlacError::UnexpectedEof));

        let err: FlacError = demuxkit_core::Error::InvalidParameter("x".into()).into();
        assert!(matches!(err, FlacError::Bitstream(_)));
    }
}
