//! Per-track metadata for audio tracks in an ISO container.

use crate::sample_table::SampleTableInfo;

/// Audio codec carried by a track's sample entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    /// AAC.
    Aac,
    /// Apple Lossless.
    Alac,
    /// G.711 mu-law.
    Ulaw,
    /// G.711 A-law.
    Alaw,
    /// Uncompressed PCM.
    Pcm,
    /// FLAC.
    Flac,
    /// Unknown codec.
    Unknown([u8; 4]),
}

impl CodecType {
    /// Parse from a 4-byte sample entry fourcc.
    pub fn from_fourcc(bytes: &[u8; 4]) -> Self {
        match bytes {
            b"mp4a" => CodecType::Aac,
            b"alac" => CodecType::Alac,
            b"ulaw" => CodecType::Ulaw,
            b"alaw" => CodecType::Alaw,
            b"sowt" | b"twos" | b"lpcm" => CodecType::Pcm,
            b"fLaC" => CodecType::Flac,
            _ => CodecType::Unknown(*bytes),
        }
    }
}

/// Metadata and playback state for one audio track.
///
/// Constructed once during container parse; `current_sample` is the mutable
/// playback cursor, advanced on every read and reset on seek.
#[derive(Debug, Clone)]
pub struct AudioTrackInfo {
    /// Track identifier from the `tkhd` box.
    pub track_id: u32,
    /// Codec carried by this track.
    pub codec: CodecType,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channel_count: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Track timescale (units per second).
    pub timescale: u32,
    /// Track duration in timescale units.
    pub duration: u64,
    /// Codec-specific configuration blob (e.g. esds payload).
    pub codec_config: Vec<u8>,
    /// Index of the next sample to read.
    pub current_sample: u64,
    /// Raw sample tables extracted from the `stbl` box.
    pub sample_table: SampleTableInfo,
}

impl AudioTrackInfo {
    /// Create a track with the given identity and sample tables.
    pub fn new(track_id: u32, codec: CodecType, sample_table: SampleTableInfo) -> Self {
        Self {
            track_id,
            codec,
            sample_rate: 0,
            channel_count: 0,
            bits_per_sample: 0,
            timescale: 0,
            duration: 0,
            codec_config: Vec::new(),
            current_sample: 0,
            sample_table,
        }
    }
}
