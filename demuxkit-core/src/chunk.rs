//! Media chunk abstractions for demuxed sample data.
//!
//! A chunk carries one demuxed access unit (e.g. one AAC frame) together
//! with its timing and origin metadata.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flags for chunk properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChunkFlags: u32 {
        /// This chunk contains a sync sample (keyframe).
        const KEYFRAME = 0x0001;
    }
}

/// One demuxed media chunk.
#[derive(Clone)]
pub struct MediaChunk {
    /// The chunk payload.
    data: Vec<u8>,
    /// Stream (track) this chunk belongs to.
    pub stream_id: u32,
    /// Presentation timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Duration in the track's native timescale units.
    pub duration: u32,
    /// Byte offset of the payload in the source file.
    pub file_offset: u64,
    /// Chunk flags.
    pub flags: ChunkFlags,
}

impl MediaChunk {
    /// Create a new chunk with owned data.
    pub fn new(stream_id: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            stream_id,
            timestamp_ms: 0,
            duration: 0,
            file_offset: 0,
            flags: ChunkFlags::empty(),
        }
    }

    /// Get the chunk data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the size of the chunk data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this is a keyframe chunk.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(ChunkFlags::KEYFRAME)
    }

    /// Set the keyframe flag.
    pub fn set_keyframe(&mut self, keyframe: bool) {
        if keyframe {
            self.flags.insert(ChunkFlags::KEYFRAME);
        } else {
            self.flags.remove(ChunkFlags::KEYFRAME);
        }
    }

    /// Create a new chunk with the specified timestamp.
    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Create a new chunk with the specified duration.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Create a new chunk with the specified file offset.
    pub fn with_file_offset(mut self, offset: u64) -> Self {
        self.file_offset = offset;
        self
    }
}

impl fmt::Debug for MediaChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaChunk")
            .field("stream_id", &self.stream_id)
            .field("size", &self.size())
            .field("timestamp_ms", &self.timestamp_ms)
            .field("file_offset", &self.file_offset)
            .field("flags", &self.flags)
            .finish()
    }
}
