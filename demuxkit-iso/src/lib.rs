//! ISO-BMFF (MP4/M4A/MOV) audio sample extraction.
//!
//! Builds compact, queryable sample tables from the raw `stco`/`stsc`/`stsz`/
//! `stts`/`stss` box contents a box parser extracts, and drives byte-range
//! reads that turn logical sample indices into timed media chunks.

mod demuxer;
mod sample_table;
mod track;

pub use demuxer::{IsoDemuxer, MAX_SAMPLE_SIZE};
pub use sample_table::{
    CompressedChunkInfo, ExpandedChunkEntry, SampleInfo, SampleSizeTable, SampleTableInfo,
    SampleTableManager, SampleToChunkEntry, TimeEntry, DEFAULT_SAMPLE_DURATION,
};
pub use track::{AudioTrackInfo, CodecType};
