//! Sample extraction for ISO containers.
//!
//! The demuxer owns the reader and one [`SampleTableManager`] per playable
//! track, and turns "next sample" and "seek to time" requests into byte-range
//! reads that produce [`MediaChunk`]s. Box parsing happens upstream; the
//! demuxer is handed already-extracted [`AudioTrackInfo`]s.

use std::io::{Read, Seek, SeekFrom};

use demuxkit_core::chunk::MediaChunk;
use demuxkit_core::error::{ContainerError, Result};
use tracing::{debug, warn};

use crate::sample_table::SampleTableManager;
use crate::track::AudioTrackInfo;

/// Largest single sample accepted from a container.
pub const MAX_SAMPLE_SIZE: u32 = 16 * 1024 * 1024;

struct Track {
    info: AudioTrackInfo,
    manager: SampleTableManager,
}

/// Streaming sample extractor for one ISO container.
pub struct IsoDemuxer<R> {
    reader: R,
    tracks: Vec<Track>,
    selected: usize,
    position_ms: u64,
    duration_ms: u64,
    eof: bool,
}

impl<R: Read + Seek> IsoDemuxer<R> {
    /// Create a demuxer from a reader and the tracks a box parser extracted.
    ///
    /// Tracks whose sample tables cannot be built are rejected with a
    /// warning; construction fails only if no track survives.
    pub fn new(reader: R, track_infos: Vec<AudioTrackInfo>) -> Result<Self> {
        let mut tracks = Vec::new();
        for info in track_infos {
            let mut manager = SampleTableManager::with_lazy_loading(false);
            match manager.build_sample_tables(&info.sample_table) {
                Ok(()) => tracks.push(Track { info, manager }),
                Err(e) => {
                    warn!(
                        track_id = info.track_id,
                        error = %e,
                        "rejecting track with unusable sample tables"
                    );
                }
            }
        }
        if tracks.is_empty() {
            return Err(ContainerError::TrackConfig("no playable audio tracks".into()).into());
        }

        let duration_ms = tracks
            .iter()
            .map(|t| {
                if t.info.timescale > 0 {
                    t.info.duration.saturating_mul(1000) / t.info.timescale as u64
                } else {
                    (t.manager.sample_to_time(t.manager.sample_count()) * 1000.0) as u64
                }
            })
            .max()
            .unwrap_or(0);

        Ok(Self {
            reader,
            tracks,
            selected: 0,
            position_ms: 0,
            duration_ms,
            eof: false,
        })
    }

    /// Number of playable tracks.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Metadata for a track by position.
    pub fn track_info(&self, index: usize) -> Option<&AudioTrackInfo> {
        self.tracks.get(index).map(|t| &t.info)
    }

    /// Select the track to read from by its track id.
    pub fn select_track(&mut self, track_id: u32) -> Result<()> {
        match self.tracks.iter().position(|t| t.info.track_id == track_id) {
            Some(index) => {
                self.selected = index;
                self.eof = false;
                Ok(())
            }
            None => Err(ContainerError::StreamNotFound { index: track_id }.into()),
        }
    }

    /// Read the next sample of the selected track.
    ///
    /// Returns `Ok(None)` at end of track. A zero offset/size answer from
    /// the sample tables is the out-of-range sentinel and also ends the
    /// stream rather than producing an empty chunk.
    pub fn read_chunk(&mut self) -> Result<Option<MediaChunk>> {
        if self.eof {
            return Ok(None);
        }

        let track = &mut self.tracks[self.selected];
        let index = track.info.current_sample;
        if index >= track.manager.sample_count() {
            self.eof = true;
            return Ok(None);
        }

        let sample = track.manager.get_sample_info(index);
        if sample.offset == 0 && sample.size == 0 {
            debug!(index, "sample lookup returned empty sentinel, ending stream");
            self.eof = true;
            return Ok(None);
        }
        if sample.size > MAX_SAMPLE_SIZE {
            return Err(ContainerError::InvalidSize {
                offset: sample.offset,
                message: format!("sample {} size {} exceeds limit", index, sample.size),
            }
            .into());
        }

        self.reader.seek(SeekFrom::Start(sample.offset))?;
        let mut data = vec![0u8; sample.size as usize];
        self.reader.read_exact(&mut data)?;

        let timestamp_ms = (track.manager.sample_to_time(index) * 1000.0) as u64;
        track.info.current_sample += 1;
        self.position_ms = timestamp_ms;

        let mut chunk = MediaChunk::new(track.info.track_id, data)
            .with_timestamp(timestamp_ms)
            .with_duration(sample.duration)
            .with_file_offset(sample.offset);
        chunk.set_keyframe(sample.is_keyframe);
        Ok(Some(chunk))
    }

    /// Seek the selected track to a timestamp, snapping backward to the
    /// nearest sync sample so decoding can restart cleanly.
    pub fn seek_to(&mut self, timestamp_ms: u64) -> Result<()> {
        let target_ms = if self.duration_ms > 0 {
            timestamp_ms.min(self.duration_ms)
        } else {
            timestamp_ms
        };

        let track = &mut self.tracks[self.selected];
        let sample = track.manager.time_to_sample(target_ms as f64 / 1000.0);
        let snapped = track.manager.nearest_sync_before(sample);
        track.info.current_sample = snapped;
        let position_ms = (track.manager.sample_to_time(snapped) * 1000.0) as u64;

        debug!(target_ms, sample, snapped, "seek");
        self.position_ms = position_ms;
        self.eof = false;
        Ok(())
    }

    /// Current playback position in milliseconds.
    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Container duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Whether the selected track has been fully read.
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}
