//! Compressed sample table management.
//!
//! Raw ISO sample tables are per-sample or per-chunk arrays that can run to
//! millions of entries for long tracks. This module compresses them into
//! run-length chunk tables, binary-searchable time tables, and a lazily
//! loaded size table, then answers sample-location and time-mapping queries
//! against the compact forms.

use std::io::{Read, Seek, SeekFrom};
use std::mem;

use demuxkit_core::error::{ContainerError, Result};
use tracing::{debug, warn};

/// Fallback per-sample duration in timescale units (one AAC frame).
pub const DEFAULT_SAMPLE_DURATION: u32 = 1024;

/// Upper bound on deferred size-table entries accepted from a container.
const MAX_DEFERRED_SIZE_ENTRIES: u64 = 64 * 1024 * 1024;

/// One `stsc` run: chunks starting at `first_chunk` carry `samples_per_chunk`
/// samples each. Chunk indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToChunkEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_desc_index: u32,
}

/// Raw sample tables as extracted from an `stbl` box.
///
/// All indices are 0-based. `sample_to_chunk` is ordered by `first_chunk`
/// ascending and the last entry's implicit chunk range extends to the final
/// chunk. `sample_times` are absolute decode times, millisecond-scaled.
#[derive(Debug, Clone, Default)]
pub struct SampleTableInfo {
    /// Chunk byte offsets (`stco`/`co64`).
    pub chunk_offsets: Vec<u64>,
    /// Sample-to-chunk runs (`stsc`).
    pub sample_to_chunk: Vec<SampleToChunkEntry>,
    /// Per-sample byte sizes (`stsz`).
    pub sample_sizes: Vec<u32>,
    /// Absolute per-sample decode times (`stts`, expanded).
    pub sample_times: Vec<u64>,
    /// Sorted sync sample indices (`stss`); empty means every sample syncs.
    pub sync_samples: Vec<u64>,
    /// File offset of the raw `stsz` entry array, for deferred loading.
    pub size_table_offset: u64,
}

/// One run of chunks sharing a `samples_per_chunk` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedChunkInfo {
    /// Byte offset of the first chunk in the run.
    pub base_offset: u64,
    /// Number of chunks in the run.
    pub chunk_count: u32,
    /// Samples carried by each chunk in the run.
    pub samples_per_chunk: u32,
    /// Global sample index at the start of the run.
    pub first_sample: u64,
    /// Total samples covered by the run.
    pub total_samples: u64,
}

/// One materialised per-chunk entry, expanded from the compressed runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandedChunkEntry {
    /// Byte offset of the chunk.
    pub offset: u64,
    /// Samples carried by the chunk.
    pub sample_count: u32,
    /// Global index of the chunk's first sample.
    pub first_sample: u64,
}

/// One run of consecutive samples sharing an inter-sample duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEntry {
    /// Global sample index at the start of the run.
    pub sample_index: u64,
    /// Absolute time of the run start, millisecond-scaled.
    pub timestamp: u64,
    /// Per-sample duration within the run.
    pub duration: u32,
    /// Number of samples in the run.
    pub sample_range: u32,
}

/// Sample size storage: a single fixed size, or a variable table whose
/// entries may be deferred until [`SampleTableManager::load_sample_sizes`].
#[derive(Debug, Clone)]
pub enum SampleSizeTable {
    /// Every sample shares one size.
    Fixed { size: u32, count: u64 },
    /// Per-sample sizes; `sizes` is `None` until loaded.
    Variable {
        count: u64,
        table_offset: u64,
        sizes: Option<Vec<u32>>,
    },
}

impl Default for SampleSizeTable {
    fn default() -> Self {
        SampleSizeTable::Fixed { size: 0, count: 0 }
    }
}

impl SampleSizeTable {
    /// Number of samples described by the table.
    pub fn count(&self) -> u64 {
        match self {
            SampleSizeTable::Fixed { count, .. } => *count,
            SampleSizeTable::Variable { count, .. } => *count,
        }
    }

    /// Whether per-sample sizes are resident in memory.
    pub fn is_loaded(&self) -> bool {
        match self {
            SampleSizeTable::Fixed { .. } => true,
            SampleSizeTable::Variable { sizes, .. } => sizes.is_some(),
        }
    }
}

/// Location and timing of one sample.
///
/// `offset == 0 && size == 0` is the out-of-range sentinel, not a legitimate
/// zero-length sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleInfo {
    /// Byte offset in the file.
    pub offset: u64,
    /// Byte size.
    pub size: u32,
    /// Duration in timescale units.
    pub duration: u32,
    /// Whether the sample is independently decodable.
    pub is_keyframe: bool,
}

/// Builds and queries the compressed sample tables for one track.
///
/// Query methods return zero/default sentinels for out-of-range input;
/// [`SampleTableManager::build_sample_tables`] is the only hard-failure
/// point, and a manager left with partial state after a failed build must
/// be discarded rather than queried.
#[derive(Debug)]
pub struct SampleTableManager {
    chunk_table: Vec<CompressedChunkInfo>,
    time_table: Vec<TimeEntry>,
    sample_sizes: SampleSizeTable,
    sync_samples: Vec<u64>,
    /// Per-chunk entries expanded from the compressed runs, built on demand
    /// by [`SampleTableManager::expand_chunk_table`] and dropped by
    /// [`SampleTableManager::optimize_memory_usage`].
    expanded_chunks: Option<Vec<ExpandedChunkEntry>>,
    estimated_memory: usize,
    lazy_loading: bool,
}

impl SampleTableManager {
    /// Create a manager with deferred size-table loading enabled.
    pub fn new() -> Self {
        Self::with_lazy_loading(true)
    }

    /// Create a manager, choosing whether variable sample sizes are kept
    /// resident at build time or re-read from the container on demand.
    pub fn with_lazy_loading(lazy_loading: bool) -> Self {
        Self {
            chunk_table: Vec::new(),
            time_table: Vec::new(),
            sample_sizes: SampleSizeTable::default(),
            sync_samples: Vec::new(),
            expanded_chunks: None,
            estimated_memory: 0,
            lazy_loading,
        }
    }

    /// Build all derived tables from raw box contents.
    ///
    /// On failure the partial state is left as-is; callers reject the track
    /// instead of retrying with partial tables.
    pub fn build_sample_tables(&mut self, raw: &SampleTableInfo) -> Result<()> {
        self.build_chunk_table(raw)?;
        self.build_time_table(raw)?;
        self.build_size_table(raw)?;

        self.sync_samples = raw.sync_samples.clone();
        self.sync_samples.sort_unstable();

        if !self.validate_consistency() {
            return Err(ContainerError::InvalidStructure(
                "chunk and time tables disagree on sample count".into(),
            )
            .into());
        }

        self.estimated_memory = self.calculate_memory_footprint();
        debug!(
            chunk_runs = self.chunk_table.len(),
            time_runs = self.time_table.len(),
            samples = self.sample_count(),
            memory = self.estimated_memory,
            "built compressed sample tables"
        );
        Ok(())
    }

    fn build_chunk_table(&mut self, raw: &SampleTableInfo) -> Result<()> {
        if raw.chunk_offsets.is_empty() || raw.sample_to_chunk.is_empty() {
            return Err(ContainerError::MissingElement(
                "chunk offsets or sample-to-chunk runs".into(),
            )
            .into());
        }

        self.chunk_table.clear();
        let total_chunks = raw.chunk_offsets.len() as u32;
        let mut first_sample = 0u64;

        for (i, entry) in raw.sample_to_chunk.iter().enumerate() {
            let first_chunk = entry.first_chunk;
            let last_chunk = match raw.sample_to_chunk.get(i + 1) {
                Some(next) => next.first_chunk.saturating_sub(1).min(total_chunks - 1),
                None => total_chunks - 1,
            };

            if last_chunk < first_chunk || first_chunk >= total_chunks {
                debug!(
                    run = i,
                    first_chunk, last_chunk, "dropping malformed sample-to-chunk run"
                );
                continue;
            }

            let chunk_count = last_chunk - first_chunk + 1;
            let total_samples = chunk_count as u64 * entry.samples_per_chunk as u64;
            self.chunk_table.push(CompressedChunkInfo {
                base_offset: raw.chunk_offsets[first_chunk as usize],
                chunk_count,
                samples_per_chunk: entry.samples_per_chunk,
                first_sample,
                total_samples,
            });
            first_sample += total_samples;
        }

        if self.chunk_table.is_empty() {
            return Err(
                ContainerError::InvalidStructure("no usable sample-to-chunk runs".into()).into(),
            );
        }
        Ok(())
    }

    /// Materialise one entry per chunk from the compressed runs. Idempotent.
    ///
    /// The expanded table answers direct per-chunk queries without walking
    /// the runs; offsets use the same uniform-size math as
    /// [`SampleTableManager::get_sample_info`], so the two lookup paths
    /// agree. The table is redundant with the compressed form and is the
    /// first thing [`SampleTableManager::optimize_memory_usage`] reclaims.
    pub fn expand_chunk_table(&mut self) {
        if self.expanded_chunks.is_some() {
            return;
        }
        let total: usize = self.chunk_table.iter().map(|r| r.chunk_count as usize).sum();
        let mut expanded = Vec::with_capacity(total);
        for run in &self.chunk_table {
            for i in 0..run.chunk_count as u64 {
                let first_sample = run.first_sample + i * run.samples_per_chunk as u64;
                let stride =
                    run.samples_per_chunk as u64 * self.sample_size(first_sample) as u64;
                expanded.push(ExpandedChunkEntry {
                    offset: run.base_offset + i * stride,
                    sample_count: run.samples_per_chunk,
                    first_sample,
                });
            }
        }
        debug!(chunks = expanded.len(), "expanded per-chunk table");
        self.expanded_chunks = Some(expanded);
        self.estimated_memory = self.calculate_memory_footprint();
    }

    fn build_time_table(&mut self, raw: &SampleTableInfo) -> Result<()> {
        let times = &raw.sample_times;
        if times.is_empty() {
            return Err(ContainerError::MissingElement("time-to-sample table".into()).into());
        }

        self.time_table.clear();
        let n = times.len();
        if n == 1 {
            self.time_table.push(TimeEntry {
                sample_index: 0,
                timestamp: times[0],
                duration: DEFAULT_SAMPLE_DURATION,
                sample_range: 1,
            });
            return Ok(());
        }

        // Per-sample durations inferred from consecutive time differences;
        // the last sample reuses its predecessor's duration.
        let mut durations = Vec::with_capacity(n);
        for i in 0..n - 1 {
            let delta = times[i + 1].saturating_sub(times[i]);
            durations.push(delta.min(u32::MAX as u64) as u32);
        }
        durations.push(durations[n - 2]);

        let mut start = 0usize;
        for i in 1..=n {
            if i == n || durations[i] != durations[start] {
                self.time_table.push(TimeEntry {
                    sample_index: start as u64,
                    timestamp: times[start],
                    duration: durations[start],
                    sample_range: (i - start) as u32,
                });
                start = i;
            }
        }
        Ok(())
    }

    fn build_size_table(&mut self, raw: &SampleTableInfo) -> Result<()> {
        if raw.sample_sizes.is_empty() {
            return Err(ContainerError::MissingElement("sample size table".into()).into());
        }

        let count = raw.sample_sizes.len() as u64;
        let first = raw.sample_sizes[0];
        if raw.sample_sizes.iter().all(|&s| s == first) {
            self.sample_sizes = SampleSizeTable::Fixed { size: first, count };
        } else if self.lazy_loading && raw.size_table_offset != 0 {
            debug!(count, offset = raw.size_table_offset, "deferring sample size table");
            self.sample_sizes = SampleSizeTable::Variable {
                count,
                table_offset: raw.size_table_offset,
                sizes: None,
            };
        } else {
            self.sample_sizes = SampleSizeTable::Variable {
                count,
                table_offset: raw.size_table_offset,
                sizes: Some(raw.sample_sizes.clone()),
            };
        }
        Ok(())
    }

    /// Populate a deferred variable size table from the container.
    pub fn load_sample_sizes<R: Read + Seek>(&mut self, reader: &mut R) -> Result<()> {
        if let SampleSizeTable::Variable {
            count,
            table_offset,
            sizes,
        } = &mut self.sample_sizes
        {
            if sizes.is_none() {
                if *count > MAX_DEFERRED_SIZE_ENTRIES {
                    return Err(ContainerError::InvalidStructure(format!(
                        "deferred size table too large: {count} entries"
                    ))
                    .into());
                }
                reader.seek(SeekFrom::Start(*table_offset))?;
                let mut buf = vec![0u8; *count as usize * 4];
                reader.read_exact(&mut buf)?;
                let loaded: Vec<u32> = buf
                    .chunks_exact(4)
                    .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                debug!(count = *count, "loaded deferred sample size table");
                *sizes = Some(loaded);
            }
        }
        self.estimated_memory = self.calculate_memory_footprint();
        Ok(())
    }

    /// Strict cross-table check: chunk-derived and time-derived sample
    /// totals must match exactly.
    pub fn validate_consistency(&self) -> bool {
        let chunk_total = self.chunk_sample_total();
        let time_total = self.sample_count();
        if chunk_total != time_total {
            warn!(chunk_total, time_total, "sample table totals disagree");
            return false;
        }
        true
    }

    /// Loose cross-table check tolerating up to 20% mismatch, for tables
    /// rebuilt from approximate or compressed time data.
    pub fn validate_consistency_detailed(&self) -> bool {
        let chunk_total = self.chunk_sample_total();
        let time_total = self.sample_count();
        if chunk_total == time_total {
            return true;
        }
        if chunk_total == 0 || time_total == 0 {
            return false;
        }
        let ratio = chunk_total as f64 / time_total as f64;
        (0.8..=1.2).contains(&ratio)
    }

    fn chunk_sample_total(&self) -> u64 {
        self.chunk_table.iter().map(|c| c.total_samples).sum()
    }

    /// Total number of samples in the track.
    pub fn sample_count(&self) -> u64 {
        self.time_table.iter().map(|e| e.sample_range as u64).sum()
    }

    fn find_chunk_for_sample(&self, sample_index: u64) -> Option<&CompressedChunkInfo> {
        self.chunk_table.iter().find(|c| {
            sample_index >= c.first_sample && sample_index < c.first_sample + c.total_samples
        })
    }

    /// Locate a sample: byte offset, size, duration, keyframe flag.
    ///
    /// Returns the zero-default sentinel when the index is out of range.
    /// The offset math assumes a uniform sample size within the matched
    /// chunk run; exact for fixed-size audio, an approximation otherwise.
    pub fn get_sample_info(&self, sample_index: u64) -> SampleInfo {
        let chunk = match self.find_chunk_for_sample(sample_index) {
            Some(chunk) => chunk,
            None => return SampleInfo::default(),
        };

        let size = self.sample_size(sample_index);
        let samples_per_chunk = chunk.samples_per_chunk as u64;
        let sample_in_range = sample_index - chunk.first_sample;
        let chunk_in_range = sample_in_range / samples_per_chunk;
        let sample_in_chunk = sample_in_range % samples_per_chunk;

        let offset = chunk.base_offset
            + chunk_in_range * samples_per_chunk * size as u64
            + sample_in_chunk * size as u64;

        SampleInfo {
            offset,
            size,
            duration: self.sample_duration(sample_index),
            is_keyframe: self.is_sync_sample(sample_index),
        }
    }

    /// Map a timestamp in seconds to a sample index.
    ///
    /// Queries past the end clamp to the last sample; an empty table or a
    /// query before the first entry maps to sample 0.
    pub fn time_to_sample(&self, timestamp_seconds: f64) -> u64 {
        if self.time_table.is_empty() {
            return 0;
        }
        let target_ms = (timestamp_seconds.max(0.0) * 1000.0) as u64;

        let idx = self
            .time_table
            .partition_point(|e| e.timestamp < target_ms);
        if idx == 0 {
            return self.time_table[0].sample_index;
        }

        let entry = &self.time_table[idx - 1];
        if entry.duration == 0 {
            return entry.sample_index;
        }
        let sample = entry.sample_index + (target_ms - entry.timestamp) / entry.duration as u64;

        let total = self.sample_count();
        if total > 0 && sample >= total {
            total - 1
        } else {
            sample
        }
    }

    /// Map a sample index to its decode time in seconds.
    ///
    /// Indices past the last entry extrapolate using its duration; an empty
    /// table yields 0.0.
    pub fn sample_to_time(&self, sample_index: u64) -> f64 {
        for entry in &self.time_table {
            let end = entry.sample_index + entry.sample_range as u64;
            if sample_index >= entry.sample_index && sample_index < end {
                let offset = sample_index - entry.sample_index;
                let ms = entry
                    .timestamp
                    .saturating_add(offset.saturating_mul(entry.duration as u64));
                return ms as f64 / 1000.0;
            }
        }
        if let Some(last) = self.time_table.last() {
            if sample_index >= last.sample_index {
                let offset = sample_index - last.sample_index;
                let ms = last
                    .timestamp
                    .saturating_add(offset.saturating_mul(last.duration as u64));
                return ms as f64 / 1000.0;
            }
        }
        0.0
    }

    /// Byte size of a sample, 0 if unknown or out of range.
    ///
    /// A deferred variable table answers 0 until
    /// [`SampleTableManager::load_sample_sizes`] runs.
    pub fn sample_size(&self, sample_index: u64) -> u32 {
        match &self.sample_sizes {
            SampleSizeTable::Fixed { size, count } => {
                if sample_index < *count {
                    *size
                } else {
                    0
                }
            }
            SampleSizeTable::Variable { sizes, .. } => sizes
                .as_ref()
                .and_then(|s| s.get(sample_index as usize).copied())
                .unwrap_or(0),
        }
    }

    /// Duration of a sample in timescale units.
    pub fn sample_duration(&self, sample_index: u64) -> u32 {
        for entry in &self.time_table {
            let end = entry.sample_index + entry.sample_range as u64;
            if sample_index >= entry.sample_index && sample_index < end {
                return entry.duration;
            }
        }
        DEFAULT_SAMPLE_DURATION
    }

    /// Whether a sample is a sync sample. An empty sync set means every
    /// sample is independently decodable.
    pub fn is_sync_sample(&self, sample_index: u64) -> bool {
        if self.sync_samples.is_empty() {
            return true;
        }
        self.sync_samples.binary_search(&sample_index).is_ok()
    }

    /// Latest sync sample at or before the given index, 0 if none precede it.
    pub fn nearest_sync_before(&self, sample_index: u64) -> u64 {
        if self.sync_samples.is_empty() {
            return sample_index;
        }
        let idx = self.sync_samples.partition_point(|&s| s <= sample_index);
        if idx == 0 {
            0
        } else {
            self.sync_samples[idx - 1]
        }
    }

    /// The size table representation currently in use.
    pub fn sample_size_table(&self) -> &SampleSizeTable {
        &self.sample_sizes
    }

    /// The expanded per-chunk table, `None` until
    /// [`SampleTableManager::expand_chunk_table`] runs or after the table
    /// has been reclaimed.
    pub fn expanded_chunks(&self) -> Option<&[ExpandedChunkEntry]> {
        self.expanded_chunks.as_deref()
    }

    /// Byte offset of a chunk, while the expanded per-chunk table is alive.
    pub fn chunk_offset(&self, chunk_index: usize) -> Option<u64> {
        self.expanded_chunks
            .as_ref()
            .and_then(|chunks| chunks.get(chunk_index))
            .map(|c| c.offset)
    }

    /// Current memory estimate for all live derived tables.
    pub fn memory_footprint(&self) -> usize {
        self.estimated_memory
    }

    fn calculate_memory_footprint(&self) -> usize {
        let mut total = self.chunk_table.capacity() * mem::size_of::<CompressedChunkInfo>();
        total += self.time_table.capacity() * mem::size_of::<TimeEntry>();
        total += self.sync_samples.capacity() * mem::size_of::<u64>();
        if let Some(chunks) = &self.expanded_chunks {
            total += chunks.capacity() * mem::size_of::<ExpandedChunkEntry>();
        }
        if let SampleSizeTable::Variable {
            sizes: Some(sizes), ..
        } = &self.sample_sizes
        {
            total += sizes.capacity() * mem::size_of::<u32>();
        }
        total
    }

    /// Drop the expanded per-chunk table and shrink all vectors.
    /// Callable opportunistically under memory pressure.
    pub fn optimize_memory_usage(&mut self) {
        if !self.chunk_table.is_empty() && self.expanded_chunks.take().is_some() {
            debug!("dropped expanded per-chunk table");
        }
        self.chunk_table.shrink_to_fit();
        self.time_table.shrink_to_fit();
        self.sync_samples.shrink_to_fit();
        if let SampleSizeTable::Variable {
            sizes: Some(sizes), ..
        } = &mut self.sample_sizes
        {
            sizes.shrink_to_fit();
        }
        self.estimated_memory = self.calculate_memory_footprint();
    }
}

impl Default for SampleTableManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Raw tables for `sample_count` fixed-size samples spread over chunks
    /// of `samples_per_chunk`, with a constant inter-sample delta.
    fn create_test_tables(
        sample_count: u64,
        samples_per_chunk: u32,
        delta_ms: u64,
        sample_size: u32,
    ) -> SampleTableInfo {
        let chunk_count =
            (sample_count + samples_per_chunk as u64 - 1) / samples_per_chunk as u64;
        let chunk_stride = samples_per_chunk as u64 * sample_size as u64;
        SampleTableInfo {
            chunk_offsets: (0..chunk_count).map(|c| c * chunk_stride).collect(),
            sample_to_chunk: vec![SampleToChunkEntry {
                first_chunk: 0,
                samples_per_chunk,
                sample_desc_index: 1,
            }],
            sample_sizes: vec![sample_size; sample_count as usize],
            sample_times: (0..sample_count).map(|i| i * delta_ms).collect(),
            sync_samples: Vec::new(),
            size_table_offset: 0,
        }
    }

    fn built_manager(raw: &SampleTableInfo) -> SampleTableManager {
        let mut manager = SampleTableManager::with_lazy_loading(false);
        manager.build_sample_tables(raw).unwrap();
        manager
    }

    #[test]
    fn test_build_basic() {
        let raw = create_test_tables(100, 10, 23, 512);
        let manager = built_manager(&raw);
        assert_eq!(manager.sample_count(), 100);
        assert!(manager.validate_consistency());
        assert!(manager.validate_consistency_detailed());
    }

    #[test]
    fn test_build_fails_on_empty_input() {
        let mut manager = SampleTableManager::new();
        assert!(manager
            .build_sample_tables(&SampleTableInfo::default())
            .is_err());
    }

    #[test]
    fn test_get_sample_info_fixed_sizes() {
        let raw = create_test_tables(20, 4, 23, 256);
        let manager = built_manager(&raw);

        let first = manager.get_sample_info(0);
        assert_eq!(first.offset, 0);
        assert_eq!(first.size, 256);

        // Sample 5 is the second sample of chunk 1.
        let info = manager.get_sample_info(5);
        assert_eq!(info.offset, 4 * 256 + 256);
        assert_eq!(info.size, 256);
        assert!(info.is_keyframe);
    }

    #[test]
    fn test_get_sample_info_out_of_range() {
        let raw = create_test_tables(8, 4, 23, 256);
        let manager = built_manager(&raw);
        assert_eq!(manager.get_sample_info(8), SampleInfo::default());
        assert_eq!(manager.get_sample_info(u64::MAX), SampleInfo::default());
    }

    #[test]
    fn test_malformed_runs_are_dropped() {
        let mut raw = create_test_tables(20, 4, 23, 256);
        // Out-of-bounds run plus the valid one covering all chunks.
        raw.sample_to_chunk.push(SampleToChunkEntry {
            first_chunk: 99,
            samples_per_chunk: 4,
            sample_desc_index: 1,
        });
        let manager = built_manager(&raw);
        assert_eq!(manager.sample_count(), 20);
    }

    #[test]
    fn test_build_fails_when_all_runs_malformed() {
        let mut raw = create_test_tables(20, 4, 23, 256);
        raw.sample_to_chunk = vec![SampleToChunkEntry {
            first_chunk: 99,
            samples_per_chunk: 4,
            sample_desc_index: 1,
        }];
        let mut manager = SampleTableManager::new();
        assert!(manager.build_sample_tables(&raw).is_err());
    }

    #[test]
    fn test_time_to_sample_edges() {
        let raw = create_test_tables(50, 5, 20, 128);
        let manager = built_manager(&raw);

        assert_eq!(manager.time_to_sample(0.0), 0);
        assert_eq!(manager.time_to_sample(0.020), 1);
        assert_eq!(manager.time_to_sample(0.100), 5);
        // Past the end clamps to the last sample.
        assert_eq!(manager.time_to_sample(1_000.0), 49);
        assert_eq!(manager.time_to_sample(-5.0), 0);
    }

    #[test]
    fn test_sample_to_time_and_extrapolation() {
        let raw = create_test_tables(10, 5, 20, 128);
        let manager = built_manager(&raw);

        assert_eq!(manager.sample_to_time(0), 0.0);
        assert!((manager.sample_to_time(3) - 0.060).abs() < 1e-9);
        // Beyond the last sample: extrapolated with the final duration.
        assert!((manager.sample_to_time(12) - 0.240).abs() < 1e-9);
    }

    #[test]
    fn test_sample_to_time_extreme_index_saturates() {
        let raw = create_test_tables(10, 5, 20, 128);
        let manager = built_manager(&raw);
        let t = manager.sample_to_time(u64::MAX);
        assert!(t.is_finite());
        assert!(t >= manager.sample_to_time(9));
    }

    #[test]
    fn test_empty_manager_queries_return_defaults() {
        let manager = SampleTableManager::new();
        assert_eq!(manager.time_to_sample(1.0), 0);
        assert_eq!(manager.sample_to_time(5), 0.0);
        assert_eq!(manager.sample_size(0), 0);
        assert_eq!(manager.sample_duration(0), DEFAULT_SAMPLE_DURATION);
        assert_eq!(manager.get_sample_info(0), SampleInfo::default());
    }

    #[test]
    fn test_single_sample_default_duration() {
        let raw = create_test_tables(1, 1, 23, 700);
        let manager = built_manager(&raw);
        assert_eq!(manager.sample_duration(0), DEFAULT_SAMPLE_DURATION);
        assert_eq!(manager.sample_count(), 1);
    }

    #[test]
    fn test_fixed_size_compression() {
        let raw = create_test_tables(1000, 10, 23, 417);
        let manager = built_manager(&raw);
        assert!(matches!(
            manager.sample_size_table(),
            SampleSizeTable::Fixed { size: 417, count: 1000 }
        ));
        for i in [0u64, 1, 500, 999] {
            assert_eq!(manager.sample_size(i), 417);
        }
        assert_eq!(manager.sample_size(1000), 0);
    }

    #[test]
    fn test_variable_sizes_eager() {
        let mut raw = create_test_tables(4, 2, 23, 0);
        raw.sample_sizes = vec![100, 200, 300, 400];
        let manager = built_manager(&raw);
        assert_eq!(manager.sample_size(2), 300);
    }

    #[test]
    fn test_lazy_size_table_load() {
        let mut raw = create_test_tables(4, 2, 23, 0);
        raw.sample_sizes = vec![100, 200, 300, 400];
        raw.size_table_offset = 8;

        let mut manager = SampleTableManager::with_lazy_loading(true);
        manager.build_sample_tables(&raw).unwrap();
        assert!(!manager.sample_sizes.is_loaded());
        assert_eq!(manager.sample_size(1), 0);

        // Big-endian u32 entries at offset 8.
        let mut file = vec![0u8; 8];
        for size in [100u32, 200, 300, 400] {
            file.extend_from_slice(&size.to_be_bytes());
        }
        manager.load_sample_sizes(&mut Cursor::new(file)).unwrap();
        assert!(manager.sample_sizes.is_loaded());
        assert_eq!(manager.sample_size(1), 200);
        assert_eq!(manager.sample_size(3), 400);
    }

    #[test]
    fn test_sync_samples() {
        let mut raw = create_test_tables(20, 4, 23, 256);
        raw.sync_samples = vec![0, 8, 16];
        let manager = built_manager(&raw);

        assert!(manager.is_sync_sample(0));
        assert!(manager.is_sync_sample(8));
        assert!(!manager.is_sync_sample(7));
        assert_eq!(manager.nearest_sync_before(7), 0);
        assert_eq!(manager.nearest_sync_before(8), 8);
        assert_eq!(manager.nearest_sync_before(19), 16);
    }

    #[test]
    fn test_empty_sync_set_means_all_sync() {
        let raw = create_test_tables(10, 5, 23, 256);
        let manager = built_manager(&raw);
        for i in 0..10 {
            assert!(manager.is_sync_sample(i));
        }
        assert_eq!(manager.nearest_sync_before(7), 7);
    }

    #[test]
    fn test_expand_chunk_table() {
        let raw = create_test_tables(20, 4, 23, 256);
        let mut manager = built_manager(&raw);
        assert!(manager.expanded_chunks().is_none());
        assert!(manager.chunk_offset(0).is_none());

        manager.expand_chunk_table();
        let chunks = manager.expanded_chunks().unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].first_sample, 0);
        assert_eq!(chunks[2].offset, 2 * 4 * 256);
        assert_eq!(chunks[2].sample_count, 4);
        assert_eq!(chunks[2].first_sample, 8);
        assert_eq!(manager.chunk_offset(2), Some(2 * 4 * 256));

        // Idempotent.
        manager.expand_chunk_table();
        assert_eq!(manager.expanded_chunks().unwrap().len(), 5);
    }

    #[test]
    fn test_memory_optimization() {
        let raw = create_test_tables(1000, 10, 23, 417);
        let mut manager = built_manager(&raw);
        manager.expand_chunk_table();
        let before = manager.memory_footprint();
        assert!(before > 0);
        assert!(manager.chunk_offset(0).is_some());

        manager.optimize_memory_usage();
        assert!(manager.memory_footprint() < before);
        assert!(manager.chunk_offset(0).is_none());
        // Queries still work off the compressed tables.
        assert_eq!(manager.get_sample_info(5).size, 417);
    }
}
