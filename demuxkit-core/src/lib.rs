//! # Demuxkit Core
//!
//! Core types and utilities for the demuxkit audio parsing library.
//!
//! This crate provides the fundamental building blocks used across all demuxkit components:
//! - Error handling types
//! - Bitstream reading/writing utilities
//! - CRC-8/CRC-16 checksums for frame validation
//! - Media chunk abstractions for demuxed sample data

pub mod bitstream;
pub mod chunk;
pub mod crc;
pub mod error;

pub use bitstream::{BitReader, BitWriter};
pub use chunk::{ChunkFlags, MediaChunk};
pub use crc::{crc8, crc16, CrcValidator};
pub use error::{Error, Result};
