//! Bitstream reading and writing utilities.
//!
//! This module provides bit-level access to byte streams, used for parsing
//! coded audio bitstreams where fields are not byte-aligned.

use crate::error::{BitstreamError, Result};

/// A bitstream reader for parsing coded data.
///
/// Reads are MSB-first. The cursor position can be saved and restored at bit
/// granularity, which sync-scanning parsers rely on to rewind after a probe.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Get the total number of bits in the stream.
    pub fn total_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// Get the current bit position in the stream.
    pub fn position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// Restore the cursor to a previously saved bit position.
    pub fn set_position(&mut self, bit_position: usize) -> Result<()> {
        if bit_position > self.total_bits() {
            return Err(BitstreamError::UnexpectedEnd.into());
        }
        self.byte_pos = bit_position / 8;
        self.bit_pos = (bit_position % 8) as u8;
        Ok(())
    }

    /// Get the number of remaining bits.
    pub fn remaining_bits(&self) -> usize {
        self.total_bits().saturating_sub(self.position())
    }

    /// Check if we've reached the end of the stream.
    pub fn is_eof(&self) -> bool {
        self.byte_pos >= self.data.len()
    }

    /// Check if the stream is byte-aligned.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Skip to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos != 0 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.byte_pos >= self.data.len() {
            return Err(BitstreamError::UnexpectedEnd.into());
        }

        let bit = (self.data[self.byte_pos] >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit != 0)
    }

    /// Read up to 32 bits as an unsigned integer.
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(crate::error::Error::InvalidParameter(
                "Cannot read more than 32 bits at once".into(),
            ));
        }
        if self.remaining_bits() < n as usize {
            return Err(BitstreamError::UnexpectedEnd.into());
        }

        let mut value: u32 = 0;
        for _ in 0..n {
            value = (value << 1) | (self.read_bit()? as u32);
        }

        Ok(value)
    }

    /// Read up to 64 bits as an unsigned integer.
    pub fn read_bits_u64(&mut self, n: u8) -> Result<u64> {
        if n == 0 {
            return Ok(0);
        }
        if n > 64 {
            return Err(crate::error::Error::InvalidParameter(
                "Cannot read more than 64 bits at once".into(),
            ));
        }
        if self.remaining_bits() < n as usize {
            return Err(BitstreamError::UnexpectedEnd.into());
        }

        let mut value: u64 = 0;
        for _ in 0..n {
            value = (value << 1) | (self.read_bit()? as u64);
        }

        Ok(value)
    }

    /// Read a byte-aligned unsigned 8-bit value.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bits(8).map(|v| v as u8)
    }

    /// Read a byte-aligned unsigned 16-bit value (big-endian).
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_bits(16).map(|v| v as u16)
    }

    /// Skip a number of bits.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        if self.remaining_bits() < n {
            return Err(BitstreamError::UnexpectedEnd.into());
        }

        let new_pos = self.position() + n;
        self.byte_pos = new_pos / 8;
        self.bit_pos = (new_pos % 8) as u8;

        Ok(())
    }

    /// Peek at the next n bits without consuming them.
    pub fn peek_bits(&self, n: u8) -> Result<u32> {
        let mut clone = self.clone();
        clone.read_bits(n)
    }
}

/// A bitstream writer for generating coded data.
///
/// Used primarily for constructing frame headers in tests and tooling.
#[derive(Debug, Clone)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_pos: u8,
}

impl BitWriter {
    /// Create a new bit writer.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            bit_pos: 0,
        }
    }

    /// Create a new bit writer with capacity.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            bit_pos: 0,
        }
    }

    /// Get the current bit position.
    pub fn position(&self) -> usize {
        self.data.len() * 8 - (8 - self.bit_pos as usize) % 8
    }

    /// Check if the writer is byte-aligned.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Write a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        if self.bit_pos == 0 {
            self.data.push(0);
        }

        if bit {
            let idx = self.data.len() - 1;
            self.data[idx] |= 1 << (7 - self.bit_pos);
        }

        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
        }
        Ok(())
    }

    /// Write up to 32 bits from an unsigned integer.
    pub fn write_bits(&mut self, value: u32, n: u8) -> Result<()> {
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 != 0)?;
        }
        Ok(())
    }

    /// Write up to 64 bits from an unsigned integer.
    pub fn write_bits_u64(&mut self, value: u64, n: u8) -> Result<()> {
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 != 0)?;
        }
        Ok(())
    }

    /// Align to byte boundary by writing zero bits.
    pub fn align_to_byte(&mut self) -> Result<()> {
        while self.bit_pos != 0 {
            self.write_bit(false)?;
        }
        Ok(())
    }

    /// Get the written data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the written data, consuming the writer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}
