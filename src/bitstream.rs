// Copyright (C) 2014-2015 Ruud van Asseldonk
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! The `bitstream` module provides MSB-first bit I/O over a byte sink/source.
//!
//! A handle is either a writer or a reader, fixed at construction, so that a
//! mode mismatch is a type error rather than a runtime one.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{AlaError, AlaResult};

fn low_bits_mask(n: u32) -> u64 {
    debug_assert!(n <= 64);
    if n == 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Writes individual bits, MSB-first, into an underlying byte sink.
pub struct BitWriter<W> {
    inner: W,
    buffer: u8,
    /// Number of bits still free in `buffer` before it must be flushed out.
    free: u32,
}

impl<W: Write> BitWriter<W> {
    /// Wraps `inner` for bit-level writing. The internal byte buffer starts empty.
    pub fn new(inner: W) -> BitWriter<W> {
        BitWriter { inner, buffer: 0, free: 8 }
    }

    /// Writes a single bit.
    pub fn put_bit(&mut self, bit: bool) -> AlaResult<()> {
        self.put_bits(1, bit as u64)
    }

    /// Writes the low `n` bits of `val`, most-significant bit first. `n` ≤ 64.
    pub fn put_bits(&mut self, n: u32, val: u64) -> AlaResult<()> {
        if n > 64 {
            return Err(AlaError::InvalidArgument(format!("cannot write {n} bits at once")));
        }
        if n == 0 {
            return Ok(());
        }

        let mut remaining = n;
        let masked = val & low_bits_mask(n);

        while remaining >= self.free {
            remaining -= self.free;
            let chunk = ((masked >> remaining) & low_bits_mask(self.free)) as u8;
            self.buffer |= chunk;
            self.inner.write_all(std::slice::from_ref(&self.buffer))?;
            self.buffer = 0;
            self.free = 8;
        }

        if remaining > 0 {
            self.free -= remaining;
            let chunk = ((masked & low_bits_mask(remaining)) as u8) << self.free;
            self.buffer |= chunk;
        }

        Ok(())
    }

    /// Pads the current byte with zero bits and emits it, if not already byte-aligned.
    pub fn flush(&mut self) -> AlaResult<()> {
        if self.free != 8 {
            self.put_bits(self.free, 0)?;
        }
        Ok(())
    }

    /// Returns the wrapped writer, after flushing any partial byte.
    pub fn into_inner(mut self) -> AlaResult<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write + Seek> BitWriter<W> {
    /// Flushes, then seeks the underlying byte sink.
    pub fn seek(&mut self, offset: SeekFrom) -> AlaResult<u64> {
        self.flush()?;
        Ok(self.inner.seek(offset)?)
    }

    /// Current byte offset in the underlying sink.
    pub fn tell(&mut self) -> AlaResult<u64> {
        Ok(self.inner.stream_position()?)
    }
}

/// Reads individual bits, MSB-first, from an underlying byte source.
pub struct BitReader<R> {
    inner: R,
    buffer: u8,
    /// Number of unconsumed bits remaining in `buffer`.
    left: u32,
    /// Set once the underlying reader has reported EOF with no bits buffered.
    exhausted: bool,
}

impl<R: Read> BitReader<R> {
    /// Wraps `inner` for bit-level reading.
    pub fn new(inner: R) -> BitReader<R> {
        BitReader { inner, buffer: 0, left: 0, exhausted: false }
    }

    fn fetch_byte(&mut self) -> AlaResult<bool> {
        let mut byte = [0u8; 1];
        match self.inner.read(&mut byte)? {
            0 => Ok(false),
            _ => {
                self.buffer = byte[0];
                self.left = 8;
                Ok(true)
            }
        }
    }

    /// Reads a single bit.
    pub fn get_bit(&mut self) -> AlaResult<bool> {
        Ok(self.get_bits(1)? != 0)
    }

    /// Reads `n` bits (`n` ≤ 64) and returns them right-justified.
    ///
    /// If the stream runs out mid-value, returns the partial value zero-padded
    /// on the low side and records end-of-stream for the *next* call.
    pub fn get_bits(&mut self, n: u32) -> AlaResult<u64> {
        if n > 64 {
            return Err(AlaError::InvalidArgument(format!("cannot read {n} bits at once")));
        }
        if n == 0 {
            return Ok(0);
        }
        if self.exhausted {
            return Err(AlaError::EndOfStream);
        }

        let mut remaining = n;
        let mut result: u64 = 0;

        while remaining > self.left {
            remaining -= self.left;
            result |= (low_bits_mask(self.left) & self.buffer as u64) << remaining;
            if !self.fetch_byte()? {
                self.exhausted = true;
                self.left = 0;
                return Ok(result);
            }
        }

        self.left -= remaining;
        result |= low_bits_mask(remaining) & ((self.buffer >> self.left) as u64);
        Ok(result)
    }

    /// Discards any buffered bits, advancing to the next byte boundary.
    pub fn flush(&mut self) -> AlaResult<()> {
        self.left = 0;
        Ok(())
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BitReader<R> {
    /// Flushes, then seeks the underlying byte source.
    pub fn seek(&mut self, offset: SeekFrom) -> AlaResult<u64> {
        self.flush()?;
        Ok(self.inner.seek(offset)?)
    }

    /// Current byte offset in the underlying source.
    pub fn tell(&mut self) -> AlaResult<u64> {
        Ok(self.inner.stream_position()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn put_bits_matches_individual_bits() {
        let mut a = BitWriter::new(Vec::new());
        a.put_bits(1, 1).unwrap();
        a.put_bits(1, 1).unwrap();
        a.put_bits(1, 0).unwrap();
        let bytes_a = a.into_inner().unwrap();

        let mut b = BitWriter::new(Vec::new());
        b.put_bits(3, 0b110).unwrap();
        let bytes_b = b.into_inner().unwrap();

        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn round_trips_arbitrary_bit_widths() {
        let mut w = BitWriter::new(Vec::new());
        let values: Vec<(u32, u64)> = vec![
            (1, 1),
            (3, 0b101),
            (7, 0x7f),
            (16, 0xBEEF),
            (32, 0xDEADBEEF),
            (64, u64::MAX),
            (5, 0),
        ];
        for &(n, v) in &values {
            w.put_bits(n, v).unwrap();
        }
        let bytes = w.into_inner().unwrap();

        let mut r = BitReader::new(Cursor::new(bytes));
        for &(n, v) in &values {
            assert_eq!(r.get_bits(n).unwrap(), v & low_bits_mask(n));
        }
    }

    #[test]
    fn flush_pads_to_byte_boundary() {
        let mut w = BitWriter::new(Vec::new());
        w.put_bits(3, 0b101).unwrap();
        w.flush().unwrap();
        let bytes = w.into_inner().unwrap();
        assert_eq!(bytes, vec![0b1010_0000]);
    }

    #[test]
    fn read_past_end_reports_end_of_stream() {
        let mut r = BitReader::new(Cursor::new(vec![0xFFu8]));
        assert_eq!(r.get_bits(8).unwrap(), 0xFF);
        // No more bytes: the remainder is zero-padded, then the *next* read fails.
        assert_eq!(r.get_bits(4).unwrap(), 0);
        assert!(matches!(r.get_bits(1), Err(AlaError::EndOfStream)));
    }

    #[test]
    fn align_discards_remaining_bits_in_current_byte() {
        let mut r = BitReader::new(Cursor::new(vec![0x00u8, 0xff]));
        assert_eq!(r.get_bits(5).unwrap(), 0);
        r.flush().unwrap();
        assert_eq!(r.get_bits(3).unwrap(), 0b111);
    }
}
