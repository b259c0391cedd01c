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

//! Adaptive recursive-Rice entropy coder, one independent state per channel.

use std::io::{Read, Write};

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{AlaError, AlaResult};
use crate::numeric::{log2_ceil, round_up_pow2, zigzag_decode, zigzag_encode};

const FRACTION_BITS: u32 = 8;
const ROUND_HALF: u64 = 1 << (FRACTION_BITS - 1);
const MEAN_UPDATE_BIAS: u64 = 1 << 6;

/// Tracks one fixed-point mean estimate per channel and Rice-codes values
/// against the divisor it implies.
pub struct RiceCoder {
    mean: Vec<u64>,
}

impl RiceCoder {
    /// Creates a handle with zeroed mean state for up to `max_channels` channels.
    pub fn new(max_channels: usize) -> RiceCoder {
        RiceCoder { mean: vec![0; max_channels] }
    }

    fn divisor(mean: u64) -> u32 {
        let rounded = ((mean >> 1) + ROUND_HALF) >> FRACTION_BITS;
        round_up_pow2(rounded.max(1) as u32)
    }

    fn update_mean(mean: u64, value: u32) -> u64 {
        (119 * mean + 9 * ((value as u64) << FRACTION_BITS) + MEAN_UPDATE_BIAS) >> 7
    }

    fn check_channel(&self, channel: usize) -> AlaResult<()> {
        if channel >= self.mean.len() {
            return Err(AlaError::InvalidArgument(format!(
                "channel {channel} exceeds configured maximum of {}",
                self.mean.len()
            )));
        }
        Ok(())
    }

    /// Rice-codes one signed residual on `channel`'s running state.
    pub fn code<W: Write>(&mut self, channel: usize, value: i32, writer: &mut BitWriter<W>) -> AlaResult<()> {
        self.check_channel(channel)?;
        let unsigned = zigzag_encode(value);
        let divisor = Self::divisor(self.mean[channel]);
        let k = log2_ceil(divisor);

        let quotient = unsigned >> k;
        let remainder = unsigned & (divisor - 1);

        for _ in 0..quotient {
            writer.put_bit(false)?;
        }
        writer.put_bit(true)?;
        if k > 0 {
            writer.put_bits(k, remainder as u64)?;
        }

        self.mean[channel] = Self::update_mean(self.mean[channel], unsigned);
        Ok(())
    }

    /// Decodes one signed residual from `channel`'s running state.
    pub fn decode<R: Read>(&mut self, channel: usize, reader: &mut BitReader<R>) -> AlaResult<i32> {
        self.check_channel(channel)?;
        let divisor = Self::divisor(self.mean[channel]);
        let k = log2_ceil(divisor);

        let mut quotient: u32 = 0;
        while !reader.get_bit()? {
            quotient += 1;
        }
        let remainder = if k > 0 { reader.get_bits(k)? as u32 } else { 0 };
        let unsigned = quotient * divisor + remainder;

        self.mean[channel] = Self::update_mean(self.mean[channel], unsigned);
        Ok(zigzag_decode(unsigned))
    }

    /// Encodes one block's worth of per-channel residuals, channel-outer:
    /// a 16-bit initial mean per channel, then all of that channel's samples.
    pub fn put_array<W: Write>(&mut self, data: &[Vec<i32>], writer: &mut BitWriter<W>) -> AlaResult<()> {
        if data.len() > self.mean.len() {
            return Err(AlaError::InvalidArgument(format!(
                "{} channels exceeds configured maximum of {}",
                data.len(),
                self.mean.len()
            )));
        }

        for (channel, samples) in data.iter().enumerate() {
            let initial_mean = Self::initial_mean_u16(samples)?;
            writer.put_bits(16, initial_mean as u64)?;
            self.mean[channel] = (initial_mean as u64) << FRACTION_BITS;
        }

        for (channel, samples) in data.iter().enumerate() {
            for &value in samples {
                self.code(channel, value, writer)?;
            }
        }

        Ok(())
    }

    /// Decodes one block's worth of per-channel residuals; `data[c]` must
    /// already be sized to that channel's sample count.
    pub fn get_array<R: Read>(&mut self, data: &mut [Vec<i32>], reader: &mut BitReader<R>) -> AlaResult<()> {
        if data.len() > self.mean.len() {
            return Err(AlaError::InvalidArgument(format!(
                "{} channels exceeds configured maximum of {}",
                data.len(),
                self.mean.len()
            )));
        }

        for channel in 0..data.len() {
            let initial_mean = reader.get_bits(16)? as u64;
            self.mean[channel] = initial_mean << FRACTION_BITS;
        }

        for (channel, samples) in data.iter_mut().enumerate() {
            for value in samples.iter_mut() {
                *value = self.decode(channel, reader)?;
            }
        }

        Ok(())
    }

    fn initial_mean_u16(samples: &[i32]) -> AlaResult<u16> {
        if samples.is_empty() {
            return Ok(0);
        }
        let sum: u64 = samples.iter().map(|&v| zigzag_encode(v) as u64).sum();
        let mean = sum / samples.len() as u64;
        if mean >= 1 << 16 {
            return Err(AlaError::ComputationFailed(format!(
                "initial Rice mean {mean} does not fit in 16 bits"
            )));
        }
        Ok(mean as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn codes_known_sequence_and_round_trips() {
        let values = [0, 0, 0, 7, 0, 0, 127, 0];

        let mut writer = BitWriter::new(Vec::new());
        let mut encoder = RiceCoder::new(1);
        for &v in &values {
            encoder.code(0, v, &mut writer).unwrap();
        }
        let bytes = writer.into_inner().unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        let mut decoder = RiceCoder::new(1);
        for &expected in &values {
            assert_eq!(decoder.decode(0, &mut reader).unwrap(), expected);
        }
    }

    #[test]
    fn array_round_trips_across_channels() {
        let data = vec![
            vec![0, -1, 2, -3, 500, -500, 1, 0],
            vec![100, 100, 100, 99, 101, 100, 100, 100],
        ];

        let mut writer = BitWriter::new(Vec::new());
        let mut encoder = RiceCoder::new(2);
        encoder.put_array(&data, &mut writer).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        let mut decoder = RiceCoder::new(2);
        let mut out = vec![vec![0i32; 8], vec![0i32; 8]];
        decoder.get_array(&mut out, &mut reader).unwrap();

        assert_eq!(out, data);
    }

    #[test]
    fn divisor_is_always_a_power_of_two() {
        for mean in [0u64, 1, 255, 256, 1000, 1 << 20] {
            let d = RiceCoder::divisor(mean);
            assert!(d.is_power_of_two());
            assert!(d >= 1);
        }
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let mut writer = BitWriter::new(Vec::new());
        let mut encoder = RiceCoder::new(1);
        assert!(encoder.code(1, 0, &mut writer).is_err());
    }
}
