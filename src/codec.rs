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

//! Frame and block orchestration: header framing and the per-block pipeline
//! that ties `channel`, `emphasis`, `lpc`, `lattice` and `rice` together.

use std::io::{Read, Write};

use crate::bitstream::{BitReader, BitWriter};
use crate::channel;
use crate::emphasis;
use crate::error::{AlaError, AlaResult};
use crate::lattice::{LatticePredictor, LatticeSynthesizer};
use crate::lpc::{quantize_parcor, LpcAnalyzer};
use crate::numeric::{sin_window, zigzag_decode, zigzag_encode};
use crate::rice::RiceCoder;

const SIGNATURE: [u8; 4] = *b"ALA\0";
const FORMAT_VERSION: u16 = 1;

/// Tunables for [`Encoder`], defaulting to the reference constants.
#[derive(Debug, Clone, Copy)]
pub struct EncoderConfig {
    pub block_size: usize,
    pub parcor_order: usize,
}

impl Default for EncoderConfig {
    fn default() -> EncoderConfig {
        EncoderConfig { block_size: 4096, parcor_order: 10 }
    }
}

/// Bounds [`Decoder`] allocates its per-channel state against, validated
/// once the stream's own header has been read.
#[derive(Debug, Clone, Copy)]
pub struct DecoderConfig {
    pub max_channels: usize,
    pub max_parcor_order: usize,
}

impl Default for DecoderConfig {
    fn default() -> DecoderConfig {
        DecoderConfig { max_channels: 8, max_parcor_order: 32 }
    }
}

/// The file header, as laid out in the 136-bit on-disk format.
#[derive(Debug, Clone, Copy)]
struct Header {
    channels: u8,
    num_samples: u32,
    sample_rate: u32,
    bits_per_sample: u8,
    samples_per_block: u16,
    parcor_order: u8,
}

fn write_header<W: Write>(writer: &mut BitWriter<W>, header: &Header) -> AlaResult<()> {
    for &byte in &SIGNATURE {
        writer.put_bits(8, byte as u64)?;
    }
    writer.put_bits(16, FORMAT_VERSION as u64)?;
    writer.put_bits(8, header.channels as u64)?;
    writer.put_bits(32, header.num_samples as u64)?;
    writer.put_bits(32, header.sample_rate as u64)?;
    writer.put_bits(8, header.bits_per_sample as u64)?;
    writer.put_bits(16, header.samples_per_block as u64)?;
    writer.put_bits(8, header.parcor_order as u64)?;
    Ok(())
}

fn read_header<R: Read>(reader: &mut BitReader<R>) -> AlaResult<Header> {
    let mut signature = [0u8; 4];
    for byte in signature.iter_mut() {
        *byte = reader.get_bits(8)? as u8;
    }
    if signature != SIGNATURE {
        return Err(AlaError::BadSignature);
    }

    let version = reader.get_bits(16)? as u16;
    if version != FORMAT_VERSION {
        return Err(AlaError::UnsupportedVersion(version));
    }

    let header = Header {
        channels: reader.get_bits(8)? as u8,
        num_samples: reader.get_bits(32)? as u32,
        sample_rate: reader.get_bits(32)? as u32,
        bits_per_sample: reader.get_bits(8)? as u8,
        samples_per_block: reader.get_bits(16)? as u16,
        parcor_order: reader.get_bits(8)? as u8,
    };

    log::info!(
        "parsed header: channels={} samples={} rate={} bits={}",
        header.channels,
        header.num_samples,
        header.sample_rate,
        header.bits_per_sample
    );

    Ok(header)
}

/// Decoded audio, right-shifted to its effective bit width, one `Vec` per channel.
pub struct DecodedAudio {
    pub channels: u8,
    pub sample_rate: u32,
    pub bits_per_sample: u8,
    pub samples: Vec<Vec<i32>>,
}

/// Drives samples through the block pipeline and writes a complete ALA stream.
pub struct Encoder {
    channels: usize,
    config: EncoderConfig,
    lpc: LpcAnalyzer,
    predictors: Vec<LatticePredictor>,
    rice: RiceCoder,
}

impl Encoder {
    /// Creates a handle sized for an exact channel count, for the configured PARCOR order.
    pub fn new(channels: usize, config: EncoderConfig) -> AlaResult<Encoder> {
        if channels == 0 || channels > u8::MAX as usize {
            return Err(AlaError::InvalidArgument(format!(
                "channel count must be between 1 and {}, got {channels}",
                u8::MAX
            )));
        }
        if config.block_size == 0 || config.block_size > u16::MAX as usize {
            return Err(AlaError::InvalidArgument(format!(
                "block size must be between 1 and {}, got {}",
                u16::MAX,
                config.block_size
            )));
        }
        if config.parcor_order > u8::MAX as usize {
            return Err(AlaError::InvalidArgument(format!(
                "PARCOR order must be at most {}, got {}",
                u8::MAX,
                config.parcor_order
            )));
        }
        Ok(Encoder {
            channels,
            lpc: LpcAnalyzer::new(config.parcor_order),
            predictors: (0..channels).map(|_| LatticePredictor::new(config.parcor_order)).collect(),
            rice: RiceCoder::new(channels),
            config,
        })
    }

    /// Encodes `samples` (one `Vec<i32>` per channel, already right-shifted to
    /// `bits_per_sample`) into a complete ALA stream.
    pub fn encode<W: Write>(
        &mut self,
        samples: &[Vec<i32>],
        sample_rate: u32,
        bits_per_sample: u8,
        writer: &mut BitWriter<W>,
        mut progress: Option<&mut dyn FnMut(u64, u64)>,
    ) -> AlaResult<()> {
        if samples.len() != self.channels {
            return Err(AlaError::InvalidArgument(format!(
                "encoder configured for {} channels, got {}",
                self.channels,
                samples.len()
            )));
        }
        if bits_per_sample == 0 || bits_per_sample > 16 {
            return Err(AlaError::InvalidArgument(format!(
                "unsupported bit depth: {bits_per_sample}"
            )));
        }

        let num_samples = samples.first().map_or(0, |c| c.len());
        for channel_samples in samples {
            if channel_samples.len() != num_samples {
                return Err(AlaError::InvalidArgument(
                    "all channels must carry the same sample count".to_string(),
                ));
            }
        }

        write_header(
            writer,
            &Header {
                channels: self.channels as u8,
                num_samples: num_samples as u32,
                sample_rate,
                bits_per_sample,
                samples_per_block: self.config.block_size as u16,
                parcor_order: self.config.parcor_order as u8,
            },
        )?;

        let mut int_data: Vec<Vec<i32>> = samples.to_vec();
        let mut f64_data: Vec<Vec<f64>> =
            int_data.iter().map(|c| c.iter().map(|&v| v as f64).collect()).collect();

        if self.channels >= 2 {
            {
                let (left, rest) = int_data.split_at_mut(1);
                channel::lr_to_ms_i32(&mut left[0], &mut rest[0])?;
            }
            let mut mid = vec![0.0; num_samples];
            let mut side = vec![0.0; num_samples];
            channel::lr_to_ms_f64(&f64_data[0], &f64_data[1], &mut mid, &mut side)?;
            f64_data[0] = mid;
            f64_data[1] = side;
        }

        let block_size = self.config.block_size;
        let order = self.config.parcor_order;
        let mut offset = 0usize;

        while offset < num_samples {
            let len = block_size.min(num_samples - offset);
            let window = sin_window(len);

            let mut parcor: Vec<Vec<i16>> = Vec::with_capacity(self.channels);
            for channel_f64 in &f64_data {
                let mut analysis: Vec<f64> = channel_f64[offset..offset + len].to_vec();
                for (x, w) in analysis.iter_mut().zip(window.iter()) {
                    *x *= w;
                }
                emphasis::pre_emphasis_f64(&mut analysis, emphasis::DEFAULT_SHIFT);
                let coefficients = self.lpc.calculate_parcor(&analysis, order)?;

                let mut quantized = vec![0i16; order + 1];
                for (k, slot) in quantized.iter_mut().enumerate().skip(1) {
                    *slot = quantize_parcor(coefficients[k]);
                }
                parcor.push(quantized);
            }

            let mut residual: Vec<Vec<i32>> = Vec::with_capacity(self.channels);
            for (ch, predictor) in self.predictors.iter_mut().enumerate() {
                emphasis::pre_emphasis_i32(&mut int_data[ch][offset..offset + len], emphasis::DEFAULT_SHIFT);
                let mut channel_residual = vec![0i32; len];
                predictor.predict(&int_data[ch][offset..offset + len], &parcor[ch], order, &mut channel_residual)?;
                residual.push(channel_residual);
            }

            writer.put_bits(16, 0xFFFF)?;
            for channel_parcor in &parcor {
                for &coefficient in channel_parcor.iter().skip(1) {
                    writer.put_bits(16, zigzag_encode(coefficient as i32) as u64)?;
                }
            }
            self.rice.put_array(&residual, writer)?;
            writer.flush()?;

            offset += len;
            if let Some(callback) = progress.as_deref_mut() {
                callback(offset as u64, num_samples as u64);
            }
            log::debug!("encoded block: offset={offset} len={len}");
        }

        Ok(())
    }
}

/// Parses an ALA stream and reconstructs its samples.
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a handle that will reject streams exceeding `config`'s bounds.
    pub fn new(config: DecoderConfig) -> Decoder {
        Decoder { config }
    }

    /// Decodes a complete ALA stream from `reader`.
    pub fn decode<R: Read>(
        &mut self,
        reader: &mut BitReader<R>,
        mut progress: Option<&mut dyn FnMut(u64, u64)>,
    ) -> AlaResult<DecodedAudio> {
        let header = read_header(reader)?;

        if header.channels as usize > self.config.max_channels {
            return Err(AlaError::InvalidArgument(format!(
                "stream declares {} channels, exceeding configured maximum of {}",
                header.channels, self.config.max_channels
            )));
        }
        if header.parcor_order as usize > self.config.max_parcor_order {
            return Err(AlaError::OrderExceedsMaximum {
                order: header.parcor_order as usize,
                max: self.config.max_parcor_order,
            });
        }

        let channels = header.channels as usize;
        let order = header.parcor_order as usize;
        let block_size = header.samples_per_block as usize;
        let num_samples = header.num_samples as usize;

        if block_size == 0 && num_samples > 0 {
            return Err(AlaError::InvalidArgument("samples per block must be at least 1".to_string()));
        }

        let mut synthesizers: Vec<LatticeSynthesizer> =
            (0..channels).map(|_| LatticeSynthesizer::new(order)).collect();
        let mut rice = RiceCoder::new(channels);
        let mut output: Vec<Vec<i32>> = (0..channels).map(|_| Vec::with_capacity(num_samples)).collect();

        let mut offset = 0usize;
        while offset < num_samples {
            let len = block_size.min(num_samples - offset);

            let sync = reader.get_bits(16)? as u16;
            if sync != 0xFFFF {
                return Err(AlaError::SyncLost(sync));
            }

            let mut parcor: Vec<Vec<i16>> = Vec::with_capacity(channels);
            for _ in 0..channels {
                let mut quantized = vec![0i16; order + 1];
                for slot in quantized.iter_mut().skip(1) {
                    let unsigned = reader.get_bits(16)? as u32;
                    *slot = zigzag_decode(unsigned) as i16;
                }
                parcor.push(quantized);
            }

            let mut residual: Vec<Vec<i32>> = (0..channels).map(|_| vec![0i32; len]).collect();
            rice.get_array(&mut residual, reader)?;
            reader.flush()?;

            for ch in 0..channels {
                let mut block_output = vec![0i32; len];
                synthesizers[ch].synthesize(&residual[ch], &parcor[ch], order, &mut block_output)?;
                emphasis::de_emphasis_i32(&mut block_output, emphasis::DEFAULT_SHIFT);
                output[ch].extend_from_slice(&block_output);
            }

            offset += len;
            if let Some(callback) = progress.as_deref_mut() {
                callback(offset as u64, num_samples as u64);
            }
            log::debug!("decoded block: offset={offset} len={len}");
        }

        if channels >= 2 {
            let (left, rest) = output.split_at_mut(1);
            channel::ms_to_lr_i32(&mut left[0], &mut rest[0])?;
        }

        Ok(DecodedAudio {
            channels: header.channels,
            sample_rate: header.sample_rate,
            bits_per_sample: header.bits_per_sample,
            samples: output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(samples: Vec<Vec<i32>>, bits_per_sample: u8) -> DecodedAudio {
        let channels = samples.len();
        let mut encoder = Encoder::new(channels, EncoderConfig::default()).unwrap();
        let mut writer = BitWriter::new(Vec::new());
        encoder.encode(&samples, 44100, bits_per_sample, &mut writer, None).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut decoder = Decoder::new(DecoderConfig::default());
        let mut reader = BitReader::new(Cursor::new(bytes));
        decoder.decode(&mut reader, None).unwrap()
    }

    #[test]
    fn single_sample_mono_block_round_trips() {
        let samples = vec![vec![0i32]];
        let decoded = round_trip(samples.clone(), 16);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn constant_stereo_signal_round_trips() {
        let samples = vec![vec![100i32; 8192], vec![100i32; 8192]];
        let decoded = round_trip(samples.clone(), 16);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn sawtooth_stereo_signal_spanning_multiple_blocks_round_trips() {
        let left: Vec<i32> = (0..10000).map(|i| (i % 2000) - 1000).collect();
        let right: Vec<i32> = (0..10000).map(|i| -((i % 1500) - 750)).collect();
        let samples = vec![left, right];
        let decoded = round_trip(samples.clone(), 16);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn mono_signal_round_trips() {
        let samples = vec![(0..5000).map(|i| ((i * 31) % 4000) - 2000).collect()];
        let decoded = round_trip(samples.clone(), 16);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn flipped_sync_code_is_detected() {
        let samples = vec![vec![1i32; 64], vec![-1i32; 64]];
        let mut encoder = Encoder::new(2, EncoderConfig::default()).unwrap();
        let mut writer = BitWriter::new(Vec::new());
        encoder.encode(&samples, 44100, 16, &mut writer, None).unwrap();
        let mut bytes = writer.into_inner().unwrap();

        // Header is 19 bytes; the sync code is the first two bytes of the first block.
        bytes[19] ^= 0xFF;

        let mut decoder = Decoder::new(DecoderConfig::default());
        let mut reader = BitReader::new(Cursor::new(bytes));
        assert!(matches!(decoder.decode(&mut reader, None), Err(AlaError::SyncLost(_))));
    }

    #[test]
    fn truncated_stream_reports_end_of_stream() {
        let samples = vec![vec![1i32; 4096]];
        let mut encoder = Encoder::new(1, EncoderConfig::default()).unwrap();
        let mut writer = BitWriter::new(Vec::new());
        encoder.encode(&samples, 44100, 16, &mut writer, None).unwrap();
        let bytes = writer.into_inner().unwrap();
        let truncated = &bytes[..bytes.len() / 2];

        let mut decoder = Decoder::new(DecoderConfig::default());
        let mut reader = BitReader::new(Cursor::new(truncated));
        assert!(matches!(decoder.decode(&mut reader, None), Err(AlaError::EndOfStream)));
    }

    #[test]
    fn bad_signature_is_rejected() {
        let mut decoder = Decoder::new(DecoderConfig::default());
        let mut reader = BitReader::new(Cursor::new(vec![0u8; 32]));
        assert!(matches!(decoder.decode(&mut reader, None), Err(AlaError::BadSignature)));
    }

    #[test]
    fn block_size_above_u16_max_is_rejected() {
        let config = EncoderConfig { block_size: u16::MAX as usize + 1, ..EncoderConfig::default() };
        assert!(Encoder::new(1, config).is_err());
    }

    #[test]
    fn channel_count_above_u8_max_is_rejected() {
        let result = Encoder::new(u8::MAX as usize + 1, EncoderConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn parcor_order_above_u8_max_is_rejected() {
        let config = EncoderConfig { parcor_order: u8::MAX as usize + 1, ..EncoderConfig::default() };
        assert!(Encoder::new(1, config).is_err());
    }
}
