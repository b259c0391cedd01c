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

//! The external sample I/O collaborator: reads and writes WAV containers via
//! `hound`, performing the left-justified-32-bit boundary shift the core
//! leaves to its caller.

use std::path::Path;

use crate::codec::DecodedAudio;
use crate::error::AlaResult;

/// The header fields an encoder needs, read off a source WAV file.
pub struct WavInput {
    pub channels: Vec<Vec<i32>>,
    pub sample_rate: u32,
    pub bits_per_sample: u8,
}

/// Reads a WAV file, returning its samples right-shifted to their effective
/// bit width, one `Vec<i32>` per channel.
pub fn read_wav<P: AsRef<Path>>(path: P) -> AlaResult<WavInput> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.bits_per_sample > 16 {
        return Err(crate::error::AlaError::InvalidArgument(format!(
            "unsupported bit depth: {}",
            spec.bits_per_sample
        )));
    }

    let num_channels = spec.channels as usize;
    let mut channels: Vec<Vec<i32>> = vec![Vec::new(); num_channels];

    match spec.sample_format {
        hound::SampleFormat::Int => {
            // hound already sign-extends each sample into its effective bit
            // width rather than delivering a raw left-justified 32-bit word,
            // so there is no further shift to apply on the way in.
            for (i, sample) in reader.samples::<i32>().enumerate() {
                channels[i % num_channels].push(sample?);
            }
        }
        hound::SampleFormat::Float => {
            return Err(crate::error::AlaError::InvalidArgument(
                "floating-point WAV sample format is not supported".to_string(),
            ));
        }
    }

    log::info!(
        "read WAV: channels={} rate={} bits={} frames={}",
        num_channels,
        spec.sample_rate,
        spec.bits_per_sample,
        channels.first().map_or(0, |c| c.len())
    );

    Ok(WavInput { channels, sample_rate: spec.sample_rate, bits_per_sample: spec.bits_per_sample as u8 })
}

/// Writes decoded audio out as a WAV file, left-shifting samples back to
/// their left-justified 32-bit external representation's narrow form.
pub fn write_wav<P: AsRef<Path>>(path: P, audio: &DecodedAudio) -> AlaResult<()> {
    let spec = hound::WavSpec {
        channels: audio.channels as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: audio.bits_per_sample as u16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let num_frames = audio.samples.first().map_or(0, |c| c.len());

    for frame in 0..num_frames {
        for channel in &audio.samples {
            writer.write_sample(channel[frame])?;
        }
    }

    writer.finalize()?;
    log::info!("wrote WAV: channels={} frames={}", audio.channels, num_frames);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_wav_right_shifts_to_effective_width() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec).unwrap();
            for v in [0i16, 1000, -1000, i16::MAX, i16::MIN] {
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();
        }

        let mut reader = hound::WavReader::new(Cursor::new(&buffer)).unwrap();
        let samples: Vec<i32> = reader.samples::<i32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX as i32, i16::MIN as i32]);
    }
}
