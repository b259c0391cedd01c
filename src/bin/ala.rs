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

use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use ala::bitstream::{BitReader, BitWriter};
use ala::codec::{Decoder, DecoderConfig, Encoder, EncoderConfig};
use ala::wav;
use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[clap(name = "ala", version, author, about = "A lossless PCM audio codec")]
struct AlaArguments {
    /// Increase logging verbosity (info, then debug).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    command: AlaCommand,
}

#[derive(Subcommand, Debug)]
enum AlaCommand {
    /// Encode a WAV file into an ALA stream.
    Encode {
        input: PathBuf,
        output: PathBuf,

        /// Samples per block.
        #[clap(long, default_value_t = 4096)]
        block_size: usize,

        /// PARCOR predictor order.
        #[clap(long, default_value_t = 10)]
        parcor_order: usize,
    },
    /// Decode an ALA stream into a WAV file.
    Decode { input: PathBuf, output: PathBuf },
}

fn main() -> ExitCode {
    let args = AlaArguments::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::builder().filter_level(level).init();

    let result = match &args.command {
        AlaCommand::Encode { input, output, block_size, parcor_order } => {
            encode(input, output, *block_size, *parcor_order)
        }
        AlaCommand::Decode { input, output } => decode(input, output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn encode(input: &PathBuf, output: &PathBuf, block_size: usize, parcor_order: usize) -> ala::AlaResult<()> {
    let source = wav::read_wav(input)?;
    let channels = source.channels.len();

    let config = EncoderConfig { block_size, parcor_order, ..EncoderConfig::default() };
    let mut encoder = Encoder::new(channels, config)?;

    let file = std::fs::File::create(output)?;
    let mut writer = BitWriter::new(BufWriter::new(file));

    let total = source.channels.first().map_or(0, |c| c.len()) as u64;
    let mut last_reported = 0u64;
    let mut progress = |done: u64, _total: u64| {
        if done - last_reported >= total / 20.max(1) {
            log::info!("encoding... {:.1}%", 100.0 * done as f64 / total.max(1) as f64);
            last_reported = done;
        }
    };

    encoder.encode(&source.channels, source.sample_rate, source.bits_per_sample, &mut writer, Some(&mut progress))?;
    writer.into_inner()?;

    log::info!("encoded {} -> {}", input.display(), output.display());
    Ok(())
}

fn decode(input: &PathBuf, output: &PathBuf) -> ala::AlaResult<()> {
    let file = std::fs::File::open(input)?;
    let mut reader = BitReader::new(std::io::BufReader::new(file));

    let mut decoder = Decoder::new(DecoderConfig::default());
    let audio = decoder.decode(&mut reader, None)?;

    wav::write_wav(output, &audio)?;
    log::info!("decoded {} -> {}", input.display(), output.display());
    Ok(())
}
