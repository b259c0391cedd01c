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

//! ALA is a lossless codec for 16-bit integer PCM built from three layers:
//! MSB-first bit-level I/O, a mid/side and PARCOR-lattice prediction
//! pipeline, and an adaptive recursive-Rice residual coder. The [`codec`]
//! module ties them together into [`codec::Encoder`] and [`codec::Decoder`];
//! [`wav`] drives WAV files through them.

pub mod bitstream;
pub mod channel;
pub mod codec;
pub mod emphasis;
pub mod error;
pub mod lattice;
pub mod lpc;
pub mod numeric;
pub mod rice;
pub mod wav;

pub use codec::{DecodedAudio, Decoder, DecoderConfig, Encoder, EncoderConfig};
pub use error::{AlaError, AlaResult};
