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

//! The `error` module defines the error and result types used throughout the crate.

use thiserror::Error;

/// An error that prevents successful encoding or decoding of an ALA stream.
#[derive(Error, Debug)]
pub enum AlaError {
    /// A problem with the underlying byte I/O.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A problem reading or writing the WAV container at the crate boundary.
    #[error(transparent)]
    Wav(#[from] hound::Error),

    /// A bit-I/O call was made against a stream opened in the other direction.
    ///
    /// Unreachable through this crate's own API, since `BitReader` and
    /// `BitWriter` are distinct types, but retained so the error catalogue
    /// matches the reference implementation's.
    #[error("bit stream operation is inconsistent with the stream's open mode")]
    InvalidMode,

    /// A caller-supplied argument was out of range (bad dimension, order
    /// above the handle's configured maximum, unsupported bit width, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A block- or order-sized quantity exceeded the handle's configured maximum.
    #[error("order {order} exceeds the configured maximum of {max}")]
    OrderExceedsMaximum { order: usize, max: usize },

    /// The reader ran out of data before the requested value could be read.
    #[error("end of stream")]
    EndOfStream,

    /// The LPC analyser could not produce a coefficient vector.
    #[error("LPC analysis failed: {0}")]
    ComputationFailed(String),

    /// The stream's 32-bit signature did not read `ALA\0`.
    #[error("invalid signature")]
    BadSignature,

    /// The stream's format version is not one this crate knows how to decode.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    /// A block did not begin with the expected `0xFFFF` sync code.
    #[error("sync lost: expected 0xFFFF, found {0:#06x}")]
    SyncLost(u16),
}

/// Either `T` on success, or an [`AlaError`] on failure.
pub type AlaResult<T> = Result<T, AlaError>;
