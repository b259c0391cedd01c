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

//! Fixed-point lattice-form PARCOR predictor and its inverse synthesiser.
//!
//! Coefficients are scaled by `2^15`; rounding is approximated by adding
//! `2^14` before the arithmetic right shift by 15.

use crate::error::{AlaError, AlaResult};

const ROUND_BIAS: i64 = 1 << 14;
const SCALE_SHIFT: u32 = 15;

#[inline]
fn scaled_mul(coef: i32, value: i32) -> i32 {
    (((coef as i64) * (value as i64) + ROUND_BIAS) >> SCALE_SHIFT) as i32
}

/// Forward lattice predictor: turns raw samples into prediction residuals.
///
/// Holds the forward/backward residual history buffers, which persist across
/// blocks for the lifetime of an encode session (the history is reset only
/// once, at construction).
pub struct LatticePredictor {
    max_order: usize,
    forward: Vec<i32>,
    backward: Vec<i32>,
}

impl LatticePredictor {
    /// Creates a handle with zeroed history buffers, able to predict at
    /// orders up to `max_order`.
    pub fn new(max_order: usize) -> LatticePredictor {
        LatticePredictor {
            max_order,
            forward: vec![0; max_order + 1],
            backward: vec![0; max_order + 1],
        }
    }

    /// Predicts `residual[n]` for each `data[n]`, given the quantised PARCOR
    /// vector (length `order + 1`, element 0 unused).
    pub fn predict(&mut self, data: &[i32], parcor: &[i16], order: usize, residual: &mut [i32]) -> AlaResult<()> {
        self.check_order(order, parcor.len(), data.len(), residual.len())?;

        for (n, &sample) in data.iter().enumerate() {
            self.forward[0] = sample;
            for k in 1..=order {
                let mul = scaled_mul(parcor[k] as i32, self.backward[k - 1]);
                self.forward[k] = self.forward[k - 1] - mul;
            }
            for k in (1..=order).rev() {
                let mul = scaled_mul(parcor[k] as i32, self.forward[k - 1]);
                self.backward[k] = self.backward[k - 1] - mul;
            }
            self.backward[0] = sample;
            residual[n] = self.forward[order];
        }

        Ok(())
    }

    fn check_order(&self, order: usize, parcor_len: usize, data_len: usize, residual_len: usize) -> AlaResult<()> {
        if order > self.max_order {
            return Err(AlaError::OrderExceedsMaximum { order, max: self.max_order });
        }
        if parcor_len != order + 1 {
            return Err(AlaError::InvalidArgument(format!(
                "parcor vector has length {parcor_len}, expected {}",
                order + 1
            )));
        }
        if data_len != residual_len {
            return Err(AlaError::InvalidArgument(
                "data and residual buffers must have equal length".to_string(),
            ));
        }
        Ok(())
    }
}

/// Inverse of [`LatticePredictor`]: turns prediction residuals back into samples.
pub struct LatticeSynthesizer {
    max_order: usize,
    backward: Vec<i32>,
}

impl LatticeSynthesizer {
    /// Creates a handle with zeroed history, able to synthesise at orders up to `max_order`.
    pub fn new(max_order: usize) -> LatticeSynthesizer {
        LatticeSynthesizer { max_order, backward: vec![0; max_order + 1] }
    }

    /// Reconstructs `output[n]` for each `residual[n]`, given the same
    /// quantised PARCOR vector used to encode it.
    pub fn synthesize(&mut self, residual: &[i32], parcor: &[i16], order: usize, output: &mut [i32]) -> AlaResult<()> {
        if order > self.max_order {
            return Err(AlaError::OrderExceedsMaximum { order, max: self.max_order });
        }
        if parcor.len() != order + 1 {
            return Err(AlaError::InvalidArgument(format!(
                "parcor vector has length {}, expected {}",
                parcor.len(),
                order + 1
            )));
        }
        if residual.len() != output.len() {
            return Err(AlaError::InvalidArgument(
                "residual and output buffers must have equal length".to_string(),
            ));
        }

        for (n, &r) in residual.iter().enumerate() {
            let mut forward = r;
            for k in (1..=order).rev() {
                forward += scaled_mul(parcor[k] as i32, self.backward[k - 1]);
                let mul = scaled_mul(parcor[k] as i32, forward);
                self.backward[k] = self.backward[k - 1] - mul;
            }
            output[n] = forward;
            self.backward[0] = forward;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantized_parcor(order: usize) -> Vec<i16> {
        let mut v = vec![0i16; order + 1];
        for (k, slot) in v.iter_mut().enumerate().skip(1) {
            *slot = (1000 * k as i16) * if k % 2 == 0 { -1 } else { 1 };
        }
        v
    }

    #[test]
    fn predict_then_synthesize_recovers_input_single_block() {
        let order = 4;
        let parcor = quantized_parcor(order);
        let data: Vec<i32> = (0..64).map(|i| ((i * 37) % 2000) - 1000).collect();

        let mut predictor = LatticePredictor::new(order);
        let mut residual = vec![0i32; data.len()];
        predictor.predict(&data, &parcor, order, &mut residual).unwrap();

        let mut synth = LatticeSynthesizer::new(order);
        let mut output = vec![0i32; data.len()];
        synth.synthesize(&residual, &parcor, order, &mut output).unwrap();

        assert_eq!(output, data);
    }

    #[test]
    fn state_persists_across_multiple_blocks() {
        let order = 3;
        let parcor = quantized_parcor(order);
        let blocks: Vec<Vec<i32>> = vec![
            (0..16).map(|i| i * 3 - 20).collect(),
            (0..16).map(|i| (i * i) % 500 - 250).collect(),
            (0..16).map(|_| 7).collect(),
        ];

        let mut predictor = LatticePredictor::new(order);
        let mut synth = LatticeSynthesizer::new(order);

        for block in &blocks {
            let mut residual = vec![0i32; block.len()];
            predictor.predict(block, &parcor, order, &mut residual).unwrap();

            let mut output = vec![0i32; block.len()];
            synth.synthesize(&residual, &parcor, order, &mut output).unwrap();

            assert_eq!(&output, block);
        }
    }

    #[test]
    fn order_above_maximum_is_rejected() {
        let mut predictor = LatticePredictor::new(2);
        let data = vec![0i32; 4];
        let mut residual = vec![0i32; 4];
        let parcor = vec![0i16; 4];
        assert!(predictor.predict(&data, &parcor, 3, &mut residual).is_err());
    }
}
