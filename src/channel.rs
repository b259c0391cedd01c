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

//! Stereo decorrelation between the two leading channels of a sample frame.
//!
//! Channels beyond the first two, if any, are left untouched.

use crate::error::{AlaError, AlaResult};
use crate::numeric::ashr32;

fn check_lengths(left: &[i32], right: &[i32]) -> AlaResult<()> {
    if left.len() != right.len() {
        return Err(AlaError::InvalidArgument(format!(
            "channel length mismatch: {} vs {}",
            left.len(),
            right.len()
        )));
    }
    Ok(())
}

/// Lossless integer LR→MS transform, in place: `left` becomes mid, `right` becomes side.
pub fn lr_to_ms_i32(left: &mut [i32], right: &mut [i32]) -> AlaResult<()> {
    check_lengths(left, right)?;
    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let side = *l - *r;
        let mid = ashr32(*l + *r, 1);
        *l = mid;
        *r = side;
    }
    Ok(())
}

/// Inverse of [`lr_to_ms_i32`]: `left` holds mid, `right` holds side on entry.
pub fn ms_to_lr_i32(left: &mut [i32], right: &mut [i32]) -> AlaResult<()> {
    check_lengths(left, right)?;
    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let side = *r;
        let mid2 = (*l << 1) | (side & 1);
        let l_out = ashr32(mid2 + side, 1);
        let r_out = ashr32(mid2 - side, 1);
        *l = l_out;
        *r = r_out;
    }
    Ok(())
}

/// Analysis-only, non-invertible LR→MS transform in double precision.
pub fn lr_to_ms_f64(left: &[f64], right: &[f64], mid: &mut [f64], side: &mut [f64]) -> AlaResult<()> {
    if left.len() != right.len() || left.len() != mid.len() || left.len() != side.len() {
        return Err(AlaError::InvalidArgument(
            "channel length mismatch in double-precision LR->MS".to_string(),
        ));
    }
    for i in 0..left.len() {
        mid[i] = (left[i] + right[i]) * 0.5;
        side[i] = left[i] - right[i];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lr_ms_round_trips() {
        let mut l: Vec<i32> = vec![100, -200, 0, 30000, -30001];
        let mut r: Vec<i32> = vec![100, 199, -5, -30000, 30001];
        let orig_l = l.clone();
        let orig_r = r.clone();

        lr_to_ms_i32(&mut l, &mut r).unwrap();
        ms_to_lr_i32(&mut l, &mut r).unwrap();

        assert_eq!(l, orig_l);
        assert_eq!(r, orig_r);
    }

    #[test]
    fn constant_signal_collapses_side_to_zero() {
        let mut l = vec![100i32; 8];
        let mut r = vec![100i32; 8];
        lr_to_ms_i32(&mut l, &mut r).unwrap();
        assert!(l.iter().all(|&x| x == 100));
        assert!(r.iter().all(|&x| x == 0));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let mut l = vec![0i32; 3];
        let mut r = vec![0i32; 4];
        assert!(lr_to_ms_i32(&mut l, &mut r).is_err());
    }
}
