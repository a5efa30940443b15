//! Raised-cosine grain shaping.
//!
//! Every grain is an asymmetric Hann window: a rising half-cosine between its
//! begin and center knots and a falling half-cosine between center and end.
//! Adjacent grains whose knots coincide sum to exactly one.

use std::f32::consts::PI;

/// Rising half of a Hann window, `u` in `[0, 1]`.
#[inline]
pub fn hann_rise(u: f32) -> f32 {
    (1.0 - (PI * u).cos()) * 0.5
}

/// Falling half of a Hann window, `u` in `[0, 1]`.
#[inline]
pub fn hann_fall(u: f32) -> f32 {
    (1.0 + (PI * u).cos()) * 0.5
}

/// Weight of a grain with knots `tbegin <= tmid <= tend` at output time `t`.
///
/// Zero outside `[tbegin, tend)`. A degenerate half (zero width) contributes
/// a full-weight step so that grains at a region boundary are not lost.
#[inline]
pub fn grain_weight(t: f64, tbegin: f64, tmid: f64, tend: f64) -> f32 {
    if t < tbegin || t >= tend {
        0.0
    } else if t < tmid {
        let u = ((t - tbegin) / (tmid - tbegin)) as f32;
        hann_rise(u)
    } else if tend > tmid {
        let u = ((t - tmid) / (tend - tmid)) as f32;
        hann_fall(u)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halves_complement() {
        for i in 0..=10 {
            let u = i as f32 / 10.0;
            assert!((hann_rise(u) + hann_fall(u) - 1.0).abs() < 1e-6);
        }
        assert!(hann_rise(0.0).abs() < 1e-6);
        assert!((hann_fall(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_grain_weight_shape() {
        assert_eq!(grain_weight(-1.0, 0.0, 10.0, 20.0), 0.0);
        assert_eq!(grain_weight(20.0, 0.0, 10.0, 20.0), 0.0);
        assert!((grain_weight(10.0, 0.0, 10.0, 20.0) - 1.0).abs() < 1e-6);
        assert!((grain_weight(5.0, 0.0, 10.0, 20.0) - 0.5).abs() < 1e-6);
        assert!((grain_weight(15.0, 0.0, 10.0, 20.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_adjacent_grains_sum_to_one() {
        // Grains centered at 0, 10, 20 with knots at their neighbors.
        for i in 0..100 {
            let t = i as f64 * 0.1;
            let sum = grain_weight(t, -10.0, 0.0, 10.0) + grain_weight(t, 0.0, 10.0, 20.0);
            assert!((sum - 1.0).abs() < 1e-5, "t={}: {}", t, sum);
        }
    }

    #[test]
    fn test_degenerate_rise_is_step() {
        assert!((grain_weight(5.0, 5.0, 5.0, 15.0) - 1.0).abs() < 1e-6);
    }
}
