//! FFT-based correlation over a fixed block length.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

const COMPLEX_ZERO: Complex<f64> = Complex::new(0.0, 0.0);

/// Computes the linear correlation of two equal-length blocks in O(N log N).
///
/// Both inputs are zero-padded to `2N`; the second is time-reversed so a plain
/// spectral product yields the correlation. Plans and buffers are allocated
/// once in [`CorrelationService::new`], so [`CorrelationService::run`] never
/// allocates.
///
/// For output index `k`, `out[k] = sum_i in1[i] * in2[N - 1 - k + i]`, i.e.
/// `in1` slid against the tail of `in2` by `N - 1 - k` samples.
pub struct CorrelationService {
    length: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buf1: Vec<Complex<f64>>,
    buf2: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl CorrelationService {
    /// Plans transforms for blocks of `length` samples.
    pub fn new(length: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(2 * length);
        let inverse = planner.plan_fft_inverse(2 * length);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            length,
            forward,
            inverse,
            buf1: vec![COMPLEX_ZERO; 2 * length],
            buf2: vec![COMPLEX_ZERO; 2 * length],
            scratch: vec![COMPLEX_ZERO; scratch_len],
        }
    }

    /// Block length this service was planned for.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Correlates `in1` with `in2`, writing `N` values to `out`.
    ///
    /// All three slices must hold at least `N` elements.
    pub fn run(&mut self, in1: &[f32], in2: &[f32], out: &mut [f32]) {
        let n = self.length;
        debug_assert!(in1.len() >= n && in2.len() >= n && out.len() >= n);

        for i in 0..n {
            self.buf1[i] = Complex::new(in1[i] as f64, 0.0);
            self.buf2[i] = Complex::new(in2[n - 1 - i] as f64, 0.0);
            self.buf1[i + n] = COMPLEX_ZERO;
            self.buf2[i + n] = COMPLEX_ZERO;
        }

        self.forward
            .process_with_scratch(&mut self.buf1, &mut self.scratch);
        self.forward
            .process_with_scratch(&mut self.buf2, &mut self.scratch);

        for (a, b) in self.buf1.iter_mut().zip(self.buf2.iter()) {
            *a *= *b;
        }

        self.inverse
            .process_with_scratch(&mut self.buf1, &mut self.scratch);

        let scale = 1.0 / (2 * n) as f64;
        for (o, c) in out.iter_mut().zip(self.buf1.iter()).take(n) {
            *o = (c.re * scale) as f32;
        }
    }
}
