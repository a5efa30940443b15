//! Immutable mono PCM waveform.

use crate::core::types::Sample;
use crate::error::IntonationError;

/// Mono PCM samples plus their sample rate. Read-only after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<Sample>,
    sample_rate: u32,
}

impl Waveform {
    /// Creates a waveform from mono samples.
    ///
    /// # Errors
    /// Returns `IntonationError::EmptyWaveform` if `samples` is empty and
    /// `IntonationError::InvalidSampleRate` if `sample_rate` is 0.
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> Result<Self, IntonationError> {
        if sample_rate == 0 {
            return Err(IntonationError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(IntonationError::EmptyWaveform);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; empty waveforms are rejected at construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Raw sample slice.
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Bounds-checked sample access.
    #[inline]
    pub fn sample(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).copied()
    }

    /// Linearly interpolated sample at a fractional position.
    ///
    /// Positions outside the waveform read as silence, so grains that
    /// overhang either end fade out instead of wrapping.
    #[inline]
    pub fn sample_at(&self, t: f64) -> Sample {
        if !(t > -1.0) || t >= self.samples.len() as f64 {
            return 0.0;
        }
        let floor = t.floor();
        let frac = (t - floor) as f32;
        let i = floor as i64;
        let s0 = self.sample_signed(i);
        let s1 = self.sample_signed(i + 1);
        s0 + (s1 - s0) * frac
    }

    #[inline]
    fn sample_signed(&self, i: i64) -> Sample {
        if i < 0 {
            0.0
        } else {
            self.samples.get(i as usize).copied().unwrap_or(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_rejects_invalid() {
        assert!(matches!(
            Waveform::new(vec![], 44100),
            Err(IntonationError::EmptyWaveform)
        ));
        assert!(matches!(
            Waveform::new(vec![0.0], 0),
            Err(IntonationError::InvalidSampleRate(0))
        ));
    }

    #[test]
    fn test_sample_bounds() {
        let wave = Waveform::new(vec![0.1, 0.2, 0.3], 8000).unwrap();
        assert_eq!(wave.len(), 3);
        assert_eq!(wave.sample(2), Some(0.3));
        assert_eq!(wave.sample(3), None);
    }

    #[test]
    fn test_fractional_interpolation() {
        let wave = Waveform::new(vec![0.0, 1.0, -1.0], 8000).unwrap();
        assert!((wave.sample_at(0.5) - 0.5).abs() < 1e-6);
        assert!((wave.sample_at(1.25) - 0.5).abs() < 1e-6);
        assert_eq!(wave.sample_at(1.0), 1.0);
    }

    #[test]
    fn test_fractional_outside_is_silent() {
        let wave = Waveform::new(vec![1.0, 1.0], 8000).unwrap();
        assert_eq!(wave.sample_at(-5.0), 0.0);
        assert_eq!(wave.sample_at(2.0), 0.0);
        assert_eq!(wave.sample_at(f64::NAN), 0.0);
        // Fades toward zero past the last sample.
        assert!((wave.sample_at(1.5) - 0.5).abs() < 1e-6);
        assert!((wave.sample_at(-0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_duration() {
        let wave = Waveform::new(vec![0.0; 22050], 44100).unwrap();
        assert!((wave.duration_secs() - 0.5).abs() < 1e-12);
    }
}
