use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::IntonationError;

/// A single audio sample (32-bit float, range -1.0 to 1.0).
pub type Sample = f32;

/// Reference tuning: MIDI note 69 (A4) sounds at 440 Hz.
pub const A4_FREQUENCY: f32 = 440.0;
/// MIDI note number of the reference pitch.
pub const A4_PITCH: f32 = 69.0;

/// Converts a frequency in Hz to a fractional MIDI-like pitch number.
#[inline]
pub fn frequency_to_pitch(freq: f32) -> f32 {
    (freq / A4_FREQUENCY).log2() * 12.0 + A4_PITCH
}

/// Converts a fractional pitch number to a frequency in Hz.
#[inline]
pub fn pitch_to_frequency(pitch: f32) -> f32 {
    A4_FREQUENCY * ((pitch - A4_PITCH) / 12.0).exp2()
}

/// Period length in samples of the given pitch at `sample_rate`.
#[inline]
pub fn pitch_to_period(pitch: f32, sample_rate: u32) -> f64 {
    sample_rate as f64 / pitch_to_frequency(pitch) as f64
}

/// One analysis frame produced by the frame decomposition.
///
/// Voiced frames sit one pitch period apart; unvoiced frames carry
/// `period == 0.0` and `pitch == 0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisFrame {
    /// Sample offset into the waveform.
    pub position: f64,
    /// Period length in samples (0 if unvoiced).
    pub period: f32,
    /// Fractional pitch number (0 if unvoiced).
    pub pitch: f32,
}

impl AnalysisFrame {
    /// Creates an unvoiced frame marker.
    #[inline]
    pub fn unvoiced(position: f64) -> Self {
        Self {
            position,
            period: 0.0,
            pitch: 0.0,
        }
    }

    #[inline]
    pub fn is_voiced(&self) -> bool {
        self.period > 0.0
    }
}

/// One overlap-add grain on the output timeline.
///
/// The grain is shaped by a raised cosine rising over `[tbegin, tmid]` and
/// falling over `[tmid, tend]`; the renderer applies the shaping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SynthFrame {
    /// Window center in the source waveform.
    pub smid: f64,
    /// Window begin on the output timeline.
    pub tbegin: f64,
    /// Window center on the output timeline.
    pub tmid: f64,
    /// Window end on the output timeline.
    pub tend: f64,
    /// Source samples consumed per output sample.
    pub stretch: f32,
    /// Amplitude scaling factor.
    pub amplitude: f32,
}

/// Receives fractional progress from long-running analysis or export.
///
/// Closures taking an `f64` implement this trait directly.
pub trait ProgressMonitor {
    /// Reports progress in `[0.0, 1.0]`.
    fn report(&mut self, fraction: f64);

    /// Returns true if the operation should stop as soon as possible.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F: FnMut(f64)> ProgressMonitor for F {
    fn report(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// Progress monitor that ignores all reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressMonitor for NoProgress {
    fn report(&mut self, _fraction: f64) {}
}

/// Largest accepted `max_subdivision`.
pub const MAX_SUBDIVISION: usize = 15;

/// Parameters controlling analysis: frame decomposition, chunk segmentation,
/// and pitch contour fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Correlation block length in samples (default: 1024).
    pub block_size: usize,
    /// Half-width of the correlation reference window (default: 24).
    pub overlap: usize,
    /// Highest harmonic subdivision considered for octave correction (default: 7).
    pub max_subdivision: usize,
    /// Viterbi cost of declaring a periodic frame unvoiced (default: π/2).
    pub unvoiced_cost: f32,
    /// Viterbi penalty for a voiced/unvoiced transition (default: 5.0).
    pub voicing_transition_penalty: f32,
    /// Weight of the squared log-period jump between voiced frames (default: 25.0).
    pub period_jump_weight: f32,
    /// Discrete pitch candidates considered per voiced frame (default: 7).
    pub pitch_candidates: usize,
    /// Penalty for changing the quantized pitch between frames (default: 10.0).
    pub pitch_change_penalty: f32,
    /// Per-segment L1 error below which contour refinement stops (default: 5.0).
    pub contour_error_threshold: f32,
    /// Maximum number of contour refinement passes (default: 100).
    pub contour_max_passes: usize,
    /// Weight of the log segment length regularizer (default: 5.0).
    pub contour_length_weight: f32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            block_size: 1024,
            overlap: 24,
            max_subdivision: 7,
            unvoiced_cost: PI / 2.0,
            voicing_transition_penalty: 5.0,
            period_jump_weight: 25.0,
            pitch_candidates: 7,
            pitch_change_penalty: 10.0,
            contour_error_threshold: 5.0,
            contour_max_passes: 100,
            contour_length_weight: 5.0,
        }
    }
}

impl AnalysisParams {
    /// Creates parameters with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the correlation block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the correlation reference half-width.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Set the highest harmonic subdivision (clamped to 1..=15).
    pub fn with_max_subdivision(mut self, max_subdivision: usize) -> Self {
        self.max_subdivision = max_subdivision.clamp(1, MAX_SUBDIVISION);
        self
    }

    /// Set the number of pitch candidates per voiced frame.
    pub fn with_pitch_candidates(mut self, candidates: usize) -> Self {
        self.pitch_candidates = candidates;
        self
    }

    /// Set the penalty for changing quantized pitch.
    pub fn with_pitch_change_penalty(mut self, penalty: f32) -> Self {
        self.pitch_change_penalty = penalty.max(0.0);
        self
    }

    /// Set the contour refinement error threshold.
    pub fn with_contour_error_threshold(mut self, threshold: f32) -> Self {
        self.contour_error_threshold = threshold.max(0.0);
        self
    }

    /// Set the maximum number of contour refinement passes.
    pub fn with_contour_max_passes(mut self, passes: usize) -> Self {
        self.contour_max_passes = passes;
        self
    }

    /// Samples skipped after an unvoiced frame.
    #[inline]
    pub fn unvoiced_step(&self) -> usize {
        self.block_size / 4
    }

    /// Number of Viterbi states (unvoiced plus one per subdivision).
    #[inline]
    pub fn viterbi_states(&self) -> usize {
        self.max_subdivision + 1
    }

    /// Validate all parameters.
    pub fn validate(&self) -> Result<(), IntonationError> {
        if self.block_size < 64 {
            return Err(IntonationError::InvalidParams(format!(
                "block size {} is smaller than 64",
                self.block_size
            )));
        }
        if self.overlap == 0 || 4 * self.overlap >= self.block_size {
            return Err(IntonationError::InvalidParams(format!(
                "overlap {} must be in 1..{}",
                self.overlap,
                self.block_size / 4
            )));
        }
        if self.max_subdivision == 0 || self.max_subdivision > MAX_SUBDIVISION {
            return Err(IntonationError::InvalidParams(format!(
                "max subdivision {} must be in 1..={}",
                self.max_subdivision, MAX_SUBDIVISION
            )));
        }
        if self.pitch_candidates == 0 || self.pitch_candidates % 2 == 0 {
            return Err(IntonationError::InvalidParams(format!(
                "pitch candidates must be odd, got {}",
                self.pitch_candidates
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for AnalysisParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "block={} overlap={} subdivisions={} candidates={} change_penalty={:.1} contour_threshold={:.1}",
            self.block_size,
            self.overlap,
            self.max_subdivision,
            self.pitch_candidates,
            self.pitch_change_penalty,
            self.contour_error_threshold
        )
    }
}
