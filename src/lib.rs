#![forbid(unsafe_code)]
//! Pure Rust vocal pitch analysis and PSOLA resynthesis.
//!
//! `intonation` analyses a monophonic voice recording into pitch-tracked
//! frames, segments it into notes ("chunks"), fits an editable pitch contour,
//! and resynthesizes the audio with modified pitch and timing using
//! pitch-synchronous overlap-add. The same pull-based renderer drives both
//! live playback and offline export.
//!
//! # Quick Start
//!
//! ```
//! use intonation::{AnalysisParams, NoProgress, Track, Waveform};
//!
//! // Half a second of 220 Hz sine at 44.1 kHz
//! let samples: Vec<f32> = (0..22050)
//!     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 44100.0).sin())
//!     .collect();
//! let wave = Waveform::new(samples, 44100).unwrap();
//!
//! let mut track = Track::analyze(wave, AnalysisParams::default(), &mut NoProgress).unwrap();
//! let voiced: Vec<_> = track
//!     .chunks()
//!     .iter()
//!     .filter(|(_, c)| c.voiced)
//!     .map(|(id, _)| id)
//!     .collect();
//! for id in voiced {
//!     track.shift_chunk_pitch(id, 2.0).unwrap(); // up a whole tone
//! }
//!
//! let output = intonation::render(&mut track, &mut NoProgress).unwrap();
//! assert!(!output.is_empty());
//! ```
//!
//! # Playback
//!
//! For real-time use, hand a renderer to the audio callback through a
//! [`PlaybackSink`]:
//!
//! ```
//! use intonation::stream::{channel, Renderer};
//! # use intonation::{AnalysisParams, NoProgress, Track, Waveform};
//! # let wave = Waveform::new(vec![0.0; 4096], 44100).unwrap();
//! # let mut track = Track::analyze(wave, AnalysisParams::default(), &mut NoProgress).unwrap();
//!
//! let (mut control, mut sink) = channel();
//! control.play(Box::new(Renderer::new(track.snapshot()))).unwrap();
//!
//! // In the audio callback:
//! let mut buffer = [0.0f32; 256];
//! sink.process(&mut buffer);
//! ```

pub mod analysis;
pub mod core;
pub mod error;
pub mod io;
pub mod stream;
pub mod track;

pub use core::spline::HermiteSplinePoint;
pub use core::types::{
    frequency_to_pitch, pitch_to_frequency, AnalysisFrame, AnalysisParams, NoProgress,
    ProgressMonitor, Sample, SynthFrame,
};
pub use core::waveform::Waveform;
pub use error::IntonationError;
pub use stream::{AudioProvider, PlaybackControl, PlaybackSink, Renderer};
pub use track::{Chunk, ChunkId, ChunkList, PitchContourIterator, Track, TrackSnapshot};

/// Loads a mono WAV file and runs the full analysis pipeline on it.
pub fn analyze_file(
    path: impl AsRef<std::path::Path>,
    params: AnalysisParams,
    monitor: &mut dyn ProgressMonitor,
) -> Result<Track, IntonationError> {
    let wave = io::wav::read_wav_file(path)?;
    Track::analyze(wave, params, monitor)
}

/// Renders the track's current state to a sample vector.
pub fn render(
    track: &mut Track,
    monitor: &mut dyn ProgressMonitor,
) -> Result<Vec<f32>, IntonationError> {
    stream::export_to_vec(track.snapshot(), monitor)
}
