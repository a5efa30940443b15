//! An analysed track: waveform, frames, editable chunk list, and synth frames.

pub mod chunk;
pub mod contour;
pub mod edit;
pub mod synth;

use std::sync::Arc;

use crate::analysis::{decompose, detect_chunks, fit_pitch_contour};
use crate::core::types::{AnalysisFrame, AnalysisParams, ProgressMonitor, SynthFrame};
use crate::core::waveform::Waveform;
use crate::error::IntonationError;

pub use chunk::{Chunk, ChunkId, ChunkList};
pub use contour::{PitchContourIterator, SplineCursor};
pub use edit::{MIN_CHUNK_LENGTH, MIN_CONTOUR_SPACING};
pub use synth::compute_synth_frames;

/// A mono recording together with its analysis and the user's edits.
///
/// The waveform and analysis frames never change after analysis and are
/// shared with renderers by `Arc`. The chunk list is owned here and mutated
/// only on the edit thread; renderers get an immutable [`TrackSnapshot`].
#[derive(Debug, Clone)]
pub struct Track {
    wave: Arc<Waveform>,
    frames: Arc<Vec<AnalysisFrame>>,
    chunks: ChunkList,
    synth: Arc<Vec<SynthFrame>>,
    synth_dirty: bool,
    params: AnalysisParams,
}

impl Track {
    /// Runs the full analysis pipeline: frame decomposition, chunk
    /// segmentation, contour fitting, and synth-frame generation.
    pub fn analyze(
        wave: Waveform,
        params: AnalysisParams,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Self, IntonationError> {
        let frames = decompose(&wave, &params, monitor)?;
        let mut chunks = detect_chunks(&frames, &params);
        fit_pitch_contour(&mut chunks, &frames, &params);
        let synth = compute_synth_frames(&chunks, &frames, wave.sample_rate());
        monitor.report(1.0);

        log::info!(
            "analysed {:.2}s at {} Hz: {} frames, {} chunks",
            wave.duration_secs(),
            wave.sample_rate(),
            frames.len(),
            chunks.len()
        );

        Ok(Self {
            wave: Arc::new(wave),
            frames: Arc::new(frames),
            chunks,
            synth: Arc::new(synth),
            synth_dirty: false,
            params,
        })
    }

    /// Reassembles a track from previously persisted parts.
    pub fn from_parts(
        wave: Waveform,
        frames: Vec<AnalysisFrame>,
        chunks: ChunkList,
        params: AnalysisParams,
    ) -> Result<Self, IntonationError> {
        validate_frames(&frames, wave.len())?;
        chunks.validate(wave.len() as i64, frames.len())?;
        Ok(Self {
            wave: Arc::new(wave),
            frames: Arc::new(frames),
            chunks,
            synth: Arc::new(Vec::new()),
            synth_dirty: true,
            params,
        })
    }

    #[inline]
    pub fn waveform(&self) -> &Arc<Waveform> {
        &self.wave
    }

    #[inline]
    pub fn frames(&self) -> &[AnalysisFrame] {
        &self.frames
    }

    #[inline]
    pub fn chunks(&self) -> &ChunkList {
        &self.chunks
    }

    #[inline]
    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.wave.sample_rate()
    }

    /// Mutable access for edits. Marks the synth frames stale.
    pub(crate) fn chunks_mut(&mut self) -> &mut ChunkList {
        self.synth_dirty = true;
        &mut self.chunks
    }

    /// Replaces the chunk list, e.g. with an earlier clone for undo.
    pub fn restore_chunks(&mut self, chunks: ChunkList) -> Result<(), IntonationError> {
        chunks.validate(self.wave.len() as i64, self.frames.len())?;
        self.chunks = chunks;
        self.synth_dirty = true;
        Ok(())
    }

    /// Current synth frames, regenerated if an edit made them stale.
    pub fn synth_frames(&mut self) -> &[SynthFrame] {
        self.refresh_synth();
        &self.synth
    }

    fn refresh_synth(&mut self) {
        if self.synth_dirty {
            self.synth = Arc::new(compute_synth_frames(
                &self.chunks,
                &self.frames,
                self.wave.sample_rate(),
            ));
            self.synth_dirty = false;
        }
    }

    /// Immutable copy of everything a renderer needs.
    pub fn snapshot(&mut self) -> Arc<TrackSnapshot> {
        self.refresh_synth();
        Arc::new(TrackSnapshot {
            wave: Arc::clone(&self.wave),
            frames: Arc::clone(&self.frames),
            chunks: self.chunks.clone(),
            synth: Arc::clone(&self.synth),
        })
    }
}

/// Frozen view of a track for rendering on another thread.
#[derive(Debug, Clone)]
pub struct TrackSnapshot {
    pub wave: Arc<Waveform>,
    pub frames: Arc<Vec<AnalysisFrame>>,
    pub chunks: ChunkList,
    pub synth: Arc<Vec<SynthFrame>>,
}

impl TrackSnapshot {
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.wave.sample_rate()
    }

    /// Index of the first synth frame centered at or after the chunk's begin.
    pub fn first_synth_frame_index(&self, chunk: ChunkId) -> usize {
        match self.chunks.get(chunk) {
            Some(c) => {
                let begin = c.begin as f64;
                self.synth.partition_point(|sf| sf.tmid < begin)
            }
            None => self.synth.len(),
        }
    }

    /// Output length in samples, the end of the last chunk.
    pub fn output_len(&self) -> i64 {
        self.chunks
            .last()
            .map_or(0, |id| self.chunks[id].end)
    }
}

fn validate_frames(frames: &[AnalysisFrame], length: usize) -> Result<(), IntonationError> {
    let (Some(first), Some(last)) = (frames.first(), frames.last()) else {
        return Err(IntonationError::InvalidFormat("no analysis frames".to_string()));
    };
    if frames.len() < 2 || first.position != 0.0 || last.position != length as f64 {
        return Err(IntonationError::InvalidFormat(
            "analysis frames do not span the waveform".to_string(),
        ));
    }
    if frames.windows(2).any(|w| !(w[1].position > w[0].position)) {
        return Err(IntonationError::InvalidFormat(
            "analysis frame positions are not strictly increasing".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NoProgress;

    fn sine(freq: f32, secs: f32, sample_rate: u32) -> Waveform {
        let n = (secs * sample_rate as f32) as usize;
        let samples = (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        Waveform::new(samples, sample_rate).unwrap()
    }

    #[test]
    fn test_analyze_covers_waveform() {
        let track = Track::analyze(sine(220.0, 0.5, 44100), AnalysisParams::default(), &mut NoProgress)
            .unwrap();
        let len = track.waveform().len() as i64;
        assert!(track.chunks().validate(len, track.frames().len()).is_ok());
        assert!(track.chunks().iter().any(|(_, c)| c.voiced));
        for (_, c) in track.chunks().iter() {
            if c.voiced {
                assert_eq!(c.pitch, 57);
            }
        }
    }

    #[test]
    fn test_snapshot_regenerates_after_edit() {
        let mut track =
            Track::analyze(sine(220.0, 0.5, 44100), AnalysisParams::default(), &mut NoProgress)
                .unwrap();
        let before = track.snapshot();
        let voiced = track
            .chunks()
            .iter()
            .find(|(_, c)| c.voiced)
            .map(|(id, _)| id)
            .unwrap();
        track.shift_chunk_pitch(voiced, 12.0).unwrap();
        let after = track.snapshot();
        assert!(!Arc::ptr_eq(&before.synth, &after.synth));
        assert!(after.synth.len() > before.synth.len());
        assert!(Arc::ptr_eq(&before.wave, &after.wave));
    }

    #[test]
    fn test_from_parts_rejects_bad_frames() {
        let wave = Waveform::new(vec![0.0; 100], 8000).unwrap();
        let frames = vec![AnalysisFrame::unvoiced(0.0), AnalysisFrame::unvoiced(50.0)];
        let mut chunks = ChunkList::new();
        chunks.push_back(Chunk::new(0, 1, 0, 100, 60, false));
        let err = Track::from_parts(wave, frames, chunks, AnalysisParams::default());
        assert!(matches!(err, Err(IntonationError::InvalidFormat(_))));
    }

    #[test]
    fn test_restore_chunks() {
        let mut track =
            Track::analyze(sine(220.0, 0.5, 44100), AnalysisParams::default(), &mut NoProgress)
                .unwrap();
        let backup = track.chunks().clone();
        let voiced = track
            .chunks()
            .iter()
            .find(|(_, c)| c.voiced)
            .map(|(id, _)| id)
            .unwrap();
        track.shift_chunk_pitch(voiced, 2.0).unwrap();
        assert_ne!(track.chunks(), &backup);
        track.restore_chunks(backup.clone()).unwrap();
        assert_eq!(track.chunks(), &backup);
    }

    #[test]
    fn test_first_synth_frame_index() {
        let mut track =
            Track::analyze(sine(220.0, 0.5, 44100), AnalysisParams::default(), &mut NoProgress)
                .unwrap();
        let snap = track.snapshot();
        let first = snap.chunks.first().unwrap();
        assert_eq!(snap.first_synth_frame_index(first), 0);
        for (id, c) in snap.chunks.iter() {
            let idx = snap.first_synth_frame_index(id);
            if idx < snap.synth.len() {
                assert!(snap.synth[idx].tmid >= c.begin as f64);
            }
        }
    }
}
