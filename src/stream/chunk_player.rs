//! Renderer that derives grains directly from chunks and contours.
//!
//! Unlike [`Renderer`](super::renderer::Renderer) it needs no precomputed
//! synth frames, so it can audition a freshly edited chunk range before the
//! full synth-frame pass has run.

use std::sync::Arc;

use crate::core::types::SynthFrame;
use crate::track::contour::SplineCursor;
use crate::track::synth::{blended_grains, synth_period, unvoiced_grain};
use crate::track::{ChunkId, TrackSnapshot};

use super::mixer::GrainMixer;
use super::provider::{AudioProvider, TerminateHandle};

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// About to start the current chunk.
    Enter,
    /// Inside a voiced run; next grain center.
    Voiced { t: f64 },
    /// Inside an unvoiced chunk; next analysis frame.
    Unvoiced { frame: usize },
}

/// Plays a chunk range, computing grain positions on the fly.
pub struct ChunkPlayer {
    snapshot: Arc<TrackSnapshot>,
    chunk: Option<ChunkId>,
    end: Option<ChunkId>,
    phase: Phase,
    cursor: Option<SplineCursor>,
    pending: [Option<SynthFrame>; 2],
    lookahead: Option<SynthFrame>,
    last_tmid: Option<f64>,
    mixer: GrainMixer,
    terminate: TerminateHandle,
    finished: bool,
}

impl ChunkPlayer {
    /// Player from chunk `first` up to, not including, `end`.
    pub fn new(snapshot: Arc<TrackSnapshot>, first: ChunkId, end: Option<ChunkId>) -> Self {
        let clock = snapshot.chunks.get(first).map_or(0, |c| c.begin);
        Self {
            snapshot,
            chunk: Some(first),
            end,
            phase: Phase::Enter,
            cursor: None,
            pending: [None, None],
            lookahead: None,
            last_tmid: None,
            mixer: GrainMixer::new(clock),
            terminate: TerminateHandle::new(),
            finished: false,
        }
    }

    /// Player for the whole track.
    pub fn whole(snapshot: Arc<TrackSnapshot>) -> Option<Self> {
        let first = snapshot.chunks.first()?;
        Some(Self::new(snapshot, first, None))
    }

    #[inline]
    pub fn clock(&self) -> i64 {
        self.mixer.clock()
    }

    fn take_pending(&mut self) -> Option<SynthFrame> {
        self.pending.iter_mut().find_map(Option::take)
    }

    /// Produces the next grain in output order, or `None` at the end of the
    /// range.
    fn next_grain(&mut self) -> Option<SynthFrame> {
        let snap = Arc::clone(&self.snapshot);
        let chunks = &snap.chunks;
        let frames = snap.frames.as_slice();

        loop {
            if let Some(sf) = self.take_pending() {
                self.last_tmid = Some(sf.tmid);
                return Some(sf);
            }
            let id = self.chunk.filter(|&id| Some(id) != self.end)?;
            let chunk = chunks.get(id)?;

            match self.phase {
                Phase::Enter => {
                    self.phase = if chunk.voiced {
                        self.cursor = Some(SplineCursor::at_run(chunks, id));
                        Phase::Voiced {
                            t: chunk.begin as f64,
                        }
                    } else {
                        Phase::Unvoiced {
                            frame: chunk.begin_frame,
                        }
                    };
                }
                Phase::Voiced { t } => {
                    if t >= chunk.end as f64 {
                        let next = chunks.next(id);
                        if !next.is_some_and(|n| chunks[n].voiced) {
                            self.phase = Phase::Enter;
                        }
                        self.chunk = next;
                        continue;
                    }
                    let pitch = self
                        .cursor
                        .as_mut()
                        .and_then(|c| c.pitch_at(chunks, t))
                        .unwrap_or(chunk.pitch as f32);
                    self.pending = blended_grains(frames, chunk.frame_index_at(t), t);
                    self.phase = Phase::Voiced {
                        t: t + synth_period(pitch, snap.sample_rate()),
                    };
                }
                Phase::Unvoiced { frame } => {
                    if frame >= chunk.end_frame {
                        self.chunk = chunks.next(id);
                        self.phase = Phase::Enter;
                        continue;
                    }
                    self.phase = Phase::Unvoiced { frame: frame + 1 };
                    if let Some(mut sf) = unvoiced_grain(frames, chunk, frame) {
                        sf.tbegin = self.last_tmid.unwrap_or(sf.tmid);
                        self.pending = [Some(sf), None];
                    }
                }
            }
        }
    }

    fn schedule(&mut self) {
        let t = self.mixer.clock() as f64;
        loop {
            if self.lookahead.is_none() {
                self.lookahead = self.next_grain();
            }
            match self.lookahead {
                Some(sf) if sf.tbegin <= t => {
                    self.mixer.schedule(&sf);
                    self.lookahead = None;
                }
                _ => break,
            }
        }
    }

    fn render_sample(&mut self) -> Option<f32> {
        let terminating = self.terminate.is_terminating();
        if !terminating {
            self.schedule();
        }
        let exhausted = terminating || self.lookahead.is_none();
        if self.mixer.is_idle() && exhausted {
            self.finished = true;
            return None;
        }
        Some(self.mixer.mix(&self.snapshot.wave))
    }
}

impl AudioProvider for ChunkPlayer {
    fn provide(&mut self, out: &mut [f32]) -> usize {
        if self.finished {
            return 0;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            match self.render_sample() {
                Some(v) => *slot = v,
                None => return i,
            }
        }
        out.len()
    }

    fn terminate_handle(&self) -> TerminateHandle {
        self.terminate.clone()
    }
}
