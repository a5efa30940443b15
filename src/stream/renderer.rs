//! Pull-based PSOLA renderer over precomputed synth frames.

use std::sync::Arc;

use crate::track::{ChunkId, TrackSnapshot};

use super::mixer::GrainMixer;
use super::provider::{AudioProvider, TerminateHandle};

/// Renders a track snapshot by overlap-adding its synth frames.
///
/// The same renderer drives live playback and offline export, so both
/// produce identical samples. Output starts at the clock position the
/// renderer was created with and is deterministic regardless of how the
/// caller splits its requests.
pub struct Renderer {
    snapshot: Arc<TrackSnapshot>,
    next: usize,
    end: usize,
    mixer: GrainMixer,
    terminate: TerminateHandle,
    finished: bool,
}

impl Renderer {
    /// Renderer for the whole track, starting at sample 0.
    pub fn new(snapshot: Arc<TrackSnapshot>) -> Self {
        let end = snapshot.synth.len();
        Self::with_bounds(snapshot, 0, end, 0)
    }

    /// Renderer from the start of chunk `first` up to, not including, chunk
    /// `end` (or the end of the track).
    pub fn for_range(snapshot: Arc<TrackSnapshot>, first: ChunkId, end: Option<ChunkId>) -> Self {
        let start = snapshot.first_synth_frame_index(first);
        let stop = end.map_or(snapshot.synth.len(), |id| {
            snapshot.first_synth_frame_index(id)
        });
        let clock = snapshot.chunks.get(first).map_or(0, |c| c.begin);
        Self::with_bounds(snapshot, start, stop.max(start), clock)
    }

    fn with_bounds(snapshot: Arc<TrackSnapshot>, next: usize, end: usize, clock: i64) -> Self {
        Self {
            snapshot,
            next,
            end,
            mixer: GrainMixer::new(clock),
            terminate: TerminateHandle::new(),
            finished: false,
        }
    }

    /// Output position of the next sample.
    #[inline]
    pub fn clock(&self) -> i64 {
        self.mixer.clock()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Grains dropped because too many overlapped.
    #[inline]
    pub fn dropped_grains(&self) -> usize {
        self.mixer.dropped()
    }

    fn schedule(&mut self) {
        let t = self.mixer.clock() as f64;
        while self.next < self.end {
            let sf = &self.snapshot.synth[self.next];
            if sf.tbegin > t {
                break;
            }
            self.mixer.schedule(sf);
            self.next += 1;
        }
    }

    fn render_sample(&mut self) -> Option<f32> {
        let terminating = self.terminate.is_terminating();
        if !terminating {
            self.schedule();
        }
        if self.mixer.is_idle() && (terminating || self.next >= self.end) {
            self.finished = true;
            return None;
        }
        Some(self.mixer.mix(&self.snapshot.wave))
    }
}

impl AudioProvider for Renderer {
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
