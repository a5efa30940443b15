//! Overlap-add of in-flight grains, shared by every renderer.

use crate::core::ring_buffer::RingBuffer;
use crate::core::types::SynthFrame;
use crate::core::waveform::Waveform;
use crate::core::window::grain_weight;

/// Maximum number of simultaneously sounding grains.
pub const GRAIN_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
struct Grain {
    smid: f64,
    tbegin: f64,
    tmid: f64,
    tend: f64,
    stretch: f64,
    amplitude: f32,
}

impl From<&SynthFrame> for Grain {
    fn from(sf: &SynthFrame) -> Self {
        Self {
            smid: sf.smid,
            tbegin: sf.tbegin,
            tmid: sf.tmid,
            tend: sf.tend,
            stretch: sf.stretch as f64,
            amplitude: sf.amplitude,
        }
    }
}

/// Fixed-capacity grain queue plus the output clock.
#[derive(Debug, Clone)]
pub(crate) struct GrainMixer {
    grains: RingBuffer<Grain>,
    clock: i64,
    dropped: usize,
}

impl GrainMixer {
    pub(crate) fn new(clock: i64) -> Self {
        Self {
            grains: RingBuffer::with_capacity(GRAIN_CAPACITY),
            clock,
            dropped: 0,
        }
    }

    #[inline]
    pub(crate) fn clock(&self) -> i64 {
        self.clock
    }

    #[inline]
    pub(crate) fn is_idle(&self) -> bool {
        self.grains.is_empty()
    }

    /// Grains refused because the queue was full.
    #[inline]
    pub(crate) fn dropped(&self) -> usize {
        self.dropped
    }

    /// Adds a grain unless it already ended before the current clock.
    pub(crate) fn schedule(&mut self, sf: &SynthFrame) {
        if sf.tend <= self.clock as f64 {
            return;
        }
        if !self.grains.push(Grain::from(sf)) {
            self.dropped += 1;
        }
    }

    /// Mixes one output sample at the current clock, evicts grains that end
    /// before the next sample, and advances the clock.
    pub(crate) fn mix(&mut self, wave: &Waveform) -> f32 {
        let t = self.clock as f64;
        let mut acc = 0.0f32;
        for g in self.grains.iter() {
            let w = grain_weight(t, g.tbegin, g.tmid, g.tend);
            if w > 0.0 {
                let source = g.smid + (t - g.tmid) * g.stretch;
                acc += w * g.amplitude * wave.sample_at(source);
            }
        }

        let next = t + 1.0;
        while self.grains.front().is_some_and(|g| g.tend <= next) {
            self.grains.pop();
        }
        self.clock += 1;
        acc
    }
}
