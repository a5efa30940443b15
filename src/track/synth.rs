//! Synth-frame generation: lays PSOLA grains out on the output timeline.

use crate::core::types::{pitch_to_period, AnalysisFrame, SynthFrame};

use super::chunk::{Chunk, ChunkId, ChunkList};
use super::contour::SplineCursor;

/// Grains whose blend weight falls below this are not emitted.
const MIN_GRAIN_AMPLITUDE: f32 = 1e-3;
/// Shortest output period accepted from the pitch contour, in samples.
pub const MIN_SYNTH_PERIOD: f64 = 2.0;

/// Grain for analysis frame `k` centered at output time `t`.
///
/// The window reaches back to the previous frame marker and forward to the
/// next one, measured in source samples. `k` must have both neighbors.
#[inline]
pub fn frame_grain(frames: &[AnalysisFrame], k: usize, t: f64, amplitude: f32) -> SynthFrame {
    let smid = frames[k].position;
    SynthFrame {
        smid,
        tbegin: t + frames[k - 1].position - smid,
        tmid: t,
        tend: t + frames[k + 1].position - smid,
        stretch: 1.0,
        amplitude,
    }
}

/// Grains for a fractional frame index: the two nearest frame markers with
/// complementary amplitudes, ordered by `tbegin`.
pub fn blended_grains(frames: &[AnalysisFrame], frame_index: f64, t: f64) -> [Option<SynthFrame>; 2] {
    let n = frames.len();
    if n < 3 {
        return [None, None];
    }
    let hi = n - 2;
    let f0 = (frame_index.floor().max(1.0) as usize).min(hi);
    if f0 == hi {
        return [Some(frame_grain(frames, f0, t, 1.0)), None];
    }
    let w = (frame_index - f0 as f64).clamp(0.0, 1.0) as f32;

    let a = (1.0 - w >= MIN_GRAIN_AMPLITUDE).then(|| frame_grain(frames, f0, t, 1.0 - w));
    let b = (w >= MIN_GRAIN_AMPLITUDE).then(|| frame_grain(frames, f0 + 1, t, w));
    match (a, b) {
        (Some(a), Some(b)) if b.tbegin < a.tbegin => [Some(b), Some(a)],
        (Some(a), b) => [Some(a), b],
        (None, b) => [b, None],
    }
}

/// Output period at pitch `pitch`, guarded against degenerate contour values.
#[inline]
pub fn synth_period(pitch: f32, sample_rate: u32) -> f64 {
    let period = pitch_to_period(pitch, sample_rate);
    if period.is_finite() {
        period.max(MIN_SYNTH_PERIOD)
    } else {
        MIN_SYNTH_PERIOD
    }
}

/// Grain for frame `i` of an unvoiced chunk, with the chunk's frame span
/// mapped linearly onto its output span. `tbegin` is left for the caller.
pub fn unvoiced_grain(frames: &[AnalysisFrame], chunk: &Chunk, i: usize) -> Option<SynthFrame> {
    let p0 = frames.get(chunk.begin_frame)?.position;
    let p1 = frames.get(chunk.end_frame)?.position;
    let next = frames.get(i + 1)?.position;
    let span = p1 - p0;
    let map = |p: f64| {
        let s = if span > 0.0 { (p - p0) / span } else { 0.0 };
        chunk.begin as f64 * (1.0 - s) + chunk.end as f64 * s
    };
    let tmid = map(frames[i].position);
    Some(SynthFrame {
        smid: frames[i].position,
        tbegin: tmid,
        tmid,
        tend: map(next),
        stretch: 1.0,
        amplitude: 1.0,
    })
}

/// Walks the chunk list and produces the grain sequence for the whole track.
///
/// Voiced runs are resynthesized pitch-synchronously at the period given by
/// the contour; unvoiced chunks replay one grain per analysis frame. Grain
/// centers (`tmid`) are non-decreasing and no grain reaches past the end of
/// the last chunk.
pub fn compute_synth_frames(
    chunks: &ChunkList,
    frames: &[AnalysisFrame],
    sample_rate: u32,
) -> Vec<SynthFrame> {
    let mut synth: Vec<SynthFrame> = Vec::new();
    let mut cur = chunks.first();

    while let Some(id) = cur {
        let chunk = &chunks[id];
        if chunk.voiced {
            let last = voiced_run(chunks, frames, sample_rate, id, &mut synth);
            cur = chunks.next(last);
        } else {
            for i in chunk.begin_frame..chunk.end_frame {
                if let Some(mut sf) = unvoiced_grain(frames, chunk, i) {
                    sf.tbegin = synth.last().map_or(sf.tmid, |p| p.tmid);
                    synth.push(sf);
                }
            }
            cur = chunks.next(id);
        }
    }

    // A run that ends the track reuses the last frame, whose window would
    // otherwise extend past the output.
    let end = chunks.last().map_or(0.0, |id| chunks[id].end as f64);
    for sf in synth.iter_mut() {
        sf.tend = sf.tend.min(end.max(sf.tmid));
    }

    log::debug!("computed {} synth frames", synth.len());
    synth
}

/// Emits grains for the voiced run starting at `first`. Returns the last
/// chunk of the run.
fn voiced_run(
    chunks: &ChunkList,
    frames: &[AnalysisFrame],
    sample_rate: u32,
    first: ChunkId,
    synth: &mut Vec<SynthFrame>,
) -> ChunkId {
    let mut id = first;
    let mut cursor = SplineCursor::at_run(chunks, first);
    let mut t = chunks[first].begin as f64;

    loop {
        while t >= chunks[id].end as f64 {
            match chunks.next(id) {
                Some(next) if chunks[next].voiced => id = next,
                _ => return id,
            }
        }

        let chunk = &chunks[id];
        let pitch = cursor
            .pitch_at(chunks, t)
            .unwrap_or(chunk.pitch as f32);

        for sf in blended_grains(frames, chunk.frame_index_at(t), t)
            .into_iter()
            .flatten()
        {
            synth.push(sf);
        }

        t += synth_period(pitch, sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spline::HermiteSplinePoint;
    use crate::core::types::frequency_to_pitch;
    use crate::core::window::grain_weight;

    /// Steady 100-sample frames with a 440-ish pitch, unvoiced at the ends.
    fn steady(n: usize, period: f64, sample_rate: u32) -> (Vec<AnalysisFrame>, ChunkList) {
        let pitch = frequency_to_pitch((sample_rate as f64 / period) as f32);
        let mut frames = vec![AnalysisFrame::unvoiced(0.0)];
        for i in 1..n - 1 {
            frames.push(AnalysisFrame {
                position: i as f64 * period,
                period: period as f32,
                pitch,
            });
        }
        frames.push(AnalysisFrame::unvoiced((n - 1) as f64 * period));

        let pos = |f: usize| frames[f].position.round() as i64;
        let mut list = ChunkList::new();
        list.push_back(Chunk::new(0, 1, 0, pos(1), 69, false));
        let mut voiced = Chunk::new(1, n - 2, pos(1), pos(n - 2), 69, true);
        voiced.pitch_contour = vec![
            HermiteSplinePoint::new(frames[1].position, pitch, 0.0),
            HermiteSplinePoint::new(frames[n - 3].position, pitch, 0.0),
        ];
        list.push_back(voiced);
        list.push_back(Chunk::new(n - 2, n - 1, pos(n - 2), pos(n - 1), 69, false));
        (frames, list)
    }

    #[test]
    fn test_tmid_non_decreasing() {
        let (frames, list) = steady(50, 100.0, 44100);
        let synth = compute_synth_frames(&list, &frames, 44100);
        assert!(!synth.is_empty());
        for w in synth.windows(2) {
            assert!(w[1].tmid >= w[0].tmid);
        }
        for sf in &synth {
            assert!(sf.tbegin <= sf.tmid && sf.tmid <= sf.tend);
        }
    }

    #[test]
    fn test_voiced_tail_stops_at_output_end() {
        let n = 40;
        let (frames, _) = steady(n, 100.0, 44100);
        let pitch = frames[1].pitch;
        let mut list = ChunkList::new();
        list.push_back(Chunk::new(0, 1, 0, 100, 69, false));
        let mut voiced = Chunk::new(1, n - 1, 100, ((n - 1) * 100) as i64, 69, true);
        voiced.pitch_contour = vec![
            HermiteSplinePoint::new(100.0, pitch, 0.0),
            HermiteSplinePoint::new(((n - 2) * 100) as f64, pitch, 0.0),
        ];
        list.push_back(voiced);

        let synth = compute_synth_frames(&list, &frames, 44100);
        let end = ((n - 1) * 100) as f64;
        assert!(synth.iter().any(|sf| sf.tmid > end - 200.0));
        for sf in &synth {
            assert!(sf.tend <= end, "grain ends at {} past {}", sf.tend, end);
            assert!(sf.tmid <= sf.tend);
        }
    }

    #[test]
    fn test_unvoiced_grains_are_contiguous() {
        let frames: Vec<_> = (0..10).map(|i| AnalysisFrame::unvoiced(i as f64 * 256.0)).collect();
        let mut list = ChunkList::new();
        list.push_back(Chunk::new(0, 9, 0, 9 * 256, 60, false));
        let synth = compute_synth_frames(&list, &frames, 44100);
        assert_eq!(synth.len(), 9);
        for w in synth.windows(2) {
            assert_eq!(w[1].tbegin, w[0].tmid);
            assert_eq!(w[1].amplitude, 1.0);
        }
        assert_eq!(synth[0].tbegin, synth[0].tmid);
    }

    #[test]
    fn test_overlap_add_coverage_is_unity() {
        let (frames, list) = steady(60, 100.0, 44100);
        let synth = compute_synth_frames(&list, &frames, 44100);
        for t in (1000..5000).step_by(7) {
            let t = t as f64;
            let sum: f32 = synth
                .iter()
                .map(|sf| grain_weight(t, sf.tbegin, sf.tmid, sf.tend) * sf.amplitude)
                .sum();
            assert!((sum - 1.0).abs() < 0.1, "coverage at {} is {}", t, sum);
        }
    }

    #[test]
    fn test_blended_amplitudes_are_complementary() {
        let frames: Vec<_> = (0..6)
            .map(|i| AnalysisFrame {
                position: i as f64 * 100.0,
                period: 100.0,
                pitch: 60.0,
            })
            .collect();
        let [a, b] = blended_grains(&frames, 2.25, 1000.0);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!((a.amplitude + b.amplitude - 1.0).abs() < 1e-6);
        assert_eq!(a.tmid, 1000.0);
        assert_eq!(b.tmid, 1000.0);

        let [only, none] = blended_grains(&frames, 3.0, 0.0);
        assert_eq!(only.unwrap().smid, 300.0);
        assert!(none.is_none());
    }

    #[test]
    fn test_period_guard() {
        assert_eq!(synth_period(f32::NAN, 44100), MIN_SYNTH_PERIOD);
        assert_eq!(synth_period(200.0, 44100), MIN_SYNTH_PERIOD);
        assert!((synth_period(69.0, 44100) - 100.227).abs() < 0.01);
    }
}
