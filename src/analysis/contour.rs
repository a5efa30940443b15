//! Greedy pitch-contour fitting.
//!
//! Each maximal voiced run gets a sparse Akima spline through selected frame
//! pitches. Starting from the two end frames, the fitter repeatedly splits
//! the segment with the largest L1 error at the frame that minimizes the
//! local error, with a log-length bonus that keeps segments from collapsing.
//!
//! Knots sit on the output timeline: each frame is placed where its chunk
//! plays it, so a stretched chunk carries its contour along.

use crate::core::spline::{akima_slope, secant, HermiteInterpolation, HermiteSplinePoint};
use crate::core::types::{AnalysisFrame, AnalysisParams};
use crate::track::chunk::{ChunkId, ChunkList};

/// Scratch spline node. Nodes live in a vector and link by index.
#[derive(Debug, Clone, Copy)]
struct Node {
    prev: Option<usize>,
    next: Option<usize>,
    frame: usize,
    pt: HermiteSplinePoint,
}

struct Fitter<'a> {
    frames: &'a [AnalysisFrame],
    /// Output time of frame `from + i`.
    times: Vec<f64>,
    from: usize,
    nodes: Vec<Node>,
    length_weight: f32,
}

impl<'a> Fitter<'a> {
    fn new(frames: &'a [AnalysisFrame], times: Vec<f64>, from: usize, length_weight: f32) -> Self {
        let last = from + times.len() - 1;
        let point = |f: usize| HermiteSplinePoint::new(times[f - from], frames[f].pitch, 0.0);
        let mut first = Node {
            prev: None,
            next: Some(1),
            frame: from,
            pt: point(from),
        };
        let mut end = Node {
            prev: Some(0),
            next: None,
            frame: last,
            pt: point(last),
        };
        let slope = secant(&first.pt, &end.pt);
        first.pt.dy = slope;
        end.pt.dy = slope;

        Self {
            frames,
            times,
            from,
            nodes: vec![first, end],
            length_weight,
        }
    }

    #[inline]
    fn time(&self, frame: usize) -> f64 {
        self.times[frame - self.from]
    }

    fn update_slope(&mut self, idx: usize) {
        let node = self.nodes[idx];
        let p1 = node.prev.map(|p| self.nodes[p]);
        let p0 = p1.and_then(|n| n.prev).map(|p| self.nodes[p].pt);
        let p3 = node.next.map(|n| self.nodes[n]);
        let p4 = p3.and_then(|n| n.next).map(|n| self.nodes[n].pt);
        let p1 = p1.map(|n| n.pt);
        let p3 = p3.map(|n| n.pt);
        self.nodes[idx].pt.dy =
            akima_slope(p0.as_ref(), p1.as_ref(), &node.pt, p3.as_ref(), p4.as_ref());
    }

    /// L1 error of the segment starting at `idx` over the frames strictly
    /// between its two knots.
    fn segment_error(&self, idx: usize) -> f32 {
        let node = &self.nodes[idx];
        let Some(next) = node.next.map(|n| &self.nodes[n]) else {
            return 0.0;
        };
        let interp = HermiteInterpolation::new(&node.pt, &next.pt);
        (node.frame + 1..next.frame)
            .map(|f| (interp.eval(self.time(f)) - self.frames[f].pitch).abs())
            .sum()
    }

    fn place(&mut self, idx: usize, frame: usize) {
        let t = self.time(frame);
        let pitch = self.frames[frame].pitch;
        let node = &mut self.nodes[idx];
        node.frame = frame;
        node.pt.t = t;
        node.pt.y = pitch;
    }

    fn refresh_slopes_around(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        self.update_slope(idx);
        if let Some(p) = prev {
            self.update_slope(p);
        }
        if let Some(n) = next {
            self.update_slope(n);
        }
    }

    /// Moves an interior node to the frame between its neighbors that
    /// minimizes the regularized error of its two segments.
    fn optimize(&mut self, idx: usize) {
        let (Some(prev), Some(next)) = (self.nodes[idx].prev, self.nodes[idx].next) else {
            return;
        };
        let lo = self.nodes[prev].frame + 1;
        let hi = self.nodes[next].frame;
        if lo >= hi {
            return;
        }

        let mut best_error = f32::INFINITY;
        let mut best_frame = self.nodes[idx].frame.clamp(lo, hi - 1);
        for frame in lo..hi {
            self.place(idx, frame);
            self.refresh_slopes_around(idx);

            let t = self.nodes[idx].pt.t;
            let left = (t - self.nodes[prev].pt.t) as f32;
            let right = (self.nodes[next].pt.t - t) as f32;
            let error = self.segment_error(prev) + self.segment_error(idx)
                - self.length_weight * left.ln()
                - self.length_weight * right.ln();

            if error < best_error {
                best_error = error;
                best_frame = frame;
            }
        }

        self.place(idx, best_frame);
        self.refresh_slopes_around(idx);
        if let Some(pp) = self.nodes[prev].prev {
            self.update_slope(pp);
        }
        if let Some(nn) = self.nodes[next].next {
            self.update_slope(nn);
        }
    }

    fn insert_after(&mut self, idx: usize) -> usize {
        let next = self.nodes[idx].next;
        let new = self.nodes.len();
        self.nodes.push(Node {
            prev: Some(idx),
            next,
            frame: self.nodes[idx].frame,
            pt: self.nodes[idx].pt,
        });
        self.nodes[idx].next = Some(new);
        if let Some(n) = next {
            self.nodes[n].prev = Some(new);
        }
        new
    }

    fn run(&mut self, threshold: f32, max_passes: usize) {
        for pass in 0..max_passes {
            let mut worst = 0;
            let mut worst_error = 0.0f32;
            let mut cur = Some(0);
            while let Some(idx) = cur {
                if self.nodes[idx].next.is_none() {
                    break;
                }
                let error = self.segment_error(idx);
                if error > worst_error {
                    worst_error = error;
                    worst = idx;
                }
                cur = self.nodes[idx].next;
            }

            log::trace!("contour pass {}: worst segment error {:.3}", pass, worst_error);
            if worst_error < threshold || worst_error <= 0.0 {
                break;
            }

            let split = self.insert_after(worst);
            self.optimize(split);

            let mut cur = self.nodes[split].prev;
            while let Some(idx) = cur {
                if self.nodes[idx].prev.is_none() {
                    break;
                }
                self.optimize(idx);
                cur = self.nodes[idx].prev;
            }

            let mut cur = self.nodes[split].next;
            while let Some(idx) = cur {
                if self.nodes[idx].next.is_none() {
                    break;
                }
                self.optimize(idx);
                cur = self.nodes[idx].next;
            }
        }
    }

    fn points(&self) -> Vec<HermiteSplinePoint> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut cur = Some(0);
        while let Some(idx) = cur {
            out.push(self.nodes[idx].pt);
            cur = self.nodes[idx].next;
        }
        out
    }
}

/// Fits pitch contours for every voiced run of `chunks`, replacing any
/// existing contour points.
pub fn fit_pitch_contour(chunks: &mut ChunkList, frames: &[AnalysisFrame], params: &AnalysisParams) {
    let mut cur = chunks.first();
    let mut runs = 0usize;
    while let Some(id) = cur {
        if !chunks[id].voiced {
            cur = chunks.next(id);
            continue;
        }
        let Some(last) = chunks.voiced_run_end(id) else {
            break;
        };
        fit_run(chunks, frames, params, id, last);
        runs += 1;
        cur = chunks.next(last);
    }
    log::debug!("fitted pitch contours for {} voiced runs", runs);
}

/// Fits one voiced run, from chunk `first` through chunk `last` inclusive.
pub fn fit_run(
    chunks: &mut ChunkList,
    frames: &[AnalysisFrame],
    params: &AnalysisParams,
    first: ChunkId,
    last: ChunkId,
) {
    let from = chunks[first].begin_frame;
    let to = chunks[last].end_frame;
    if to <= from || to > frames.len() {
        return;
    }

    let mut times = Vec::with_capacity(to - from);
    let mut cur = Some(first);
    while let Some(id) = cur {
        let chunk = &chunks[id];
        times.extend((chunk.begin_frame..chunk.end_frame).map(|f| chunk.time_at_frame(f as f64)));
        if id == last {
            break;
        }
        cur = chunks.next(id);
    }
    if times.len() != to - from {
        log::warn!("voiced run frames {}..{} are not contiguous; contour left as is", from, to);
        return;
    }

    let points = if times.len() == 1 {
        vec![HermiteSplinePoint::new(times[0], frames[from].pitch, 0.0)]
    } else {
        let mut fitter = Fitter::new(frames, times, from, params.contour_length_weight);
        fitter.run(params.contour_error_threshold, params.contour_max_passes);
        fitter.points()
    };

    let mut cur = Some(first);
    while let Some(id) = cur {
        chunks[id].pitch_contour.clear();
        if id == last {
            break;
        }
        cur = chunks.next(id);
    }
    distribute_points(chunks, first, points);
}

/// Hands each point to the chunk whose output span contains it.
fn distribute_points(chunks: &mut ChunkList, first: ChunkId, points: Vec<HermiteSplinePoint>) {
    let mut chunk = first;
    for pt in points {
        while let Some(next) = chunks.next(chunk) {
            let n = &chunks[next];
            if !n.voiced || pt.t < n.begin as f64 {
                break;
            }
            chunk = next;
        }
        chunks[chunk].pitch_contour.push(pt);
    }
}
