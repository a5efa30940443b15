//! Chunk segmentation: quantizes the frame pitch track into notes.
//!
//! A second dynamic program runs over the analysis frames. Voiced frames pick
//! one of a few semitone candidates around their rounded pitch, paying the
//! distance to the measured pitch plus a penalty whenever the choice differs
//! from the previous voiced frame. Unvoiced frames carry the previous state
//! forward for free. Maximal runs of the same choice become chunks.

use crate::core::types::{AnalysisFrame, AnalysisParams};
use crate::track::chunk::{Chunk, ChunkList};

/// Pitch assigned to an unvoiced chunk that has no neighbors.
pub const DEFAULT_UNVOICED_PITCH: i32 = 60;

#[derive(Debug, Clone, Copy)]
struct Node {
    /// Chosen semitone, or -1 for unvoiced.
    pitch: i32,
    back: usize,
    cost: f32,
}

const UNVOICED: i32 = -1;

/// Segments analysis frames into a contiguous chunk list covering
/// `[0, frames.last().position]`.
///
/// Expects the framing produced by [`decompose`](super::frames::decompose):
/// at least two frames, the first and last unvoiced.
pub fn detect_chunks(frames: &[AnalysisFrame], params: &AnalysisParams) -> ChunkList {
    let mut list = ChunkList::new();
    let n = frames.len();
    if n < 2 {
        return list;
    }

    let candidates = params.pitch_candidates.max(1);
    let half = (candidates / 2) as i32;

    let mut nodes: Vec<Node> = vec![
        Node {
            pitch: UNVOICED,
            back: 0,
            cost: 0.0,
        };
        n * candidates
    ];
    let at = |i: usize, j: usize| i * candidates + j;

    for i in 1..n {
        let frame = &frames[i];
        if frame.is_voiced() {
            let base = frame.pitch.round() as i32 - half;
            for j in 0..candidates {
                let p = base + j as i32;
                let mut best_cost = f32::INFINITY;
                let mut best_back = 0;
                for k in 0..candidates {
                    let prev = nodes[at(i - 1, k)];
                    let mut cost = prev.cost;
                    if prev.pitch >= 0 && prev.pitch != p {
                        cost += params.pitch_change_penalty;
                    }
                    cost += (frame.pitch - p as f32).abs();
                    if cost < best_cost {
                        best_cost = cost;
                        best_back = k;
                    }
                }
                nodes[at(i, j)] = Node {
                    pitch: p,
                    back: best_back,
                    cost: best_cost,
                };
            }
        } else {
            for j in 0..candidates {
                nodes[at(i, j)] = Node {
                    pitch: UNVOICED,
                    back: j,
                    cost: nodes[at(i - 1, j)].cost,
                };
            }
        }
    }

    // The last frame is the end marker, so the path is read from n - 2.
    let mut i = n as isize - 2;
    let mut j = (0..candidates)
        .min_by(|&a, &b| {
            nodes[at(i as usize, a)]
                .cost
                .total_cmp(&nodes[at(i as usize, b)].cost)
        })
        .unwrap_or(0);

    let round_pos = |f: usize| frames[f].position.round() as i64;

    while i >= 0 {
        let pitch = nodes[at(i as usize, j)].pitch;
        let mut begin = i;
        while begin >= 0 && nodes[at(begin as usize, j)].pitch == pitch {
            j = nodes[at(begin as usize, j)].back;
            begin -= 1;
        }

        let begin_frame = (begin + 1) as usize;
        let end_frame = (i + 1) as usize;
        let chunk = Chunk::new(
            begin_frame,
            end_frame,
            round_pos(begin_frame),
            round_pos(end_frame),
            pitch,
            pitch >= 0,
        );
        list.push_front(chunk);

        i = begin;
    }

    assign_unvoiced_pitches(&mut list);

    log::debug!(
        "segmented {} frames into {} chunks ({} voiced)",
        n,
        list.len(),
        list.iter().filter(|(_, c)| c.voiced).count()
    );

    list
}

/// Semitone closest to the voiced frames in L1, i.e. the rounded median of
/// their pitches. `None` if no frame is voiced.
pub fn nearest_note(frames: &[AnalysisFrame]) -> Option<i32> {
    let mut pitches: Vec<f32> = frames
        .iter()
        .filter(|f| f.is_voiced())
        .map(|f| f.pitch)
        .collect();
    if pitches.is_empty() {
        return None;
    }
    pitches.sort_by(|a, b| a.total_cmp(b));
    Some(pitches[pitches.len() / 2].round() as i32)
}

/// Gives unvoiced chunks a nominal pitch from their neighbors.
fn assign_unvoiced_pitches(list: &mut ChunkList) {
    let ids: Vec<_> = list.ids().collect();
    for id in ids {
        if list[id].voiced {
            continue;
        }
        let prev = list.prev(id).map(|p| list[p].pitch);
        let next = list.next(id).map(|n| list[n].pitch);
        list[id].pitch = match (prev, next) {
            (Some(p), Some(n)) => (p + n) / 2,
            (Some(p), None) => p,
            (None, Some(n)) => n,
            (None, None) => DEFAULT_UNVOICED_PITCH,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voiced(position: f64, pitch: f32) -> AnalysisFrame {
        AnalysisFrame {
            position,
            period: 100.0,
            pitch,
        }
    }

    #[test]
    fn test_silence_is_one_chunk() {
        let frames: Vec<_> = (0..20)
            .map(|i| AnalysisFrame::unvoiced(i as f64 * 256.0))
            .collect();
        let list = detect_chunks(&frames, &AnalysisParams::default());
        assert_eq!(list.len(), 1);
        let chunk = &list[list.first().unwrap()];
        assert!(!chunk.voiced);
        assert_eq!(chunk.begin, 0);
        assert_eq!(chunk.end, 19 * 256);
        assert_eq!(chunk.pitch, DEFAULT_UNVOICED_PITCH);
    }

    #[test]
    fn test_two_notes_with_unvoiced_edges() {
        let mut frames = vec![AnalysisFrame::unvoiced(0.0)];
        for i in 1..=10 {
            frames.push(voiced(i as f64 * 100.0, 60.2));
        }
        for i in 11..=20 {
            frames.push(voiced(i as f64 * 100.0, 64.9));
        }
        frames.push(AnalysisFrame::unvoiced(2100.0));
        frames.push(AnalysisFrame::unvoiced(2200.0));

        let list = detect_chunks(&frames, &AnalysisParams::default());
        let chunks: Vec<_> = list.iter().map(|(_, c)| c.clone()).collect();
        assert_eq!(chunks.len(), 4);

        assert!(!chunks[0].voiced);
        assert_eq!((chunks[0].begin_frame, chunks[0].end_frame), (0, 1));
        assert_eq!(chunks[1].pitch, 60);
        assert_eq!((chunks[1].begin_frame, chunks[1].end_frame), (1, 11));
        assert_eq!(chunks[2].pitch, 65);
        assert_eq!(chunks[2].begin, 1100);
        assert!(!chunks[3].voiced);
        assert_eq!(chunks[3].end, 2200);

        assert_eq!(chunks[0].pitch, 60);
        assert_eq!(chunks[3].pitch, 65);
        assert!(list.validate(2200, frames.len()).is_ok());
    }

    #[test]
    fn test_change_penalty_suppresses_chatter() {
        let mut frames = vec![AnalysisFrame::unvoiced(0.0)];
        for i in 1..=12 {
            let pitch = if i % 2 == 0 { 60.45 } else { 60.55 };
            frames.push(voiced(i as f64 * 100.0, pitch));
        }
        frames.push(AnalysisFrame::unvoiced(1300.0));

        let list = detect_chunks(&frames, &AnalysisParams::default());
        let voiced: Vec<_> = list.iter().filter(|(_, c)| c.voiced).collect();
        assert_eq!(voiced.len(), 1);
    }

    #[test]
    fn test_nearest_note_is_rounded_median() {
        let frames = vec![
            AnalysisFrame::unvoiced(0.0),
            voiced(100.0, 61.6),
            voiced(200.0, 62.2),
            voiced(300.0, 66.0),
        ];
        assert_eq!(nearest_note(&frames), Some(62));
        assert_eq!(nearest_note(&frames[..1]), None);
    }

    #[test]
    fn test_two_frames() {
        let frames = vec![AnalysisFrame::unvoiced(0.0), AnalysisFrame::unvoiced(500.0)];
        let list = detect_chunks(&frames, &AnalysisParams::default());
        assert_eq!(list.len(), 1);
        assert_eq!(list[list.first().unwrap()].end, 500);
    }
}
