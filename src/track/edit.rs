//! Edit operations on a track's chunk list and pitch contour.
//!
//! Every edit either keeps the chunk and contour invariants intact or fails
//! with [`IntonationError::InvalidEdit`] and leaves the track unchanged:
//!
//! * chunks tile the waveform contiguously and are at least
//!   [`MIN_CHUNK_LENGTH`] samples long;
//! * contour points of a voiced run are strictly ascending in time and at
//!   least [`MIN_CONTOUR_SPACING`] samples apart;
//! * a voiced run keeps at least one contour point.

use crate::analysis::chunks::nearest_note;
use crate::analysis::contour::fit_run;
use crate::core::spline::{akima_slope, update_akima_slopes, HermiteSplinePoint};
use crate::error::IntonationError;

use super::chunk::{Chunk, ChunkId, ChunkList};
use super::contour::PitchContourIterator;
use super::Track;

/// Shortest chunk an edit may produce, in samples.
pub const MIN_CHUNK_LENGTH: i64 = 64;
/// Smallest distance between neighboring contour points, in samples.
pub const MIN_CONTOUR_SPACING: f64 = 1.0;

fn invalid(msg: impl Into<String>) -> IntonationError {
    IntonationError::InvalidEdit(msg.into())
}

fn existing(list: &ChunkList, id: ChunkId) -> Result<&Chunk, IntonationError> {
    list.get(id).ok_or_else(|| invalid("unknown chunk"))
}

fn voiced(list: &ChunkList, id: ChunkId) -> Result<&Chunk, IntonationError> {
    let chunk = existing(list, id)?;
    if !chunk.voiced {
        return Err(invalid("chunk is unvoiced"));
    }
    Ok(chunk)
}

/// Recomputes the Akima slope of the point under `it` from its neighbors.
fn update_slope_at(list: &mut ChunkList, it: PitchContourIterator) {
    let (p0, p1, p2, p3, p4) = {
        let view: &ChunkList = list;
        let get = |n: isize| {
            let moved = if n >= 0 {
                it.advance(view, n as usize)
            } else {
                it.retreat(view, n.unsigned_abs())
            };
            moved.get(view).copied()
        };
        (get(-2), get(-1), get(0), get(1), get(2))
    };
    let Some(p2) = p2 else {
        return;
    };
    let dy = akima_slope(p0.as_ref(), p1.as_ref(), &p2, p3.as_ref(), p4.as_ref());
    if let Some(p) = it.get_mut(list) {
        p.dy = dy;
    }
}

/// Recomputes slopes for the points from `reach` before `first` through
/// `reach` after `last`.
fn update_slopes_between(
    list: &mut ChunkList,
    first: PitchContourIterator,
    last: PitchContourIterator,
    reach: usize,
) {
    let mut it = first;
    for _ in 0..reach {
        let prev = it.retreat(list, 1);
        if prev.is_null() {
            break;
        }
        it = prev;
    }
    let mut stop = last;
    for _ in 0..reach {
        let next = stop.advance(list, 1);
        if next.is_null() {
            break;
        }
        stop = next;
    }
    loop {
        update_slope_at(list, it);
        if it == stop {
            break;
        }
        it = it.advance(list, 1);
        if it.is_null() {
            break;
        }
    }
}

/// Recomputes every slope of the voiced run starting at `first` as one
/// contiguous spline.
fn update_run_slopes(list: &mut ChunkList, first: ChunkId) {
    let mut ids = Vec::new();
    let mut cur = Some(first);
    while let Some(id) = cur {
        if !list[id].voiced {
            break;
        }
        ids.push(id);
        cur = list.next(id);
    }

    let mut points: Vec<HermiteSplinePoint> = ids
        .iter()
        .flat_map(|&id| list[id].pitch_contour.iter().copied())
        .collect();
    update_akima_slopes(&mut points);

    let mut rest = points.as_slice();
    for id in ids {
        let n = list[id].pitch_contour.len();
        list[id].pitch_contour.copy_from_slice(&rest[..n]);
        rest = &rest[n..];
    }
}

fn check_spacing(prev: Option<f64>, t: f64, next: Option<f64>) -> Result<(), IntonationError> {
    if prev.is_some_and(|p| t - p < MIN_CONTOUR_SPACING)
        || next.is_some_and(|n| n - t < MIN_CONTOUR_SPACING)
    {
        return Err(invalid("contour points would be closer than the minimum spacing"));
    }
    Ok(())
}

impl Track {
    /// Shifts a voiced chunk's pitch and its contour points by `semitones`.
    ///
    /// Slopes of the shifted points and the two points on either side are
    /// recomputed immediately.
    pub fn shift_chunk_pitch(&mut self, id: ChunkId, semitones: f32) -> Result<(), IntonationError> {
        if !semitones.is_finite() {
            return Err(invalid("pitch shift must be finite"));
        }
        let count = voiced(&self.chunks, id)?.pitch_contour.len();

        let list = self.chunks_mut();
        let chunk = &mut list[id];
        chunk.pitch = (chunk.pitch as f32 + semitones).round() as i32;
        for p in chunk.pitch_contour.iter_mut() {
            p.y += semitones;
        }
        if count > 0 {
            let first = PitchContourIterator::new(id, 0);
            let last = PitchContourIterator::new(id, count - 1);
            update_slopes_between(list, first, last, 2);
        }
        log::debug!("shifted chunk {} by {:.2} semitones", id.index(), semitones);
        Ok(())
    }

    /// Moves a contour point to `(t, y)`.
    ///
    /// `t` is clamped to stay inside the run and at least
    /// [`MIN_CONTOUR_SPACING`] from both neighbors.
    pub fn move_contour_point(
        &mut self,
        it: PitchContourIterator,
        t: f64,
        y: f32,
    ) -> Result<PitchContourIterator, IntonationError> {
        if !t.is_finite() || !y.is_finite() {
            return Err(invalid("contour point must be finite"));
        }
        let list = &self.chunks;
        let chunk_id = it.chunk().ok_or_else(|| invalid("null contour iterator"))?;
        if it.get(list).is_none() {
            return Err(invalid("contour iterator out of range"));
        }
        let prev = it.retreat(list, 1).get(list).map(|p| p.t);
        let next = it.advance(list, 1).get(list).map(|p| p.t);

        let chunk = &list[chunk_id];
        let lo = prev.map_or(chunk.begin as f64, |p| p + MIN_CONTOUR_SPACING);
        let hi = next.map_or(chunk.end as f64, |n| n - MIN_CONTOUR_SPACING);
        // Keep the point inside its own chunk so per-chunk ownership holds.
        let lo = lo.max(chunk.begin as f64);
        let hi = hi.min(chunk.end as f64 - MIN_CONTOUR_SPACING);
        if lo > hi {
            return Err(invalid("no room to move contour point"));
        }

        let list = self.chunks_mut();
        if let Some(p) = it.get_mut(list) {
            p.t = t.clamp(lo, hi);
            p.y = y;
        }
        update_slopes_between(list, it, it, 2);
        Ok(it)
    }

    /// Inserts a contour point into a voiced chunk at `(t, y)`.
    pub fn insert_contour_point(
        &mut self,
        id: ChunkId,
        t: f64,
        y: f32,
    ) -> Result<PitchContourIterator, IntonationError> {
        if !t.is_finite() || !y.is_finite() {
            return Err(invalid("contour point must be finite"));
        }
        let list = &self.chunks;
        let chunk = voiced(list, id)?;
        if t < chunk.begin as f64 || t >= chunk.end as f64 {
            return Err(invalid("contour point outside chunk"));
        }

        let index = chunk.pitch_contour.partition_point(|p| p.t < t);
        let at = PitchContourIterator::new(id, index);
        let prev = if index > 0 {
            Some(chunk.pitch_contour[index - 1].t)
        } else {
            at.retreat(list, 1).get(list).map(|p| p.t)
        };
        let next = match chunk.pitch_contour.get(index) {
            Some(p) => Some(p.t),
            None => at.advance(list, 0).get(list).map(|p| p.t),
        };
        check_spacing(prev, t, next)?;

        let list = self.chunks_mut();
        list[id]
            .pitch_contour
            .insert(index, HermiteSplinePoint::new(t, y, 0.0));
        update_slopes_between(list, at, at, 2);
        Ok(at)
    }

    /// Removes a contour point. The last point of a voiced run cannot be
    /// removed.
    pub fn delete_contour_point(&mut self, it: PitchContourIterator) -> Result<(), IntonationError> {
        let list = &self.chunks;
        let chunk_id = it.chunk().ok_or_else(|| invalid("null contour iterator"))?;
        if it.get(list).is_none() {
            return Err(invalid("contour iterator out of range"));
        }
        let prev = it.retreat(list, 1);
        let next = it.advance(list, 1);
        if prev.is_null() && next.is_null() {
            return Err(invalid("cannot remove the only contour point of a voiced run"));
        }
        let run_start = list
            .voiced_run_start(chunk_id)
            .ok_or_else(|| invalid("chunk is unvoiced"))?;

        let list = self.chunks_mut();
        list[chunk_id].pitch_contour.remove(it.index());
        // Neighbor iterators may have shifted; re-derive them from the run.
        let anchor = if prev.is_null() {
            PitchContourIterator::first_of_run(list, run_start)
        } else {
            prev
        };
        update_slopes_between(list, anchor, anchor.advance(list, 1), 2);
        Ok(())
    }

    /// Splits a chunk at output time `t`, snapped to the nearest analysis
    /// frame. Returns the id of the new right half.
    pub fn split_chunk(&mut self, id: ChunkId, t: f64) -> Result<ChunkId, IntonationError> {
        let chunk = existing(&self.chunks, id)?;
        if !t.is_finite() {
            return Err(invalid("split position must be finite"));
        }
        let frame = chunk.frame_index_at(t).round() as i64;
        let (bf, ef) = (chunk.begin_frame as i64, chunk.end_frame as i64);
        if frame <= bf || frame >= ef {
            return Err(invalid("split must fall strictly inside the chunk's frames"));
        }
        let s = (frame - bf) as f64 / (ef - bf) as f64;
        let split = (chunk.begin as f64 + s * (chunk.end - chunk.begin) as f64).round() as i64;
        if split - chunk.begin < MIN_CHUNK_LENGTH || chunk.end - split < MIN_CHUNK_LENGTH {
            return Err(invalid("split would create a chunk shorter than the minimum length"));
        }

        let mut right = Chunk::new(
            frame as usize,
            chunk.end_frame,
            split,
            chunk.end,
            chunk.pitch,
            chunk.voiced,
        );
        right.elastic = chunk.elastic;

        let list = self.chunks_mut();
        let left = &mut list[id];
        let at = left.pitch_contour.partition_point(|p| p.t < split as f64);
        right.pitch_contour = left.pitch_contour.split_off(at);
        left.end = split;
        left.end_frame = frame as usize;
        let new = list.insert_after(id, right);
        log::debug!("split chunk {} at {}", id.index(), split);
        Ok(new)
    }

    /// Merges a chunk with its successor. Both must share voicing.
    pub fn merge_with_next(&mut self, id: ChunkId) -> Result<(), IntonationError> {
        let chunk = existing(&self.chunks, id)?;
        let next_id = chunk.next().ok_or_else(|| invalid("chunk has no successor"))?;
        if self.chunks[next_id].voiced != chunk.voiced {
            return Err(invalid("cannot merge voiced and unvoiced chunks"));
        }

        let list = self.chunks_mut();
        let Some(next) = list.remove(next_id) else {
            return Err(invalid("unknown chunk"));
        };
        let chunk = &mut list[id];
        chunk.end = next.end;
        chunk.end_frame = next.end_frame;
        chunk.elastic = chunk.elastic && next.elastic;
        chunk.pitch_contour.extend(next.pitch_contour);
        Ok(())
    }

    /// Moves the boundary between a chunk and its predecessor to `begin`.
    ///
    /// Both chunks must be elastic. Contour points are remapped linearly
    /// with their chunk's new span.
    pub fn move_chunk_boundary(&mut self, id: ChunkId, begin: i64) -> Result<(), IntonationError> {
        let chunk = existing(&self.chunks, id)?;
        let prev_id = chunk.prev().ok_or_else(|| invalid("first chunk has a fixed begin"))?;
        let prev = &self.chunks[prev_id];
        if !chunk.elastic || !prev.elastic {
            return Err(invalid("both chunks must be elastic"));
        }
        if begin - prev.begin < MIN_CHUNK_LENGTH || chunk.end - begin < MIN_CHUNK_LENGTH {
            return Err(invalid("boundary move would create a chunk shorter than the minimum length"));
        }

        let remap = |c: &Chunk, new_begin: i64, new_end: i64| -> Vec<HermiteSplinePoint> {
            let scale = (new_end - new_begin) as f64 / (c.end - c.begin) as f64;
            c.pitch_contour
                .iter()
                .map(|p| HermiteSplinePoint {
                    t: new_begin as f64 + (p.t - c.begin as f64) * scale,
                    y: p.y,
                    dy: p.dy / scale as f32,
                })
                .collect()
        };
        let left = remap(prev, prev.begin, begin);
        let right = remap(chunk, begin, chunk.end);

        let spaced = |pts: &[HermiteSplinePoint]| {
            pts.windows(2).all(|w| w[1].t - w[0].t >= MIN_CONTOUR_SPACING)
        };
        let joined = match (left.last(), right.first()) {
            (Some(a), Some(b)) if prev.voiced && chunk.voiced => b.t - a.t >= MIN_CONTOUR_SPACING,
            _ => true,
        };
        if !spaced(&left) || !spaced(&right) || !joined {
            return Err(invalid("boundary move would compress contour points too far"));
        }
        let any_voiced = prev.voiced || chunk.voiced;
        let run_start = if prev.voiced { prev_id } else { id };

        let list = self.chunks_mut();
        list[prev_id].end = begin;
        list[prev_id].pitch_contour = left;
        list[id].begin = begin;
        list[id].pitch_contour = right;
        if any_voiced {
            if let Some(start) = list.voiced_run_start(run_start) {
                update_run_slopes(list, start);
            }
        }
        Ok(())
    }

    /// Sets the elastic flag of an unvoiced chunk. Voiced chunks are always
    /// elastic.
    pub fn set_elastic(&mut self, id: ChunkId, elastic: bool) -> Result<(), IntonationError> {
        if existing(&self.chunks, id)?.voiced {
            return Err(invalid("voiced chunks are always elastic"));
        }
        self.chunks_mut()[id].elastic = elastic;
        Ok(())
    }

    /// Refits the contour of the voiced run containing `id` from the analysis
    /// frames, discarding manual contour and pitch edits in that run.
    ///
    /// Each chunk's note is re-derived from the frames it plays, so it
    /// agrees with the refitted contour.
    pub fn refit_contour(&mut self, id: ChunkId) -> Result<(), IntonationError> {
        voiced(&self.chunks, id)?;
        let first = self.chunks.voiced_run_start(id).unwrap_or(id);
        let last = self.chunks.voiced_run_end(id).unwrap_or(id);
        let frames = std::sync::Arc::clone(&self.frames);
        let params = self.params.clone();

        let list = self.chunks_mut();
        fit_run(list, &frames, &params, first, last);
        let mut cur = Some(first);
        while let Some(c) = cur {
            let chunk = &mut list[c];
            if let Some(note) = frames
                .get(chunk.begin_frame..chunk.end_frame)
                .and_then(nearest_note)
            {
                chunk.pitch = note;
            }
            if c == last {
                break;
            }
            cur = list.next(c);
        }
        log::debug!("refitted voiced run starting at chunk {}", first.index());
        Ok(())
    }

    /// Pulls every voiced contour toward its chunk's quantized pitch.
    ///
    /// `amount` 0 leaves the contour unchanged, 1 flattens it onto the note.
    pub fn correct_pitch(&mut self, amount: f32) -> Result<(), IntonationError> {
        if !(0.0..=1.0).contains(&amount) {
            return Err(invalid(format!("correction amount {} outside 0..=1", amount)));
        }
        let list = self.chunks_mut();
        let ids: Vec<ChunkId> = list.ids().collect();
        for &id in &ids {
            let chunk = &mut list[id];
            if !chunk.voiced {
                continue;
            }
            let target = chunk.pitch as f32;
            for p in chunk.pitch_contour.iter_mut() {
                p.y += amount * (target - p.y);
            }
        }
        for &id in &ids {
            let starts_run = list[id].voiced && list.prev(id).map_or(true, |p| !list[p].voiced);
            if starts_run {
                update_run_slopes(list, id);
            }
        }
        log::debug!("applied pitch correction {:.2}", amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AnalysisFrame, AnalysisParams};
    use crate::core::waveform::Waveform;

    /// Track with frames every 100 samples and chunks:
    /// unvoiced [0,100), voiced [100,1100) pitch 60, voiced [1100,2100) pitch 62,
    /// unvoiced [2100,2200).
    fn track() -> Track {
        let mut frames = vec![AnalysisFrame::unvoiced(0.0)];
        for i in 1..=20 {
            let pitch = if i <= 10 { 60.2 } else { 61.8 };
            frames.push(AnalysisFrame {
                position: i as f64 * 100.0,
                period: 100.0,
                pitch,
            });
        }
        frames.push(AnalysisFrame::unvoiced(2100.0));
        frames.push(AnalysisFrame::unvoiced(2200.0));

        let mut list = ChunkList::new();
        list.push_back(Chunk::new(0, 1, 0, 100, 60, false));
        let mut a = Chunk::new(1, 11, 100, 1100, 60, true);
        a.pitch_contour = vec![
            HermiteSplinePoint::new(100.0, 60.2, 0.0),
            HermiteSplinePoint::new(600.0, 60.2, 0.0),
        ];
        let mut b = Chunk::new(11, 21, 1100, 2100, 62, true);
        b.pitch_contour = vec![
            HermiteSplinePoint::new(1100.0, 61.8, 0.0),
            HermiteSplinePoint::new(2000.0, 61.8, 0.0),
        ];
        list.push_back(a);
        list.push_back(b);
        list.push_back(Chunk::new(21, 22, 2100, 2200, 61, false));

        let wave = Waveform::new(vec![0.0; 2200], 44100).unwrap();
        Track::from_parts(wave, frames, list, AnalysisParams::default()).unwrap()
    }

    fn ids(track: &Track) -> Vec<ChunkId> {
        track.chunks().ids().collect()
    }

    fn assert_valid(track: &Track) {
        let len = track.waveform().len() as i64;
        track.chunks().validate(len, track.frames().len()).unwrap();
    }

    #[test]
    fn test_shift_updates_slopes_across_run() {
        let mut t = track();
        let id = ids(&t)[1];
        t.shift_chunk_pitch(id, 1.0).unwrap();
        let a = &t.chunks()[id];
        assert_eq!(a.pitch, 61);
        assert!((a.pitch_contour[0].y - 61.2).abs() < 1e-5);
        // The neighbor chunk's first point sits between a rising secant and
        // a flat one.
        let b = &t.chunks()[ids(&t)[2]];
        assert!(b.pitch_contour[0].dy > 0.0);
        assert!(a.pitch_contour[1].dy != 0.0);
    }

    #[test]
    fn test_shift_rejects_unvoiced() {
        let mut t = track();
        let err = t.shift_chunk_pitch(ids(&t)[0], 1.0);
        assert!(matches!(err, Err(IntonationError::InvalidEdit(_))));
    }

    #[test]
    fn test_move_point_is_clamped_between_neighbors() {
        let mut t = track();
        let id = ids(&t)[1];
        let it = PitchContourIterator::new(id, 1);
        t.move_contour_point(it, 50.0, 63.0).unwrap();
        let p = t.chunks()[id].pitch_contour[1];
        assert_eq!(p.t, 100.0 + MIN_CONTOUR_SPACING);
        assert_eq!(p.y, 63.0);

        t.move_contour_point(it, 5000.0, 63.0).unwrap();
        let p = t.chunks()[id].pitch_contour[1];
        assert_eq!(p.t, 1100.0 - MIN_CONTOUR_SPACING);
    }

    #[test]
    fn test_insert_and_delete_points() {
        let mut t = track();
        let id = ids(&t)[1];
        let it = t.insert_contour_point(id, 300.0, 61.0).unwrap();
        assert_eq!(it.index(), 1);
        assert_eq!(t.chunks()[id].pitch_contour.len(), 3);

        let dup = t.insert_contour_point(id, 300.5, 61.0);
        assert!(matches!(dup, Err(IntonationError::InvalidEdit(_))));

        let outside = t.insert_contour_point(id, 1500.0, 61.0);
        assert!(outside.is_err());

        t.delete_contour_point(it).unwrap();
        assert_eq!(t.chunks()[id].pitch_contour.len(), 2);
        let pts = &t.chunks()[id].pitch_contour;
        assert!(pts[0].t < pts[1].t);
    }

    #[test]
    fn test_cannot_delete_last_point_of_run() {
        let mut list = ChunkList::new();
        let mut c = Chunk::new(0, 1, 0, 100, 60, true);
        c.pitch_contour.push(HermiteSplinePoint::new(0.0, 60.0, 0.0));
        let id = list.push_back(c);
        let frames = vec![
            AnalysisFrame {
                position: 0.0,
                period: 100.0,
                pitch: 60.0,
            },
            AnalysisFrame::unvoiced(100.0),
        ];
        let wave = Waveform::new(vec![0.0; 100], 44100).unwrap();
        let mut t = Track::from_parts(wave, frames, list, AnalysisParams::default()).unwrap();
        let err = t.delete_contour_point(PitchContourIterator::new(id, 0));
        assert!(matches!(err, Err(IntonationError::InvalidEdit(_))));
    }

    #[test]
    fn test_split_and_merge() {
        let mut t = track();
        let id = ids(&t)[1];
        let right = t.split_chunk(id, 640.0).unwrap();
        assert_valid(&t);
        assert_eq!(t.chunks()[id].end, 600);
        assert_eq!(t.chunks()[id].end_frame, 6);
        assert_eq!(t.chunks()[right].begin, 600);
        assert_eq!(t.chunks()[right].pitch_contour.len(), 1);
        assert_eq!(t.chunks()[id].pitch_contour.len(), 1);

        t.merge_with_next(id).unwrap();
        assert_valid(&t);
        assert_eq!(t.chunks()[id].end, 1100);
        assert_eq!(t.chunks()[id].pitch_contour.len(), 2);
        assert_eq!(t.chunks().len(), 4);
    }

    #[test]
    fn test_split_respects_min_length() {
        let mut t = track();
        let first = ids(&t)[0];
        assert!(t.split_chunk(first, 50.0).is_err());
        let id = ids(&t)[1];
        assert!(t.split_chunk(id, 110.0).is_err());
        assert_eq!(t.chunks().len(), 4);
    }

    #[test]
    fn test_merge_rejects_mixed_voicing() {
        let mut t = track();
        assert!(t.merge_with_next(ids(&t)[0]).is_err());
        let last = *ids(&t).last().unwrap();
        assert!(t.merge_with_next(last).is_err());
    }

    #[test]
    fn test_move_boundary_remaps_contour() {
        let mut t = track();
        let id = ids(&t)[2];
        t.move_chunk_boundary(id, 1300).unwrap();
        assert_valid(&t);
        let a = &t.chunks()[ids(&t)[1]];
        let b = &t.chunks()[id];
        assert_eq!(a.end, 1300);
        assert_eq!(b.begin, 1300);
        assert_eq!(b.pitch_contour[0].t, 1300.0);
        assert!(a.pitch_contour[1].t > 600.0);

        let too_short = t.move_chunk_boundary(id, 2090);
        assert!(too_short.is_err());
    }

    #[test]
    fn test_move_boundary_requires_elastic() {
        let mut t = track();
        let unvoiced_tail = ids(&t)[3];
        t.set_elastic(unvoiced_tail, false).unwrap();
        assert!(t.move_chunk_boundary(unvoiced_tail, 2000).is_err());
        t.set_elastic(unvoiced_tail, true).unwrap();
        assert!(t.move_chunk_boundary(unvoiced_tail, 2000).is_ok());
        assert_valid(&t);
    }

    #[test]
    fn test_set_elastic_rejects_voiced() {
        let mut t = track();
        assert!(t.set_elastic(ids(&t)[1], false).is_err());
    }

    #[test]
    fn test_correct_pitch_pulls_toward_note() {
        let mut t = track();
        t.correct_pitch(1.0).unwrap();
        for (_, c) in t.chunks().iter().filter(|(_, c)| c.voiced) {
            for p in &c.pitch_contour {
                assert!((p.y - c.pitch as f32).abs() < 1e-5);
            }
        }
        assert!(t.correct_pitch(1.5).is_err());
    }

    #[test]
    fn test_refit_restores_contour_and_note() {
        let mut t = track();
        let id = ids(&t)[1];
        t.shift_chunk_pitch(id, 3.0).unwrap();
        assert_eq!(t.chunks()[id].pitch, 63);
        t.refit_contour(id).unwrap();
        let a = &t.chunks()[id];
        assert!(!a.pitch_contour.is_empty());
        assert!((a.pitch_contour[0].y - 60.2).abs() < 1e-5);
        assert_eq!(a.pitch, 60);
        assert_eq!(t.chunks()[ids(&t)[2]].pitch, 62);

        // Correction now pulls toward the note the chunk actually sings.
        t.correct_pitch(1.0).unwrap();
        for p in &t.chunks()[id].pitch_contour {
            assert!((p.y - 60.0).abs() < 1e-5);
        }
        assert!(t.refit_contour(ids(&t)[0]).is_err());
    }

    #[test]
    fn test_refit_after_boundary_move_stays_on_output_timeline() {
        let mut t = track();
        let b = ids(&t)[2];
        t.move_chunk_boundary(b, 1500).unwrap();
        t.refit_contour(b).unwrap();
        assert_valid(&t);

        let a = ids(&t)[1];
        for (id, sung) in [(a, 60.2f32), (b, 61.8)] {
            let c = &t.chunks()[id];
            assert!(!c.pitch_contour.is_empty());
            for p in &c.pitch_contour {
                assert!(
                    p.t >= c.begin as f64 && p.t < c.end as f64,
                    "{:?} outside {}..{}",
                    p,
                    c.begin,
                    c.end
                );
                assert!((p.y - sung).abs() < 1e-5);
            }
        }
    }
}
