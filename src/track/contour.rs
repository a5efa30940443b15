//! Cursor over the pitch-contour points of a voiced run.
//!
//! Contour points are stored per chunk, but a voiced run is one continuous
//! spline. The cursor walks points across chunk boundaries inside a run and
//! turns null when it would step into an unvoiced chunk or off either end of
//! the list.

use crate::core::spline::{HermiteInterpolation, HermiteSplinePoint};

use super::chunk::{ChunkId, ChunkList};

/// Position of one contour point: owning chunk plus index into its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitchContourIterator {
    chunk: Option<ChunkId>,
    index: usize,
}

impl PitchContourIterator {
    /// Cursor at point `index` of `chunk`. Not normalized; see [`Self::advance`].
    pub fn new(chunk: ChunkId, index: usize) -> Self {
        Self {
            chunk: Some(chunk),
            index,
        }
    }

    /// The null cursor.
    pub fn null() -> Self {
        Self {
            chunk: None,
            index: 0,
        }
    }

    /// First point of the voiced run that starts at or contains `chunk`.
    pub fn first_of_run(list: &ChunkList, chunk: ChunkId) -> Self {
        match list.voiced_run_start(chunk) {
            Some(start) => Self::new(start, 0).advance(list, 0),
            None => Self::null(),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.chunk.is_none()
    }

    #[inline]
    pub fn chunk(&self) -> Option<ChunkId> {
        self.chunk
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves forward by `n` points, skipping chunks without points.
    pub fn advance(self, list: &ChunkList, n: usize) -> Self {
        let Some(mut chunk) = self.chunk else {
            return self;
        };
        let mut index = self.index + n;
        loop {
            let Some(c) = list.get(chunk) else {
                return Self::null();
            };
            if index < c.pitch_contour.len() {
                return Self {
                    chunk: Some(chunk),
                    index,
                };
            }
            index -= c.pitch_contour.len();
            match c.next() {
                Some(next) if list[next].voiced => chunk = next,
                _ => return Self::null(),
            }
        }
    }

    /// Moves backward by `n` points, skipping chunks without points.
    pub fn retreat(self, list: &ChunkList, n: usize) -> Self {
        let Some(mut chunk) = self.chunk else {
            return self;
        };
        let mut index = self.index as isize - n as isize;
        while index < 0 {
            match list.prev(chunk) {
                Some(prev) if list[prev].voiced => {
                    chunk = prev;
                    index += list[prev].pitch_contour.len() as isize;
                }
                _ => return Self::null(),
            }
        }
        Self {
            chunk: Some(chunk),
            index: index as usize,
        }
    }

    /// The point under the cursor.
    pub fn get<'a>(&self, list: &'a ChunkList) -> Option<&'a HermiteSplinePoint> {
        list.get(self.chunk?)?.pitch_contour.get(self.index)
    }

    pub fn get_mut<'a>(&self, list: &'a mut ChunkList) -> Option<&'a mut HermiteSplinePoint> {
        list.get_mut(self.chunk?)?.pitch_contour.get_mut(self.index)
    }

    /// Hermite segment from this point to the next, or a constant past the
    /// last point of the run.
    pub fn segment(&self, list: &ChunkList) -> Option<HermiteInterpolation> {
        let p0 = self.get(list)?;
        Some(match self.advance(list, 1).get(list) {
            Some(p1) => HermiteInterpolation::new(p0, p1),
            None => HermiteInterpolation::constant(p0.y),
        })
    }
}

/// Forward spline cursor: tracks the segment containing a monotonically
/// increasing time and evaluates pitch there.
#[derive(Debug, Clone, Copy)]
pub struct SplineCursor {
    it: PitchContourIterator,
}

impl SplineCursor {
    /// Cursor at the first point of the run containing `chunk`.
    pub fn at_run(list: &ChunkList, chunk: ChunkId) -> Self {
        Self {
            it: PitchContourIterator::first_of_run(list, chunk),
        }
    }

    /// Pitch at `t`. `t` must not decrease between calls.
    pub fn pitch_at(&mut self, list: &ChunkList, t: f64) -> Option<f32> {
        loop {
            let next = self.it.advance(list, 1);
            match next.get(list) {
                Some(p) if t >= p.t => self.it = next,
                _ => break,
            }
        }
        let p0 = self.it.get(list)?;
        if t <= p0.t {
            return Some(p0.y);
        }
        self.it.segment(list).map(|h| h.eval(t))
    }
}
