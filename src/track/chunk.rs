//! Arena-backed doubly-linked chunk list.
//!
//! Chunks live in a slot vector and refer to their neighbors by [`ChunkId`],
//! so splitting, merging, and snapshotting the list never touch raw pointers
//! and cloning the whole list is a plain structural copy.

use std::ops::{Index, IndexMut};

use crate::core::spline::HermiteSplinePoint;
use crate::error::IntonationError;

/// Stable handle to a chunk inside a [`ChunkList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(usize);

impl ChunkId {
    /// Slot index inside the owning list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A contiguous run of analysis frames with one quantized pitch and voicing.
///
/// Equality compares content only, not list links.
#[derive(Debug, Clone)]
pub struct Chunk {
    prev: Option<ChunkId>,
    next: Option<ChunkId>,
    /// First analysis frame (inclusive).
    pub begin_frame: usize,
    /// Boundary analysis frame (exclusive end of the run).
    pub end_frame: usize,
    /// Output-timeline start in samples.
    pub begin: i64,
    /// Output-timeline end in samples.
    pub end: i64,
    /// Quantized pitch (semitone number).
    pub pitch: i32,
    pub voiced: bool,
    /// Whether the chunk may be time-stretched by edits.
    pub elastic: bool,
    /// Contour points owned by this chunk, ascending in `t`.
    pub pitch_contour: Vec<HermiteSplinePoint>,
}

impl Chunk {
    /// Creates an unlinked chunk. Voiced chunks start out elastic.
    pub fn new(
        begin_frame: usize,
        end_frame: usize,
        begin: i64,
        end: i64,
        pitch: i32,
        voiced: bool,
    ) -> Self {
        Self {
            prev: None,
            next: None,
            begin_frame,
            end_frame,
            begin,
            end,
            pitch,
            voiced,
            elastic: voiced,
            pitch_contour: Vec::new(),
        }
    }

    #[inline]
    pub fn prev(&self) -> Option<ChunkId> {
        self.prev
    }

    #[inline]
    pub fn next(&self) -> Option<ChunkId> {
        self.next
    }

    /// Length on the output timeline in samples.
    #[inline]
    pub fn len(&self) -> i64 {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Fraction of the way through the chunk at output time `t`.
    #[inline]
    pub fn fraction_at(&self, t: f64) -> f64 {
        if self.end > self.begin {
            (t - self.begin as f64) / (self.end - self.begin) as f64
        } else {
            0.0
        }
    }

    /// Fractional analysis-frame index that output time `t` maps to.
    #[inline]
    pub fn frame_index_at(&self, t: f64) -> f64 {
        let s = self.fraction_at(t);
        self.begin_frame as f64 * (1.0 - s) + self.end_frame as f64 * s
    }

    /// Output time at which fractional frame index `frame` is played. Inverse
    /// of [`frame_index_at`](Self::frame_index_at).
    #[inline]
    pub fn time_at_frame(&self, frame: f64) -> f64 {
        if self.end_frame > self.begin_frame {
            let s = (frame - self.begin_frame as f64) / (self.end_frame - self.begin_frame) as f64;
            self.begin as f64 + s * (self.end - self.begin) as f64
        } else {
            self.begin as f64
        }
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.begin_frame == other.begin_frame
            && self.end_frame == other.end_frame
            && self.begin == other.begin
            && self.end == other.end
            && self.pitch == other.pitch
            && self.voiced == other.voiced
            && self.elastic == other.elastic
            && self.pitch_contour == other.pitch_contour
    }
}

/// Doubly-linked list of chunks stored in a slot arena.
///
/// Two lists are equal when they hold equal chunks in the same order,
/// regardless of slot layout.
#[derive(Debug, Clone, Default)]
pub struct ChunkList {
    slots: Vec<Option<Chunk>>,
    free: Vec<usize>,
    head: Option<ChunkId>,
    tail: Option<ChunkId>,
    len: usize,
}

impl ChunkList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn first(&self) -> Option<ChunkId> {
        self.head
    }

    #[inline]
    pub fn last(&self) -> Option<ChunkId> {
        self.tail
    }

    /// Returns the chunk for `id`, or `None` if the slot is vacant.
    #[inline]
    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    #[inline]
    pub fn next(&self, id: ChunkId) -> Option<ChunkId> {
        self.get(id).and_then(|c| c.next)
    }

    #[inline]
    pub fn prev(&self, id: ChunkId) -> Option<ChunkId> {
        self.get(id).and_then(|c| c.prev)
    }

    fn alloc(&mut self, chunk: Chunk) -> ChunkId {
        self.len += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(chunk);
                ChunkId(slot)
            }
            None => {
                self.slots.push(Some(chunk));
                ChunkId(self.slots.len() - 1)
            }
        }
    }

    /// Appends a chunk at the end of the list.
    pub fn push_back(&mut self, mut chunk: Chunk) -> ChunkId {
        chunk.prev = self.tail;
        chunk.next = None;
        let id = self.alloc(chunk);
        match self.tail {
            Some(tail) => self[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Prepends a chunk at the start of the list.
    pub fn push_front(&mut self, mut chunk: Chunk) -> ChunkId {
        chunk.prev = None;
        chunk.next = self.head;
        let id = self.alloc(chunk);
        match self.head {
            Some(head) => self[head].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        id
    }

    /// Inserts a chunk directly after `after`.
    pub fn insert_after(&mut self, after: ChunkId, mut chunk: Chunk) -> ChunkId {
        let next = self[after].next;
        chunk.prev = Some(after);
        chunk.next = next;
        let id = self.alloc(chunk);
        self[after].next = Some(id);
        match next {
            Some(next) => self[next].prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    /// Unlinks and returns a chunk. Its slot may be reused by later inserts.
    pub fn remove(&mut self, id: ChunkId) -> Option<Chunk> {
        let chunk = self.slots.get_mut(id.0)?.take()?;
        match chunk.prev {
            Some(prev) => self[prev].next = chunk.next,
            None => self.head = chunk.next,
        }
        match chunk.next {
            Some(next) => self[next].prev = chunk.prev,
            None => self.tail = chunk.prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(chunk)
    }

    /// Iterates chunk ids in list order.
    pub fn ids(&self) -> ChunkIds<'_> {
        ChunkIds {
            list: self,
            cur: self.head,
        }
    }

    /// Iterates `(id, chunk)` pairs in list order.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> + '_ {
        self.ids().map(move |id| (id, &self[id]))
    }

    /// The chunk covering output position `t`, if any.
    pub fn chunk_at(&self, t: i64) -> Option<ChunkId> {
        self.iter()
            .find(|(_, c)| c.begin <= t && t < c.end)
            .map(|(id, _)| id)
    }

    /// The first chunk of the maximal voiced run containing `id`.
    pub fn voiced_run_start(&self, id: ChunkId) -> Option<ChunkId> {
        if !self.get(id)?.voiced {
            return None;
        }
        let mut cur = id;
        while let Some(prev) = self.prev(cur) {
            if !self[prev].voiced {
                break;
            }
            cur = prev;
        }
        Some(cur)
    }

    /// The last chunk of the maximal voiced run containing `id`.
    pub fn voiced_run_end(&self, id: ChunkId) -> Option<ChunkId> {
        if !self.get(id)?.voiced {
            return None;
        }
        let mut cur = id;
        while let Some(next) = self.next(cur) {
            if !self[next].voiced {
                break;
            }
            cur = next;
        }
        Some(cur)
    }

    /// Checks that the chunks tile `[0, length)` contiguously, that every
    /// chunk spans at least one frame, and that frame indices stay below
    /// `frame_count`.
    pub fn validate(&self, length: i64, frame_count: usize) -> Result<(), IntonationError> {
        let mut expected_begin = 0i64;
        let mut expected_frame = 0usize;
        let mut count = 0usize;

        for (id, chunk) in self.iter() {
            count += 1;
            if chunk.begin != expected_begin {
                return Err(IntonationError::InvalidFormat(format!(
                    "chunk {} begins at {}, expected {}",
                    id.0, chunk.begin, expected_begin
                )));
            }
            if chunk.end <= chunk.begin {
                return Err(IntonationError::InvalidFormat(format!(
                    "chunk {} has non-positive length",
                    id.0
                )));
            }
            if chunk.begin_frame != expected_frame
                || chunk.begin_frame >= chunk.end_frame
                || chunk.end_frame >= frame_count
            {
                return Err(IntonationError::InvalidFormat(format!(
                    "chunk {} has invalid frame range {}..{}",
                    id.0, chunk.begin_frame, chunk.end_frame
                )));
            }
            if !chunk.voiced && !chunk.pitch_contour.is_empty() {
                return Err(IntonationError::InvalidFormat(format!(
                    "unvoiced chunk {} carries a pitch contour",
                    id.0
                )));
            }
            expected_begin = chunk.end;
            expected_frame = chunk.end_frame;
        }

        if count != self.len {
            return Err(IntonationError::InvalidFormat(
                "chunk list links are inconsistent".to_string(),
            ));
        }
        if expected_begin != length {
            return Err(IntonationError::InvalidFormat(format!(
                "chunks end at {}, waveform length is {}",
                expected_begin, length
            )));
        }
        Ok(())
    }
}

impl PartialEq for ChunkList {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .iter()
                .zip(other.iter())
                .all(|((_, a), (_, b))| a == b)
    }
}

impl Index<ChunkId> for ChunkList {
    type Output = Chunk;

    fn index(&self, id: ChunkId) -> &Chunk {
        self.get(id).expect("stale chunk id")
    }
}

impl IndexMut<ChunkId> for ChunkList {
    fn index_mut(&mut self, id: ChunkId) -> &mut Chunk {
        self.get_mut(id).expect("stale chunk id")
    }
}

/// Iterator over chunk ids in list order.
pub struct ChunkIds<'a> {
    list: &'a ChunkList,
    cur: Option<ChunkId>,
}

impl Iterator for ChunkIds<'_> {
    type Item = ChunkId;

    fn next(&mut self) -> Option<ChunkId> {
        let id = self.cur?;
        self.cur = self.list.next(id);
        Some(id)
    }
}
