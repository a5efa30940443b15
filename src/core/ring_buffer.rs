//! Fixed-capacity ring buffer for real-time audio paths.

/// Fixed-capacity FIFO queue.
///
/// The buffer never allocates after construction and never shifts memory,
/// which makes it usable from the audio callback thread.
#[derive(Debug, Clone)]
pub struct RingBuffer<T>
where
    T: Copy + Default,
{
    data: Vec<T>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T>
where
    T: Copy + Default,
{
    /// Creates a ring buffer with fixed capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: vec![T::default(); cap],
            head: 0,
            len: 0,
        }
    }

    /// Returns the number of elements currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns true when no elements are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true when no further element can be pushed.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Clears the ring buffer.
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Pushes one element at the back. Returns `false` if the buffer is full.
    #[inline]
    pub fn push(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        let tail = (self.head + self.len) % self.capacity();
        self.data[tail] = value;
        self.len += 1;
        true
    }

    /// Pops one element from the front.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.data[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        if self.len == 0 {
            self.head = 0;
        }
        Some(value)
    }

    /// Returns the front element without removing it.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        if self.len == 0 {
            None
        } else {
            Some(&self.data[self.head])
        }
    }

    /// Iterates front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let cap = self.capacity();
        (0..self.len).map(move |i| &self.data[(self.head + i) % cap])
    }

    /// Mutably iterates front to back.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let (head, len) = (self.head, self.len);
        let (wrapped, tail) = self.data.split_at_mut(head);
        let first = tail.len().min(len);
        let second = len - first;
        tail[..first].iter_mut().chain(wrapped[..second].iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn test_push_pop_wrap() {
        let mut rb = RingBuffer::<i32>::with_capacity(4);
        assert!(rb.push(1));
        assert!(rb.push(2));
        assert!(rb.push(3));
        assert_eq!(rb.pop(), Some(1));
        assert_eq!(rb.pop(), Some(2));
        assert!(rb.push(4));
        assert!(rb.push(5));
        assert!(rb.push(6));
        let items: Vec<i32> = rb.iter().copied().collect();
        assert_eq!(items, vec![3, 4, 5, 6]);
        assert_eq!(rb.front(), Some(&3));
    }

    #[test]
    fn test_bounded_capacity() {
        let mut rb = RingBuffer::<f32>::with_capacity(2);
        assert!(rb.push(1.0));
        assert!(rb.push(2.0));
        assert!(!rb.push(3.0));
        assert!(rb.is_full());
        assert_eq!(rb.len(), 2);
    }

    #[test]
    fn test_iter_mut_across_wrap() {
        let mut rb = RingBuffer::<i32>::with_capacity(3);
        rb.push(1);
        rb.push(2);
        rb.pop();
        rb.push(3);
        rb.push(4);
        for v in rb.iter_mut() {
            *v *= 10;
        }
        let items: Vec<i32> = rb.iter().copied().collect();
        assert_eq!(items, vec![20, 30, 40]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut rb = RingBuffer::<i32>::with_capacity(0);
        assert!(!rb.push(1));
        assert_eq!(rb.pop(), None);
        assert_eq!(rb.iter().count(), 0);
    }

    #[test]
    fn test_clear() {
        let mut rb = RingBuffer::<i32>::with_capacity(2);
        rb.push(7);
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.front(), None);
    }
}
