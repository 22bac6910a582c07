//! Shared helpers for the pipeline stages
//!
//! Fixed-capacity storage used wherever the engine keeps history, plus the small numeric
//! predicates shared by level math and alerting.

use serde::{Deserialize, Serialize};

// ============================================================
// RING BUFFER
// ============================================================

/// Fixed-capacity FIFO. Pushing into a full buffer evicts the oldest element.
///
/// Storage is allocated once at construction and indexed modulo capacity; the buffer
/// never grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` elements (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
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
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Append `value`, returning the evicted oldest element if the buffer was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let capacity = self.capacity();
        if self.len == capacity {
            let evicted = self.slots[self.head].replace(value);
            self.head = (self.head + 1) % capacity;
            evicted
        } else {
            let tail = (self.head + self.len) % capacity;
            self.slots[tail] = Some(value);
            self.len += 1;
            None
        }
    }

    /// Remove and return the oldest element.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        value
    }

    /// Element at logical position `i` (0 = oldest).
    #[inline]
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.len {
            return None;
        }
        self.slots[(self.head + i) % self.capacity()].as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        if i >= self.len {
            return None;
        }
        let capacity = self.capacity();
        self.slots[(self.head + i) % capacity].as_mut()
    }

    /// Newest element.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        match self.len.checked_sub(1) {
            Some(i) => self.get_mut(i),
            None => None,
        }
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }

    /// Structural sanity check for buffers restored from a checkpoint.
    pub fn is_consistent(&self) -> bool {
        let capacity = self.capacity();
        capacity > 0
            && self.head < capacity
            && self.len <= capacity
            && (0..capacity).all(|offset| {
                let occupied = offset < self.len;
                self.slots[(self.head + offset) % capacity].is_some() == occupied
            })
    }
}

// ============================================================
// NUMERIC HELPERS
// ============================================================

/// Anchor ranges at or below this are treated as zero.
pub const RANGE_EPSILON: f64 = f64::EPSILON;

/// Tolerance used when matching a configured ratio against the fixed ratio table.
pub const RATIO_TOLERANCE: f64 = 1e-9;

/// Check if two ratios denote the same table entry
#[inline]
pub fn same_ratio(a: f64, b: f64) -> bool {
    (a - b).abs() < RATIO_TOLERANCE
}

/// True if the bar's `[low, high]` span intersects `[lower, upper]`.
#[inline]
pub fn spans_overlap(low: f64, high: f64, lower: f64, upper: f64) -> bool {
    low <= upper && high >= lower
}

/// True if the move from `prev` to `curr` crosses `level` in either direction.
///
/// Touching the level without passing through it does not count: the previous value must be
/// strictly on one side and the current value on the level or beyond it.
#[inline]
pub fn crossed(prev: f64, curr: f64, level: f64) -> bool {
    (prev < level && curr >= level) || (prev > level && curr <= level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut ring = RingBuffer::with_capacity(3);
        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.push(3), None);
        assert!(ring.is_full());
        assert_eq!(ring.push(4), Some(1));
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(ring.get(0), Some(&2));
        assert_eq!(ring.back(), Some(&4));
        assert_eq!(ring.get(3), None);
    }

    #[test]
    fn test_ring_buffer_pop_and_clear() {
        let mut ring = RingBuffer::with_capacity(2);
        ring.push("a");
        ring.push("b");
        ring.push("c");
        assert_eq!(ring.pop_front(), Some("b"));
        assert_eq!(ring.len(), 1);
        assert!(ring.is_consistent());
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.pop_front(), None);
        assert!(ring.is_consistent());
    }

    #[test]
    fn test_ring_buffer_zero_capacity_clamped() {
        let mut ring = RingBuffer::with_capacity(0);
        assert_eq!(ring.capacity(), 1);
        ring.push(7);
        assert_eq!(ring.push(8), Some(7));
    }

    #[test]
    fn test_back_mut() {
        let mut ring = RingBuffer::with_capacity(2);
        assert!(ring.back_mut().is_none());
        ring.push(1);
        ring.push(2);
        ring.push(3);
        if let Some(last) = ring.back_mut() {
            *last = 30;
        }
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 30]);
    }

    #[test]
    fn test_crossed() {
        assert!(crossed(99.0, 101.0, 100.0));
        assert!(crossed(101.0, 99.0, 100.0));
        assert!(crossed(99.0, 100.0, 100.0));
        assert!(!crossed(100.0, 101.0, 100.0));
        assert!(!crossed(101.0, 102.0, 100.0));
    }

    #[test]
    fn test_spans_overlap() {
        assert!(spans_overlap(117.0, 118.0, 117.5, 119.1));
        assert!(spans_overlap(119.1, 125.0, 117.5, 119.1));
        assert!(!spans_overlap(119.2, 125.0, 117.5, 119.1));
    }
}
