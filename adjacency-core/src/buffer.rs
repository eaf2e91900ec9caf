//! Fixed-Size Circular Buffer for Update History
//!
//! ## Overview
//!
//! Reliability needs to know how many fixes each subject delivered recently.
//! The history is kept in a ring buffer with a capacity fixed at compile time,
//! so a subject that reports every second never grows memory. When the buffer
//! is full the oldest entry is overwritten, which is exactly the entry the
//! counting window would discard first.
//!
//! ```text
//! CircularBuffer<u64, 5> after 7 pushes (t0..t6):
//! ┌────┬────┬────┬────┬────┐
//! │ t5 │ t6 │ t2 │ t3 │ t4 │   physical slots
//! └────┴────┴────┴────┴────┘
//!             ↑
//!             write_pos = 2 (oldest)
//!
//! Logical view: [t2, t3, t4, t5, t6]
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use adjacency_core::buffer::UpdateHistory;
//!
//! let mut history: UpdateHistory<8> = UpdateHistory::new();
//! history.push(1_000);
//! history.push(61_000);
//! history.push(121_000);
//!
//! // Entries at or after t=60s
//! assert_eq!(history.count_since(60_000), 2);
//! ```

use crate::time::Timestamp;

/// Fixed-size circular buffer
///
/// ## Internal Invariants
///
/// - `write_pos < N`
/// - `len <= N`
/// - Items are yielded in insertion order when iterating
#[derive(Clone)]
pub struct CircularBuffer<T: Copy, const N: usize> {
    data: [Option<T>; N],
    write_pos: usize,
    len: usize,
}

impl<T: Copy, const N: usize> CircularBuffer<T, N> {
    /// Creates a new empty circular buffer
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Adds an item, overwriting the oldest when full
    pub fn push(&mut self, item: T) {
        self.data[self.write_pos] = Some(item);
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Get number of stored items
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Get the most recent item
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        let idx = if self.write_pos == 0 { N - 1 } else { self.write_pos - 1 };
        self.data[idx].as_ref()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> CircularBufferIter<'_, T, N> {
        CircularBufferIter {
            buffer: self,
            index: 0,
        }
    }

    /// Keep only the items matching `keep`, preserving order
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        let mut kept = Self::new();
        for item in self.iter() {
            if keep(item) {
                kept.push(*item);
            }
        }
        *self = kept;
    }

    /// Logical index (0 = oldest) to stored item
    fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        self.data[actual_index].as_ref()
    }
}

/// Iterator over circular buffer contents
pub struct CircularBufferIter<'a, T: Copy, const N: usize> {
    buffer: &'a CircularBuffer<T, N>,
    index: usize,
}

impl<'a, T: Copy, const N: usize> Iterator for CircularBufferIter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }
}

impl<T: Copy, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + core::fmt::Debug, const N: usize> core::fmt::Debug for CircularBuffer<T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Acceptance timestamps of one subject
pub type UpdateHistory<const N: usize> = CircularBuffer<Timestamp, N>;

impl<const N: usize> CircularBuffer<Timestamp, N> {
    /// Count entries at or after `cutoff`
    pub fn count_since(&self, cutoff: Timestamp) -> usize {
        self.iter().filter(|&&ts| ts >= cutoff).count()
    }

    /// Drop entries older than `cutoff`
    pub fn prune_before(&mut self, cutoff: Timestamp) {
        self.retain(|&ts| ts >= cutoff);
    }
}
