//! Fixed-Size Ring Buffer for Sensor Samples
//!
//! ## Overview
//!
//! Samples travel from the sampling timer to readers through a bounded FIFO.
//! The buffer has a fixed number of slots chosen at compile time through const
//! generics, so the sensor never allocates after creation.
//!
//! ## Algorithm
//!
//! Two indices walk the slot array:
//!
//! ```text
//! ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐
//! │  0  │  1  │  2  │  3  │  4  │  5  │  6  │  7  │
//! └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘
//!          ↑                       ↑
//!        tail                    head
//!        (next read)          (next write)
//! ```
//!
//! - empty: `head == tail`
//! - full: `(head + 1) % N == tail`
//! - live samples: `(head - tail) mod N`
//!
//! One slot always stays unused so that "full" and "empty" are distinguishable
//! from the indices alone. A `RingBuffer<64>` therefore holds 63 samples.
//!
//! ## Overflow
//!
//! [`RingBuffer::enqueue`] refuses to write into a full buffer and returns
//! [`BufferError::Overflow`] with the indices untouched; the caller picks the
//! policy. [`RingBuffer::enqueue_overwrite`] is the drop-oldest alternative: it
//! advances `tail` first and hands back the evicted sample.
//!
//! ## Thread Safety
//!
//! This type has no locking of its own. The sensor keeps it inside the same
//! mutex as its configuration and statistics.
//!
//! ## Usage Example
//!
//! ```rust
//! use simtemp_core::buffer::{RingBuffer, Traversal};
//! use simtemp_core::sample::{Sample, SampleFlags};
//!
//! let mut buf: RingBuffer<4> = RingBuffer::new();
//! for t in 0..3 {
//!     buf.enqueue(Sample::new(t, 27_000, SampleFlags::NEW_SAMPLE)).unwrap();
//! }
//! assert!(buf.is_full());
//! assert!(buf.enqueue(Sample::default()).is_err());
//!
//! let oldest = buf.dequeue().unwrap();
//! assert_eq!(oldest.timestamp_ns, 0);
//! assert_eq!(buf.iter(Traversal::Logical).count(), 2);
//! ```

use crate::errors::{BufferError, BufferResult};
use crate::sample::Sample;

/// Order used by [`RingBuffer::iter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Live samples from oldest (`tail`) to newest (`head - 1`)
    Logical,
    /// Every slot from index 0 to `N - 1`, stale ones included. Diagnostics only.
    Raw,
}

/// Bounded FIFO of samples with `N - 1` usable slots
///
/// ## Internal Invariants
///
/// - `head < N` and `tail < N`
/// - `len() == (head + N - tail) % N`, never more than `N - 1`
/// - failed operations leave both indices unchanged
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    slots: [Sample; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> RingBuffer<N> {
    const VALID_SIZE: () = assert!(N >= 2, "ring buffer needs at least two slots");

    /// Creates an empty buffer with zeroed slots
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_SIZE;
        Self {
            slots: [Sample::ZERO; N],
            head: 0,
            tail: 0,
        }
    }

    /// Resets both indices and zeroes every slot
    pub fn init(&mut self) {
        self.slots = [Sample::ZERO; N];
        self.head = 0;
        self.tail = 0;
    }

    /// Drops all live samples without touching slot contents
    pub fn clear(&mut self) {
        self.tail = self.head;
    }

    /// Number of usable slots (`N - 1`)
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Number of live samples
    pub fn len(&self) -> usize {
        (self.head + N - self.tail) % N
    }

    /// True when no sample is waiting
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// True when the next enqueue would overflow
    pub fn is_full(&self) -> bool {
        (self.head + 1) % N == self.tail
    }

    /// Index of the next write
    pub fn head(&self) -> usize {
        self.head
    }

    /// Index of the next read
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Appends a sample, failing with `Overflow` when full
    pub fn enqueue(&mut self, sample: Sample) -> BufferResult<()> {
        if self.is_full() {
            return Err(BufferError::Overflow);
        }

        self.slots[self.head] = sample;
        self.head = (self.head + 1) % N;
        Ok(())
    }

    /// Appends a sample, evicting the oldest one first if the buffer is full
    ///
    /// Returns the evicted sample, if any.
    pub fn enqueue_overwrite(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.is_full() {
            let oldest = self.slots[self.tail];
            self.tail = (self.tail + 1) % N;
            Some(oldest)
        } else {
            None
        };

        self.slots[self.head] = sample;
        self.head = (self.head + 1) % N;
        evicted
    }

    /// Removes and returns the oldest sample, failing with `Underflow` when empty
    pub fn dequeue(&mut self) -> BufferResult<Sample> {
        if self.is_empty() {
            return Err(BufferError::Underflow);
        }

        let sample = self.slots[self.tail];
        self.tail = (self.tail + 1) % N;
        Ok(sample)
    }

    /// Lazily walks the buffer without moving `head` or `tail`
    ///
    /// The iterator borrows the buffer, so it can be created again at any time
    /// to restart the walk.
    pub fn iter(&self, order: Traversal) -> RingIter<'_, N> {
        let (start, remaining) = match order {
            Traversal::Logical => (self.tail, self.len()),
            Traversal::Raw => (0, N),
        };

        RingIter {
            buffer: self,
            index: start,
            remaining,
        }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`RingBuffer::iter`]
pub struct RingIter<'a, const N: usize> {
    buffer: &'a RingBuffer<N>,
    index: usize,
    remaining: usize,
}

impl<'a, const N: usize> Iterator for RingIter<'a, N> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let item = &self.buffer.slots[self.index];
        self.index = (self.index + 1) % N;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, const N: usize> ExactSizeIterator for RingIter<'a, N> {}
