//! Bounded priority queue
//!
//! Entries pop by `(priority rank, submission sequence)`, a strict total
//! order: higher priority first, then first come first served.

use crate::error::QueueFullError;
use crate::task::Priority;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

struct Entry<T> {
    key: Reverse<(u8, u64)>,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Priority queue with a fixed capacity
pub struct TaskQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    capacity: usize,
    next_sequence: u64,
}

impl<T> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.heap.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> TaskQueue<T> {
    /// Empty queue holding at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.min(1024)),
            capacity,
            next_sequence: 0,
        }
    }

    /// Enqueue `item`, returning its submission sequence
    ///
    /// # Errors
    ///
    /// [`QueueFullError`] when at capacity; the item is dropped.
    pub fn push(&mut self, priority: Priority, item: T) -> Result<u64, QueueFullError> {
        self.push_with(priority, |_| item)
    }

    /// Enqueue the item built from the assigned sequence
    ///
    /// # Errors
    ///
    /// [`QueueFullError`] when at capacity; `build` is not called.
    pub fn push_with(&mut self, priority: Priority, build: impl FnOnce(u64) -> T) -> Result<u64, QueueFullError> {
        if self.heap.len() >= self.capacity {
            return Err(QueueFullError {
                capacity: self.capacity,
            });
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Entry {
            key: Reverse((priority.rank(), sequence)),
            item: build(sequence),
        });
        Ok(sequence)
    }

    /// Remove the next entry
    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    /// Remove every entry in dispatch order
    pub fn drain_ordered(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.pop()).collect()
    }

    /// Queued entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is queued
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Configured capacity
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
