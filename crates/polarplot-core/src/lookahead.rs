//! Fixed-capacity lookahead queue.
//!
//! The planner keeps upcoming targets here so it can see the next corners
//! before committing to a speed. Capacity never grows: an enqueue on a full
//! buffer is refused and the value handed back.

use crate::geometry::Point;
use thiserror::Error;

/// Returned by [`LookaheadBuffer::enqueue`] when no slot is free.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("lookahead buffer is full")]
pub struct BufferFull<T>(pub T);

#[derive(Debug, Clone)]
pub struct LookaheadBuffer<T = Point> {
    slots: Box<[Option<T>]>,
    head: usize,
    len: usize,
}

impl<T> LookaheadBuffer<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "lookahead capacity must be non-zero");
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Append at the tail.
    pub fn enqueue(&mut self, value: T) -> Result<(), BufferFull<T>> {
        if self.is_full() {
            return Err(BufferFull(value));
        }
        let idx = self.slot(self.len);
        self.slots[idx] = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Remove and return the head.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        value
    }

    pub fn peek(&self) -> Option<&T> {
        self.get(0)
    }

    /// Most recently queued value.
    pub fn last_mut(&mut self) -> Option<&mut T> {
        let index = self.len.checked_sub(1)?;
        let slot = self.slot(index);
        self.slots[slot].as_mut()
    }

    /// The `index`th queued value counted from the head.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.slots[self.slot(index)].as_ref()
    }

    /// Queued values from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    fn slot(&self, offset: usize) -> usize {
        (self.head + offset) % self.capacity()
    }
}
