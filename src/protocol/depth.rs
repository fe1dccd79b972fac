//! Per-nesting-level byte counters.
//!
//! Slot 0 belongs to the root object and is never popped. The writer uses
//! each slot as an accumulator of bytes produced at that level; the reader
//! uses it as the remaining byte budget of the enclosing object.

use crate::error::{LBinaryError, Result};

/// Bounded stack of per-level byte counters.
#[derive(Debug, Clone)]
pub struct DepthStack {
    frames: Vec<usize>,
    max_depth: usize,
}

impl DepthStack {
    /// Create a stack holding only the root slot.
    pub fn new(max_depth: usize) -> Self {
        let mut frames = Vec::with_capacity(max_depth.min(16) + 1);
        frames.push(0);
        Self { frames, max_depth }
    }

    /// Current nesting level (0 = root).
    #[inline]
    pub fn level(&self) -> usize {
        self.frames.len() - 1
    }

    /// Check if no nested frame is open.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.frames.len() == 1
    }

    /// Maximum nesting level accepted by `push`.
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Counter of the current level.
    #[inline]
    pub fn current(&self) -> usize {
        self.frames[self.frames.len() - 1]
    }

    /// Open a new level initialised to `initial`.
    ///
    /// # Errors
    ///
    /// Returns `DepthExceeded` if the stack is already `max_depth` levels deep.
    pub fn push(&mut self, initial: usize) -> Result<()> {
        if self.level() >= self.max_depth {
            return Err(LBinaryError::DepthExceeded(self.max_depth));
        }
        self.frames.push(initial);
        Ok(())
    }

    /// Close the current level and return its final counter.
    ///
    /// The root slot is never removed; popping at root returns `None`.
    pub fn pop(&mut self) -> Option<usize> {
        if self.is_root() {
            return None;
        }
        self.frames.pop()
    }

    /// Add `n` bytes to the current level.
    #[inline]
    pub fn add(&mut self, n: usize) {
        let last = self.frames.len() - 1;
        self.frames[last] = self.frames[last].saturating_add(n);
    }

    /// Remove `n` bytes from the current level, stopping at zero.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        let last = self.frames.len() - 1;
        self.frames[last] = self.frames[last].saturating_sub(n);
    }

    /// Drop every nested level and zero the root slot.
    pub fn reset(&mut self) {
        self.frames.truncate(1);
        self.frames[0] = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stack_is_root() {
        let stack = DepthStack::new(4);
        assert!(stack.is_root());
        assert_eq!(stack.level(), 0);
        assert_eq!(stack.current(), 0);
        assert_eq!(stack.max_depth(), 4);
    }

    #[test]
    fn test_push_pop_accumulates() {
        let mut stack = DepthStack::new(4);
        stack.push(0).unwrap();
        stack.add(4);
        stack.add(8);
        assert_eq!(stack.level(), 1);
        assert_eq!(stack.pop(), Some(12));
        assert!(stack.is_root());
    }

    #[test]
    fn test_consume_saturates_at_zero() {
        let mut stack = DepthStack::new(4);
        stack.push(6).unwrap();
        stack.consume(4);
        assert_eq!(stack.current(), 2);
        stack.consume(10);
        assert_eq!(stack.current(), 0);
    }

    #[test]
    fn test_push_beyond_max_depth_fails() {
        let mut stack = DepthStack::new(2);
        stack.push(0).unwrap();
        stack.push(0).unwrap();
        let err = stack.push(0).unwrap_err();
        assert_eq!(err, LBinaryError::DepthExceeded(2));
        assert_eq!(stack.level(), 2);
    }

    #[test]
    fn test_root_is_never_popped() {
        let mut stack = DepthStack::new(2);
        stack.add(5);
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.current(), 5);
    }

    #[test]
    fn test_reset_clears_levels() {
        let mut stack = DepthStack::new(3);
        stack.add(3);
        stack.push(7).unwrap();
        stack.push(1).unwrap();
        stack.reset();
        assert!(stack.is_root());
        assert_eq!(stack.current(), 0);
    }
}
