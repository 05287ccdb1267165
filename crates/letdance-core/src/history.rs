//! Bounded sliding window of recent keypoint frames.
//!
//! Frames live in a fixed-capacity ring: once full, each push overwrites the
//! oldest slot in place, so the window never grows past its capacity and
//! never reallocates after warm-up.

use crate::error::{Error, Result};
use crate::types::KeypointFrame;

/// Default number of frames retained per session
pub const DEFAULT_HISTORY_LENGTH: usize = 10;

/// FIFO window of the most recent keypoint frames
#[derive(Debug, Clone)]
pub struct MotionHistoryBuffer {
    slots: Vec<KeypointFrame>,
    capacity: usize,
    /// Slot holding the oldest frame once the ring is full
    head: usize,
}

impl MotionHistoryBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidInput(
                "history capacity must be positive".into(),
            ));
        }

        Ok(Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        })
    }

    /// Append a frame, evicting the oldest one when full
    pub fn push(&mut self, frame: KeypointFrame) {
        if self.slots.len() < self.capacity {
            self.slots.push(frame);
        } else {
            self.slots[self.head] = frame;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Read-only chronological view of the buffered frames
    pub fn snapshot(&self) -> HistoryWindow<'_> {
        HistoryWindow {
            slots: &self.slots,
            head: self.head,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MotionHistoryBuffer {
    fn default() -> Self {
        Self {
            slots: Vec::with_capacity(DEFAULT_HISTORY_LENGTH),
            capacity: DEFAULT_HISTORY_LENGTH,
            head: 0,
        }
    }
}

/// Borrowed view over a [`MotionHistoryBuffer`], oldest frame first
#[derive(Debug, Clone, Copy)]
pub struct HistoryWindow<'a> {
    slots: &'a [KeypointFrame],
    head: usize,
}

impl<'a> HistoryWindow<'a> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Frame at chronological position `i` (0 = oldest)
    pub fn get(&self, i: usize) -> Option<&'a KeypointFrame> {
        if i >= self.slots.len() {
            return None;
        }
        self.slots.get((self.head + i) % self.slots.len())
    }

    /// Most recently pushed frame
    pub fn latest(&self) -> Option<&'a KeypointFrame> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Frame pushed immediately before [`latest`](Self::latest)
    pub fn previous(&self) -> Option<&'a KeypointFrame> {
        self.len().checked_sub(2).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a KeypointFrame> + 'a {
        let window = *self;
        (0..window.len()).filter_map(move |i| window.get(i))
    }

    /// Consecutive (older, newer) frame pairs in chronological order
    pub fn pairs(&self) -> impl Iterator<Item = (&'a KeypointFrame, &'a KeypointFrame)> + 'a {
        let window = *self;
        (1..window.len()).filter_map(move |i| Some((window.get(i - 1)?, window.get(i)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Keypoint, Landmark, Timestamp};

    fn frame(t: i64) -> KeypointFrame {
        KeypointFrame::new(
            Timestamp::from_nanos(t),
            [Keypoint::new(t as f64, 0.0, 1.0); Landmark::COUNT],
        )
    }

    fn timestamps(buffer: &MotionHistoryBuffer) -> Vec<i64> {
        buffer
            .snapshot()
            .iter()
            .map(|f| f.timestamp().as_nanos())
            .collect()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(MotionHistoryBuffer::new(0).is_err());
    }

    #[test]
    fn test_evicts_oldest_and_keeps_order() {
        let mut buffer = MotionHistoryBuffer::new(3).unwrap();
        for t in 0..5 {
            buffer.push(frame(t));
            assert!(buffer.len() <= 3);
        }

        assert_eq!(timestamps(&buffer), vec![2, 3, 4]);

        let window = buffer.snapshot();
        assert_eq!(window.latest().unwrap().timestamp().as_nanos(), 4);
        assert_eq!(window.previous().unwrap().timestamp().as_nanos(), 3);
        assert_eq!(window.pairs().count(), 2);
    }

    #[test]
    fn test_partial_window() {
        let mut buffer = MotionHistoryBuffer::default();
        assert!(buffer.snapshot().latest().is_none());

        buffer.push(frame(7));
        let window = buffer.snapshot();
        assert_eq!(window.len(), 1);
        assert!(window.previous().is_none());
        assert_eq!(window.pairs().count(), 0);
    }

    #[test]
    fn test_clear() {
        let mut buffer = MotionHistoryBuffer::new(2).unwrap();
        for t in 0..3 {
            buffer.push(frame(t));
        }
        buffer.clear();
        assert!(buffer.is_empty());

        buffer.push(frame(9));
        buffer.push(frame(10));
        buffer.push(frame(11));
        assert_eq!(timestamps(&buffer), vec![10, 11]);
    }
}
