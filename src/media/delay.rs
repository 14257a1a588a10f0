// SPDX-License-Identifier: MPL-2.0

//! Delayed emission buffer for output frames
//!
//! Frames enter with their capture timestamp and leave once `delay` has
//! elapsed. When several entries qualify at once only the most recent one is
//! returned and everything older is dropped, so consumers never see a burst
//! of stale frames after a stall.

use std::collections::VecDeque;
use std::time::Duration;

/// FIFO of timestamped entries released after a fixed delay
#[derive(Debug, Default)]
pub struct DelayedFrameQueue<T> {
    entries: VecDeque<(Duration, T)>,
}

impl<T> DelayedFrameQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffer one entry stamped with its capture time
    pub fn push(&mut self, timestamp: Duration, value: T) {
        self.entries.push_back((timestamp, value));
    }

    /// Release the newest entry whose age reached `delay`, dropping older ones
    ///
    /// Returns `None` while nothing has aged enough.
    pub fn take_ready(&mut self, now: Duration, delay: Duration) -> Option<T> {
        let mut ready = 0usize;
        for (ts, _) in self.entries.iter() {
            if now.saturating_sub(*ts) >= delay {
                ready += 1;
            } else {
                break;
            }
        }
        if ready == 0 {
            return None;
        }

        // drain through the last qualifying entry, keep only that one
        let mut last = None;
        for _ in 0..ready {
            last = self.entries.pop_front();
        }
        last.map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_nothing_ready_before_delay() {
        let mut q = DelayedFrameQueue::new();
        q.push(ms(100), 1);
        assert_eq!(q.take_ready(ms(110), ms(20)), None);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_single_release() {
        let mut q = DelayedFrameQueue::new();
        q.push(ms(100), 1);
        assert_eq!(q.take_ready(ms(120), ms(20)), Some(1));
        assert!(q.is_empty());
    }

    #[test]
    fn test_coalesces_to_newest_ready() {
        let mut q = DelayedFrameQueue::new();
        for (ts, v) in [(0u64, 'a'), (10, 'b'), (20, 'c'), (30, 'd')] {
            q.push(ms(ts), v);
        }
        // at now=35 with delay=20, entries at 0 and 10 qualify; the one at
        // 10 is returned and the one at 0 is dropped
        assert_eq!(q.take_ready(ms(35), ms(20)), Some('b'));
        assert_eq!(q.len(), 2);
        assert_eq!(q.take_ready(ms(55), ms(20)), Some('d'));
        assert!(q.is_empty());
    }

    #[test]
    fn test_zero_delay_releases_immediately() {
        let mut q = DelayedFrameQueue::new();
        q.push(ms(5), 7);
        assert_eq!(q.take_ready(ms(5), ms(0)), Some(7));
    }
}
