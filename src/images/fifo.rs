//! FIFO Tracker Module
//!
//! Tracks insertion order of image keys for capacity eviction.

use std::collections::VecDeque;

use crate::images::ImageKey;

// == FIFO Tracker ==
/// Orders keys by the time they were (re)cached.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest `cached_at`
/// - Back = Most recently cached
///
/// Reads do not reorder keys; only a fresh insert of the same key moves it to
/// the back.
#[derive(Debug, Default)]
pub struct FifoTracker {
    order: VecDeque<ImageKey>,
}

impl FifoTracker {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Push ==
    /// Records `key` as the newest cached key.
    pub fn push(&mut self, key: &ImageKey) {
        self.remove(key);
        self.order.push_back(key.clone());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &ImageKey) {
        self.order.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the oldest cached key.
    pub fn evict_oldest(&mut self) -> Option<ImageKey> {
        self.order.pop_front()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
