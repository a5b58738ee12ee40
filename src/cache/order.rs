//! Recency Tracking Module
//!
//! Maintains the insertion/access order used for LRU eviction.

use std::collections::VecDeque;

// == Recency List ==
/// Tracks touch order for LRU eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Least recently used (eviction candidate)
/// - Back = Most recently used
#[derive(Debug)]
pub struct RecencyList<K> {
    /// Order of keys by touch time
    order: VecDeque<K>,
}

impl<K: Clone + Eq> RecencyList<K> {
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently used (moves to back).
    ///
    /// If the key is already tracked it is removed first; a new key is
    /// simply appended.
    pub fn touch(&mut self, key: &K) {
        self.remove(key);
        self.order.push_back(key.clone());
    }

    // == Remove ==
    /// Removes a key from the tracker; unknown keys are a no-op.
    pub fn remove(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    // == Oldest / Newest ==
    /// Returns and removes the least recently used key.
    pub fn pop_oldest(&mut self) -> Option<K> {
        self.order.pop_front()
    }

    /// Returns and removes the most recently used key.
    pub fn pop_newest(&mut self) -> Option<K> {
        self.order.pop_back()
    }

    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.front()
    }

    /// Iterates keys from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Removes all tracked keys.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    #[cfg(test)]
    pub fn contains(&self, key: &K) -> bool {
        self.order.iter().any(|k| k == key)
    }
}

impl<K: Clone + Eq> Default for RecencyList<K> {
    fn default() -> Self {
        Self::new()
    }
}
