//! Contains the [`RecencyBuffer`].

use std::{collections::HashMap, hash::Hash, num::NonZeroUsize};

/// An insertion-ordered cache with O(1) lookups.
///
/// Keys are kept in a ring ordered by their last touch; values live in a map. Adding a new key to
/// a full buffer evicts the least recently touched one. Re-adding a present key updates its
/// value and moves it to the head.
#[derive(Debug, Clone)]
pub struct RecencyBuffer<K, V> {
    ring: Vec<Option<K>>,
    /// Index of the most recently touched key.
    head: usize,
    map: HashMap<K, V>,
}

impl<K, V> RecencyBuffer<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates an empty [`RecencyBuffer`] with the given capacity.
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            ring: vec![None; capacity],
            head: capacity - 1,
            map: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the buffer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn next(&self, index: usize) -> usize {
        (index + 1) % self.ring.len()
    }

    /// Inserts or updates `key`, making it the most recent entry.
    pub fn add(&mut self, key: K, value: V) {
        if let Some(existing) = self.map.get_mut(&key) {
            *existing = value;
            self.move_to_head(&key);
            return;
        }

        self.head = self.next(self.head);
        if let Some(evicted) = self.ring[self.head].take() {
            self.map.remove(&evicted);
        }
        self.ring[self.head] = Some(key.clone());
        self.map.insert(key, value);
    }

    /// Rotates the keys between the slot of `key` and the head one step back, then stores `key`
    /// at the head.
    fn move_to_head(&mut self, key: &K) {
        let Some(mut index) = self.ring.iter().position(|slot| slot.as_ref() == Some(key)) else {
            return;
        };
        while index != self.head {
            let next = self.next(index);
            self.ring.swap(index, next);
            index = next;
        }
    }

    /// Returns the value stored for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns up to `count` values, most recently touched first.
    pub fn latest(&self, count: usize) -> Vec<&V> {
        let capacity = self.ring.len();
        let count = count.min(self.map.len());
        let mut values = Vec::with_capacity(count);
        let mut index = self.head;
        for _ in 0..capacity {
            if values.len() == count {
                break;
            }
            if let Some(value) = self.ring[index].as_ref().and_then(|key| self.map.get(key)) {
                values.push(value);
            }
            index = (index + capacity - 1) % capacity;
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, b256};

    fn buffer(capacity: usize) -> RecencyBuffer<u64, &'static str> {
        RecencyBuffer::new(NonZeroUsize::new(capacity).unwrap())
    }

    /// Checks that the ring and the map hold the same key set.
    fn assert_consistent<K: Hash + Eq + Clone + std::fmt::Debug, V>(buf: &RecencyBuffer<K, V>) {
        let ring_keys: Vec<_> = buf.ring.iter().flatten().collect();
        assert_eq!(ring_keys.len(), buf.map.len());
        for key in ring_keys {
            assert!(buf.map.contains_key(key), "{key:?} missing from the map");
        }
    }

    #[test]
    fn test_recency_move_to_front() {
        let mut buf = buffer(4);
        buf.add(1, "a");
        buf.add(2, "b");
        buf.add(1, "c");

        assert_eq!(buf.get(&1), Some(&"c"));
        assert_eq!(buf.latest(1), vec![&"c"]);
        assert_eq!(buf.latest(5), vec![&"c", &"b"]);
        assert_eq!(buf.len(), 2);
        assert_consistent(&buf);
    }

    #[test]
    fn test_recency_eviction() {
        let mut buf = buffer(3);
        for (key, value) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            buf.add(key, value);
        }

        assert_eq!(buf.len(), 3);
        assert!(!buf.contains(&1));
        assert_eq!(buf.latest(3), vec![&"d", &"c", &"b"]);
        assert_consistent(&buf);
    }

    #[test]
    fn test_recency_touch_protects_from_eviction() {
        let mut buf = buffer(3);
        buf.add(1, "a");
        buf.add(2, "b");
        buf.add(3, "c");
        // Touching the oldest key makes `2` the eviction candidate.
        buf.add(1, "a2");
        buf.add(4, "d");

        assert!(buf.contains(&1));
        assert!(!buf.contains(&2));
        assert_eq!(buf.latest(3), vec![&"d", &"a2", &"c"]);
        assert_consistent(&buf);
    }

    #[test]
    fn test_recency_update_head_in_place() {
        let mut buf = buffer(2);
        buf.add(7, "x");
        buf.add(7, "y");
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.latest(2), vec![&"y"]);
        assert_consistent(&buf);
    }

    #[test]
    fn test_recency_hash_keys() {
        let hash = b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
        let mut buf: RecencyBuffer<B256, u64> = RecencyBuffer::new(NonZeroUsize::new(2).unwrap());
        buf.add(hash, 1);
        buf.add(B256::ZERO, 2);
        buf.add(B256::repeat_byte(0x22), 3);

        assert!(buf.get(&hash).is_none());
        assert_eq!(buf.get(&B256::ZERO), Some(&2));
        assert_eq!(buf.latest(10), vec![&3, &2]);
    }

    #[test]
    fn test_recency_wraps_many_times() {
        let mut buf = buffer(5);
        for key in 0..103u64 {
            buf.add(key, "v");
        }
        assert_eq!(buf.len(), 5);
        for key in 98..103 {
            assert!(buf.contains(&key));
        }
        assert_consistent(&buf);
    }
}
