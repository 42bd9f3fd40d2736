//! Min-heap keyed by a numeric priority
//!
//! `get` always hands out the entry with the lowest priority. Entries with
//! equal priority come out in insertion order, which keeps work-position and
//! target selection deterministic across runs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry<T, P> {
    item: T,
    priority: P,
    seq: u64,
}

impl<T, P: Ord> PartialEq for Entry<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<T, P: Ord> Eq for Entry<T, P> {}

impl<T, P: Ord> Ord for Entry<T, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T, P: Ord> PartialOrd for Entry<T, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize, P: Serialize + Ord",
    deserialize = "T: Deserialize<'de>, P: Deserialize<'de> + Ord"
))]
pub struct PriorityQueue<T, P: Ord> {
    heap: BinaryHeap<Entry<T, P>>,
    next_seq: u64,
}

impl<T, P: Ord> Default for PriorityQueue<T, P> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<T, P: Ord> PriorityQueue<T, P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, item: T, priority: P) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            item,
            priority,
            seq,
        });
    }

    /// Remove and return the entry with the lowest priority
    pub fn get(&mut self) -> Option<T> {
        self.heap.pop().map(|e| e.item)
    }

    pub fn peek_priority(&self) -> Option<&P> {
        self.heap.peek().map(|e| &e.priority)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.next_seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_priority_first() {
        let mut pq = PriorityQueue::new();
        pq.put("far", 25);
        pq.put("near", 1);
        pq.put("middle", 9);

        assert_eq!(pq.get(), Some("near"));
        assert_eq!(pq.get(), Some("middle"));
        assert_eq!(pq.get(), Some("far"));
        assert_eq!(pq.get(), None);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut pq = PriorityQueue::new();
        for i in 0..5 {
            pq.put(i, 3);
        }
        let drained: Vec<_> = std::iter::from_fn(|| pq.get()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_clear_and_len() {
        let mut pq = PriorityQueue::new();
        pq.put('a', 2);
        pq.put('b', 1);
        assert_eq!(pq.len(), 2);
        assert_eq!(pq.peek_priority(), Some(&1));
        pq.clear();
        assert!(pq.is_empty());
    }

    #[test]
    fn test_serde_roundtrip_preserves_order() {
        let mut pq = PriorityQueue::new();
        pq.put(10u32, 5i64);
        pq.put(20u32, 1i64);
        pq.put(30u32, 5i64);

        let json = serde_json::to_string(&pq).unwrap();
        let mut restored: PriorityQueue<u32, i64> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.get(), Some(20));
        assert_eq!(restored.get(), Some(10));
        assert_eq!(restored.get(), Some(30));
    }
}
