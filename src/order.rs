//! Insertion-order index layered over the hash trie.
//!
//! Maps and sets that promise insertion-order iteration pair their HAMT
//! with this sidecar: a key→slot trie, a slot→key vector with `Hole`
//! markers for deletions, and a parallel slot→value vector so ordered entry
//! iteration needs no re-lookup. Holes accumulate until they make up
//! [`ORDER_COMPACT_RATIO`] of the slots, then one O(n) rebuild reclaims
//! them.

use crate::hamt::{Hamt, KeyHash};
use crate::owner::OwnerTag;
use crate::vector::{Iter as VectorIter, Vector};

/// Compact once `holes / next` reaches this ratio.
pub const ORDER_COMPACT_RATIO: f64 = 0.5;

#[derive(Debug, Clone)]
pub(crate) enum Slot<K> {
    Live(K),
    Hole,
}

#[derive(Clone)]
pub struct OrderIndex<K, V> {
    next: u32,
    holes: u32,
    key_to_idx: Hamt<K, u32>,
    idx_to_key: Vector<Slot<K>>,
    idx_to_val: Vector<V>,
}

impl<K: KeyHash, V: Clone> OrderIndex<K, V> {
    pub fn new() -> OrderIndex<K, V> {
        OrderIndex {
            next: 0,
            holes: 0,
            key_to_idx: Hamt::new(),
            idx_to_key: Vector::new(),
            idx_to_val: Vector::new(),
        }
    }

    pub fn len(&self) -> usize {
        (self.next - self.holes) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a key the caller knows to be absent.
    pub fn append(&mut self, owner: OwnerTag, key: K, value: V) {
        debug_assert!(!self.key_to_idx.contains(&key), "append of a live key");
        let idx = self.next;
        self.key_to_idx.insert(owner, key.clone(), idx);
        self.idx_to_key.push_mut(owner, Slot::Live(key));
        self.idx_to_val.push_mut(owner, value);
        self.next += 1;
    }

    /// Refresh the stored value of a live key; its slot is unchanged.
    pub fn update(&mut self, owner: OwnerTag, key: &K, value: V) {
        if let Some(&idx) = self.key_to_idx.get(key) {
            self.idx_to_val
                .assoc_mut(owner, idx as usize, value)
                .expect("slot within the index");
        }
    }

    /// Punch a hole at the key's slot. The stale value stays parked in the
    /// value vector until compaction.
    pub fn remove(&mut self, owner: OwnerTag, key: &K) -> bool {
        let Some(idx) = self.key_to_idx.remove(owner, key) else {
            return false;
        };
        self.idx_to_key
            .assoc_mut(owner, idx as usize, Slot::Hole)
            .expect("slot within the index");
        self.holes += 1;
        if self.next > 0 && self.holes as f64 / self.next as f64 >= ORDER_COMPACT_RATIO {
            self.compact(owner);
        }
        true
    }

    /// Entries in insertion order, skipping holes.
    pub fn iter(&self) -> OrderedIter<'_, K, V> {
        OrderedIter {
            keys: self.idx_to_key.iter(),
            vals: self.idx_to_val.iter(),
        }
    }

    pub fn compact(&mut self, owner: OwnerTag) {
        log::debug!(
            "compacting order index: {} holes over {} slots",
            self.holes,
            self.next
        );
        let mut key_to_idx = Hamt::new();
        let mut idx_to_key = Vector::new();
        let mut idx_to_val = Vector::new();
        let mut idx = 0u32;
        for (key, value) in self.iter() {
            key_to_idx.insert(owner, key.clone(), idx);
            idx_to_key.push_mut(owner, Slot::Live(key.clone()));
            idx_to_val.push_mut(owner, value.clone());
            idx += 1;
        }
        self.key_to_idx = key_to_idx;
        self.idx_to_key = idx_to_key;
        self.idx_to_val = idx_to_val;
        self.next = idx;
        self.holes = 0;
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert_eq!(self.idx_to_key.len(), self.next as usize);
        assert_eq!(self.idx_to_val.len(), self.next as usize);
        assert_eq!(self.key_to_idx.len(), self.len());
        let mut holes = 0;
        for (i, slot) in self.idx_to_key.iter().enumerate() {
            match slot {
                Slot::Live(key) => {
                    assert_eq!(self.key_to_idx.get(key), Some(&(i as u32)));
                }
                Slot::Hole => holes += 1,
            }
        }
        assert_eq!(holes, self.holes);
    }
}

impl<K: KeyHash, V: Clone> Default for OrderIndex<K, V> {
    fn default() -> Self {
        OrderIndex::new()
    }
}

pub struct OrderedIter<'a, K: Clone, V: Clone> {
    keys: VectorIter<'a, Slot<K>>,
    vals: VectorIter<'a, V>,
}

impl<'a, K: Clone, V: Clone> Iterator for OrderedIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        loop {
            match (self.keys.next(), self.vals.next()) {
                (Some(Slot::Live(key)), Some(value)) => return Some((key, value)),
                (Some(Slot::Hole), Some(_)) => continue,
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: OwnerTag = OwnerTag::NONE;

    fn keys_of(ord: &OrderIndex<String, i64>) -> Vec<String> {
        ord.iter().map(|(k, _)| k.clone()).collect()
    }

    #[test]
    fn keeps_insertion_order_across_deletes() {
        let mut ord: OrderIndex<String, i64> = OrderIndex::new();
        for (i, name) in ["c", "a", "b"].iter().enumerate() {
            ord.append(NONE, name.to_string(), i as i64);
        }
        assert!(ord.remove(NONE, &"a".to_string()));
        assert_eq!(keys_of(&ord), vec!["c", "b"]);
        ord.append(NONE, "a".to_string(), 9);
        assert_eq!(keys_of(&ord), vec!["c", "b", "a"]);
        ord.check_invariants();
    }

    #[test]
    fn updates_do_not_move_slots() {
        let mut ord: OrderIndex<String, i64> = OrderIndex::new();
        ord.append(NONE, "x".to_string(), 1);
        ord.append(NONE, "y".to_string(), 2);
        ord.update(NONE, &"x".to_string(), 100);
        assert_eq!(
            ord.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            vec![100, 2]
        );
        ord.check_invariants();
    }

    #[test]
    fn compaction_reclaims_holes() {
        let mut ord: OrderIndex<String, i64> = OrderIndex::new();
        for i in 0..100 {
            ord.append(NONE, format!("k{}", i), i);
        }
        // Deleting every other key pushes the hole ratio past the trigger.
        for i in (0..100).step_by(2) {
            ord.remove(NONE, &format!("k{}", i));
        }
        ord.check_invariants();
        assert_eq!(ord.len(), 50);
        assert!(
            ord.holes == 0,
            "compaction should have run at the ratio trigger"
        );
        let survivors: Vec<String> = keys_of(&ord);
        let expect: Vec<String> = (0..100).filter(|i| i % 2 == 1).map(|i| format!("k{}", i)).collect();
        assert_eq!(survivors, expect);
    }

    #[test]
    fn removing_a_missing_key_is_a_no_op() {
        let mut ord: OrderIndex<String, i64> = OrderIndex::new();
        ord.append(NONE, "x".to_string(), 1);
        assert!(!ord.remove(NONE, &"y".to_string()));
        assert_eq!(ord.len(), 1);
    }
}
