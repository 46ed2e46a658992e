//! Keyed map over the hash trie, optionally insertion-ordered.
//!
//! The plain form iterates in hash order; the ordered form pairs the trie
//! with an [`OrderIndex`] kept in sync on every bind and removal, so
//! iteration matches the sequence of surviving inserts.

use std::fmt;

use crate::hamt::{Hamt, HamtIter, KeyHash, SetOutcome};
use crate::order::{OrderIndex, OrderedIter};
use crate::owner::OwnerTag;

#[derive(Clone)]
pub struct Map<K, V> {
    hamt: Hamt<K, V>,
    order: Option<OrderIndex<K, V>>,
}

impl<K: KeyHash, V: Clone + PartialEq> Map<K, V> {
    pub fn new() -> Map<K, V> {
        Map {
            hamt: Hamt::new(),
            order: None,
        }
    }

    pub fn new_ordered() -> Map<K, V> {
        Map {
            hamt: Hamt::new(),
            order: Some(OrderIndex::new()),
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hamt.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hamt.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.hamt.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.hamt.contains(key)
    }

    /// Bind `key` to `value`; returns whether the key is new. Binding an
    /// equal value over an existing key changes nothing, keeping the map's
    /// identity.
    pub fn insert(&mut self, owner: OwnerTag, key: K, value: V) -> bool {
        matches!(
            self.insert_tracking(owner, key, value),
            SetOutcome::Added
        )
    }

    /// Like [`Map::insert`], but reports whether anything changed at all,
    /// which the draft layer uses to keep no-op writes identity-preserving.
    pub(crate) fn insert_tracking(&mut self, owner: OwnerTag, key: K, value: V) -> SetOutcome {
        match &mut self.order {
            None => self.hamt.insert_outcome(owner, key, value),
            Some(_) => {
                let outcome = self
                    .hamt
                    .insert_outcome(owner, key.clone(), value.clone());
                let order = self.order.as_mut().expect("ordered map");
                match outcome {
                    SetOutcome::Added => order.append(owner, key, value),
                    SetOutcome::Replaced => order.update(owner, &key, value),
                    SetOutcome::Unchanged => {}
                }
                outcome
            }
        }
    }

    pub fn remove(&mut self, owner: OwnerTag, key: &K) -> Option<V> {
        let value = self.hamt.remove(owner, key)?;
        if let Some(order) = &mut self.order {
            order.remove(owner, key);
        }
        Some(value)
    }

    /// Insertion order when the map is ordered, hash order otherwise.
    pub fn iter(&self) -> MapIter<'_, K, V> {
        match &self.order {
            Some(order) => MapIter::Ordered(order.iter()),
            None => MapIter::Hashed(self.hamt.iter()),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.hamt.ptr_eq(&other.hamt)
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.hamt.check_invariants();
        if let Some(order) = &self.order {
            order.check_invariants();
            assert_eq!(order.len(), self.hamt.len());
        }
    }
}

impl<K: KeyHash, V: Clone + PartialEq> Default for Map<K, V> {
    fn default() -> Self {
        Map::new()
    }
}

impl<K: KeyHash + fmt::Debug, V: Clone + PartialEq + fmt::Debug> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: KeyHash, V: Clone + PartialEq> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(OwnerTag::NONE, k, v);
        }
        map
    }
}

impl<K: KeyHash, V: Clone + PartialEq> Extend<(K, V)> for Map<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(OwnerTag::NONE, k, v);
        }
    }
}

pub enum MapIter<'a, K: Clone, V: Clone> {
    Hashed(HamtIter<'a, K, V>),
    Ordered(OrderedIter<'a, K, V>),
}

impl<'a, K: Clone, V: Clone> Iterator for MapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        match self {
            MapIter::Hashed(iter) => iter.next(),
            MapIter::Ordered(iter) => iter.next(),
        }
    }
}
