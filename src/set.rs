//! Unique set: a map with a unit value.

use std::fmt;

use crate::hamt::KeyHash;
use crate::map::{Map, MapIter};
use crate::owner::OwnerTag;

#[derive(Clone)]
pub struct Set<K> {
    map: Map<K, ()>,
}

impl<K: KeyHash> Set<K> {
    pub fn new() -> Set<K> {
        Set { map: Map::new() }
    }

    pub fn new_ordered() -> Set<K> {
        Set {
            map: Map::new_ordered(),
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.map.is_ordered()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains(key)
    }

    /// Add `key`; returns whether it was new. Re-adding changes nothing.
    pub fn add(&mut self, owner: OwnerTag, key: K) -> bool {
        self.map.insert(owner, key, ())
    }

    pub fn remove(&mut self, owner: OwnerTag, key: &K) -> bool {
        self.map.remove(owner, key).is_some()
    }

    pub fn iter(&self) -> SetIter<'_, K> {
        SetIter {
            inner: self.map.iter(),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.map.ptr_eq(&other.map)
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.map.check_invariants();
    }
}

impl<K: KeyHash> Default for Set<K> {
    fn default() -> Self {
        Set::new()
    }
}

impl<K: KeyHash + fmt::Debug> fmt::Debug for Set<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: KeyHash> FromIterator<K> for Set<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Set::new();
        for k in iter {
            set.add(OwnerTag::NONE, k);
        }
        set
    }
}

pub struct SetIter<'a, K: Clone> {
    inner: MapIter<'a, K, ()>,
}

impl<'a, K: Clone> Iterator for SetIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }
}
