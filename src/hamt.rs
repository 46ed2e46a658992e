//! Hash-array mapped trie keyed by a 32-bit hash.
//!
//! Inner nodes hold a 32-bit occupancy bitmap and a packed children array;
//! each level consumes five hash bits, bounding the depth at seven, with a
//! collision chain as terminal when two distinct keys share a full hash.
//! The element count lives on the root wrapper only.

mod iter;
pub(crate) mod node;

use std::fmt;
use std::sync::Arc;

pub use iter::HamtIter;

use crate::owner::OwnerTag;
use node::HamtNode;
pub(crate) use node::SetOutcome;

/// Hashing and equality for trie keys. Equality is SameValueZero-shaped:
/// reflexive even for values the host language would consider incomparable
/// (`NaN` equals itself, `+0` equals `-0`).
pub trait KeyHash: Clone {
    fn hash32(&self) -> u32;
    fn key_eq(&self, other: &Self) -> bool;
}

impl KeyHash for Arc<str> {
    fn hash32(&self) -> u32 {
        crate::hash::hash_str(self)
    }
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl KeyHash for String {
    fn hash32(&self) -> u32 {
        crate::hash::hash_str(self)
    }
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl KeyHash for i64 {
    fn hash32(&self) -> u32 {
        crate::hash::hash_i64(*self)
    }
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl KeyHash for u32 {
    fn hash32(&self) -> u32 {
        crate::hash::splitmix32(*self)
    }
    fn key_eq(&self, other: &Self) -> bool {
        self == other
    }
}

pub struct Hamt<K, V> {
    root: Option<Arc<HamtNode<K, V>>>,
    size: usize,
}

impl<K: KeyHash, V: Clone> Hamt<K, V> {
    pub fn new() -> Hamt<K, V> {
        Hamt {
            root: None,
            size: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let root = self.root.as_deref()?;
        node::get(root, key.hash32(), key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Bind `key` to `value`; returns whether the key is new. Binding an
    /// already-equal value leaves the trie untouched, so an unchanged map
    /// keeps its root pointer.
    pub fn insert(&mut self, owner: OwnerTag, key: K, value: V) -> bool
    where
        V: PartialEq,
    {
        matches!(self.insert_outcome(owner, key, value), SetOutcome::Added)
    }

    pub(crate) fn insert_outcome(&mut self, owner: OwnerTag, key: K, value: V) -> SetOutcome
    where
        V: PartialEq,
    {
        let hash = key.hash32();
        let Some(root) = self.root.as_mut() else {
            self.root = Some(Arc::new(HamtNode::Leaf { hash, key, value }));
            self.size = 1;
            return SetOutcome::Added;
        };
        let outcome = node::set(root, 0, hash, key, value, owner);
        if matches!(outcome, SetOutcome::Added) {
            self.size += 1;
        }
        outcome
    }

    pub fn remove(&mut self, owner: OwnerTag, key: &K) -> Option<V> {
        let root = self.root.as_ref()?;
        let (replacement, value) = node::remove(root, 0, key.hash32(), key, owner)?;
        self.root = replacement;
        self.size -= 1;
        Some(value)
    }

    /// Entries in unspecified (hash) order.
    pub fn iter(&self) -> HamtIter<'_, K, V> {
        HamtIter::new(self)
    }

    /// Same backing root, i.e. observably identical by construction.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        if let Some(root) = &self.root {
            root.check_invariants(0, 0);
        } else {
            assert_eq!(self.size, 0);
        }
    }
}

impl<K, V> Clone for Hamt<K, V> {
    fn clone(&self) -> Self {
        Hamt {
            root: self.root.clone(),
            size: self.size,
        }
    }
}

impl<K: KeyHash, V: Clone> Default for Hamt<K, V> {
    fn default() -> Self {
        Hamt::new()
    }
}

impl<K: KeyHash + fmt::Debug, V: Clone + fmt::Debug> fmt::Debug for Hamt<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: KeyHash, V: Clone + PartialEq> FromIterator<(K, V)> for Hamt<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut hamt = Hamt::new();
        for (k, v) in iter {
            hamt.insert(OwnerTag::NONE, k, v);
        }
        hamt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::Owner;
    use proptest::prelude::*;
    use std::collections::HashMap;

    const NONE: OwnerTag = OwnerTag::NONE;

    /// A key whose hash is pinned, for forcing collisions and deep chains.
    #[derive(Debug, Clone, PartialEq)]
    struct Pinned(u32, String);

    impl Pinned {
        fn new(hash: u32, name: &str) -> Pinned {
            Pinned(hash, name.to_string())
        }
    }

    impl KeyHash for Pinned {
        fn hash32(&self) -> u32 {
            self.0
        }
        fn key_eq(&self, other: &Self) -> bool {
            self.1 == other.1
        }
    }

    #[test]
    fn set_get_delete() {
        let mut map: Hamt<String, i64> = Hamt::new();
        assert!(map.insert(NONE, "one".to_string(), 1));
        assert!(map.insert(NONE, "two".to_string(), 2));
        assert!(!map.insert(NONE, "two".to_string(), 22));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"one".to_string()), Some(&1));
        assert_eq!(map.get(&"two".to_string()), Some(&22));
        assert_eq!(map.remove(NONE, &"one".to_string()), Some(1));
        assert_eq!(map.get(&"one".to_string()), None);
        assert_eq!(map.len(), 1);
        map.check_invariants();
    }

    #[test]
    fn rebinding_an_equal_value_keeps_the_root() {
        let mut map: Hamt<i64, i64> = (0..100).map(|i| (i, i * 10)).collect();
        let before = map.clone();
        map.insert(NONE, 42, 420);
        assert!(map.ptr_eq(&before));
        map.insert(NONE, 42, 421);
        assert!(!map.ptr_eq(&before));
    }

    #[test]
    fn colliding_keys_chain_and_unchain() {
        let mut map: Hamt<Pinned, i64> = Hamt::new();
        map.insert(NONE, Pinned::new(0, "a"), 1);
        map.insert(NONE, Pinned::new(0, "b"), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&Pinned::new(0, "a")), Some(&1));
        assert_eq!(map.get(&Pinned::new(0, "b")), Some(&2));
        assert_eq!(map.remove(NONE, &Pinned::new(0, "a")), Some(1));
        assert_eq!(map.get(&Pinned::new(0, "b")), Some(&2));
        map.check_invariants();
    }

    #[test]
    fn divergence_at_the_last_slice() {
        // Hashes that agree on bits 0..30 force the deepest inner chain.
        let mut map: Hamt<Pinned, i64> = Hamt::new();
        map.insert(NONE, Pinned::new(0x3fff_ffff, "x"), 1);
        map.insert(NONE, Pinned::new(0x7fff_ffff, "y"), 2);
        map.insert(NONE, Pinned::new(0xffff_ffff, "z"), 3);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&Pinned::new(0x3fff_ffff, "x")), Some(&1));
        assert_eq!(map.get(&Pinned::new(0x7fff_ffff, "y")), Some(&2));
        assert_eq!(map.get(&Pinned::new(0xffff_ffff, "z")), Some(&3));
        map.check_invariants();
        assert_eq!(map.remove(NONE, &Pinned::new(0x7fff_ffff, "y")), Some(2));
        assert_eq!(map.get(&Pinned::new(0xffff_ffff, "z")), Some(&3));
        map.check_invariants();
    }

    #[test]
    fn removal_compresses_paths() {
        let mut map: Hamt<i64, i64> = (0..1000).map(|i| (i, i)).collect();
        for i in 0..999 {
            assert_eq!(map.remove(NONE, &i), Some(i));
            map.check_invariants();
        }
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&999), Some(&999));
    }

    #[test]
    fn owned_inserts_reuse_inner_nodes() {
        let owner = Owner::new();
        let mut map: Hamt<i64, i64> = Hamt::new();
        for i in 0..100 {
            map.insert(owner.tag(), i, i);
        }
        let frozen = map.clone();
        // A fresh owner must not disturb the frozen copy.
        let other = Owner::new();
        let mut next = frozen.clone();
        for i in 0..100 {
            next.insert(other.tag(), i, i + 1);
        }
        for i in 0..100 {
            assert_eq!(frozen.get(&i), Some(&i));
            assert_eq!(next.get(&i), Some(&(i + 1)));
        }
    }

    proptest! {
        #[test]
        fn behaves_like_a_hash_map(ops in prop::collection::vec((any::<i64>(), any::<i64>(), any::<bool>()), 0..400)) {
            let mut map: Hamt<i64, i64> = Hamt::new();
            let mut oracle: HashMap<i64, i64> = HashMap::new();
            for (k, v, is_insert) in ops {
                if is_insert {
                    map.insert(NONE, k, v);
                    oracle.insert(k, v);
                } else {
                    prop_assert_eq!(map.remove(NONE, &k), oracle.remove(&k));
                }
                prop_assert_eq!(map.len(), oracle.len());
            }
            map.check_invariants();
            for (k, v) in &oracle {
                prop_assert_eq!(map.get(k), Some(v));
            }
            prop_assert_eq!(map.iter().count(), oracle.len());
        }

        #[test]
        fn collisions_under_a_constant_hash(names in prop::collection::hash_set("[a-z]{1,8}", 1..40)) {
            let names: Vec<String> = names.into_iter().collect();
            let mut map: Hamt<Pinned, usize> = Hamt::new();
            for (i, name) in names.iter().enumerate() {
                map.insert(NONE, Pinned::new(7, name), i);
            }
            prop_assert_eq!(map.len(), names.len());
            for (i, name) in names.iter().enumerate() {
                prop_assert_eq!(map.get(&Pinned::new(7, name)), Some(&i));
            }
            map.check_invariants();
        }
    }
}
