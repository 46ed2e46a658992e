use std::sync::Arc;

use super::KeyHash;
use crate::bitmap::{bit, packed_index, slice, MAX_SHIFT, SLICE_BITS};
use crate::owner::OwnerTag;

/// One of three node kinds: a single entry, a chain of entries sharing a
/// full 32-bit hash, or a bitmap-indexed branch whose children array is
/// packed (slot i lives at `popcount(bitmap & (bit(i) - 1))`).
#[derive(Debug, Clone)]
pub(crate) enum HamtNode<K, V> {
    Leaf {
        hash: u32,
        key: K,
        value: V,
    },
    Collision {
        hash: u32,
        entries: Vec<(K, V)>,
    },
    Inner {
        owner: OwnerTag,
        bitmap: u32,
        children: Vec<Arc<HamtNode<K, V>>>,
    },
}

pub(crate) enum SetOutcome {
    Added,
    Replaced,
    /// The key was already bound to an equal value; the tree (and therefore
    /// the map upstream) is untouched, preserving reference equality.
    Unchanged,
}

impl<K, V> HamtNode<K, V> {
    fn owner(&self) -> OwnerTag {
        match self {
            HamtNode::Inner { owner, .. } => *owner,
            _ => OwnerTag::NONE,
        }
    }

    fn is_inner(&self) -> bool {
        matches!(self, HamtNode::Inner { .. })
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self, shift: u32, prefix: u32) {
        match self {
            HamtNode::Leaf { hash, .. } => {
                let mask = (1u32 << shift.min(31)) - 1;
                assert_eq!(hash & mask, prefix & mask, "leaf under a wrong path");
            }
            HamtNode::Collision { entries, .. } => {
                assert!(entries.len() >= 2, "undersized collision chain");
            }
            HamtNode::Inner {
                bitmap, children, ..
            } => {
                assert_eq!(
                    bitmap.count_ones() as usize,
                    children.len(),
                    "bitmap inconsistent with children"
                );
                assert!(shift <= 30, "hash bits exhausted");
                let mut slots: Vec<u32> = (0..32).filter(|s| bitmap & bit(*s) != 0).collect();
                slots.sort_unstable();
                for (child, slot) in children.iter().zip(slots) {
                    child.check_invariants(shift + SLICE_BITS, prefix | (slot << shift));
                }
            }
        }
    }
}

pub(crate) fn get<'a, K: KeyHash, V>(
    mut node: &'a HamtNode<K, V>,
    hash: u32,
    key: &K,
) -> Option<&'a V> {
    let mut shift = 0;
    loop {
        match node {
            HamtNode::Leaf {
                hash: h,
                key: k,
                value,
            } => {
                return (*h == hash && k.key_eq(key)).then_some(value);
            }
            HamtNode::Collision { hash: h, entries } => {
                if *h != hash {
                    return None;
                }
                return entries.iter().find(|(k, _)| k.key_eq(key)).map(|(_, v)| v);
            }
            HamtNode::Inner {
                bitmap, children, ..
            } => {
                let b = bit(slice(hash, shift));
                if bitmap & b == 0 {
                    return None;
                }
                node = &children[packed_index(*bitmap, b)];
                shift += SLICE_BITS;
            }
        }
    }
}

/// Bind `key` to `value` below `link`, rewriting only the path that
/// changed. An insert that binds an already-equal value leaves the link
/// untouched all the way to the root.
pub(crate) fn set<K: KeyHash, V: Clone + PartialEq>(
    link: &mut Arc<HamtNode<K, V>>,
    shift: u32,
    hash: u32,
    key: K,
    value: V,
    owner: OwnerTag,
) -> SetOutcome {
    match &**link {
        HamtNode::Leaf {
            hash: h,
            key: k,
            value: old,
        } if *h == hash && k.key_eq(&key) => {
            if *old == value {
                return SetOutcome::Unchanged;
            }
            // The original key survives a rebind, as SameValueZero demands
            // nothing more than equality.
            let key = k.clone();
            *link = Arc::new(HamtNode::Leaf { hash, key, value });
            SetOutcome::Replaced
        }
        HamtNode::Leaf {
            hash: h,
            key: k,
            value: old,
        } if *h == hash => {
            let entries = vec![(k.clone(), old.clone()), (key, value)];
            *link = Arc::new(HamtNode::Collision { hash, entries });
            SetOutcome::Added
        }
        HamtNode::Leaf { hash: h, .. } => {
            let other_hash = *h;
            let existing = link.clone();
            let fresh = Arc::new(HamtNode::Leaf { hash, key, value });
            *link = merge_nodes(owner, existing, other_hash, fresh, hash, shift);
            SetOutcome::Added
        }
        HamtNode::Collision { hash: h, entries } if *h == hash => {
            if let Some(pos) = entries.iter().position(|(k, _)| k.key_eq(&key)) {
                if entries[pos].1 == value {
                    return SetOutcome::Unchanged;
                }
                let mut entries = entries.clone();
                entries[pos].1 = value;
                *link = Arc::new(HamtNode::Collision { hash, entries });
                SetOutcome::Replaced
            } else {
                let mut entries = entries.clone();
                entries.push((key, value));
                *link = Arc::new(HamtNode::Collision { hash, entries });
                SetOutcome::Added
            }
        }
        HamtNode::Collision { hash: h, .. } => {
            let other_hash = *h;
            let existing = link.clone();
            let fresh = Arc::new(HamtNode::Leaf { hash, key, value });
            *link = merge_nodes(owner, existing, other_hash, fresh, hash, shift);
            SetOutcome::Added
        }
        HamtNode::Inner {
            bitmap, children, ..
        } => {
            debug_assert!(shift <= MAX_SHIFT, "hash bits exhausted");
            let b = bit(slice(hash, shift));
            let idx = packed_index(*bitmap, b);
            if bitmap & b == 0 {
                let fresh = Arc::new(HamtNode::Leaf { hash, key, value });
                let (bitmap_mut, children_mut) = edit_inner(link, owner);
                *bitmap_mut |= b;
                children_mut.insert(idx, fresh);
                return SetOutcome::Added;
            }
            let mut child = children[idx].clone();
            let outcome = set(&mut child, shift + SLICE_BITS, hash, key, value, owner);
            if matches!(outcome, SetOutcome::Unchanged) {
                return outcome;
            }
            let (_, children_mut) = edit_inner(link, owner);
            children_mut[idx] = child;
            outcome
        }
    }
}

/// Remove `key` below `node`. `None` when absent; otherwise the extracted
/// value and the replacement node (`None` when the subtree vanished).
/// Single-entry collisions are promoted to leaves and an inner node left
/// with one non-inner child hands that child to its parent, keeping paths
/// minimal.
#[allow(clippy::type_complexity)]
pub(crate) fn remove<K: KeyHash, V: Clone>(
    node: &Arc<HamtNode<K, V>>,
    shift: u32,
    hash: u32,
    key: &K,
    owner: OwnerTag,
) -> Option<(Option<Arc<HamtNode<K, V>>>, V)> {
    match &**node {
        HamtNode::Leaf {
            hash: h,
            key: k,
            value,
        } => {
            if *h == hash && k.key_eq(key) {
                Some((None, value.clone()))
            } else {
                None
            }
        }
        HamtNode::Collision { hash: h, entries } => {
            if *h != hash {
                return None;
            }
            let pos = entries.iter().position(|(k, _)| k.key_eq(key))?;
            let mut rest = entries.clone();
            let (_, value) = rest.remove(pos);
            let replacement = if rest.len() == 1 {
                let (k, v) = rest.pop().expect("one entry left");
                Arc::new(HamtNode::Leaf {
                    hash: *h,
                    key: k,
                    value: v,
                })
            } else {
                Arc::new(HamtNode::Collision {
                    hash: *h,
                    entries: rest,
                })
            };
            Some((Some(replacement), value))
        }
        HamtNode::Inner {
            bitmap, children, ..
        } => {
            let b = bit(slice(hash, shift));
            if bitmap & b == 0 {
                return None;
            }
            let idx = packed_index(*bitmap, b);
            let (child_rep, value) = remove(&children[idx], shift + SLICE_BITS, hash, key, owner)?;
            match child_rep {
                Some(new_child) => {
                    if children.len() == 1 && !new_child.is_inner() {
                        return Some((Some(new_child), value));
                    }
                    let mut link = node.clone();
                    let (_, children_mut) = edit_inner(&mut link, owner);
                    children_mut[idx] = new_child;
                    Some((Some(link), value))
                }
                None => {
                    if children.len() == 1 {
                        return Some((None, value));
                    }
                    if children.len() == 2 {
                        let sibling = children[1 - idx].clone();
                        if !sibling.is_inner() {
                            return Some((Some(sibling), value));
                        }
                    }
                    let mut link = node.clone();
                    let (bitmap_mut, children_mut) = edit_inner(&mut link, owner);
                    *bitmap_mut &= !b;
                    children_mut.remove(idx);
                    Some((Some(link), value))
                }
            }
        }
    }
}

/// Build the inner-node chain above the first shift where the two hashes'
/// slices diverge, placing both nodes in their slots.
fn merge_nodes<K: Clone, V: Clone>(
    owner: OwnerTag,
    a: Arc<HamtNode<K, V>>,
    a_hash: u32,
    b: Arc<HamtNode<K, V>>,
    b_hash: u32,
    shift: u32,
) -> Arc<HamtNode<K, V>> {
    debug_assert_ne!(a_hash, b_hash);
    let a_slice = slice(a_hash, shift);
    let b_slice = slice(b_hash, shift);
    if a_slice == b_slice {
        let child = merge_nodes(owner, a, a_hash, b, b_hash, shift + SLICE_BITS);
        Arc::new(HamtNode::Inner {
            owner,
            bitmap: bit(a_slice),
            children: vec![child],
        })
    } else {
        let children = if a_slice < b_slice {
            vec![a, b]
        } else {
            vec![b, a]
        };
        Arc::new(HamtNode::Inner {
            owner,
            bitmap: bit(a_slice) | bit(b_slice),
            children,
        })
    }
}

fn edit_inner<K: Clone, V: Clone>(
    link: &mut Arc<HamtNode<K, V>>,
    owner: OwnerTag,
) -> (&mut u32, &mut Vec<Arc<HamtNode<K, V>>>) {
    if owner.is_none() || link.owner() != owner {
        let copy = match &**link {
            HamtNode::Inner {
                bitmap, children, ..
            } => HamtNode::Inner {
                owner,
                bitmap: *bitmap,
                children: children.clone(),
            },
            _ => unreachable!("edit_inner on a terminal node"),
        };
        *link = Arc::new(copy);
    }
    let HamtNode::Inner {
        bitmap, children, ..
    } = Arc::make_mut(link)
    else {
        unreachable!("edit_inner on a terminal node")
    };
    (bitmap, children)
}
