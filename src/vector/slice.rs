//! Subrange extraction for `Vector::slice`.
//!
//! The trie is cut along the left and right spines; nodes on a cut path are
//! copied with truncated leaves and recomputed size tables, everything else
//! is shared. Single-child wrappers left above the cut are collapsed by the
//! caller.
//!
//! Indices travel through regular nodes unmasked (radix selection ignores
//! the high bits), so every arm that consumes an index as a count must
//! reduce it to the local span first.

use std::sync::Arc;

use super::node::*;
use crate::owner::OwnerTag;

/// Keep the first `n` elements under `link` (1 ≤ n ≤ subtree size; `n` may
/// carry high bits from regular ancestors).
pub(crate) fn take_tree<T: Clone>(link: &mut Arc<Node<T>>, shift: u32, n: usize, owner: OwnerTag) {
    let node = edit(link, owner);
    if let Node::Leaf { elems, .. } = node {
        elems.truncate(((n - 1) & MASK) + 1);
        return;
    }
    let (slot, sub) = node.select(shift, n - 1);
    let span_mask = (1usize << (shift + BITS)) - 1;
    let kept = ((n - 1) & span_mask) + 1;
    let Node::Branch {
        children, sizes, ..
    } = node
    else {
        unreachable!()
    };
    children.truncate(slot + 1);
    if let Some(sizes) = sizes {
        sizes.truncate(slot + 1);
        sizes[slot] = kept;
    }
    take_tree(&mut children[slot], shift - BITS, sub + 1, owner);
}

/// Drop the first `n` elements under `link` (1 ≤ n < subtree size; `n` may
/// carry high bits from regular ancestors). The result is always relaxed:
/// a left cut breaks radix alignment.
pub(crate) fn drop_tree<T: Clone>(link: &mut Arc<Node<T>>, shift: u32, n: usize, owner: OwnerTag) {
    let node = edit(link, owner);
    if let Node::Leaf { elems, .. } = node {
        elems.drain(..(n & MASK));
        return;
    }
    let (slot, sub) = node.select(shift, n);
    let Node::Branch {
        children, sizes, ..
    } = node
    else {
        unreachable!()
    };
    children.drain(..slot);
    if sub > 0 {
        drop_tree(&mut children[0], shift - BITS, sub, owner);
    }
    let mut table = Chunk::new();
    let mut acc = 0usize;
    for child in children.iter() {
        acc += child.tree_size(shift - BITS);
        table.push(acc);
    }
    *sizes = Some(table);
}
