use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::owner::OwnerTag;

pub(crate) const BITS: u32 = 5;
pub(crate) const WIDTH: usize = 32;
pub(crate) const MASK: usize = WIDTH - 1;

/// Fixed 32-slot buffer backing leaves, children arrays and size tables.
pub(crate) type Chunk<T> = ArrayVec<T, WIDTH>;

/// A trie node. `shift` is carried by the caller: a branch at shift `s`
/// selects its slot from index bits `[s, s + BITS)`; leaves sit at shift 0.
/// A branch carries a cumulative size table iff it is relaxed, i.e. its
/// children may be smaller than the regular subtree span.
#[derive(Debug, Clone)]
pub(crate) enum Node<T> {
    Leaf {
        owner: OwnerTag,
        elems: Chunk<T>,
    },
    Branch {
        owner: OwnerTag,
        children: Chunk<Arc<Node<T>>>,
        sizes: Option<Chunk<usize>>,
    },
}

impl<T: Clone> Node<T> {
    pub(crate) fn empty_leaf() -> Node<T> {
        Node::Leaf {
            owner: OwnerTag::NONE,
            elems: Chunk::new(),
        }
    }

    pub(crate) fn leaf_of(owner: OwnerTag, elems: Chunk<T>) -> Node<T> {
        Node::Leaf { owner, elems }
    }

    pub(crate) fn owner(&self) -> OwnerTag {
        match self {
            Node::Leaf { owner, .. } | Node::Branch { owner, .. } => *owner,
        }
    }

    pub(crate) fn set_owner(&mut self, tag: OwnerTag) {
        match self {
            Node::Leaf { owner, .. } | Node::Branch { owner, .. } => *owner = tag,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub(crate) fn elems(&self) -> &Chunk<T> {
        match self {
            Node::Leaf { elems, .. } => elems,
            Node::Branch { .. } => unreachable!("elems on a branch"),
        }
    }

    pub(crate) fn elems_mut(&mut self) -> &mut Chunk<T> {
        match self {
            Node::Leaf { elems, .. } => elems,
            Node::Branch { .. } => unreachable!("elems_mut on a branch"),
        }
    }

    pub(crate) fn children(&self) -> &Chunk<Arc<Node<T>>> {
        match self {
            Node::Branch { children, .. } => children,
            Node::Leaf { .. } => unreachable!("children on a leaf"),
        }
    }

    /// Direct slot count: elements for a leaf, children for a branch.
    pub(crate) fn slot_count(&self) -> usize {
        match self {
            Node::Leaf { elems, .. } => elems.len(),
            Node::Branch { children, .. } => children.len(),
        }
    }

    /// Total element count of the subtree rooted here, `shift` being this
    /// node's level.
    pub(crate) fn tree_size(&self, shift: u32) -> usize {
        match self {
            Node::Leaf { elems, .. } => elems.len(),
            Node::Branch {
                sizes: Some(sizes), ..
            } => sizes.last().copied().unwrap_or(0),
            Node::Branch { children, .. } => {
                let n = children.len();
                if n == 0 {
                    return 0;
                }
                ((n - 1) << shift) + children[n - 1].tree_size(shift - BITS)
            }
        }
    }

    /// Select the child slot for `idx` at this branch's `shift` and the
    /// index to carry into that child. Regular branches use pure radix
    /// selection; relaxed branches reduce the index to the subtree span and
    /// scan the size table forward from the radix guess.
    pub(crate) fn select(&self, shift: u32, idx: usize) -> (usize, usize) {
        match self {
            Node::Branch { sizes: None, .. } => (((idx >> shift) & MASK), idx),
            Node::Branch {
                sizes: Some(sizes), ..
            } => {
                let span_mask = (1usize << (shift + BITS)) - 1;
                let ri = idx & span_mask;
                let mut slot = (ri >> shift) & MASK;
                while sizes[slot] <= ri {
                    slot += 1;
                }
                let sub = if slot == 0 { ri } else { ri - sizes[slot - 1] };
                (slot, sub)
            }
            Node::Leaf { .. } => unreachable!("select on a leaf"),
        }
    }
}

/// Copy `slice` into a fresh chunk.
pub(crate) fn chunk_from<T: Clone>(slice: &[T]) -> Chunk<T> {
    debug_assert!(slice.len() <= WIDTH);
    let mut chunk = Chunk::new();
    chunk.extend(slice.iter().cloned());
    chunk
}

/// Mutable access to the node behind `link`, reusing the allocation when it
/// is owned by `owner` and copying otherwise. The result carries `owner`.
/// Correctness never depends on the tag: a stray extra reference to an
/// owned node only costs `Arc::make_mut` a copy.
pub(crate) fn edit<T: Clone>(link: &mut Arc<Node<T>>, owner: OwnerTag) -> &mut Node<T> {
    if owner.is_none() || link.owner() != owner {
        let mut copy = (**link).clone();
        copy.set_owner(owner);
        *link = Arc::new(copy);
    }
    Arc::make_mut(link)
}

/// Build a branch over `children` (all at `child_shift`), attaching a size
/// table iff radix selection alone would misplace an index.
pub(crate) fn make_branch<T: Clone>(
    owner: OwnerTag,
    children: Chunk<Arc<Node<T>>>,
    child_shift: u32,
) -> Node<T> {
    let full = 1usize << (child_shift + BITS);
    let n = children.len();
    let mut sizes = Chunk::new();
    let mut total = 0usize;
    let mut regular = true;
    for (i, child) in children.iter().enumerate() {
        let size = child.tree_size(child_shift);
        total += size;
        if i + 1 < n && size != full {
            regular = false;
        }
        sizes.push(total);
    }
    Node::Branch {
        owner,
        children,
        sizes: if regular { None } else { Some(sizes) },
    }
}

/// Wrap `node` in single-child branches until it sits at `target_shift`.
pub(crate) fn new_path<T: Clone>(
    owner: OwnerTag,
    mut node: Arc<Node<T>>,
    mut shift: u32,
    target_shift: u32,
) -> Arc<Node<T>> {
    while shift < target_shift {
        let mut children = Chunk::new();
        children.push(node);
        node = Arc::new(make_branch(owner, children, shift));
        shift += BITS;
    }
    node
}

/// Whether another leaf can be attached under `node` without growing a
/// level above it.
pub(crate) fn has_room<T: Clone>(node: &Node<T>, shift: u32) -> bool {
    match node {
        Node::Leaf { .. } => false,
        Node::Branch { children, .. } => {
            if children.len() < WIDTH {
                true
            } else if shift == BITS {
                false
            } else {
                has_room(&children[WIDTH - 1], shift - BITS)
            }
        }
    }
}

/// Attach `leaf` as the new rightmost leaf below `link` (a branch at
/// `shift`). The caller has checked `has_room`.
pub(crate) fn push_leaf<T: Clone>(
    link: &mut Arc<Node<T>>,
    shift: u32,
    leaf: Arc<Node<T>>,
    owner: OwnerTag,
) {
    let leaf_len = leaf.tree_size(0);
    let node = edit(link, owner);
    let child_shift = shift - BITS;
    let Node::Branch {
        children, sizes, ..
    } = node
    else {
        unreachable!("push_leaf into a leaf")
    };

    let descend = shift > BITS
        && children
            .last()
            .map_or(false, |c| has_room(c, child_shift));
    if descend {
        push_leaf(children.last_mut().unwrap(), child_shift, leaf, owner);
        if let Some(sizes) = sizes {
            *sizes.last_mut().unwrap() += leaf_len;
        }
        return;
    }

    // Appending a fresh child slot. A regular node whose rightmost subtree
    // is truncated must materialize its size table first, since that
    // subtree is about to stop being the last one.
    let full = 1usize << shift;
    if sizes.is_none()
        && children
            .last()
            .map_or(false, |c| c.tree_size(child_shift) != full)
    {
        let mut table = Chunk::new();
        let mut acc = 0usize;
        for child in children.iter() {
            acc += child.tree_size(child_shift);
            table.push(acc);
        }
        *sizes = Some(table);
    }

    let new_child = if shift == BITS {
        leaf
    } else {
        new_path(owner, leaf, 0, child_shift)
    };
    children.push(new_child);
    if let Some(sizes) = sizes {
        let prev = if sizes.is_empty() {
            0
        } else {
            sizes[sizes.len() - 1]
        };
        sizes.push(prev + leaf_len);
    }
}

/// Detach the rightmost leaf below `link` (a branch at `shift`). Returns
/// the leaf and whether `link` was left without children.
pub(crate) fn pop_leaf<T: Clone>(
    link: &mut Arc<Node<T>>,
    shift: u32,
    owner: OwnerTag,
) -> (Arc<Node<T>>, bool) {
    let node = edit(link, owner);
    let Node::Branch {
        children, sizes, ..
    } = node
    else {
        unreachable!("pop_leaf on a leaf")
    };

    if shift == BITS {
        let leaf = children.pop().expect("pop_leaf on an empty branch");
        if let Some(sizes) = sizes {
            sizes.pop();
        }
        return (leaf, children.is_empty());
    }

    let (leaf, child_empty) = pop_leaf(children.last_mut().unwrap(), shift - BITS, owner);
    if child_empty {
        children.pop();
        if let Some(sizes) = sizes {
            sizes.pop();
        }
    } else if let Some(sizes) = sizes {
        *sizes.last_mut().unwrap() -= leaf.tree_size(0);
    }
    (leaf, children.is_empty())
}

/// Replace the element at `idx` below `link`, copying the path unless nodes
/// already carry `owner`.
pub(crate) fn assoc_in<T: Clone>(
    link: &mut Arc<Node<T>>,
    shift: u32,
    idx: usize,
    value: T,
    owner: OwnerTag,
) {
    let node = edit(link, owner);
    if let Node::Leaf { elems, .. } = node {
        elems[idx & MASK] = value;
        return;
    }
    let (slot, sub) = node.select(shift, idx);
    let Node::Branch { children, .. } = node else {
        unreachable!()
    };
    assoc_in(&mut children[slot], shift - BITS, sub, value, owner);
}

/// Borrow the element at `idx` below `node`.
pub(crate) fn get_in<T: Clone>(mut node: &Node<T>, mut shift: u32, mut idx: usize) -> &T {
    loop {
        if let Node::Leaf { elems, .. } = node {
            return &elems[idx & MASK];
        }
        let (slot, sub) = node.select(shift, idx);
        let Node::Branch { children, .. } = node else {
            unreachable!()
        };
        node = &children[slot];
        idx = sub;
        shift -= BITS;
    }
}

/// The leaf containing `idx` plus the index of its first element, for the
/// draft read cache.
pub(crate) fn leaf_at<T: Clone>(
    root: &Arc<Node<T>>,
    shift: u32,
    idx: usize,
) -> (usize, Arc<Node<T>>) {
    let orig = idx;
    let mut node = root;
    let mut shift = shift;
    let mut idx = idx;
    loop {
        if node.is_leaf() {
            let within = idx & MASK;
            return (orig - within, node.clone());
        }
        let (slot, sub) = node.select(shift, idx);
        let Node::Branch { children, .. } = &**node else {
            unreachable!()
        };
        node = &children[slot];
        idx = sub;
        shift -= BITS;
    }
}

/// Drop single-child branch wrappers above leaf level.
pub(crate) fn collapse<T: Clone>(root: &mut Arc<Node<T>>, shift: &mut u32) {
    let from = *shift;
    loop {
        let next = match &**root {
            Node::Branch { children, .. } if children.len() == 1 => children[0].clone(),
            _ => break,
        };
        *root = next;
        *shift -= BITS;
    }
    if *shift < from {
        log::debug!("vector root collapsed from shift {} to {}", from, *shift);
    }
}
