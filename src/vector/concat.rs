//! Tree merging for `Vector::concat`.
//!
//! Nodes are combined level by level and redistributed so that a parent
//! holds between ⌈P/32⌉ and ⌈P/32⌉ + 2 children, P being the total
//! grandchild count (the E = 2 relaxation rule). The spine of the merge
//! comes out relaxed; untouched subtrees are shared.

use std::sync::Arc;

use itertools::chain;

use super::node::*;
use crate::owner::OwnerTag;

const EXTRAS: usize = 2;

/// One or two sibling nodes at `shift`, the unit the merge recursion
/// passes upward.
pub(crate) struct Merged<T> {
    pub nodes: Vec<Arc<Node<T>>>,
    pub shift: u32,
}

/// Merge two tail-flushed trees into a single root.
pub(crate) fn merge_trees<T: Clone>(
    owner: OwnerTag,
    left: &Arc<Node<T>>,
    lshift: u32,
    right: &Arc<Node<T>>,
    rshift: u32,
) -> (Arc<Node<T>>, u32) {
    let merged = concat_sub(owner, left, lshift, right, rshift);
    if merged.nodes.len() == 1 {
        let mut nodes = merged.nodes;
        (nodes.pop().unwrap(), merged.shift)
    } else {
        let mut children = Chunk::new();
        for node in merged.nodes {
            children.push(node);
        }
        let shift = merged.shift + BITS;
        (Arc::new(make_branch(owner, children, merged.shift)), shift)
    }
}

fn concat_sub<T: Clone>(
    owner: OwnerTag,
    l: &Arc<Node<T>>,
    ls: u32,
    r: &Arc<Node<T>>,
    rs: u32,
) -> Merged<T> {
    if ls > rs {
        let lc = l.children();
        let center = concat_sub(owner, lc.last().unwrap(), ls - BITS, r, rs);
        debug_assert_eq!(center.shift, ls - BITS);
        rebalance(owner, &lc[..lc.len() - 1], &center.nodes, &[], ls)
    } else if rs > ls {
        let rc = r.children();
        let center = concat_sub(owner, l, ls, &rc[0], rs - BITS);
        debug_assert_eq!(center.shift, rs - BITS);
        rebalance(owner, &[], &center.nodes, &rc[1..], rs)
    } else if ls == 0 {
        let ln = l.elems().len();
        let rn = r.elems().len();
        if ln + rn <= WIDTH {
            let mut elems = Chunk::new();
            elems.extend(l.elems().iter().cloned());
            elems.extend(r.elems().iter().cloned());
            Merged {
                nodes: vec![Arc::new(Node::leaf_of(owner, elems))],
                shift: 0,
            }
        } else {
            Merged {
                nodes: vec![l.clone(), r.clone()],
                shift: 0,
            }
        }
    } else {
        let lc = l.children();
        let rc = r.children();
        let center = concat_sub(owner, lc.last().unwrap(), ls - BITS, &rc[0], rs - BITS);
        rebalance(owner, &lc[..lc.len() - 1], &center.nodes, &rc[1..], ls)
    }
}

/// Combine three runs of nodes (all at `shift - BITS`) into one or two
/// parents at `shift`, redistributing per the concat plan.
fn rebalance<T: Clone>(
    owner: OwnerTag,
    left: &[Arc<Node<T>>],
    center: &[Arc<Node<T>>],
    right: &[Arc<Node<T>>],
    shift: u32,
) -> Merged<T> {
    let all: Vec<Arc<Node<T>>> = chain!(left, center, right).cloned().collect();
    let child_shift = shift - BITS;
    let counts: Vec<usize> = all.iter().map(|n| n.slot_count()).collect();
    let plan = create_plan(&counts);
    let packed = execute_plan(owner, &all, &counts, &plan, child_shift);

    if packed.len() <= WIDTH {
        let mut children = Chunk::new();
        for node in packed {
            children.push(node);
        }
        Merged {
            nodes: vec![Arc::new(make_branch(owner, children, child_shift))],
            shift,
        }
    } else {
        let (first, second) = packed.split_at(WIDTH);
        let mut a = Chunk::new();
        for node in first {
            a.push(node.clone());
        }
        let mut b = Chunk::new();
        for node in second {
            b.push(node.clone());
        }
        Merged {
            nodes: vec![
                Arc::new(make_branch(owner, a, child_shift)),
                Arc::new(make_branch(owner, b, child_shift)),
            ],
            shift,
        }
    }
}

/// The redistribution plan: target slot counts per surviving node. Follows
/// the classic concat-plan loop — skip nodes that are full enough, spill a
/// short node into its right neighbours, repeat until at most
/// ⌈total/32⌉ + EXTRAS nodes remain.
fn create_plan(counts: &[usize]) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    let optimal = total.div_ceil(WIDTH);
    let mut plan = counts.to_vec();
    let mut n = plan.len();
    let mut i = 0;
    while optimal + EXTRAS < n {
        while plan[i] > WIDTH - 1 {
            i += 1;
        }
        let mut remaining = plan[i];
        loop {
            debug_assert!(i + 1 < n, "concat plan ran out of spill room");
            let size = (remaining + plan[i + 1]).min(WIDTH);
            plan[i] = size;
            remaining = remaining + plan[i + 1] - size;
            i += 1;
            if remaining == 0 {
                break;
            }
        }
        for j in i..n - 1 {
            plan[j] = plan[j + 1];
        }
        n -= 1;
        i -= 1;
    }
    plan.truncate(n);
    plan
}

/// Rebuild nodes at `child_shift` according to `plan`, draining slots from
/// `all` in order. A node whose slot count already matches its plan entry
/// is reused as-is.
fn execute_plan<T: Clone>(
    owner: OwnerTag,
    all: &[Arc<Node<T>>],
    counts: &[usize],
    plan: &[usize],
    child_shift: u32,
) -> Vec<Arc<Node<T>>> {
    let mut out = Vec::with_capacity(plan.len());
    let mut src = 0usize;
    let mut offset = 0usize;
    for &want in plan {
        if offset == 0 && counts[src] == want {
            out.push(all[src].clone());
            src += 1;
            continue;
        }
        if child_shift == 0 {
            let mut elems = Chunk::new();
            while elems.len() < want {
                let leaf = all[src].elems();
                let take = (want - elems.len()).min(leaf.len() - offset);
                elems.extend(leaf[offset..offset + take].iter().cloned());
                offset += take;
                if offset == leaf.len() {
                    src += 1;
                    offset = 0;
                }
            }
            out.push(Arc::new(Node::leaf_of(owner, elems)));
        } else {
            let mut children = Chunk::new();
            while children.len() < want {
                let slots = all[src].children();
                let take = (want - children.len()).min(slots.len() - offset);
                children.extend(slots[offset..offset + take].iter().cloned());
                offset += take;
                if offset == slots.len() {
                    src += 1;
                    offset = 0;
                }
            }
            out.push(Arc::new(make_branch(owner, children, child_shift - BITS)));
        }
    }
    debug_assert!(src == all.len() && offset == 0);
    out
}
