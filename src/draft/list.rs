use std::collections::HashMap;
use std::sync::Arc;

use super::Draft;
use crate::adaptive::{settle_vector, Policy};
use crate::error::Error;
use crate::owner::OwnerTag;
use crate::value::{ListCore, ListHandle, Value};
use crate::vector::node::Node;
use crate::vector::Vector;

/// Draft over a list. The working vector is created lazily on the first
/// write; until then reads go straight to the base. A one-leaf read cache
/// accelerates sequential and clustered reads; any write invalidates it.
/// Child drafts are kept per index and written back on finalization, or
/// eagerly before any operation that moves indices around.
pub(crate) struct ListDraft {
    base: ListHandle,
    work: Option<Vector<Value>>,
    modified: bool,
    children: HashMap<usize, Draft>,
    cache: Option<(usize, Arc<Node<Value>>)>,
}

impl ListDraft {
    pub(crate) fn new(base: ListHandle) -> ListDraft {
        ListDraft {
            base,
            work: None,
            modified: false,
            children: HashMap::new(),
            cache: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.work {
            Some(work) => work.len(),
            None => self.base.len(),
        }
    }

    pub(crate) fn get(&mut self, index: usize) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        if let Some((start, leaf)) = &self.cache {
            let elems = leaf.elems();
            if index >= *start && index < *start + elems.len() {
                return Some(elems[index - *start].clone());
            }
        }
        match (&self.work, &*self.base.0) {
            (Some(work), _) => {
                let (start, leaf) = work.leaf_span(index).expect("index in range");
                let value = leaf.elems()[index - start].clone();
                self.cache = Some((start, leaf));
                Some(value)
            }
            (None, ListCore::Trie(vector)) => {
                let (start, leaf) = vector.leaf_span(index).expect("index in range");
                let value = leaf.elems()[index - start].clone();
                self.cache = Some((start, leaf));
                Some(value)
            }
            (None, ListCore::Native(items)) => items.get(index).cloned(),
        }
    }

    fn work(&mut self) -> &mut Vector<Value> {
        if self.work.is_none() {
            self.work = Some(self.base.to_vector());
        }
        self.work.as_mut().expect("working vector")
    }

    fn touch(&mut self) {
        self.cache = None;
        self.modified = true;
    }

    pub(crate) fn set(&mut self, owner: OwnerTag, index: usize, value: Value) -> Result<(), Error> {
        let len = self.len();
        if index > len {
            return Err(Error::out_of_range(index, len));
        }
        if index == len {
            self.push(owner, value);
            return Ok(());
        }
        self.children.remove(&index);
        self.touch();
        self.work()
            .assoc_mut(owner, index, value)
            .expect("index in range");
        Ok(())
    }

    pub(crate) fn push(&mut self, owner: OwnerTag, value: Value) {
        self.touch();
        self.work().push_mut(owner, value);
    }

    pub(crate) fn pop(&mut self, owner: OwnerTag) -> Option<Value> {
        if self.len() == 0 {
            return None;
        }
        self.flush_children(owner);
        self.touch();
        let work = self.work();
        let (next, value) = work.pop(owner);
        *work = next;
        value
    }

    /// Remove `delete` elements at `start`, inserting `items` in their
    /// place. Returns the removed values.
    pub(crate) fn splice(
        &mut self,
        owner: OwnerTag,
        start: usize,
        delete: usize,
        items: Vec<Value>,
    ) -> Vec<Value> {
        let len = self.len();
        let start = start.min(len);
        let delete = delete.min(len - start);
        self.flush_children(owner);
        self.touch();
        let work = self.work();
        let removed: Vec<Value> = (start..start + delete)
            .map(|i| work.get(i).expect("index in range").clone())
            .collect();
        let left = work.slice(owner, 0, start);
        let right = work.slice(owner, start + delete, len);
        let mid: Vector<Value> = items.into_iter().collect();
        *work = left.concat(owner, &mid).concat(owner, &right);
        removed
    }

    pub(crate) fn insert(
        &mut self,
        owner: OwnerTag,
        index: usize,
        value: Value,
    ) -> Result<(), Error> {
        let len = self.len();
        if index > len {
            return Err(Error::out_of_range(index, len));
        }
        self.splice(owner, index, 0, vec![value]);
        Ok(())
    }

    pub(crate) fn remove(&mut self, owner: OwnerTag, index: usize) -> Result<Value, Error> {
        let len = self.len();
        if index >= len {
            return Err(Error::out_of_range(index, len));
        }
        let mut removed = self.splice(owner, index, 1, Vec::new());
        Ok(removed.pop().expect("one element removed"))
    }

    pub(crate) fn shift(&mut self, owner: OwnerTag) -> Option<Value> {
        if self.len() == 0 {
            return None;
        }
        self.remove(owner, 0).ok()
    }

    pub(crate) fn unshift(&mut self, owner: OwnerTag, items: Vec<Value>) {
        self.splice(owner, 0, 0, items);
    }

    /// Shrink by popping or grow by padding with nulls. Negative lengths
    /// are rejected.
    pub(crate) fn set_len(&mut self, owner: OwnerTag, len: i64) -> Result<(), Error> {
        if len < 0 {
            return Err(Error::InvalidLength(len));
        }
        let target = len as usize;
        let current = self.len();
        if target == current {
            return Ok(());
        }
        self.flush_children(owner);
        self.touch();
        let work = self.work();
        if target < current {
            *work = work.slice(owner, 0, target);
        } else {
            for _ in current..target {
                work.push_mut(owner, Value::Null);
            }
        }
        Ok(())
    }

    pub(crate) fn sort_by(
        &mut self,
        owner: OwnerTag,
        mut cmp: impl FnMut(&Value, &Value) -> std::cmp::Ordering,
    ) {
        self.flush_children(owner);
        self.touch();
        let work = self.work();
        let mut items = work.to_vec();
        items.sort_by(&mut cmp);
        *work = items.into_iter().collect();
    }

    pub(crate) fn reverse(&mut self, owner: OwnerTag) {
        self.flush_children(owner);
        self.touch();
        let work = self.work();
        let items: Vec<Value> = work.iter_rev().cloned().collect();
        *work = items.into_iter().collect();
    }

    /// Keep only elements the predicate accepts.
    pub(crate) fn retain(
        &mut self,
        owner: OwnerTag,
        mut keep: impl FnMut(&Value) -> bool,
    ) {
        self.flush_children(owner);
        self.touch();
        let work = self.work();
        let items: Vec<Value> = work.iter().filter(|v| keep(v)).cloned().collect();
        *work = items.into_iter().collect();
    }

    pub(crate) fn fill(&mut self, owner: OwnerTag, value: Value, start: usize, end: usize) {
        let len = self.len();
        let end = end.min(len);
        let start = start.min(end);
        if start == end {
            return;
        }
        self.touch();
        for index in start..end {
            self.children.remove(&index);
            self.work()
                .assoc_mut(owner, index, value.clone())
                .expect("index in range");
        }
    }

    pub(crate) fn copy_within(
        &mut self,
        owner: OwnerTag,
        dest: usize,
        src_start: usize,
        src_end: usize,
    ) {
        let len = self.len();
        let src_end = src_end.min(len);
        let src_start = src_start.min(src_end);
        let count = (src_end - src_start).min(len - dest.min(len));
        if count == 0 {
            return;
        }
        self.flush_children(owner);
        self.touch();
        let work = self.work();
        let source: Vec<Value> = (src_start..src_start + count)
            .map(|i| work.get(i).expect("index in range").clone())
            .collect();
        for (offset, value) in source.into_iter().enumerate() {
            work.assoc_mut(owner, dest + offset, value)
                .expect("index in range");
        }
    }

    pub(crate) fn child_at(
        &mut self,
        owner: OwnerTag,
        policy: Policy,
        index: usize,
    ) -> Result<&mut Draft, Error> {
        let len = self.len();
        if index >= len {
            return Err(Error::out_of_range(index, len));
        }
        if !self.children.contains_key(&index) {
            let value = self.get(index).expect("index in range");
            if !value.is_container() {
                return Err(Error::KindMismatch {
                    expected: "container",
                    found: value.kind().name(),
                });
            }
            self.children
                .insert(index, Draft::new(value, owner, policy));
        }
        Ok(self.children.get_mut(&index).expect("just inserted"))
    }

    /// Write modified child drafts back into the working vector and drop
    /// them all; run before any operation that moves indices.
    fn flush_children(&mut self, owner: OwnerTag) {
        if self.children.is_empty() {
            return;
        }
        let children: Vec<(usize, Draft)> = self.children.drain().collect();
        for (index, child) in children {
            if child.is_modified() {
                let value = child.finish_value();
                self.modified = true;
                self.cache = None;
                self.work()
                    .assoc_mut(owner, index, value)
                    .expect("child index in range");
            }
        }
    }

    pub(crate) fn is_modified(&self) -> bool {
        self.modified || self.children.values().any(|child| child.is_modified())
    }

    pub(crate) fn finish(mut self, owner: OwnerTag, policy: Policy) -> (Value, bool) {
        self.flush_children(owner);
        if !self.modified {
            return (Value::List(self.base), false);
        }
        let work = match self.work {
            Some(work) => work,
            None => self.base.to_vector(),
        };
        (settle_vector(&policy, work), true)
    }
}
