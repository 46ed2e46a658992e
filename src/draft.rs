//! The transform protocol: a transparent draft over a base value.
//!
//! `transform` hands the recipe a [`Draft`] that can be read and mutated
//! like a plain container. Writes are recorded against a working structure
//! under a fresh owner token; reads of nested containers hand out child
//! drafts that record their own changes. On completion the draft walks its
//! children, writes the modified ones back, and settles the result through
//! the adaptive policy — or returns the base itself, by identity, when
//! nothing changed. An error from the recipe aborts the whole operation
//! with the base untouched.
//!
//! Dispatch is by kind test: reads on the wrong kind answer emptily, writes
//! on the wrong kind report [`Error::KindMismatch`]. Scalars and opaque
//! values pass through undrafted.

mod keyed;
mod list;
mod record;

use std::sync::Arc;

use crate::adaptive::Policy;
use crate::error::Error;
use crate::owner::{Owner, OwnerTag};
use crate::value::{Kind, Value};

use keyed::{MapDraft, SetDraft};
use list::ListDraft;
use record::RecordDraft;

/// Produce a new value by mutating a draft of `base`. The base is never
/// changed; untouched structure is shared with the result.
pub fn transform<F>(base: &Value, recipe: F) -> Result<Value, Error>
where
    F: FnOnce(&mut Draft) -> Result<(), Error>,
{
    transform_with(&Policy::default(), base, recipe)
}

pub fn transform_with<F>(policy: &Policy, base: &Value, recipe: F) -> Result<Value, Error>
where
    F: FnOnce(&mut Draft) -> Result<(), Error>,
{
    let owner = Owner::new();
    let mut draft = Draft::new(base.clone(), owner.tag(), *policy);
    recipe(&mut draft)?;
    let (value, _modified) = draft.finish();
    Ok(value)
}

pub struct Draft {
    owner: OwnerTag,
    policy: Policy,
    node: DraftNode,
}

enum DraftNode {
    Scalar(Value),
    List(ListDraft),
    Map(MapDraft),
    Set(SetDraft),
    Record(RecordDraft),
}

impl Draft {
    pub(crate) fn new(base: Value, owner: OwnerTag, policy: Policy) -> Draft {
        let node = match base {
            Value::List(handle) => DraftNode::List(ListDraft::new(handle)),
            Value::Map(handle) => DraftNode::Map(MapDraft::new(handle)),
            Value::Set(handle) => DraftNode::Set(SetDraft::new(handle)),
            Value::Record(handle) => DraftNode::Record(RecordDraft::new(handle)),
            other => DraftNode::Scalar(other),
        };
        Draft {
            owner,
            policy,
            node,
        }
    }

    pub fn kind(&self) -> Kind {
        match &self.node {
            DraftNode::Scalar(value) => value.kind(),
            DraftNode::List(_) => Kind::List,
            DraftNode::Map(_) => Kind::Map,
            DraftNode::Set(_) => Kind::Set,
            DraftNode::Record(_) => Kind::Record,
        }
    }

    pub fn len(&self) -> usize {
        match &self.node {
            DraftNode::Scalar(_) => 0,
            DraftNode::List(draft) => draft.len(),
            DraftNode::Map(draft) => draft.len(),
            DraftNode::Set(draft) => draft.len(),
            DraftNode::Record(draft) => draft.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_modified(&self) -> bool {
        match &self.node {
            DraftNode::Scalar(_) => false,
            DraftNode::List(draft) => draft.is_modified(),
            DraftNode::Map(draft) => draft.is_modified(),
            DraftNode::Set(draft) => draft.is_modified(),
            DraftNode::Record(draft) => draft.is_modified(),
        }
    }

    pub(crate) fn finish(self) -> (Value, bool) {
        match self.node {
            DraftNode::Scalar(value) => (value, false),
            DraftNode::List(draft) => draft.finish(self.owner, self.policy),
            DraftNode::Map(draft) => draft.finish(self.owner, self.policy),
            DraftNode::Set(draft) => draft.finish(self.owner, self.policy),
            DraftNode::Record(draft) => draft.finish(self.owner, self.policy),
        }
    }

    pub(crate) fn finish_value(self) -> Value {
        self.finish().0
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::KindMismatch {
            expected,
            found: self.kind().name(),
        }
    }

    // -- list surface -------------------------------------------------------

    /// Element at `index`; `None` past the end or on a non-list.
    pub fn at(&mut self, index: usize) -> Option<Value> {
        match &mut self.node {
            DraftNode::List(draft) => draft.get(index),
            _ => None,
        }
    }

    pub fn set_at(&mut self, index: usize, value: Value) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => draft.set(self.owner, index, value),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn push(&mut self, value: Value) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => {
                draft.push(self.owner, value);
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn pop(&mut self) -> Result<Option<Value>, Error> {
        match &mut self.node {
            DraftNode::List(draft) => Ok(draft.pop(self.owner)),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn splice(
        &mut self,
        start: usize,
        delete: usize,
        items: Vec<Value>,
    ) -> Result<Vec<Value>, Error> {
        match &mut self.node {
            DraftNode::List(draft) => Ok(draft.splice(self.owner, start, delete, items)),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn insert_at(&mut self, index: usize, value: Value) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => draft.insert(self.owner, index, value),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Value, Error> {
        match &mut self.node {
            DraftNode::List(draft) => draft.remove(self.owner, index),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn shift(&mut self) -> Result<Option<Value>, Error> {
        match &mut self.node {
            DraftNode::List(draft) => Ok(draft.shift(self.owner)),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn unshift(&mut self, items: Vec<Value>) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => {
                draft.unshift(self.owner, items);
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    /// Assign the list length: shrink by dropping the tail end, grow by
    /// padding with nulls. Negative lengths are [`Error::InvalidLength`].
    pub fn set_len(&mut self, len: i64) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => draft.set_len(self.owner, len),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn sort_by(
        &mut self,
        cmp: impl FnMut(&Value, &Value) -> std::cmp::Ordering,
    ) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => {
                draft.sort_by(self.owner, cmp);
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn reverse(&mut self) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => {
                draft.reverse(self.owner);
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn retain(&mut self, keep: impl FnMut(&Value) -> bool) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => {
                draft.retain(self.owner, keep);
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn fill(&mut self, value: Value, start: usize, end: usize) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => {
                draft.fill(self.owner, value, start, end);
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn copy_within(
        &mut self,
        dest: usize,
        src_start: usize,
        src_end: usize,
    ) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::List(draft) => {
                draft.copy_within(self.owner, dest, src_start, src_end);
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    /// Nested draft of the container element at `index`.
    pub fn child_at(&mut self, index: usize) -> Result<&mut Draft, Error> {
        let (owner, policy) = (self.owner, self.policy);
        if !matches!(self.node, DraftNode::List(_)) {
            return Err(self.mismatch("list"));
        }
        let DraftNode::List(draft) = &mut self.node else {
            unreachable!()
        };
        draft.child_at(owner, policy, index)
    }

    // -- record surface -----------------------------------------------------

    /// Field value; `None` when absent or on a non-record.
    pub fn get(&self, name: &str) -> Option<Value> {
        match &self.node {
            DraftNode::Record(draft) => draft.get(name),
            _ => None,
        }
    }

    pub fn has(&self, name: &str) -> bool {
        match &self.node {
            DraftNode::Record(draft) => draft.contains(name),
            _ => false,
        }
    }

    pub fn keys(&self) -> Vec<Arc<str>> {
        match &self.node {
            DraftNode::Record(draft) => draft.keys(),
            _ => Vec::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<Arc<str>>, value: Value) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::Record(draft) => {
                draft.set(self.owner, name.into(), value);
                Ok(())
            }
            _ => Err(self.mismatch("record")),
        }
    }

    pub fn delete(&mut self, name: &str) -> Result<bool, Error> {
        match &mut self.node {
            DraftNode::Record(draft) => Ok(draft.delete(self.owner, name)),
            _ => Err(self.mismatch("record")),
        }
    }

    pub fn merge<N: Into<Arc<str>>>(
        &mut self,
        fields: impl IntoIterator<Item = (N, Value)>,
    ) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::Record(draft) => {
                draft.merge(self.owner, fields.into_iter().map(|(k, v)| (k.into(), v)));
                Ok(())
            }
            _ => Err(self.mismatch("record")),
        }
    }

    /// Nested draft of the container field `name`.
    pub fn child(&mut self, name: &str) -> Result<&mut Draft, Error> {
        let (owner, policy) = (self.owner, self.policy);
        if !matches!(self.node, DraftNode::Record(_)) {
            return Err(self.mismatch("record"));
        }
        let DraftNode::Record(draft) = &mut self.node else {
            unreachable!()
        };
        draft.child(owner, policy, name)
    }

    // -- map surface --------------------------------------------------------

    pub fn get_key(&self, key: &Value) -> Option<Value> {
        match &self.node {
            DraftNode::Map(draft) => draft.get(key),
            _ => None,
        }
    }

    pub fn set_key(&mut self, key: Value, value: Value) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::Map(draft) => {
                draft.set(self.owner, key, value);
                Ok(())
            }
            _ => Err(self.mismatch("map")),
        }
    }

    pub fn delete_key(&mut self, key: &Value) -> Result<bool, Error> {
        match &mut self.node {
            DraftNode::Map(draft) => Ok(draft.delete(self.owner, key)),
            _ => Err(self.mismatch("map")),
        }
    }

    /// Nested draft of the container value under `key`.
    pub fn child_key(&mut self, key: &Value) -> Result<&mut Draft, Error> {
        let (owner, policy) = (self.owner, self.policy);
        if !matches!(self.node, DraftNode::Map(_)) {
            return Err(self.mismatch("map"));
        }
        let DraftNode::Map(draft) = &mut self.node else {
            unreachable!()
        };
        draft.child(owner, policy, key)
    }

    /// Empty a map or set.
    pub fn clear(&mut self) -> Result<(), Error> {
        match &mut self.node {
            DraftNode::Map(draft) => {
                draft.clear(self.owner);
                Ok(())
            }
            DraftNode::Set(draft) => {
                draft.clear(self.owner);
                Ok(())
            }
            _ => Err(self.mismatch("map or set")),
        }
    }

    // -- set surface --------------------------------------------------------

    /// Membership (set) or key presence (map).
    pub fn contains(&self, value: &Value) -> bool {
        match &self.node {
            DraftNode::Set(draft) => draft.contains(value),
            DraftNode::Map(draft) => draft.contains(value),
            _ => false,
        }
    }

    pub fn add(&mut self, value: Value) -> Result<bool, Error> {
        match &mut self.node {
            DraftNode::Set(draft) => Ok(draft.add(self.owner, value)),
            _ => Err(self.mismatch("set")),
        }
    }

    pub fn remove_value(&mut self, value: &Value) -> Result<bool, Error> {
        match &mut self.node {
            DraftNode::Set(draft) => Ok(draft.delete(self.owner, value)),
            _ => Err(self.mismatch("set")),
        }
    }
}
