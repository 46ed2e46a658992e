use std::sync::Arc;

use super::Draft;
use crate::adaptive::{settle_native_record, settle_record_map, Policy};
use crate::error::Error;
use crate::hamt::SetOutcome;
use crate::map::Map;
use crate::owner::OwnerTag;
use crate::value::{RecordCore, RecordHandle, Value};

/// Deep draft over a record: `(base, copy?, children)`.
///
/// Reads are transparent; the first effective write materializes `copy` — a
/// shallow clone of a native base, or the shared persistent map of a
/// wrapped one — and flips `modified`. Finalization walks the child drafts
/// recursively: a child counts as modified if it or anything below it
/// changed, so read-only paths never force a copy and an untouched draft
/// hands the base back by identity.
pub(crate) struct RecordDraft {
    base: RecordHandle,
    copy: Option<RecordWork>,
    modified: bool,
    children: Vec<(Arc<str>, Draft)>,
}

pub(crate) enum RecordWork {
    Native(Vec<(Arc<str>, Value)>),
    Trie(Map<Arc<str>, Value>),
}

impl RecordWork {
    fn get(&self, name: &str) -> Option<&Value> {
        match self {
            RecordWork::Native(fields) => fields
                .iter()
                .find(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v),
            RecordWork::Trie(map) => {
                let key: Arc<str> = name.into();
                map.get(&key)
            }
        }
    }

    fn set(&mut self, owner: OwnerTag, name: Arc<str>, value: Value) -> bool {
        match self {
            RecordWork::Native(fields) => {
                match fields.iter_mut().find(|(k, _)| k.as_ref() == name.as_ref()) {
                    Some(slot) => {
                        if slot.1.same_value_zero(&value) {
                            false
                        } else {
                            slot.1 = value;
                            true
                        }
                    }
                    None => {
                        fields.push((name, value));
                        true
                    }
                }
            }
            RecordWork::Trie(map) => {
                !matches!(map.insert_tracking(owner, name, value), SetOutcome::Unchanged)
            }
        }
    }

    fn delete(&mut self, owner: OwnerTag, name: &str) -> bool {
        match self {
            RecordWork::Native(fields) => {
                let before = fields.len();
                fields.retain(|(k, _)| k.as_ref() != name);
                fields.len() != before
            }
            RecordWork::Trie(map) => {
                let key: Arc<str> = name.into();
                map.remove(owner, &key).is_some()
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            RecordWork::Native(fields) => fields.len(),
            RecordWork::Trie(map) => map.len(),
        }
    }
}

impl RecordDraft {
    pub(crate) fn new(base: RecordHandle) -> RecordDraft {
        RecordDraft {
            base,
            copy: None,
            modified: false,
            children: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.copy {
            Some(copy) => copy.len(),
            None => self.base.len(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        match &self.copy {
            Some(copy) => copy.get(name).cloned(),
            None => self.base.get(name).cloned(),
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        match &self.copy {
            Some(copy) => copy.get(name).is_some(),
            None => self.base.contains(name),
        }
    }

    pub(crate) fn keys(&self) -> Vec<Arc<str>> {
        match &self.copy {
            Some(RecordWork::Native(fields)) => fields.iter().map(|(k, _)| k.clone()).collect(),
            Some(RecordWork::Trie(map)) => map.keys().cloned().collect(),
            None => self.base.iter().map(|(k, _)| k.clone()).collect(),
        }
    }

    fn copy(&mut self) -> &mut RecordWork {
        if self.copy.is_none() {
            self.copy = Some(match &*self.base.0 {
                RecordCore::Native(fields) => RecordWork::Native(fields.clone()),
                RecordCore::Trie(map) => RecordWork::Trie(map.clone()),
            });
        }
        self.copy.as_mut().expect("working copy")
    }

    pub(crate) fn set(&mut self, owner: OwnerTag, name: Arc<str>, value: Value) {
        self.children.retain(|(k, _)| k.as_ref() != name.as_ref());
        if self.copy().set(owner, name, value) {
            self.modified = true;
        }
    }

    pub(crate) fn delete(&mut self, owner: OwnerTag, name: &str) -> bool {
        self.children.retain(|(k, _)| k.as_ref() != name);
        let removed = self.copy().delete(owner, name);
        if removed {
            self.modified = true;
        }
        removed
    }

    pub(crate) fn merge(
        &mut self,
        owner: OwnerTag,
        fields: impl IntoIterator<Item = (Arc<str>, Value)>,
    ) {
        for (name, value) in fields {
            self.set(owner, name, value);
        }
    }

    pub(crate) fn child(
        &mut self,
        owner: OwnerTag,
        policy: Policy,
        name: &str,
    ) -> Result<&mut Draft, Error> {
        if let Some(pos) = self
            .children
            .iter()
            .position(|(k, _)| k.as_ref() == name)
        {
            return Ok(&mut self.children[pos].1);
        }
        let Some(value) = self.get(name) else {
            return Err(Error::KindMismatch {
                expected: "container",
                found: "missing field",
            });
        };
        if !value.is_container() {
            return Err(Error::KindMismatch {
                expected: "container",
                found: value.kind().name(),
            });
        }
        self.children
            .push((name.into(), Draft::new(value, owner, policy)));
        Ok(&mut self.children.last_mut().expect("just pushed").1)
    }

    /// Modified directly or anywhere below; read-only access never counts.
    pub(crate) fn is_modified(&self) -> bool {
        self.modified || self.children.iter().any(|(_, child)| child.is_modified())
    }

    pub(crate) fn finish(mut self, owner: OwnerTag, policy: Policy) -> (Value, bool) {
        let children = std::mem::take(&mut self.children);
        for (name, child) in children {
            if child.is_modified() {
                let value = child.finish_value();
                self.modified = true;
                self.copy().set(owner, name, value);
            }
        }
        if !self.modified {
            return (Value::Record(self.base), false);
        }
        match self.copy.expect("modified record has a working copy") {
            RecordWork::Native(fields) => (settle_native_record(&policy, fields), true),
            RecordWork::Trie(map) => (settle_record_map(&policy, map), true),
        }
    }
}
