use super::Draft;
use crate::adaptive::{settle_map, settle_set, Policy};
use crate::error::Error;
use crate::hamt::SetOutcome;
use crate::map::Map;
use crate::owner::OwnerTag;
use crate::set::Set;
use crate::value::{MapHandle, SetHandle, Value};

/// Draft over a keyed map. The working persistent map is created lazily on
/// the first write and carries the base's order index when one is present.
/// Child drafts are kept per key and written back on finalization.
pub(crate) struct MapDraft {
    base: MapHandle,
    work: Option<Map<Value, Value>>,
    modified: bool,
    children: Vec<(Value, Draft)>,
}

impl MapDraft {
    pub(crate) fn new(base: MapHandle) -> MapDraft {
        MapDraft {
            base,
            work: None,
            modified: false,
            children: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.work {
            Some(work) => work.len(),
            None => self.base.len(),
        }
    }

    pub(crate) fn get(&self, key: &Value) -> Option<Value> {
        match &self.work {
            Some(work) => work.get(key).cloned(),
            None => self.base.get(key).cloned(),
        }
    }

    pub(crate) fn contains(&self, key: &Value) -> bool {
        match &self.work {
            Some(work) => work.contains(key),
            None => self.base.contains(key),
        }
    }

    fn work(&mut self) -> &mut Map<Value, Value> {
        if self.work.is_none() {
            self.work = Some(self.base.to_map());
        }
        self.work.as_mut().expect("working map")
    }

    pub(crate) fn set(&mut self, owner: OwnerTag, key: Value, value: Value) {
        self.children.retain(|(k, _)| !k.same_value_zero(&key));
        let outcome = self.work().insert_tracking(owner, key, value);
        if !matches!(outcome, SetOutcome::Unchanged) {
            self.modified = true;
        }
    }

    pub(crate) fn delete(&mut self, owner: OwnerTag, key: &Value) -> bool {
        self.children.retain(|(k, _)| !k.same_value_zero(key));
        let removed = self.work().remove(owner, key).is_some();
        if removed {
            self.modified = true;
        }
        removed
    }

    pub(crate) fn clear(&mut self, _owner: OwnerTag) {
        let ordered = self.base.is_ordered();
        self.children.clear();
        if self.len() > 0 {
            self.modified = true;
        }
        self.work = Some(if ordered { Map::new_ordered() } else { Map::new() });
    }

    pub(crate) fn child(
        &mut self,
        owner: OwnerTag,
        policy: Policy,
        key: &Value,
    ) -> Result<&mut Draft, Error> {
        if let Some(pos) = self.children.iter().position(|(k, _)| k.same_value_zero(key)) {
            return Ok(&mut self.children[pos].1);
        }
        let Some(value) = self.get(key) else {
            return Err(Error::KindMismatch {
                expected: "container",
                found: "missing key",
            });
        };
        if !value.is_container() {
            return Err(Error::KindMismatch {
                expected: "container",
                found: value.kind().name(),
            });
        }
        self.children
            .push((key.clone(), Draft::new(value, owner, policy)));
        Ok(&mut self.children.last_mut().expect("just pushed").1)
    }

    pub(crate) fn is_modified(&self) -> bool {
        self.modified || self.children.iter().any(|(_, child)| child.is_modified())
    }

    pub(crate) fn finish(mut self, owner: OwnerTag, policy: Policy) -> (Value, bool) {
        let children = std::mem::take(&mut self.children);
        for (key, child) in children {
            if child.is_modified() {
                let value = child.finish_value();
                self.modified = true;
                self.work().insert(owner, key, value);
            }
        }
        if !self.modified {
            return (Value::Map(self.base), false);
        }
        let work = match self.work {
            Some(work) => work,
            None => self.base.to_map(),
        };
        (settle_map(&policy, work), true)
    }
}

/// Draft over a set. Elements are keys; there is nothing to nest, so no
/// child drafts exist.
pub(crate) struct SetDraft {
    base: SetHandle,
    work: Option<Set<Value>>,
    modified: bool,
}

impl SetDraft {
    pub(crate) fn new(base: SetHandle) -> SetDraft {
        SetDraft {
            base,
            work: None,
            modified: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.work {
            Some(work) => work.len(),
            None => self.base.len(),
        }
    }

    pub(crate) fn contains(&self, value: &Value) -> bool {
        match &self.work {
            Some(work) => work.contains(value),
            None => self.base.contains(value),
        }
    }

    fn work(&mut self) -> &mut Set<Value> {
        if self.work.is_none() {
            self.work = Some(self.base.to_set());
        }
        self.work.as_mut().expect("working set")
    }

    pub(crate) fn add(&mut self, owner: OwnerTag, value: Value) -> bool {
        let added = self.work().add(owner, value);
        if added {
            self.modified = true;
        }
        added
    }

    pub(crate) fn delete(&mut self, owner: OwnerTag, value: &Value) -> bool {
        let removed = self.work().remove(owner, value);
        if removed {
            self.modified = true;
        }
        removed
    }

    pub(crate) fn clear(&mut self, _owner: OwnerTag) {
        let ordered = self.base.is_ordered();
        if self.len() > 0 {
            self.modified = true;
        }
        self.work = Some(if ordered { Set::new_ordered() } else { Set::new() });
    }

    pub(crate) fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn finish(self, _owner: OwnerTag, policy: Policy) -> (Value, bool) {
        if !self.modified {
            return (Value::Set(self.base), false);
        }
        let work = match self.work {
            Some(work) => work,
            None => self.base.to_set(),
        };
        (settle_set(&policy, work), true)
    }
}
