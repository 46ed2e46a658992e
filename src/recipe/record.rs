//! Replay of path-based record mutations.
//!
//! Small batches are dispatched to shape-specialized appliers — a single
//! spine rebuild, one shallow copy, a root-plus-parent copy, recursive
//! grouping by leading key — and anything past twenty mutations goes
//! through a mutation tree keyed by path prefix, where a later write at a
//! prefix replaces earlier ones and shadows the nested writes it subsumes.
//! Untouched subtrees are shared in every path.

use std::sync::Arc;

use crate::adaptive::{settle_native_list, settle_native_record, settle_record_map, settle_vector, Policy};
use crate::error::Error;
use crate::owner::OwnerTag;
use crate::value::{ListCore, ListHandle, RecordCore, RecordHandle, Value};

/// One step of a mutation path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Field(Arc<str>),
    Index(usize),
}

impl PathKey {
    pub fn field(name: impl Into<Arc<str>>) -> PathKey {
        PathKey::Field(name.into())
    }

    pub fn index(index: usize) -> PathKey {
        PathKey::Index(index)
    }
}

impl From<&str> for PathKey {
    fn from(name: &str) -> PathKey {
        PathKey::Field(name.into())
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> PathKey {
        PathKey::Index(index)
    }
}

pub(crate) struct PathOp {
    pub path: Vec<PathKey>,
    pub kind: PathOpKind,
}

pub(crate) enum PathOpKind {
    Set(Value),
    Update(Box<dyn FnOnce(Value) -> Value>),
    Delete,
    Merge(Vec<(Arc<str>, Value)>),
}

impl PathOpKind {
    pub(crate) fn is_delete(&self) -> bool {
        matches!(self, PathOpKind::Delete)
    }

    fn is_shallow_write(&self) -> bool {
        matches!(self, PathOpKind::Set(_) | PathOpKind::Update(_))
    }
}

pub(crate) fn replay_record(
    policy: &Policy,
    base: &Value,
    mut ops: Vec<PathOp>,
) -> Result<Value, Error> {
    if ops.is_empty() {
        return Ok(base.clone());
    }
    let n = ops.len();
    if n == 1 {
        let op = ops.pop().expect("one op");
        return apply_at(policy, base, &op.path, op.kind);
    }

    let shallow = |op: &PathOp| {
        op.path.len() == 1
            && matches!(op.path[0], PathKey::Field(_))
            && op.kind.is_shallow_write()
    };

    if n <= 6 && ops.iter().all(shallow) {
        return apply_shallow_batch(policy, base, ops);
    }
    if n <= 10 && same_parent_depth2(&ops) {
        return apply_depth2_batch(policy, base, ops);
    }
    // Mixed shallow-plus-nested batches and general small batches both
    // land on recursive grouping by leading field.
    if n <= 20 {
        return apply_grouped(policy, base, ops);
    }
    apply_mutation_tree(policy, base, ops)
}

fn same_parent_depth2(ops: &[PathOp]) -> bool {
    let mut parent: Option<&PathKey> = None;
    for op in ops {
        if op.path.len() != 2
            || !matches!(op.path[0], PathKey::Field(_))
            || !matches!(op.path[1], PathKey::Field(_))
            || !op.kind.is_shallow_write()
        {
            return false;
        }
        match parent {
            None => parent = Some(&op.path[0]),
            Some(p) if *p == op.path[0] => {}
            Some(_) => return false,
        }
    }
    true
}

// -- single-op spine rebuild ------------------------------------------------

/// Apply one mutation, rebuilding only the containers along `path`.
pub(crate) fn apply_at(
    policy: &Policy,
    current: &Value,
    path: &[PathKey],
    kind: PathOpKind,
) -> Result<Value, Error> {
    let Some((head, rest)) = path.split_first() else {
        return match kind {
            PathOpKind::Merge(fields) => merge_into(policy, current, fields),
            _ => Err(Error::recipe("mutation path must not be empty")),
        };
    };

    match head {
        PathKey::Field(name) => {
            let record = as_record(current)?;
            if rest.is_empty() && !matches!(kind, PathOpKind::Merge(_)) {
                return match kind {
                    PathOpKind::Set(value) => Ok(record_with(policy, record, name, value)),
                    PathOpKind::Update(f) => {
                        let old = record.get(name).cloned().unwrap_or(Value::Null);
                        Ok(record_with(policy, record, name, f(old)))
                    }
                    PathOpKind::Delete => Ok(record_without(policy, record, name)),
                    PathOpKind::Merge(_) => unreachable!(),
                };
            }
            // Deleting below a missing branch deletes nothing; writes grow
            // an empty record to pass through.
            let child = match record.get(name) {
                Some(child) => child.clone(),
                None if kind.is_delete() => return Ok(current.clone()),
                None => Value::record(Vec::<(Arc<str>, Value)>::new()),
            };
            let rebuilt = apply_at(policy, &child, rest, kind)?;
            Ok(record_with(policy, record, name, rebuilt))
        }
        PathKey::Index(index) => {
            let list = as_list(current)?;
            if rest.is_empty() && !matches!(kind, PathOpKind::Merge(_)) {
                return match kind {
                    PathOpKind::Set(value) => list_with(policy, list, *index, value),
                    PathOpKind::Update(f) => {
                        let old = list
                            .get(*index)
                            .cloned()
                            .ok_or_else(|| Error::out_of_range(*index, list.len()))?;
                        list_with(policy, list, *index, f(old))
                    }
                    PathOpKind::Delete => list_without(policy, list, *index),
                    PathOpKind::Merge(_) => unreachable!(),
                };
            }
            let child = list
                .get(*index)
                .cloned()
                .ok_or_else(|| Error::out_of_range(*index, list.len()))?;
            let rebuilt = apply_at(policy, &child, rest, kind)?;
            list_with(policy, list, *index, rebuilt)
        }
    }
}

// -- shallow batches --------------------------------------------------------

/// One spread copy with every change applied (patterns for two, and up to
/// six, shallow writes).
fn apply_shallow_batch(policy: &Policy, base: &Value, ops: Vec<PathOp>) -> Result<Value, Error> {
    let record = as_record(base)?;
    let mut fields = record.to_pairs();
    for op in ops {
        let PathKey::Field(name) = &op.path[0] else {
            unreachable!("shallow batch sees field paths only")
        };
        match op.kind {
            PathOpKind::Set(value) => set_field(&mut fields, name.clone(), value),
            PathOpKind::Update(f) => {
                let old = fields
                    .iter()
                    .find(|(k, _)| k.as_ref() == name.as_ref())
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Null);
                set_field(&mut fields, name.clone(), f(old));
            }
            PathOpKind::Delete | PathOpKind::Merge(_) => {
                unreachable!("shallow batch sees writes only")
            }
        }
    }
    Ok(settle_native_record(policy, fields))
}

/// Spread copy at the root plus one at the shared parent (up to ten
/// depth-two writes under a single field).
fn apply_depth2_batch(policy: &Policy, base: &Value, ops: Vec<PathOp>) -> Result<Value, Error> {
    let record = as_record(base)?;
    let PathKey::Field(parent_name) = ops[0].path[0].clone() else {
        unreachable!("depth-2 batch sees field paths only")
    };
    let parent_value = record
        .get(&parent_name)
        .cloned()
        .unwrap_or_else(|| Value::record(Vec::<(Arc<str>, Value)>::new()));
    let parent = as_record(&parent_value)?;
    let mut fields = parent.to_pairs();
    for op in ops {
        let PathKey::Field(name) = &op.path[1] else {
            unreachable!()
        };
        match op.kind {
            PathOpKind::Set(value) => set_field(&mut fields, name.clone(), value),
            PathOpKind::Update(f) => {
                let old = fields
                    .iter()
                    .find(|(k, _)| k.as_ref() == name.as_ref())
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Null);
                set_field(&mut fields, name.clone(), f(old));
            }
            _ => unreachable!(),
        }
    }
    let rebuilt_parent = settle_native_record(policy, fields);
    Ok(record_with(policy, record, &parent_name, rebuilt_parent))
}

/// Group by leading field, fold each group onto the field's value, and
/// rebuild the root once.
fn apply_grouped(policy: &Policy, base: &Value, ops: Vec<PathOp>) -> Result<Value, Error> {
    let record = as_record(base)?;
    let mut groups: Vec<(Arc<str>, Vec<PathOp>)> = Vec::new();
    for op in ops {
        let PathKey::Field(name) = &op.path[0] else {
            return Err(Error::KindMismatch {
                expected: "record",
                found: "list",
            });
        };
        let name = name.clone();
        match groups.iter_mut().find(|(n, _)| n.as_ref() == name.as_ref()) {
            Some((_, group)) => group.push(op),
            None => groups.push((name, vec![op])),
        }
    }

    let mut fields = record.to_pairs();
    for (name, group) in groups {
        // None marks a deleted (or never-present) slot.
        let mut slot: Option<Value> = fields
            .iter()
            .find(|(k, _)| k.as_ref() == name.as_ref())
            .map(|(_, v)| v.clone());
        for op in group {
            let tail = &op.path[1..];
            if tail.is_empty() && !matches!(op.kind, PathOpKind::Merge(_)) {
                slot = match op.kind {
                    PathOpKind::Set(value) => Some(value),
                    PathOpKind::Update(f) => Some(f(slot.take().unwrap_or(Value::Null))),
                    PathOpKind::Delete => None,
                    PathOpKind::Merge(_) => unreachable!(),
                };
            } else {
                let current = match slot.take() {
                    Some(value) => value,
                    None if op.kind.is_delete() => continue,
                    None => Value::record(Vec::<(Arc<str>, Value)>::new()),
                };
                slot = Some(apply_at(policy, &current, tail, op.kind)?);
            }
        }
        match slot {
            Some(value) => set_field(&mut fields, name, value),
            None => fields.retain(|(k, _)| k.as_ref() != name.as_ref()),
        }
    }
    Ok(settle_native_record(policy, fields))
}

// -- mutation tree ----------------------------------------------------------

struct MutNode {
    /// Direct writes at this prefix, in program order. A replacing write
    /// (set, delete or update) drops earlier ops and shadows the nested
    /// writes it subsumes; only merges queue up, since they touch no keys
    /// beyond the ones they carry.
    ops: Vec<PathOpKind>,
    children: Vec<(PathKey, MutNode)>,
}

impl MutNode {
    fn new() -> MutNode {
        MutNode {
            ops: Vec::new(),
            children: Vec::new(),
        }
    }

    fn insert(&mut self, path: &[PathKey], kind: PathOpKind) {
        match path.split_first() {
            None => match kind {
                PathOpKind::Set(_) | PathOpKind::Delete | PathOpKind::Update(_) => {
                    self.ops = vec![kind];
                    self.children.clear();
                }
                PathOpKind::Merge(_) => self.ops.push(kind),
            },
            Some((head, rest)) => {
                let child = match self.children.iter_mut().position(|(k, _)| k == head) {
                    Some(pos) => &mut self.children[pos].1,
                    None => {
                        self.children.push((head.clone(), MutNode::new()));
                        &mut self.children.last_mut().expect("just pushed").1
                    }
                };
                child.insert(rest, kind);
            }
        }
    }
}

fn apply_mutation_tree(policy: &Policy, base: &Value, ops: Vec<PathOp>) -> Result<Value, Error> {
    let mut root = MutNode::new();
    for op in ops {
        root.insert(&op.path, op.kind);
    }
    let result = apply_tree(policy, Some(base.clone()), root)?;
    result.ok_or_else(|| Error::recipe("mutation tree deleted the root"))
}

fn apply_tree(
    policy: &Policy,
    current: Option<Value>,
    node: MutNode,
) -> Result<Option<Value>, Error> {
    let mut value = current;
    for op in node.ops {
        value = match op {
            PathOpKind::Set(v) => Some(v),
            PathOpKind::Delete => None,
            PathOpKind::Update(f) => Some(f(value.take().unwrap_or(Value::Null))),
            PathOpKind::Merge(fields) => {
                let target = value
                    .take()
                    .unwrap_or_else(|| Value::record(Vec::<(Arc<str>, Value)>::new()));
                Some(merge_into(policy, &target, fields)?)
            }
        };
    }
    for (key, child) in node.children {
        let container = value
            .take()
            .unwrap_or_else(|| Value::record(Vec::<(Arc<str>, Value)>::new()));
        match key {
            PathKey::Field(name) => {
                let record = as_record(&container)?;
                let slot = record.get(&name).cloned();
                match apply_tree(policy, slot, child)? {
                    Some(new_child) => {
                        value = Some(record_with(policy, record, &name, new_child));
                    }
                    None => {
                        value = Some(record_without(policy, record, &name));
                    }
                }
            }
            PathKey::Index(index) => {
                let list = as_list(&container)?;
                let slot = list
                    .get(index)
                    .cloned()
                    .ok_or_else(|| Error::out_of_range(index, list.len()))?;
                match apply_tree(policy, Some(slot), child)? {
                    Some(new_child) => {
                        value = Some(list_with(policy, list, index, new_child)?);
                    }
                    None => {
                        value = Some(list_without(policy, list, index)?);
                    }
                }
            }
        }
    }
    Ok(value)
}

// -- shared rebuild helpers -------------------------------------------------

fn as_record(value: &Value) -> Result<&RecordHandle, Error> {
    match value {
        Value::Record(handle) => Ok(handle),
        other => Err(Error::KindMismatch {
            expected: "record",
            found: other.kind().name(),
        }),
    }
}

fn as_list(value: &Value) -> Result<&ListHandle, Error> {
    match value {
        Value::List(handle) => Ok(handle),
        other => Err(Error::KindMismatch {
            expected: "list",
            found: other.kind().name(),
        }),
    }
}

fn set_field(fields: &mut Vec<(Arc<str>, Value)>, name: Arc<str>, value: Value) {
    match fields.iter_mut().find(|(k, _)| k.as_ref() == name.as_ref()) {
        Some(slot) => slot.1 = value,
        None => fields.push((name, value)),
    }
}

/// The record with one field bound, sharing everything else.
pub(crate) fn record_with(
    policy: &Policy,
    record: &RecordHandle,
    name: &Arc<str>,
    value: Value,
) -> Value {
    match &*record.0 {
        RecordCore::Native(fields) => {
            let mut fields = fields.clone();
            set_field(&mut fields, name.clone(), value);
            settle_native_record(policy, fields)
        }
        RecordCore::Trie(map) => {
            let mut map = map.clone();
            map.insert(OwnerTag::NONE, name.clone(), value);
            settle_record_map(policy, map)
        }
    }
}

fn record_without(policy: &Policy, record: &RecordHandle, name: &Arc<str>) -> Value {
    match &*record.0 {
        RecordCore::Native(fields) => {
            let mut fields = fields.clone();
            fields.retain(|(k, _)| k.as_ref() != name.as_ref());
            settle_native_record(policy, fields)
        }
        RecordCore::Trie(map) => {
            let mut map = map.clone();
            map.remove(OwnerTag::NONE, name);
            settle_record_map(policy, map)
        }
    }
}

/// The list with `index` replaced (or, at one past the end, appended).
fn list_with(
    policy: &Policy,
    list: &ListHandle,
    index: usize,
    value: Value,
) -> Result<Value, Error> {
    let len = list.len();
    if index > len {
        return Err(Error::out_of_range(index, len));
    }
    match &*list.0 {
        ListCore::Native(items) => {
            let mut items = items.clone();
            if index == len {
                items.push(value);
            } else {
                items[index] = value;
            }
            Ok(settle_native_list(policy, items))
        }
        ListCore::Trie(vector) => {
            let next = if index == len {
                vector.push(OwnerTag::NONE, value)
            } else {
                vector.assoc(OwnerTag::NONE, index, value)?
            };
            Ok(settle_vector(policy, next))
        }
    }
}

fn list_without(policy: &Policy, list: &ListHandle, index: usize) -> Result<Value, Error> {
    let len = list.len();
    if index >= len {
        return Err(Error::out_of_range(index, len));
    }
    match &*list.0 {
        ListCore::Native(items) => {
            let mut items = items.clone();
            items.remove(index);
            Ok(settle_native_list(policy, items))
        }
        ListCore::Trie(vector) => {
            let next = vector.remove(OwnerTag::NONE, index)?;
            Ok(settle_vector(policy, next))
        }
    }
}

/// Merge `fields` into the record `target`, one shallow copy.
fn merge_into(
    policy: &Policy,
    target: &Value,
    fields: Vec<(Arc<str>, Value)>,
) -> Result<Value, Error> {
    let record = as_record(target)?;
    match &*record.0 {
        RecordCore::Native(existing) => {
            let mut existing = existing.clone();
            for (name, value) in fields {
                set_field(&mut existing, name, value);
            }
            Ok(settle_native_record(policy, existing))
        }
        RecordCore::Trie(map) => {
            let mut map = map.clone();
            for (name, value) in fields {
                map.insert(OwnerTag::NONE, name, value);
            }
            Ok(settle_record_map(policy, map))
        }
    }
}
