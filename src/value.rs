//! The dynamic value model behind the collection façades.
//!
//! Scalars are stored inline. The four container kinds are `Arc`-backed
//! handles with a two-arm representation: a plain native container below
//! the adaptive threshold, the persistent form at or above it. Timestamps
//! and byte buffers pass through as opaque values and never participate in
//! drafting.
//!
//! Key semantics are SameValueZero: `NaN` equals itself, `+0` equals `-0`,
//! strings compare by content, and container values compare and hash by
//! identity through a weak registry of monotonically numbered handles.

use std::cell::RefCell;
use std::collections::HashMap as StdHashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use hifitime::Epoch;

use crate::hamt::KeyHash;
use crate::hash;
use crate::map::Map;
use crate::set::Set;
use crate::vector::Vector;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Opaque(Opaque),
    List(ListHandle),
    Map(MapHandle),
    Set(SetHandle),
    Record(RecordHandle),
}

/// Passthrough kinds: stored, compared and hashed by content, never
/// drafted.
#[derive(Clone, Debug)]
pub enum Opaque {
    Time(Epoch),
    Bytes(Bytes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Opaque,
    List,
    Map,
    Set,
    Record,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Str => "string",
            Kind::Opaque => "opaque",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Set => "set",
            Kind::Record => "record",
        }
    }
}

// ---------------------------------------------------------------------------
// Handles

#[derive(Clone)]
pub struct ListHandle(pub(crate) Arc<ListCore>);

#[derive(Clone)]
pub(crate) enum ListCore {
    Native(Vec<Value>),
    Trie(Vector<Value>),
}

#[derive(Clone)]
pub struct MapHandle(pub(crate) Arc<MapCore>);

#[derive(Clone)]
pub(crate) enum MapCore {
    Native {
        entries: Vec<(Value, Value)>,
        ordered: bool,
    },
    Trie(Map<Value, Value>),
}

#[derive(Clone)]
pub struct SetHandle(pub(crate) Arc<SetCore>);

#[derive(Clone)]
pub(crate) enum SetCore {
    Native {
        entries: Vec<Value>,
        ordered: bool,
    },
    Trie(Set<Value>),
}

#[derive(Clone)]
pub struct RecordHandle(pub(crate) Arc<RecordCore>);

#[derive(Clone)]
pub(crate) enum RecordCore {
    Native(Vec<(Arc<str>, Value)>),
    /// Always insertion-ordered.
    Trie(Map<Arc<str>, Value>),
}

impl ListHandle {
    pub(crate) fn native(items: Vec<Value>) -> ListHandle {
        ListHandle(Arc::new(ListCore::Native(items)))
    }

    pub(crate) fn trie(vector: Vector<Value>) -> ListHandle {
        ListHandle(Arc::new(ListCore::Trie(vector)))
    }

    pub fn len(&self) -> usize {
        match &*self.0 {
            ListCore::Native(items) => items.len(),
            ListCore::Trie(vector) => vector.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(&*self.0, ListCore::Trie(_))
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        match &*self.0 {
            ListCore::Native(items) => items.get(index),
            ListCore::Trie(vector) => vector.get(index),
        }
    }

    pub fn iter(&self) -> ListIter<'_> {
        match &*self.0 {
            ListCore::Native(items) => ListIter::Native(items.iter()),
            ListCore::Trie(vector) => ListIter::Trie(vector.iter()),
        }
    }

    /// The elements as a persistent vector, shared when already wrapped.
    pub(crate) fn to_vector(&self) -> Vector<Value> {
        match &*self.0 {
            ListCore::Native(items) => items.iter().cloned().collect(),
            ListCore::Trie(vector) => vector.clone(),
        }
    }
}

pub enum ListIter<'a> {
    Native(std::slice::Iter<'a, Value>),
    Trie(crate::vector::Iter<'a, Value>),
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        match self {
            ListIter::Native(iter) => iter.next(),
            ListIter::Trie(iter) => iter.next(),
        }
    }
}

impl MapHandle {
    pub(crate) fn native(entries: Vec<(Value, Value)>, ordered: bool) -> MapHandle {
        MapHandle(Arc::new(MapCore::Native { entries, ordered }))
    }

    pub(crate) fn trie(map: Map<Value, Value>) -> MapHandle {
        MapHandle(Arc::new(MapCore::Trie(map)))
    }

    pub fn len(&self) -> usize {
        match &*self.0 {
            MapCore::Native { entries, .. } => entries.len(),
            MapCore::Trie(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(&*self.0, MapCore::Trie(_))
    }

    pub fn is_ordered(&self) -> bool {
        match &*self.0 {
            MapCore::Native { ordered, .. } => *ordered,
            MapCore::Trie(map) => map.is_ordered(),
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        match &*self.0 {
            MapCore::Native { entries, .. } => entries
                .iter()
                .find(|(k, _)| k.same_value_zero(key))
                .map(|(_, v)| v),
            MapCore::Trie(map) => map.get(key),
        }
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> MapEntryIter<'_> {
        match &*self.0 {
            MapCore::Native { entries, .. } => MapEntryIter::Native(entries.iter()),
            MapCore::Trie(map) => MapEntryIter::Trie(map.iter()),
        }
    }

    /// The entries as a persistent map, shared when already wrapped.
    pub(crate) fn to_map(&self) -> Map<Value, Value> {
        match &*self.0 {
            MapCore::Native { entries, ordered } => {
                let mut map = if *ordered {
                    Map::new_ordered()
                } else {
                    Map::new()
                };
                for (k, v) in entries {
                    map.insert(crate::owner::OwnerTag::NONE, k.clone(), v.clone());
                }
                map
            }
            MapCore::Trie(map) => map.clone(),
        }
    }
}

pub enum MapEntryIter<'a> {
    Native(std::slice::Iter<'a, (Value, Value)>),
    Trie(crate::map::MapIter<'a, Value, Value>),
}

impl<'a> Iterator for MapEntryIter<'a> {
    type Item = (&'a Value, &'a Value);

    fn next(&mut self) -> Option<(&'a Value, &'a Value)> {
        match self {
            MapEntryIter::Native(iter) => iter.next().map(|(k, v)| (k, v)),
            MapEntryIter::Trie(iter) => iter.next(),
        }
    }
}

impl SetHandle {
    pub(crate) fn native(entries: Vec<Value>, ordered: bool) -> SetHandle {
        SetHandle(Arc::new(SetCore::Native { entries, ordered }))
    }

    pub(crate) fn trie(set: Set<Value>) -> SetHandle {
        SetHandle(Arc::new(SetCore::Trie(set)))
    }

    pub fn len(&self) -> usize {
        match &*self.0 {
            SetCore::Native { entries, .. } => entries.len(),
            SetCore::Trie(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(&*self.0, SetCore::Trie(_))
    }

    pub fn is_ordered(&self) -> bool {
        match &*self.0 {
            SetCore::Native { ordered, .. } => *ordered,
            SetCore::Trie(set) => set.is_ordered(),
        }
    }

    pub fn contains(&self, key: &Value) -> bool {
        match &*self.0 {
            SetCore::Native { entries, .. } => entries.iter().any(|v| v.same_value_zero(key)),
            SetCore::Trie(set) => set.contains(key),
        }
    }

    pub fn iter(&self) -> SetEntryIter<'_> {
        match &*self.0 {
            SetCore::Native { entries, .. } => SetEntryIter::Native(entries.iter()),
            SetCore::Trie(set) => SetEntryIter::Trie(set.iter()),
        }
    }

    pub(crate) fn to_set(&self) -> Set<Value> {
        match &*self.0 {
            SetCore::Native { entries, ordered } => {
                let mut set = if *ordered {
                    Set::new_ordered()
                } else {
                    Set::new()
                };
                for v in entries {
                    set.add(crate::owner::OwnerTag::NONE, v.clone());
                }
                set
            }
            SetCore::Trie(set) => set.clone(),
        }
    }
}

pub enum SetEntryIter<'a> {
    Native(std::slice::Iter<'a, Value>),
    Trie(crate::set::SetIter<'a, Value>),
}

impl<'a> Iterator for SetEntryIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        match self {
            SetEntryIter::Native(iter) => iter.next(),
            SetEntryIter::Trie(iter) => iter.next(),
        }
    }
}

impl RecordHandle {
    pub(crate) fn native(fields: Vec<(Arc<str>, Value)>) -> RecordHandle {
        RecordHandle(Arc::new(RecordCore::Native(fields)))
    }

    pub(crate) fn trie(map: Map<Arc<str>, Value>) -> RecordHandle {
        debug_assert!(map.is_ordered(), "record tries are insertion-ordered");
        RecordHandle(Arc::new(RecordCore::Trie(map)))
    }

    pub fn len(&self) -> usize {
        match &*self.0 {
            RecordCore::Native(fields) => fields.len(),
            RecordCore::Trie(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(&*self.0, RecordCore::Trie(_))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match &*self.0 {
            RecordCore::Native(fields) => fields
                .iter()
                .find(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v),
            RecordCore::Trie(map) => {
                let key: Arc<str> = name.into();
                map.get(&key)
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> RecordIter<'_> {
        match &*self.0 {
            RecordCore::Native(fields) => RecordIter::Native(fields.iter()),
            RecordCore::Trie(map) => RecordIter::Trie(map.iter()),
        }
    }

    /// The fields as native pairs, in insertion order.
    pub(crate) fn to_pairs(&self) -> Vec<(Arc<str>, Value)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

pub enum RecordIter<'a> {
    Native(std::slice::Iter<'a, (Arc<str>, Value)>),
    Trie(crate::map::MapIter<'a, Arc<str>, Value>),
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = (&'a Arc<str>, &'a Value);

    fn next(&mut self) -> Option<(&'a Arc<str>, &'a Value)> {
        match self {
            RecordIter::Native(iter) => iter.next().map(|(k, v)| (k, v)),
            RecordIter::Trie(iter) => iter.next(),
        }
    }
}

// ---------------------------------------------------------------------------
// Value

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::Opaque(_) => Kind::Opaque,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Set(_) => Kind::Set,
            Value::Record(_) => Kind::Record,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Map(_) | Value::Set(_) | Value::Record(_)
        )
    }

    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(s.as_ref().into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(ListHandle::native(items.into_iter().collect()))
    }

    pub fn record<N: Into<Arc<str>>>(fields: impl IntoIterator<Item = (N, Value)>) -> Value {
        Value::Record(RecordHandle::native(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        let mut out: Vec<(Value, Value)> = Vec::new();
        for (k, v) in entries {
            match out.iter_mut().find(|(ok, _)| ok.same_value_zero(&k)) {
                Some(slot) => slot.1 = v,
                None => out.push((k, v)),
            }
        }
        Value::Map(MapHandle::native(out, false))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Value {
        let mut out: Vec<Value> = Vec::new();
        for v in items {
            if !out.iter().any(|o| o.same_value_zero(&v)) {
                out.push(v);
            }
        }
        Value::Set(SetHandle::native(out, false))
    }

    /// Walk record fields by name. A convenience for tests and docs.
    pub fn get_path(&self, path: &[&str]) -> Option<Value> {
        let mut current = self.clone();
        for step in path {
            let next = match &current {
                Value::Record(record) => record.get(step)?.clone(),
                _ => return None,
            };
            current = next;
        }
        Some(current)
    }

    /// SameValueZero: scalar equality with `NaN == NaN` and `+0 == -0`;
    /// container handles compare by identity.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                hash::canonical_f64_bits(*a) == hash::canonical_f64_bits(*b)
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a.content_eq(b),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Value::Set(a), Value::Set(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }

    /// Identity: containers share the same backing allocation, scalars are
    /// SameValueZero-equal.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        self.same_value_zero(other)
    }
}

impl Opaque {
    fn content_eq(&self, other: &Opaque) -> bool {
        match (self, other) {
            (Opaque::Time(a), Opaque::Time(b)) => a == b,
            (Opaque::Bytes(a), Opaque::Bytes(b)) => a == b,
            _ => false,
        }
    }

    fn content_hash(&self) -> u32 {
        match self {
            Opaque::Time(epoch) => {
                let nanos = epoch.to_tai_duration().total_nanoseconds() as u128;
                hash::splitmix32(
                    (nanos ^ (nanos >> 32) ^ (nanos >> 64) ^ (nanos >> 96)) as u32,
                )
            }
            Opaque::Bytes(bytes) => hash::hash_bytes(bytes),
        }
    }
}

/// Deep structural equality, with an identity fast path per container.
/// Scalars follow SameValueZero so equality stays reflexive inside keys.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                Arc::ptr_eq(&a.0, &b.0)
                    || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y))
            }
            (Value::Record(a), Value::Record(b)) => {
                Arc::ptr_eq(&a.0, &b.0)
                    || (a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v)))
            }
            (Value::Map(a), Value::Map(b)) => {
                Arc::ptr_eq(&a.0, &b.0)
                    || (a.len() == b.len()
                        && a.iter().all(|(k, v)| b.get(k).map_or(false, |bv| bv == v)))
            }
            (Value::Set(a), Value::Set(b)) => {
                Arc::ptr_eq(&a.0, &b.0) || (a.len() == b.len() && a.iter().all(|v| b.contains(v)))
            }
            _ => self.same_value_zero(other),
        }
    }
}

impl KeyHash for Value {
    fn hash32(&self) -> u32 {
        match self {
            Value::Null => hash::HASH_NULL,
            Value::Bool(b) => hash::hash_bool(*b),
            Value::Int(i) => hash::hash_i64(*i),
            Value::Float(f) => hash::hash_f64(*f),
            Value::Str(s) => hash::hash_str(s),
            Value::Opaque(o) => o.content_hash(),
            Value::List(h) => {
                identity_hash(Arc::as_ptr(&h.0) as usize, || {
                    AnyWeak::List(Arc::downgrade(&h.0))
                })
            }
            Value::Map(h) => {
                identity_hash(Arc::as_ptr(&h.0) as usize, || {
                    AnyWeak::Map(Arc::downgrade(&h.0))
                })
            }
            Value::Set(h) => {
                identity_hash(Arc::as_ptr(&h.0) as usize, || {
                    AnyWeak::Set(Arc::downgrade(&h.0))
                })
            }
            Value::Record(h) => {
                identity_hash(Arc::as_ptr(&h.0) as usize, || {
                    AnyWeak::Record(Arc::downgrade(&h.0))
                })
            }
        }
    }

    fn key_eq(&self, other: &Self) -> bool {
        self.same_value_zero(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Opaque(o) => write!(f, "{:?}", o),
            Value::List(h) => f.debug_list().entries(h.iter()).finish(),
            Value::Map(h) => f.debug_map().entries(h.iter()).finish(),
            Value::Set(h) => f.debug_set().entries(h.iter()).finish(),
            Value::Record(h) => {
                let mut map = f.debug_map();
                for (k, v) in h.iter() {
                    map.entry(&k.as_ref(), v);
                }
                map.finish()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v.into())
    }
}

impl From<Epoch> for Value {
    fn from(v: Epoch) -> Value {
        Value::Opaque(Opaque::Time(v))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Value {
        Value::Opaque(Opaque::Bytes(v))
    }
}

// ---------------------------------------------------------------------------
// Identity registry
//
// Container keys hash by a monotonically minted identity number. The table
// is keyed by handle address and holds weak probes only, so dropped handles
// neither pin memory nor confuse a reused address: a dead probe at a hit
// means the address was recycled and a fresh number is minted.

enum AnyWeak {
    List(Weak<ListCore>),
    Map(Weak<MapCore>),
    Set(Weak<SetCore>),
    Record(Weak<RecordCore>),
}

impl AnyWeak {
    fn alive(&self) -> bool {
        match self {
            AnyWeak::List(w) => w.strong_count() > 0,
            AnyWeak::Map(w) => w.strong_count() > 0,
            AnyWeak::Set(w) => w.strong_count() > 0,
            AnyWeak::Record(w) => w.strong_count() > 0,
        }
    }
}

struct IdentityRegistry {
    next: u32,
    slots: StdHashMap<usize, (u32, AnyWeak)>,
    since_purge: u32,
}

const PURGE_INTERVAL: u32 = 1024;

thread_local! {
    static IDENTITY: RefCell<IdentityRegistry> = RefCell::new(IdentityRegistry {
        next: 1,
        slots: StdHashMap::new(),
        since_purge: 0,
    });
}

fn identity_hash(addr: usize, probe: impl FnOnce() -> AnyWeak) -> u32 {
    let id = IDENTITY.with(|cell| {
        let mut registry = cell.borrow_mut();
        if let Some((id, weak)) = registry.slots.get(&addr) {
            if weak.alive() {
                return *id;
            }
        }
        let id = registry.next;
        registry.next += 1;
        registry.slots.insert(addr, (id, probe()));
        registry.since_purge += 1;
        if registry.since_purge >= PURGE_INTERVAL {
            registry.slots.retain(|_, (_, weak)| weak.alive());
            registry.since_purge = 0;
        }
        id
    });
    hash::fmix32(id)
}

#[cfg(test)]
pub(crate) fn reset_identity_registry() {
    IDENTITY.with(|cell| {
        let mut registry = cell.borrow_mut();
        registry.next = 1;
        registry.slots.clear();
        registry.since_purge = 0;
    });
}
