//! Size-adaptive representation switching.
//!
//! Each container kind stays a plain native container until it reaches the
//! policy threshold, at which point the persistent form takes over. Draft
//! and recipe results settle back through here, so a shrinking collection
//! downgrades to native and a growing one upgrades, in both directions
//! without observable change beyond [`is_wrapped`].

use std::sync::Arc;

use crate::map::Map;
use crate::owner::OwnerTag;
use crate::set::Set;
use crate::value::{ListHandle, MapHandle, RecordHandle, SetHandle, Value};
use crate::vector::Vector;

pub const DEFAULT_THRESHOLD: usize = 512;

/// The only configuration the façade carries.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    /// Element count at which a container switches to its persistent form.
    pub threshold: usize,
}

impl Default for Policy {
    fn default() -> Policy {
        Policy {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// True iff the value is the persistent form of one of the four container
/// kinds.
pub fn is_wrapped(value: &Value) -> bool {
    match value {
        Value::List(h) => h.is_wrapped(),
        Value::Map(h) => h.is_wrapped(),
        Value::Set(h) => h.is_wrapped(),
        Value::Record(h) => h.is_wrapped(),
        _ => false,
    }
}

/// Adapt `value` to the default policy. Idempotent: a wrapped value comes
/// back as the same handle; scalars and opaque values pass through.
pub fn wrap(value: Value) -> Value {
    wrap_with(&Policy::default(), value)
}

pub fn wrap_with(policy: &Policy, value: Value) -> Value {
    if is_wrapped(&value) {
        return value;
    }
    match &value {
        Value::List(h) if h.len() >= policy.threshold => {
            log::debug!("upgrading list of {} to persistent form", h.len());
            Value::List(ListHandle::trie(h.to_vector()))
        }
        Value::Map(h) if h.len() >= policy.threshold => {
            log::debug!("upgrading map of {} to persistent form", h.len());
            Value::Map(MapHandle::trie(h.to_map()))
        }
        Value::Set(h) if h.len() >= policy.threshold => {
            log::debug!("upgrading set of {} to persistent form", h.len());
            Value::Set(SetHandle::trie(h.to_set()))
        }
        Value::Record(h) if h.len() >= policy.threshold => {
            log::debug!("upgrading record of {} to persistent form", h.len());
            Value::Record(RecordHandle::trie(record_trie(h.to_pairs())))
        }
        _ => value,
    }
}

/// Like [`wrap`], but maps and sets keep an insertion-order index at any
/// size. Records are always ordered and lists positional, so both pass
/// through to [`wrap`].
pub fn wrap_ordered(value: Value) -> Value {
    wrap_ordered_with(&Policy::default(), value)
}

pub fn wrap_ordered_with(policy: &Policy, value: Value) -> Value {
    let value = match value {
        Value::Map(h) if !h.is_ordered() => {
            if h.is_wrapped() {
                let mut ordered: Map<Value, Value> = Map::new_ordered();
                for (k, v) in h.iter() {
                    ordered.insert(OwnerTag::NONE, k.clone(), v.clone());
                }
                Value::Map(MapHandle::trie(ordered))
            } else {
                let entries = h.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                Value::Map(MapHandle::native(entries, true))
            }
        }
        Value::Set(h) if !h.is_ordered() => {
            if h.is_wrapped() {
                let mut ordered: Set<Value> = Set::new_ordered();
                for v in h.iter() {
                    ordered.add(OwnerTag::NONE, v.clone());
                }
                Value::Set(SetHandle::trie(ordered))
            } else {
                let entries = h.iter().cloned().collect();
                Value::Set(SetHandle::native(entries, true))
            }
        }
        other => other,
    };
    wrap_with(policy, value)
}

/// A fresh native container with the same observable content. Shallow:
/// nested values keep their identity. Idempotent on native inputs.
pub fn unwrap(value: &Value) -> Value {
    match value {
        Value::List(h) if h.is_wrapped() => {
            Value::List(ListHandle::native(h.iter().cloned().collect()))
        }
        Value::Map(h) if h.is_wrapped() => {
            let entries = h.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            Value::Map(MapHandle::native(entries, h.is_ordered()))
        }
        Value::Set(h) if h.is_wrapped() => {
            Value::Set(SetHandle::native(h.iter().cloned().collect(), h.is_ordered()))
        }
        Value::Record(h) if h.is_wrapped() => Value::Record(RecordHandle::native(h.to_pairs())),
        other => other.clone(),
    }
}

pub(crate) fn record_trie(pairs: Vec<(Arc<str>, Value)>) -> Map<Arc<str>, Value> {
    let mut map = Map::new_ordered();
    for (k, v) in pairs {
        map.insert(OwnerTag::NONE, k, v);
    }
    map
}

// Settling: draft and recipe results pass through one of these to land on
// the right side of the threshold.

pub(crate) fn settle_vector(policy: &Policy, vector: Vector<Value>) -> Value {
    if vector.len() >= policy.threshold {
        Value::List(ListHandle::trie(vector))
    } else {
        log::debug!("downgrading list of {} to native form", vector.len());
        Value::List(ListHandle::native(vector.iter().cloned().collect()))
    }
}

pub(crate) fn settle_native_list(policy: &Policy, items: Vec<Value>) -> Value {
    if items.len() >= policy.threshold {
        log::debug!("upgrading list of {} to persistent form", items.len());
        Value::List(ListHandle::trie(items.into_iter().collect()))
    } else {
        Value::List(ListHandle::native(items))
    }
}

pub(crate) fn settle_map(policy: &Policy, map: Map<Value, Value>) -> Value {
    if map.len() >= policy.threshold {
        Value::Map(MapHandle::trie(map))
    } else {
        log::debug!("downgrading map of {} to native form", map.len());
        let ordered = map.is_ordered();
        let entries = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Value::Map(MapHandle::native(entries, ordered))
    }
}

pub(crate) fn settle_native_map(
    policy: &Policy,
    entries: Vec<(Value, Value)>,
    ordered: bool,
) -> Value {
    if entries.len() >= policy.threshold {
        log::debug!("upgrading map of {} to persistent form", entries.len());
        let mut map = if ordered { Map::new_ordered() } else { Map::new() };
        for (k, v) in entries {
            map.insert(OwnerTag::NONE, k, v);
        }
        Value::Map(MapHandle::trie(map))
    } else {
        Value::Map(MapHandle::native(entries, ordered))
    }
}

pub(crate) fn settle_set(policy: &Policy, set: Set<Value>) -> Value {
    if set.len() >= policy.threshold {
        Value::Set(SetHandle::trie(set))
    } else {
        log::debug!("downgrading set of {} to native form", set.len());
        let ordered = set.is_ordered();
        Value::Set(SetHandle::native(set.iter().cloned().collect(), ordered))
    }
}

pub(crate) fn settle_native_set(policy: &Policy, entries: Vec<Value>, ordered: bool) -> Value {
    if entries.len() >= policy.threshold {
        log::debug!("upgrading set of {} to persistent form", entries.len());
        let mut set = if ordered { Set::new_ordered() } else { Set::new() };
        for v in entries {
            set.add(OwnerTag::NONE, v);
        }
        Value::Set(SetHandle::trie(set))
    } else {
        Value::Set(SetHandle::native(entries, ordered))
    }
}

pub(crate) fn settle_record_map(policy: &Policy, map: Map<Arc<str>, Value>) -> Value {
    if map.len() >= policy.threshold {
        Value::Record(RecordHandle::trie(map))
    } else {
        log::debug!("downgrading record of {} to native form", map.len());
        let pairs = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Value::Record(RecordHandle::native(pairs))
    }
}

pub(crate) fn settle_native_record(policy: &Policy, pairs: Vec<(Arc<str>, Value)>) -> Value {
    if pairs.len() >= policy.threshold {
        log::debug!("upgrading record of {} to persistent form", pairs.len());
        Value::Record(RecordHandle::trie(record_trie(pairs)))
    } else {
        Value::Record(RecordHandle::native(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_stay_native() {
        let v = Value::list((0..10).map(Value::from));
        let wrapped = wrap(v);
        assert!(!is_wrapped(&wrapped));
    }

    #[test]
    fn large_values_upgrade() {
        let v = Value::list((0..DEFAULT_THRESHOLD as i64).map(Value::from));
        let wrapped = wrap(v);
        assert!(is_wrapped(&wrapped));
        let Value::List(h) = &wrapped else { panic!() };
        assert_eq!(h.len(), DEFAULT_THRESHOLD);
        assert_eq!(h.get(17), Some(&Value::from(17)));
    }

    #[test]
    fn wrap_is_idempotent() {
        let v = wrap(Value::list((0..600).map(Value::from)));
        let Value::List(first) = &v else { panic!() };
        let again = wrap(v.clone());
        let Value::List(second) = &again else { panic!() };
        assert!(Arc::ptr_eq(&first.0, &second.0));
    }

    #[test]
    fn unwrap_round_trips() {
        let original = Value::list((0..600).map(Value::from));
        let wrapped = wrap(original.clone());
        let back = unwrap(&wrapped);
        assert!(!is_wrapped(&back));
        assert_eq!(back, original);
        // Unwrap of a native value is the same handle.
        let native = Value::list([Value::from(1)]);
        assert!(unwrap(&native).ptr_eq(&native));
    }

    #[test]
    fn boundary_is_inclusive() {
        let policy = Policy { threshold: 8 };
        let seven = wrap_with(&policy, Value::list((0..7).map(Value::from)));
        let eight = wrap_with(&policy, Value::list((0..8).map(Value::from)));
        assert!(!is_wrapped(&seven));
        assert!(is_wrapped(&eight));
    }

    #[test]
    fn wrap_ordered_marks_small_containers() {
        let m = wrap_ordered(Value::map([(Value::from("k"), Value::from(1))]));
        let Value::Map(h) = &m else { panic!() };
        assert!(h.is_ordered());
        assert!(!h.is_wrapped());

        let policy = Policy { threshold: 2 };
        let s = wrap_ordered_with(
            &policy,
            Value::set([Value::from(1), Value::from(2), Value::from(3)]),
        );
        let Value::Set(h) = &s else { panic!() };
        assert!(h.is_ordered());
        assert!(h.is_wrapped());
        let got: Vec<Value> = h.iter().cloned().collect();
        assert_eq!(got, vec![Value::from(1), Value::from(2), Value::from(3)]);
    }

    #[test]
    fn scalars_pass_through() {
        assert!(wrap(Value::from(3)).ptr_eq(&Value::from(3)));
        assert!(!is_wrapped(&Value::from("x")));
    }
}
