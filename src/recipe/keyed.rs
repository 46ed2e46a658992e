//! Replay of recorded map and set mutations against a native base.
//!
//! A `clear` resets the slate: only operations recorded after the last
//! clear are applied, onto an empty container.

use crate::adaptive::{settle_native_map, settle_native_set, Policy};
use crate::error::Error;
use crate::value::{MapHandle, SetHandle, Value};

pub(crate) enum MapOp {
    Set(Value, Value),
    Delete(Value),
    Clear,
}

pub(crate) enum SetOp {
    Add(Value),
    Delete(Value),
    Clear,
}

pub(crate) fn replay_map(
    policy: &Policy,
    base: &MapHandle,
    mut ops: Vec<MapOp>,
) -> Result<Value, Error> {
    if ops.is_empty() {
        return Ok(Value::Map(base.clone()));
    }
    let ordered = base.is_ordered();
    let mut entries: Vec<(Value, Value)>;
    if let Some(pos) = ops.iter().rposition(|op| matches!(op, MapOp::Clear)) {
        entries = Vec::new();
        ops.drain(..=pos);
    } else {
        entries = base.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    }
    for op in ops {
        match op {
            MapOp::Set(key, value) => {
                match entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
                    Some(slot) => slot.1 = value,
                    None => entries.push((key, value)),
                }
            }
            MapOp::Delete(key) => entries.retain(|(k, _)| !k.same_value_zero(&key)),
            MapOp::Clear => unreachable!("cleared above"),
        }
    }
    Ok(settle_native_map(policy, entries, ordered))
}

pub(crate) fn replay_set(
    policy: &Policy,
    base: &SetHandle,
    mut ops: Vec<SetOp>,
) -> Result<Value, Error> {
    if ops.is_empty() {
        return Ok(Value::Set(base.clone()));
    }
    let ordered = base.is_ordered();
    let mut entries: Vec<Value>;
    if let Some(pos) = ops.iter().rposition(|op| matches!(op, SetOp::Clear)) {
        entries = Vec::new();
        ops.drain(..=pos);
    } else {
        entries = base.iter().cloned().collect();
    }
    for op in ops {
        match op {
            SetOp::Add(value) => {
                if !entries.iter().any(|v| v.same_value_zero(&value)) {
                    entries.push(value);
                }
            }
            SetOp::Delete(value) => entries.retain(|v| !v.same_value_zero(&value)),
            SetOp::Clear => unreachable!("cleared above"),
        }
    }
    Ok(settle_native_set(policy, entries, ordered))
}
