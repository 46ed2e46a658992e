//! Replay of recorded list mutations against a native base.

use crate::adaptive::{settle_native_list, Policy};
use crate::error::Error;
use crate::value::{ListHandle, Value};

pub(crate) enum ListOp {
    Set(usize, Value),
    Delete(usize),
    Push(Vec<Value>),
    Splice {
        start: usize,
        delete: usize,
        insert: Vec<Value>,
    },
    Filter(Box<dyn FnMut(&Value) -> bool>),
}

pub(crate) fn replay_list(
    policy: &Policy,
    base: &ListHandle,
    ops: Vec<ListOp>,
) -> Result<Value, Error> {
    if ops.is_empty() {
        return Ok(Value::List(base.clone()));
    }
    // One copy either way; without structural ops the sets and pushes land
    // directly, otherwise the queue replays in program order.
    let mut items: Vec<Value> = base.iter().cloned().collect();
    for op in ops {
        match op {
            ListOp::Set(index, value) => {
                let len = items.len();
                if index > len {
                    return Err(Error::out_of_range(index, len));
                }
                if index == len {
                    items.push(value);
                } else {
                    items[index] = value;
                }
            }
            ListOp::Delete(index) => {
                if index >= items.len() {
                    return Err(Error::out_of_range(index, items.len()));
                }
                items.remove(index);
            }
            ListOp::Push(values) => items.extend(values),
            ListOp::Splice {
                start,
                delete,
                insert,
            } => {
                let len = items.len();
                let start = start.min(len);
                let delete = delete.min(len - start);
                items.splice(start..start + delete, insert);
            }
            ListOp::Filter(mut keep) => items.retain(|v| keep(v)),
        }
    }
    Ok(settle_native_list(policy, items))
}
