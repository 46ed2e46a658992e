//! The recipe protocol: typed mutation recording with batch replay.
//!
//! `record_and_apply` hands the recipe a [`Recorder`] that queues typed
//! operations instead of building per-field drafts. Replay takes one copy
//! of a native base and applies the queue — with shape-specialized fast
//! paths for record mutations — while a wrapped base forwards the queue to
//! an equivalent draft so the persistent structures' own update paths do
//! the work. A recipe error aborts with the base untouched.

mod keyed;
mod list;
pub(crate) mod record;

use std::sync::Arc;

use crate::adaptive::{is_wrapped, Policy};
use crate::draft::{transform_with, Draft};
use crate::error::Error;
use crate::value::{Kind, Value};

use keyed::{replay_map, replay_set, MapOp, SetOp};
use list::{replay_list, ListOp};
pub use record::PathKey;
use record::{replay_record, PathOp, PathOpKind};

/// Record mutations against `base` and apply them in one batch.
pub fn record_and_apply<F>(base: &Value, recipe: F) -> Result<Value, Error>
where
    F: FnOnce(&mut Recorder) -> Result<(), Error>,
{
    record_and_apply_with(&Policy::default(), base, recipe)
}

pub fn record_and_apply_with<F>(policy: &Policy, base: &Value, recipe: F) -> Result<Value, Error>
where
    F: FnOnce(&mut Recorder) -> Result<(), Error>,
{
    let mut recorder = Recorder::new(base);
    recipe(&mut recorder)?;
    recorder.replay(policy, base)
}

/// A typed mutation queue for one base value; operations are validated
/// against the base's kind at recording time and replayed afterwards.
pub struct Recorder {
    kind: Kind,
    node: RecorderNode,
}

enum RecorderNode {
    Scalar,
    List(Vec<ListOp>),
    Map(Vec<MapOp>),
    Set(Vec<SetOp>),
    Record(Vec<PathOp>),
}

impl Recorder {
    fn new(base: &Value) -> Recorder {
        let node = match base {
            Value::List(_) => RecorderNode::List(Vec::new()),
            Value::Map(_) => RecorderNode::Map(Vec::new()),
            Value::Set(_) => RecorderNode::Set(Vec::new()),
            Value::Record(_) => RecorderNode::Record(Vec::new()),
            _ => RecorderNode::Scalar,
        };
        Recorder {
            kind: base.kind(),
            node,
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::KindMismatch {
            expected,
            found: self.kind.name(),
        }
    }

    // -- list ---------------------------------------------------------------

    pub fn set_at(&mut self, index: usize, value: Value) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::List(ops) => {
                ops.push(ListOp::Set(index, value));
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn delete_at(&mut self, index: usize) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::List(ops) => {
                ops.push(ListOp::Delete(index));
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn push(&mut self, values: impl IntoIterator<Item = Value>) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::List(ops) => {
                ops.push(ListOp::Push(values.into_iter().collect()));
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn splice(
        &mut self,
        start: usize,
        delete: usize,
        insert: impl IntoIterator<Item = Value>,
    ) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::List(ops) => {
                ops.push(ListOp::Splice {
                    start,
                    delete,
                    insert: insert.into_iter().collect(),
                });
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn filter(&mut self, keep: impl FnMut(&Value) -> bool + 'static) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::List(ops) => {
                ops.push(ListOp::Filter(Box::new(keep)));
                Ok(())
            }
            _ => Err(self.mismatch("list")),
        }
    }

    // -- map ----------------------------------------------------------------

    pub fn set_key(&mut self, key: Value, value: Value) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::Map(ops) => {
                ops.push(MapOp::Set(key, value));
                Ok(())
            }
            _ => Err(self.mismatch("map")),
        }
    }

    pub fn delete_key(&mut self, key: Value) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::Map(ops) => {
                ops.push(MapOp::Delete(key));
                Ok(())
            }
            _ => Err(self.mismatch("map")),
        }
    }

    /// Empty a map or set; earlier recorded operations are discarded.
    pub fn clear(&mut self) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::Map(ops) => {
                ops.push(MapOp::Clear);
                Ok(())
            }
            RecorderNode::Set(ops) => {
                ops.push(SetOp::Clear);
                Ok(())
            }
            _ => Err(self.mismatch("map or set")),
        }
    }

    // -- set ----------------------------------------------------------------

    pub fn add(&mut self, value: Value) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::Set(ops) => {
                ops.push(SetOp::Add(value));
                Ok(())
            }
            _ => Err(self.mismatch("set")),
        }
    }

    pub fn remove_value(&mut self, value: Value) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::Set(ops) => {
                ops.push(SetOp::Delete(value));
                Ok(())
            }
            _ => Err(self.mismatch("set")),
        }
    }

    // -- record -------------------------------------------------------------

    pub fn set_in<P: Into<PathKey>>(
        &mut self,
        path: impl IntoIterator<Item = P>,
        value: Value,
    ) -> Result<(), Error> {
        self.record_path(path, PathOpKind::Set(value))
    }

    pub fn update_in<P: Into<PathKey>>(
        &mut self,
        path: impl IntoIterator<Item = P>,
        update: impl FnOnce(Value) -> Value + 'static,
    ) -> Result<(), Error> {
        self.record_path(path, PathOpKind::Update(Box::new(update)))
    }

    pub fn delete_in<P: Into<PathKey>>(
        &mut self,
        path: impl IntoIterator<Item = P>,
    ) -> Result<(), Error> {
        self.record_path(path, PathOpKind::Delete)
    }

    /// Merge `fields` into the record at `path` (the root for an empty
    /// path).
    pub fn merge_in<P: Into<PathKey>, N: Into<Arc<str>>>(
        &mut self,
        path: impl IntoIterator<Item = P>,
        fields: impl IntoIterator<Item = (N, Value)>,
    ) -> Result<(), Error> {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.record_path(path, PathOpKind::Merge(fields))
    }

    fn record_path<P: Into<PathKey>>(
        &mut self,
        path: impl IntoIterator<Item = P>,
        kind: PathOpKind,
    ) -> Result<(), Error> {
        match &mut self.node {
            RecorderNode::Record(ops) => {
                ops.push(PathOp {
                    path: path.into_iter().map(Into::into).collect(),
                    kind,
                });
                Ok(())
            }
            _ => Err(self.mismatch("record")),
        }
    }

    // -- replay -------------------------------------------------------------

    fn replay(self, policy: &Policy, base: &Value) -> Result<Value, Error> {
        if is_wrapped(base) {
            return self.forward_to_draft(policy, base);
        }
        match self.node {
            RecorderNode::Scalar => Ok(base.clone()),
            RecorderNode::List(ops) => {
                let Value::List(handle) = base else {
                    unreachable!("recorder kind tracks the base")
                };
                replay_list(policy, handle, ops)
            }
            RecorderNode::Map(ops) => {
                let Value::Map(handle) = base else {
                    unreachable!("recorder kind tracks the base")
                };
                replay_map(policy, handle, ops)
            }
            RecorderNode::Set(ops) => {
                let Value::Set(handle) = base else {
                    unreachable!("recorder kind tracks the base")
                };
                replay_set(policy, handle, ops)
            }
            RecorderNode::Record(ops) => replay_record(policy, base, ops),
        }
    }

    /// A wrapped base takes the queue through an equivalent draft, so the
    /// persistent structures' own update paths are used.
    fn forward_to_draft(self, policy: &Policy, base: &Value) -> Result<Value, Error> {
        transform_with(policy, base, |draft| {
            match self.node {
                RecorderNode::Scalar => {}
                RecorderNode::List(ops) => {
                    for op in ops {
                        match op {
                            ListOp::Set(index, value) => draft.set_at(index, value)?,
                            ListOp::Delete(index) => {
                                draft.remove_at(index)?;
                            }
                            ListOp::Push(values) => {
                                for value in values {
                                    draft.push(value)?;
                                }
                            }
                            ListOp::Splice {
                                start,
                                delete,
                                insert,
                            } => {
                                draft.splice(start, delete, insert)?;
                            }
                            ListOp::Filter(keep) => draft.retain(keep)?,
                        }
                    }
                }
                RecorderNode::Map(ops) => {
                    for op in ops {
                        match op {
                            MapOp::Set(key, value) => draft.set_key(key, value)?,
                            MapOp::Delete(key) => {
                                draft.delete_key(&key)?;
                            }
                            MapOp::Clear => draft.clear()?,
                        }
                    }
                }
                RecorderNode::Set(ops) => {
                    for op in ops {
                        match op {
                            SetOp::Add(value) => {
                                draft.add(value)?;
                            }
                            SetOp::Delete(value) => {
                                draft.remove_value(&value)?;
                            }
                            SetOp::Clear => draft.clear()?,
                        }
                    }
                }
                RecorderNode::Record(ops) => {
                    for op in ops {
                        apply_path_on_draft(draft, op.path, op.kind)?;
                    }
                }
            }
            Ok(())
        })
    }
}

fn apply_path_on_draft(cursor: &mut Draft, path: Vec<PathKey>, kind: PathOpKind) -> Result<(), Error> {
    apply_path_steps(cursor, &path, kind)
}

fn apply_path_steps(cursor: &mut Draft, path: &[PathKey], kind: PathOpKind) -> Result<(), Error> {
    let Some((head, rest)) = path.split_first() else {
        return match kind {
            PathOpKind::Merge(fields) => cursor.merge(fields),
            _ => Err(Error::recipe("mutation path must not be empty")),
        };
    };

    if rest.is_empty() && !matches!(kind, PathOpKind::Merge(_)) {
        return match (head, kind) {
            (PathKey::Field(name), PathOpKind::Set(value)) => cursor.set(name.clone(), value),
            (PathKey::Field(name), PathOpKind::Update(f)) => {
                let old = cursor.get(name).unwrap_or(Value::Null);
                cursor.set(name.clone(), f(old))
            }
            (PathKey::Field(name), PathOpKind::Delete) => {
                cursor.delete(name)?;
                Ok(())
            }
            (PathKey::Index(index), PathOpKind::Set(value)) => cursor.set_at(*index, value),
            (PathKey::Index(index), PathOpKind::Update(f)) => {
                let old = cursor
                    .at(*index)
                    .ok_or_else(|| Error::out_of_range(*index, cursor.len()))?;
                cursor.set_at(*index, f(old))
            }
            (PathKey::Index(index), PathOpKind::Delete) => {
                cursor.remove_at(*index)?;
                Ok(())
            }
            (_, PathOpKind::Merge(_)) => unreachable!(),
        };
    }

    match head {
        PathKey::Field(name) => {
            if !cursor.has(name) {
                if kind.is_delete() {
                    return Ok(());
                }
                cursor.set(name.clone(), Value::record(Vec::<(Arc<str>, Value)>::new()))?;
            }
            apply_path_steps(cursor.child(name)?, rest, kind)
        }
        PathKey::Index(index) => apply_path_steps(cursor.child_at(*index)?, rest, kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::wrap_with;

    fn record_of(fields: &[(&str, i64)]) -> Value {
        Value::record(fields.iter().map(|(k, v)| (*k, Value::from(*v))))
    }

    #[test]
    fn sets_and_pushes_take_the_direct_path() {
        let base = Value::list((0..5).map(Value::from));
        let next = record_and_apply(&base, |r| {
            r.set_at(1, Value::from(10))?;
            r.push([Value::from(5), Value::from(6)])?;
            Ok(())
        })
        .unwrap();
        let Value::List(h) = &next else { panic!() };
        assert_eq!(h.len(), 7);
        assert_eq!(h.get(1), Some(&Value::from(10)));
        assert_eq!(h.get(6), Some(&Value::from(6)));
        // Base untouched.
        let Value::List(b) = &base else { panic!() };
        assert_eq!(b.get(1), Some(&Value::from(1)));
    }

    #[test]
    fn structural_list_ops_replay_in_order() {
        let base = Value::list((0..10).map(Value::from));
        let next = record_and_apply(&base, |r| {
            r.delete_at(0)?;
            r.splice(0, 2, [Value::from(100)])?;
            r.filter(|v| !matches!(v, Value::Int(i) if i % 2 == 0))?;
            Ok(())
        })
        .unwrap();
        let Value::List(h) = &next else { panic!() };
        let got: Vec<Value> = h.iter().cloned().collect();
        // After delete: 1..9; splice removes 1,2 inserts 100: [100,3..9];
        // filter keeps odd ints only.
        assert_eq!(
            got,
            vec![
                Value::from(3),
                Value::from(5),
                Value::from(7),
                Value::from(9)
            ]
        );
    }

    #[test]
    fn growing_past_the_threshold_wraps_the_result() {
        let policy = Policy { threshold: 8 };
        let base = Value::list((0..7).map(Value::from));
        assert!(!is_wrapped(&base));
        let next = record_and_apply_with(&policy, &base, |r| {
            r.push([Value::from(7)])?;
            Ok(())
        })
        .unwrap();
        assert!(is_wrapped(&next));
        let Value::List(h) = &next else { panic!() };
        assert_eq!(h.len(), 8);
    }

    #[test]
    fn wrapped_bases_forward_to_a_draft() {
        let policy = Policy { threshold: 4 };
        let base = wrap_with(&policy, Value::list((0..6).map(Value::from)));
        assert!(is_wrapped(&base));
        let next = record_and_apply_with(&policy, &base, |r| {
            r.set_at(0, Value::from(100))?;
            r.splice(1, 2, [])?;
            Ok(())
        })
        .unwrap();
        let Value::List(h) = &next else { panic!() };
        let got: Vec<Value> = h.iter().cloned().collect();
        assert_eq!(
            got,
            vec![
                Value::from(100),
                Value::from(3),
                Value::from(4),
                Value::from(5)
            ]
        );
    }

    #[test]
    fn clear_discards_earlier_map_ops() {
        let base = Value::map([(Value::from("a"), Value::from(1))]);
        let next = record_and_apply(&base, |r| {
            r.set_key(Value::from("b"), Value::from(2))?;
            r.clear()?;
            r.set_key(Value::from("c"), Value::from(3))?;
            Ok(())
        })
        .unwrap();
        let Value::Map(h) = &next else { panic!() };
        assert_eq!(h.len(), 1);
        assert_eq!(h.get(&Value::from("c")), Some(&Value::from(3)));
    }

    #[test]
    fn set_recorder_round_trip() {
        let base = Value::set([Value::from(1), Value::from(2)]);
        let next = record_and_apply(&base, |r| {
            r.add(Value::from(3))?;
            r.remove_value(Value::from(1))?;
            r.add(Value::from(2))?;
            Ok(())
        })
        .unwrap();
        let Value::Set(h) = &next else { panic!() };
        assert_eq!(h.len(), 2);
        assert!(h.contains(&Value::from(2)));
        assert!(h.contains(&Value::from(3)));
    }

    #[test]
    fn single_set_in_rebuilds_only_the_spine() {
        let shared = Value::record([("k", Value::from(1))]);
        let base = Value::record([
            ("a", Value::record([("x", Value::from(1))])),
            ("b", shared.clone()),
        ]);
        let next = record_and_apply(&base, |r| {
            r.set_in(["a", "x"], Value::from(9))
        })
        .unwrap();
        assert_eq!(next.get_path(&["a", "x"]), Some(Value::from(9)));
        assert!(next.get_path(&["b"]).unwrap().ptr_eq(&shared));
    }

    #[test]
    fn update_delete_and_merge_in() {
        let base = Value::record([
            ("n", Value::from(10)),
            ("gone", Value::from(1)),
            ("nested", Value::record([("keep", Value::from(2))])),
        ]);
        let next = record_and_apply(&base, |r| {
            r.update_in(["n"], |v| match v {
                Value::Int(i) => Value::from(i + 1),
                other => other,
            })?;
            r.delete_in(["gone"])?;
            r.merge_in(["nested"], [("added", Value::from(3))])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(next.get_path(&["n"]), Some(Value::from(11)));
        assert_eq!(next.get_path(&["gone"]), None);
        assert_eq!(next.get_path(&["nested", "keep"]), Some(Value::from(2)));
        assert_eq!(next.get_path(&["nested", "added"]), Some(Value::from(3)));
    }

    #[test]
    fn missing_intermediates_grow_records() {
        let base = Value::record(Vec::<(&str, Value)>::new());
        let next = record_and_apply(&base, |r| {
            r.set_in(["a", "b", "c"], Value::from(1))
        })
        .unwrap();
        assert_eq!(next.get_path(&["a", "b", "c"]), Some(Value::from(1)));
    }

    #[test]
    fn index_paths_traverse_lists() {
        let base = Value::record([(
            "items",
            Value::list([
                Value::record([("x", Value::from(1))]),
                Value::record([("x", Value::from(2))]),
            ]),
        )]);
        let next = record_and_apply(&base, |r| {
            r.set_in([PathKey::field("items"), PathKey::index(1), PathKey::field("x")], Value::from(20))
        })
        .unwrap();
        let items = next.get_path(&["items"]).unwrap();
        let Value::List(h) = &items else { panic!() };
        assert_eq!(h.get(1).unwrap().get_path(&["x"]), Some(Value::from(20)));
        // The untouched element is shared.
        let base_items = base.get_path(&["items"]).unwrap();
        let Value::List(bh) = &base_items else { panic!() };
        assert!(h.get(0).unwrap().ptr_eq(bh.get(0).unwrap()));
    }

    #[test]
    fn depth2_batch_under_one_parent() {
        let base = Value::record([
            ("p", record_of(&[("a", 1), ("b", 2), ("c", 3)])),
            ("other", record_of(&[("k", 9)])),
        ]);
        let next = record_and_apply(&base, |r| {
            r.set_in(["p", "a"], Value::from(10))?;
            r.set_in(["p", "b"], Value::from(20))?;
            r.set_in(["p", "d"], Value::from(40))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(next.get_path(&["p", "a"]), Some(Value::from(10)));
        assert_eq!(next.get_path(&["p", "b"]), Some(Value::from(20)));
        assert_eq!(next.get_path(&["p", "c"]), Some(Value::from(3)));
        assert_eq!(next.get_path(&["p", "d"]), Some(Value::from(40)));
        assert!(next
            .get_path(&["other"])
            .unwrap()
            .ptr_eq(&base.get_path(&["other"]).unwrap()));
    }

    #[test]
    fn shallow_batch_later_writes_win() {
        let base = record_of(&[("a", 1), ("b", 2)]);
        let next = record_and_apply(&base, |r| {
            r.set_in(["a"], Value::from(10))?;
            r.set_in(["a"], Value::from(11))?;
            r.update_in(["b"], |v| match v {
                Value::Int(i) => Value::from(i * 2),
                other => other,
            })?;
            Ok(())
        })
        .unwrap();
        assert_eq!(next.get_path(&["a"]), Some(Value::from(11)));
        assert_eq!(next.get_path(&["b"]), Some(Value::from(4)));
    }

    #[test]
    fn large_batches_build_a_mutation_tree() {
        let base = Value::record([
            ("counters", record_of(&(0..5).map(|i| (["c0", "c1", "c2", "c3", "c4"][i], i as i64)).collect::<Vec<_>>())),
            ("keep", record_of(&[("k", 7)])),
        ]);
        let next = record_and_apply(&base, |r| {
            // 25 mutations forces the tree path.
            for round in 0..5i64 {
                for c in ["c0", "c1", "c2", "c3", "c4"] {
                    r.set_in(["counters", c], Value::from(round))?;
                }
            }
            Ok(())
        })
        .unwrap();
        for c in ["c0", "c1", "c2", "c3", "c4"] {
            // Later writes at the same prefix replace earlier ones.
            assert_eq!(next.get_path(&["counters", c]), Some(Value::from(4)));
        }
        assert!(next
            .get_path(&["keep"])
            .unwrap()
            .ptr_eq(&base.get_path(&["keep"]).unwrap()));
    }

    #[test]
    fn a_parent_write_shadows_nested_writes() {
        let base = Value::record([("a", record_of(&[("x", 1)]))]);
        let next = record_and_apply(&base, |r| {
            // Pad with unrelated ops to reach the mutation-tree path.
            for i in 0..20i64 {
                r.set_in([format!("pad{}", i).as_str()], Value::from(i))?;
            }
            r.set_in(["a", "x"], Value::from(2))?;
            r.set_in(["a"], Value::record([("y", Value::from(3))]))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(next.get_path(&["a", "x"]), None);
        assert_eq!(next.get_path(&["a", "y"]), Some(Value::from(3)));
    }

    #[test]
    fn a_parent_update_also_shadows_nested_writes() {
        let base = Value::record([("a", record_of(&[("x", 1)]))]);
        let next = record_and_apply(&base, |r| {
            // Pad with unrelated ops to reach the mutation-tree path.
            for i in 0..20i64 {
                r.set_in([format!("pad{}", i).as_str()], Value::from(i))?;
            }
            r.set_in(["a", "x"], Value::from(2))?;
            r.update_in(["a"], |_| Value::record([("y", Value::from(3))]))?;
            Ok(())
        })
        .unwrap();
        // The update replaces the subtree; the earlier nested write must not
        // resurface on top of it.
        assert_eq!(next.get_path(&["a", "x"]), None);
        assert_eq!(next.get_path(&["a", "y"]), Some(Value::from(3)));
    }

    #[test]
    fn recipe_errors_leave_the_base_untouched() {
        let base = record_of(&[("a", 1)]);
        let result = record_and_apply(&base, |r| {
            r.set_in(["a"], Value::from(2))?;
            Err(Error::recipe("abort"))
        });
        assert!(matches!(result, Err(Error::Recipe(_))));
        assert_eq!(base.get_path(&["a"]), Some(Value::from(1)));
    }

    #[cfg(feature = "proptest")]
    mod props {
        use super::*;
        use proptest::prelude::*;

        const NAMES: [&str; 4] = ["a", "b", "c", "d"];

        fn grid() -> Value {
            Value::record(NAMES.map(|outer| {
                (
                    outer,
                    Value::record(NAMES.map(|inner| (inner, Value::from(0)))),
                )
            }))
        }

        proptest! {
            #[test]
            fn set_in_changes_exactly_its_path(o in 0usize..4, i in 0usize..4, v in any::<i64>()) {
                let base = grid();
                let next = record_and_apply(&base, |r| {
                    r.set_in([NAMES[o], NAMES[i]], Value::from(v))
                })
                .unwrap();
                for (oi, outer) in NAMES.iter().enumerate() {
                    for (ii, inner) in NAMES.iter().enumerate() {
                        let expect = if oi == o && ii == i { v } else { 0 };
                        prop_assert_eq!(next.get_path(&[outer, inner]), Some(Value::from(expect)));
                    }
                    if oi != o {
                        prop_assert!(next
                            .get_path(&[outer])
                            .unwrap()
                            .ptr_eq(&base.get_path(&[outer]).unwrap()));
                    }
                }
            }

            #[test]
            fn delete_in_removes_exactly_its_path(o in 0usize..4, i in 0usize..4) {
                let base = grid();
                let next = record_and_apply(&base, |r| r.delete_in([NAMES[o], NAMES[i]])).unwrap();
                for (oi, outer) in NAMES.iter().enumerate() {
                    for (ii, inner) in NAMES.iter().enumerate() {
                        let got = next.get_path(&[outer, inner]);
                        if oi == o && ii == i {
                            prop_assert_eq!(got, None);
                        } else {
                            prop_assert_eq!(got, Some(Value::from(0)));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn recording_against_the_wrong_kind_is_rejected() {
        let base = Value::list([Value::from(1)]);
        let result = record_and_apply(&base, |r| r.set_key(Value::from(1), Value::from(2)));
        assert!(matches!(
            result,
            Err(Error::KindMismatch {
                expected: "map",
                found: "list"
            })
        ));
    }
}
