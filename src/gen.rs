//! proptest strategies for arbitrary value trees.

use proptest::prelude::*;

use crate::value::Value;

pub fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_map(Value::from),
        "[a-z0-9]{0,12}".prop_map(Value::from),
    ]
}

/// Value trees of bounded depth across all container kinds.
pub fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::list),
            prop::collection::vec(("[a-z]{1,6}", inner.clone()), 0..8)
                .prop_map(|fields| Value::record(fields)),
            prop::collection::vec((inner.clone(), inner.clone()), 0..8).prop_map(Value::map),
            prop::collection::vec(inner, 0..8).prop_map(Value::set),
        ]
    })
}

/// Records whose fields are scalars or flat containers, for draft and
/// recipe tests that need nested paths to exist.
pub fn shallow_record() -> impl Strategy<Value = Value> {
    prop::collection::vec(("[a-z]{1,6}", scalar()), 0..12).prop_map(|fields| Value::record(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_values_are_self_equal(v in value()) {
            prop_assert_eq!(&v, &v.clone());
        }
    }
}
