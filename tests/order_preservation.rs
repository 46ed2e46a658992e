use thicket::{record_and_apply, transform, wrap_ordered, Value};

fn keys_of(value: &Value) -> Vec<String> {
    match value {
        Value::Map(h) => h.iter().map(|(k, _)| format!("{:?}", k)).collect(),
        Value::Set(h) => h.iter().map(|v| format!("{:?}", v)).collect(),
        other => panic!("expected a keyed container, got {:?}", other),
    }
}

#[test]
fn ordered_map_yields_surviving_inserts() {
    let base = wrap_ordered(Value::map([
        (Value::from("c"), Value::from(0)),
        (Value::from("a"), Value::from(1)),
        (Value::from("b"), Value::from(2)),
    ]));

    let next = transform(&base, |d| {
        d.delete_key(&Value::from("a"))?;
        Ok(())
    })
    .unwrap();
    assert_eq!(keys_of(&next), vec!["\"c\"", "\"b\""]);

    let next = transform(&next, |d| {
        d.set_key(Value::from("a"), Value::from(9))?;
        Ok(())
    })
    .unwrap();
    assert_eq!(keys_of(&next), vec!["\"c\"", "\"b\"", "\"a\""]);
}

#[test]
fn ordered_set_round_trip_through_recipes() {
    let base = wrap_ordered(Value::set([
        Value::from("c"),
        Value::from("a"),
        Value::from("b"),
    ]));
    let next = record_and_apply(&base, |r| {
        r.remove_value(Value::from("a"))?;
        r.add(Value::from("a"))?;
        Ok(())
    })
    .unwrap();
    assert_eq!(keys_of(&next), vec!["\"c\"", "\"b\"", "\"a\""]);
}

#[test]
fn rebinding_keeps_the_original_slot() {
    let base = wrap_ordered(Value::map([
        (Value::from("x"), Value::from(1)),
        (Value::from("y"), Value::from(2)),
    ]));
    let next = transform(&base, |d| {
        d.set_key(Value::from("x"), Value::from(10))?;
        Ok(())
    })
    .unwrap();
    assert_eq!(keys_of(&next), vec!["\"x\"", "\"y\""]);
    let Value::Map(h) = &next else { panic!() };
    assert_eq!(h.get(&Value::from("x")), Some(&Value::from(10)));
}

#[test]
fn record_fields_keep_insertion_order() {
    let base = Value::record([
        ("c", Value::from(0)),
        ("a", Value::from(1)),
        ("b", Value::from(2)),
    ]);
    let next = transform(&base, |d| {
        d.delete("a")?;
        d.set("a", Value::from(9))?;
        Ok(())
    })
    .unwrap();
    let Value::Record(h) = &next else { panic!() };
    let names: Vec<String> = h.iter().map(|(k, _)| k.to_string()).collect();
    assert_eq!(names, vec!["c", "b", "a"]);
}
