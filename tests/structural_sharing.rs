use thicket::{transform, unwrap, wrap, Value};

#[test]
fn untouched_branches_share_their_allocation() {
    let base = wrap(Value::record([
        ("a", Value::record([("x", Value::from(1))])),
        ("b", Value::record([("y", Value::from(2))])),
    ]));

    let next = transform(&base, |d| {
        d.child("a")?.set("x", Value::from(100))?;
        Ok(())
    })
    .unwrap();

    let base_b = unwrap(&base).get_path(&["b"]).unwrap();
    let next_b = unwrap(&next).get_path(&["b"]).unwrap();
    assert!(next_b.ptr_eq(&base_b));

    let base_a = unwrap(&base).get_path(&["a"]).unwrap();
    let next_a = unwrap(&next).get_path(&["a"]).unwrap();
    assert!(!next_a.ptr_eq(&base_a));

    assert_eq!(next.get_path(&["a", "x"]), Some(Value::from(100)));
    assert_eq!(base.get_path(&["a", "x"]), Some(Value::from(1)));
}

#[test]
fn empty_and_read_only_transforms_return_the_base() {
    let base = Value::record([("f", Value::record([("inner", Value::from(1))]))]);

    let next = transform(&base, |_| Ok(())).unwrap();
    assert!(next.ptr_eq(&base));

    let next = transform(&base, |d| {
        let child = d.child("f")?;
        let _ = child.get("inner");
        Ok(())
    })
    .unwrap();
    assert!(next.ptr_eq(&base));
}

#[test]
fn sibling_transforms_from_one_base_never_interfere() {
    let base = Value::record([
        ("left", Value::record([("v", Value::from(1))])),
        ("right", Value::record([("v", Value::from(2))])),
    ]);

    let first = transform(&base, |d| d.child("left")?.set("v", Value::from(10))).unwrap();
    let second = transform(&base, |d| d.child("right")?.set("v", Value::from(20))).unwrap();

    assert_eq!(base.get_path(&["left", "v"]), Some(Value::from(1)));
    assert_eq!(base.get_path(&["right", "v"]), Some(Value::from(2)));
    assert_eq!(first.get_path(&["left", "v"]), Some(Value::from(10)));
    assert_eq!(first.get_path(&["right", "v"]), Some(Value::from(2)));
    assert_eq!(second.get_path(&["left", "v"]), Some(Value::from(1)));
    assert_eq!(second.get_path(&["right", "v"]), Some(Value::from(20)));
}
