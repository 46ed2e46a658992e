use thicket::adaptive::{wrap_with, Policy};
use thicket::{is_wrapped, record_and_apply_with, transform_with, unwrap, Value};

const POLICY: Policy = Policy { threshold: 16 };

#[test]
fn recipes_upgrade_at_the_boundary() {
    let base = Value::list((0..15).map(Value::from));
    assert!(!is_wrapped(&base));

    let grown = record_and_apply_with(&POLICY, &base, |r| {
        r.push([Value::from(15)])?;
        Ok(())
    })
    .unwrap();
    assert!(is_wrapped(&grown));
    let Value::List(h) = &grown else { panic!() };
    assert_eq!(h.len(), 16);
    assert_eq!(h.get(15), Some(&Value::from(15)));
}

#[test]
fn drafts_downgrade_below_the_boundary() {
    let base = wrap_with(&POLICY, Value::list((0..16).map(Value::from)));
    assert!(is_wrapped(&base));

    let shrunk = transform_with(&POLICY, &base, |d| {
        d.pop()?;
        Ok(())
    })
    .unwrap();
    assert!(!is_wrapped(&shrunk));
    let Value::List(h) = &shrunk else { panic!() };
    assert_eq!(h.len(), 15);
}

#[test]
fn boundary_crossings_round_trip_without_loss() {
    let mut value = Value::list((0..15).map(Value::from));
    // Bounce across the threshold a few times.
    for round in 0..4i64 {
        value = record_and_apply_with(&POLICY, &value, |r| {
            r.push([Value::from(100 + round), Value::from(200 + round)])?;
            Ok(())
        })
        .unwrap();
        value = transform_with(&POLICY, &value, |d| {
            d.pop()?;
            d.pop()?;
            Ok(())
        })
        .unwrap();
    }
    let expect = Value::list((0..15).map(Value::from));
    assert_eq!(unwrap(&value), expect);
    assert!(!is_wrapped(&value));
}

#[test]
fn maps_and_records_adapt_too() {
    let base = Value::record((0..15).map(|i| (format!("f{}", i), Value::from(i))));
    let grown = record_and_apply_with(&POLICY, &base, |r| {
        r.set_in(["f15"], Value::from(15))?;
        Ok(())
    })
    .unwrap();
    assert!(is_wrapped(&grown));
    assert_eq!(grown.get_path(&["f3"]), Some(Value::from(3)));
    assert_eq!(grown.get_path(&["f15"]), Some(Value::from(15)));

    let back = transform_with(&POLICY, &grown, |d| {
        d.delete("f15")?;
        Ok(())
    })
    .unwrap();
    assert!(!is_wrapped(&back));
    assert_eq!(back.get_path(&["f3"]), Some(Value::from(3)));
}

#[test]
fn both_protocols_share_one_policy() -> anyhow::Result<()> {
    let base = Value::list((0..15).map(Value::from));
    let via_recipe = record_and_apply_with(&POLICY, &base, |r| {
        r.push([Value::from(15)])?;
        Ok(())
    })?;
    let via_draft = transform_with(&POLICY, &base, |d| {
        d.push(Value::from(15))?;
        Ok(())
    })?;
    assert!(is_wrapped(&via_recipe));
    assert!(is_wrapped(&via_draft));
    assert_eq!(unwrap(&via_recipe), unwrap(&via_draft));
    Ok(())
}
