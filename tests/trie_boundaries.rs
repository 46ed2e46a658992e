use thicket::owner::OwnerTag;
use thicket::Vector;

// Pushing one past every trie boundary must keep all entries addressable,
// including across the root growth at 1024 elements.
#[test]
fn push_through_level_growth() {
    let mut v: Vector<usize> = Vector::new();
    for i in 0..1025 {
        v.push_mut(OwnerTag::NONE, i);
        for probe in [0, i / 2, i] {
            assert_eq!(v.get(probe), Some(&probe), "after push {}", i);
        }
        assert_eq!(v.len(), i + 1);
    }
    for i in 0..1025 {
        assert_eq!(v.get(i), Some(&i));
    }
}

// Same content built in bulk must agree with the incremental build.
#[test]
fn bulk_build_agrees_with_pushes() {
    let bulk: Vector<usize> = (0..1025).collect();
    let mut pushed: Vector<usize> = Vector::new();
    for i in 0..1025 {
        pushed.push_mut(OwnerTag::NONE, i);
    }
    assert_eq!(bulk, pushed);
}

#[test]
fn pop_walks_back_down() {
    let mut v: Vector<usize> = (0..1056).collect();
    for expect in (0..1056).rev() {
        let (next, value) = v.pop(OwnerTag::NONE);
        assert_eq!(value, Some(expect));
        v = next;
    }
    assert!(v.is_empty());
}

#[test]
fn random_point_updates_match_a_vec() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let mut v: Vector<usize> = (0..1500).collect();
    let mut oracle: Vec<usize> = (0..1500).collect();
    for _ in 0..2000 {
        let i = rng.gen_range(0..oracle.len());
        let x = rng.gen::<usize>();
        v = v.assoc(OwnerTag::NONE, i, x).unwrap();
        oracle[i] = x;
    }
    assert_eq!(v.to_vec(), oracle);
}
