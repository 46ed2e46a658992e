use thicket::hamt::{Hamt, KeyHash};
use thicket::owner::OwnerTag;

const NONE: OwnerTag = OwnerTag::NONE;

/// A key type whose hash is forced to a constant.
#[derive(Debug, Clone, PartialEq)]
struct ZeroHash(&'static str);

impl KeyHash for ZeroHash {
    fn hash32(&self) -> u32 {
        0
    }
    fn key_eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[test]
fn colliding_keys_survive_each_other() {
    let mut map: Hamt<ZeroHash, i64> = Hamt::new();
    map.insert(NONE, ZeroHash("first"), 1);
    map.insert(NONE, ZeroHash("second"), 2);
    assert_eq!(map.len(), 2);

    assert_eq!(map.remove(NONE, &ZeroHash("first")), Some(1));
    assert_eq!(map.get(&ZeroHash("second")), Some(&2));
    assert_eq!(map.get(&ZeroHash("first")), None);
    assert_eq!(map.len(), 1);
}

#[test]
fn long_collision_chains() {
    let names = [
        "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l",
    ];
    let mut map: Hamt<ZeroHash, usize> = Hamt::new();
    for (i, name) in names.iter().enumerate() {
        map.insert(NONE, ZeroHash(name), i);
    }
    assert_eq!(map.len(), names.len());
    for (i, name) in names.iter().enumerate() {
        assert_eq!(map.get(&ZeroHash(name)), Some(&i));
    }
    // Tear the chain down to a single survivor.
    for name in &names[..names.len() - 1] {
        assert!(map.remove(NONE, &ZeroHash(name)).is_some());
    }
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&ZeroHash("l")), Some(&11));
}

#[test]
fn rebinding_inside_a_chain() {
    let mut map: Hamt<ZeroHash, i64> = Hamt::new();
    map.insert(NONE, ZeroHash("x"), 1);
    map.insert(NONE, ZeroHash("y"), 2);
    map.insert(NONE, ZeroHash("x"), 10);
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&ZeroHash("x")), Some(&10));
    assert_eq!(map.get(&ZeroHash("y")), Some(&2));
}
