#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can walk
// the chains directly after every operation.

use crate::chained_hash_map::tests::{census, IdentityState};
use crate::chained_hash_map::ChainedHashMap;
use crate::config::MapConfig;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=48).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            8 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            3 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drive one scenario against a std HashMap model. After every op:
// - chain census: reachable nodes == len, each node in its digest's bucket,
//   no duplicate keys, cached digests unchanged;
// - len/is_empty parity with the model;
// - capacity never shrinks (clear keeps it) and stays a power of two within
//   the ceiling.
fn run_scenario<S: BuildHasher>(
    mut sut: ChainedHashMap<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut last_capacity = sut.capacity();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let prev = sut.insert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k.clone(), v));
                prop_assert_eq!(sut.get(&k), Some(&v));
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let before = sut.len();
                let removed = sut.remove(&k);
                let expected = model.remove(&k).is_some();
                prop_assert_eq!(removed, expected);
                prop_assert_eq!(sut.len(), if expected { before - 1 } else { before });
                prop_assert!(sut.get(&k).is_none());
            }
            OpI::Get(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.get(k.0.as_str()), model.get(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                match (sut.get_mut(&k), model.get_mut(&k)) {
                    (Some(sv), Some(mv)) => {
                        *sv = sv.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (None, None) => {}
                    (s, m) => prop_assert!(false, "presence mismatch: {:?} vs {:?}", s, m),
                }
            }
            OpI::Clear => {
                let cap = sut.capacity();
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.capacity(), cap);
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
        }

        prop_assert_eq!(census(&sut), model.len());
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.capacity() >= last_capacity, "capacity shrank");
        last_capacity = sut.capacity();
    }

    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

// Property: state-machine equivalence with std::collections::HashMap under
// the default configuration, with enough keys to cross several thresholds.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(ChainedHashMap::new(), pool, ops)?;
    }
}

// Property: the same, starting from a single bucket with a small ceiling so
// growth fires early and then freezes.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_tiny_table((pool, ops) in arb_scenario()) {
        let sut = ChainedHashMap::with_config(
            MapConfig::new().initial_capacity(1).maximum_capacity(8),
        ).unwrap();
        run_scenario(sut, pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same invariants when every key shares one digest and therefore
// one chain, across any number of resizes.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(ChainedHashMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Property: with identity hashing, any batch of distinct integer keys
// survives every resize, and the final capacity is at most one doubling past
// what `len / load_factor` needs.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_growth_preserves_content(keys in proptest::collection::btree_set(any::<u64>(), 0..400)) {
        let mut m: ChainedHashMap<u64, u64, IdentityState> =
            ChainedHashMap::with_hasher(IdentityState::default());
        for &k in &keys {
            prop_assert_eq!(m.insert(k, !k), None);
        }
        prop_assert_eq!(census(&m), keys.len());
        for &k in &keys {
            prop_assert_eq!(m.get(&k), Some(&!k));
        }
        if !keys.is_empty() {
            let expected = (keys.len() as f64 / 0.75).ceil() as usize;
            prop_assert!(m.capacity() >= 16);
            prop_assert!(m.capacity() < 2 * expected.max(16) + 2);
        }
    }
}
