#![cfg(test)]

// Property tests for both map variants kept inside the crate so they can
// reach the full structural checker alongside the public surface.

use crate::{Error, IterativeRbMap, OrderedMap, RecursiveRbMap};
use proptest::prelude::*;
use std::collections::BTreeMap;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, the pool shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Set(usize, i32),
    Remove(usize),
    RemoveMin,
    Get(usize),
    Mutate(usize, i32),
    Extremes,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<u16>, Vec<OpI>)> {
    proptest::collection::vec(any::<u16>(), 1..=48).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Set(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            1 => Just(OpI::RemoveMin),
            1 => idx.clone().prop_map(OpI::Get),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Extremes),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Smallest h with 2^h >= n + 1, i.e. ceil(log2(n + 1)).
fn ceil_log2_plus_one(n: usize) -> usize {
    (usize::BITS - n.leading_zeros()) as usize
}

// Runs one scenario against `sut` and a BTreeMap model, checking after each
// step:
// - in-order keys equal the model's sorted keys, with matching values;
// - the coloring laws and the full structural check hold;
// - `len` equals both the model size and the in-order count;
// - height stays within 2 * ceil(log2(len + 1)).
fn run_state_machine<M>(mut sut: M, pool: &[u16], ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    M: OrderedMap<u16, i32>,
{
    let mut model: BTreeMap<u16, i32> = BTreeMap::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i];
                prop_assert_eq!(sut.insert(k, v), model.insert(k, v));
                prop_assert!(sut.contains_key(&k));
                prop_assert_eq!(sut.get(&k), Ok(&v));
            }
            OpI::Set(i, v) => {
                let k = pool[i];
                sut.set(k, v);
                model.insert(k, v);
            }
            OpI::Remove(i) => {
                let k = pool[i];
                prop_assert_eq!(sut.remove(&k), model.remove_entry(&k));
                prop_assert!(!sut.contains_key(&k));
                prop_assert_eq!(sut.get(&k), Err(Error::KeyNotFound));
            }
            OpI::RemoveMin => {
                let expected = model.pop_first();
                prop_assert_eq!(sut.remove_min(), expected);
            }
            OpI::Get(i) => {
                let k = pool[i];
                prop_assert_eq!(sut.get(&k).ok(), model.get(&k));
            }
            OpI::Mutate(i, d) => {
                let k = pool[i];
                match (sut.get_mut(&k), model.get_mut(&k)) {
                    (Some(s), Some(m)) => {
                        *s = s.wrapping_add(d);
                        *m = m.wrapping_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "get_mut presence differs from model"),
                }
            }
            OpI::Extremes => {
                let min = model.first_key_value().ok_or(Error::EmptyTree);
                let max = model.last_key_value().ok_or(Error::EmptyTree);
                prop_assert_eq!(sut.min(), min);
                prop_assert_eq!(sut.max(), max);
            }
        }

        // Post-conditions after each op
        let in_order: Vec<(u16, i32)> = sut.in_order().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u16, i32)> = model.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(&in_order, &expected);
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.is_valid_red_black_tree());
        prop_assert_eq!(sut.check_structure(), Ok(()));
        prop_assert!(sut.height() <= 2 * ceil_log2_plus_one(sut.len()));
        prop_assert_eq!(sut.iter().count(), model.len());
    }
    Ok(())
}

// Property: state-machine equivalence of the recursive variant against
// std::collections::BTreeMap.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_recursive_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(RecursiveRbMap::new(), &pool, ops)?;
    }

    #[test]
    fn prop_iterative_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(IterativeRbMap::new(), &pool, ops)?;
    }
}

// Property: draining with `remove_min` yields the sorted distinct input and
// leaves the map empty after exactly `n` calls.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_drain_is_sorted(keys in proptest::collection::vec(any::<i64>(), 0..200)) {
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();

        let mut rec: RecursiveRbMap<i64, ()> = keys.iter().map(|&k| (k, ())).collect();
        let mut it: IterativeRbMap<i64, ()> = keys.iter().map(|&k| (k, ())).collect();
        prop_assert_eq!(rec.len(), sorted.len());
        prop_assert_eq!(it.len(), sorted.len());

        let mut from_rec = Vec::new();
        let mut from_it = Vec::new();
        for _ in 0..sorted.len() {
            from_rec.push(rec.remove_min().expect("non-empty").0);
            from_it.push(it.remove_min().expect("non-empty").0);
        }
        prop_assert_eq!(&from_rec, &sorted);
        prop_assert_eq!(&from_it, &sorted);
        prop_assert!(rec.is_empty() && it.is_empty());
        prop_assert_eq!(rec.remove_min(), None);
        prop_assert_eq!(it.remove_min(), None);
    }
}

#[test]
fn ceil_log2_plus_one_matches_definition() {
    assert_eq!(ceil_log2_plus_one(0), 0);
    assert_eq!(ceil_log2_plus_one(1), 1);
    assert_eq!(ceil_log2_plus_one(2), 2);
    assert_eq!(ceil_log2_plus_one(3), 2);
    assert_eq!(ceil_log2_plus_one(4), 3);
    assert_eq!(ceil_log2_plus_one(7), 3);
    assert_eq!(ceil_log2_plus_one(8), 4);
}
