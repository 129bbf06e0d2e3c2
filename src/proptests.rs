use super::*;

use crate::persist::{decode_members, encode_members};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn validate_trie(t: &RadixTrie) {
    let issues = t.check_invariants();
    assert!(issues.is_empty(), "{issues:?}\n{}", t.dump());
}

fn model_members(m: &BTreeMap<Vec<u8>, u64>) -> Vec<Member> {
    m.iter()
        .map(|(k, &count)| Member {
            key: k.clone(),
            count,
        })
        .collect()
}

#[derive(Clone, Debug)]
enum Op {
    Add(Vec<u8>),
    Delete(Vec<u8>),
    Has(Vec<u8>),
    Prefix(Vec<u8>),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A narrow alphabet forces shared segments, splits and merges; the
    // high bytes cover keys that are not valid UTF-8.
    let byte = prop_oneof![
        4 => prop::sample::select(vec![b'a', b'b', b'c']),
        1 => any::<u8>(),
    ];
    prop::collection::vec(byte, 0..=8)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        40 => key.clone().prop_map(Op::Add),
        30 => key.clone().prop_map(Op::Delete),
        15 => key.clone().prop_map(Op::Has),
        15 => key.clone().prop_map(Op::Prefix),
    ];
    prop::collection::vec(op, 0..=500)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t = RadixTrie::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Add(key) => {
                    let got = t.add(&key).count();
                    let expected = m.entry(key).or_insert(0);
                    *expected += 1;
                    prop_assert_eq!(got, *expected);
                }
                Op::Delete(key) => {
                    let expected = !key.is_empty()
                        && match m.get(&key).copied() {
                            Some(1) => {
                                m.remove(&key);
                                true
                            }
                            Some(count) => {
                                m.insert(key.clone(), count - 1);
                                true
                            }
                            None => false,
                        };
                    prop_assert_eq!(t.delete(&key), expected);
                }
                Op::Has(key) => {
                    let expected = m.get(&key).copied().unwrap_or(0);
                    prop_assert_eq!(t.has_count(&key), (expected > 0, expected));
                }
                Op::Prefix(prefix) => {
                    let expected: u64 = m
                        .iter()
                        .filter(|(k, _)| k.starts_with(&prefix))
                        .map(|(_, c)| c)
                        .sum();
                    prop_assert_eq!(t.has_prefix_count(&prefix), (expected > 0, expected));
                    let got = t.prefix_members(&prefix);
                    let want: Vec<Member> = model_members(&m)
                        .into_iter()
                        .filter(|member| member.key.starts_with(&prefix))
                        .collect();
                    prop_assert_eq!(got, want);
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(&t);
        prop_assert_eq!(t.members(), model_members(&m));
    }

    #[test]
    fn prop_delete_everything_restores_fresh(keys in prop::collection::vec(key_strategy(), 0..=64)) {
        let mut t = RadixTrie::new();
        for key in &keys {
            t.add(key);
        }
        validate_trie(&t);

        // The empty key cannot be deleted.
        let mut pending: Vec<&Vec<u8>> = keys.iter().filter(|k| !k.is_empty()).collect();
        pending.reverse();
        for key in pending {
            prop_assert!(t.delete(key));
            validate_trie(&t);
        }

        if keys.iter().any(|k| k.is_empty()) {
            prop_assert_eq!(t.len(), 1);
        } else {
            prop_assert_eq!(t, RadixTrie::new());
        }
    }

    #[test]
    fn prop_dump_roundtrip(keys in prop::collection::vec(key_strategy(), 0..=64)) {
        let t: RadixTrie = keys.iter().collect();
        let mut buf = Vec::new();
        encode_members(&t.members(), &mut buf);
        let decoded = decode_members(&buf).unwrap();
        prop_assert_eq!(&decoded, &t.members());

        let mut rebuilt = RadixTrie::new();
        for member in &decoded {
            rebuilt.add(&member.key).set_count(std::num::NonZeroU64::new(member.count).unwrap());
        }
        validate_trie(&rebuilt);
        prop_assert_eq!(rebuilt.members(), t.members());
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_SET: [&[u8]; 6] = [b"a", b"b", b"ab", b"abc", b"abd", b"ba"];

#[test]
fn exhaustive_insert_order_small_set() {
    let mut expected: Option<RadixTrie> = None;
    for_each_permutation(&SMALL_SET, |perm| {
        let t: RadixTrie = perm.into_iter().collect();
        validate_trie(&t);
        // Shape depends only on the key set, never on insertion order.
        let first = expected.get_or_insert_with(|| t.clone());
        assert_eq!(&t, first, "\n{}", t.dump());
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let base: RadixTrie = SMALL_SET.iter().collect();

    for_each_permutation(&SMALL_SET, |perm| {
        let mut t = base.clone();
        let mut remaining = SMALL_SET.len();
        for k in perm {
            assert!(t.delete(k));
            remaining -= 1;
            assert_eq!(t.len(), remaining);
            validate_trie(&t);
        }
        assert_eq!(t, RadixTrie::new());
    });
}

#[test]
fn exhaustive_remove_order_with_repeats() {
    let mut base = RadixTrie::new();
    for (i, k) in SMALL_SET.iter().enumerate() {
        for _ in 0..=i % 2 {
            base.add(k);
        }
    }

    for_each_permutation(&SMALL_SET, |perm| {
        let mut t = base.clone();
        // First pass only decrements the doubled entries.
        for k in &perm {
            assert!(t.delete(k));
            validate_trie(&t);
        }
        assert_eq!(t.len(), SMALL_SET.len() / 2);
        for k in &perm {
            let live = t.has(k);
            assert_eq!(t.delete(k), live);
        }
        assert_eq!(t, RadixTrie::new());
    });
}
