//! Integration tests for associative updates, conj and copy-on-write.

use weft::sorted_set::{Bound, subseq_range};
use weft::{
    Error, Value, assoc, assoc_in, assoc_mut, conj, contains, count, dissoc, get, get_in, hash_map,
    into, lazy, list, merge, merge_with, record, sorted_set, to_vec, update_in, vector,
};

fn ints(ns: &[i64]) -> Value {
    vector(ns.iter().map(|n| Value::int(*n)).collect())
}

fn k(s: &str) -> Value {
    Value::from(s)
}

// ============================================================================
// Copy-on-write
// ============================================================================

#[test]
fn test_assoc_leaves_original_untouched() {
    let m = hash_map(vec![(k("a"), Value::int(1))]);
    let m2 = assoc(&m, k("b"), Value::int(2)).unwrap();
    assert_eq!(get(&m, &k("b")), Value::Nil);
    assert_eq!(get(&m2, &k("b")), Value::int(2));
    assert_eq!(get(&m2, &k("a")), Value::int(1));
}

#[test]
fn test_mutating_form_is_visible_through_aliases() {
    let m = hash_map(vec![]);
    let alias = m.clone();
    assoc_mut(&m, k("x"), Value::int(9)).unwrap();
    assert_eq!(get(&alias, &k("x")), Value::int(9));
}

#[test]
fn test_dissoc_undoes_assoc_of_fresh_key() {
    let m = hash_map(vec![(k("a"), Value::int(1)), (k("b"), Value::int(2))]);
    let added = assoc(&m, k("c"), Value::int(3)).unwrap();
    assert_eq!(dissoc(&added, &[k("c")]).unwrap(), m);

    let r = record(vec![("name", k("ada"))]);
    let r2 = assoc(&r, k("age"), Value::int(36)).unwrap();
    assert_eq!(dissoc(&r2, &[k("age")]).unwrap(), r);
}

// ============================================================================
// Nested paths
// ============================================================================

#[test]
fn test_assoc_in_builds_missing_levels() {
    let m = assoc_in(&Value::Nil, &[k("a"), k("b"), k("c")], Value::int(1)).unwrap();
    assert_eq!(get_in(&m, &[k("a"), k("b"), k("c")]), Value::int(1));
}

#[test]
fn test_assoc_in_copies_every_level_on_the_path() {
    let inner = hash_map(vec![(k("n"), Value::int(1))]);
    let outer = hash_map(vec![(k("inner"), inner.clone())]);
    let updated = update_in(&outer, &[k("inner"), k("n")], |v| {
        Ok(Value::int(v.as_int().unwrap_or(0) + 1))
    })
    .unwrap();
    assert_eq!(get(&inner, &k("n")), Value::int(1));
    assert_eq!(get_in(&updated, &[k("inner"), k("n")]), Value::int(2));
}

#[test]
fn test_assoc_in_with_empty_path_is_illegal() {
    assert!(matches!(
        assoc_in(&hash_map(vec![]), &[], Value::int(1)),
        Err(Error::IllegalArgument { .. })
    ));
}

#[test]
fn test_array_assoc_bounds() {
    let v = ints(&[1, 2]);
    assert_eq!(assoc(&v, Value::int(2), Value::int(3)).unwrap(), ints(&[1, 2, 3]));
    assert!(matches!(
        assoc(&v, Value::int(5), Value::int(3)),
        Err(Error::IndexOutOfBounds { index: 5, len: 2 })
    ));
}

// ============================================================================
// Conj and into
// ============================================================================

#[test]
fn test_conj_position_follows_kind() {
    assert_eq!(conj(&ints(&[1]), &[Value::int(2)]).unwrap(), ints(&[1, 2]));
    let l = conj(&Value::list(vec![Value::int(1)]), &[Value::int(2)]).unwrap();
    assert_eq!(to_vec(&l).unwrap(), vec![Value::int(2), Value::int(1)]);
    let from_nil = conj(&Value::Nil, &[Value::int(1), Value::int(2)]).unwrap();
    assert_eq!(to_vec(&from_nil).unwrap(), vec![Value::int(2), Value::int(1)]);
}

#[test]
fn test_into_sorted_set_keeps_order() {
    let s = into(&sorted_set(vec![]).unwrap(), &ints(&[5, 1, 3, 1])).unwrap();
    assert_eq!(to_vec(&s).unwrap(), vec![Value::int(1), Value::int(3), Value::int(5)]);
    let mid = subseq_range(&s, Bound::Gt, &Value::int(1), Bound::Le, &Value::int(5)).unwrap();
    assert_eq!(mid, ints(&[3, 5]));
}

#[test]
fn test_contains_distinguishes_nil_value_from_absent_key() {
    let m = hash_map(vec![(k("a"), Value::Nil)]);
    assert_eq!(get(&m, &k("a")), Value::Nil);
    assert!(contains(&m, &k("a")).unwrap());
    assert!(!contains(&m, &k("b")).unwrap());
    assert!(contains(&ints(&[7]), &Value::int(0)).unwrap());
}

#[test]
fn test_merge_later_wins() {
    let a = hash_map(vec![(k("x"), Value::int(1)), (k("y"), Value::int(1))]);
    let b = hash_map(vec![(k("y"), Value::int(2))]);
    let m = merge(&[a.clone(), Value::Nil, b]).unwrap();
    assert_eq!(get(&m, &k("x")), Value::int(1));
    assert_eq!(get(&m, &k("y")), Value::int(2));
    assert_eq!(get(&a, &k("y")), Value::int(1));
    assert_eq!(merge(&[Value::Nil, Value::Nil]).unwrap(), Value::Nil);
}

#[test]
fn test_map_takes_entries_from_any_seqable_of_pairs() {
    let pair = |key: &str, n: i64| vector(vec![k(key), Value::int(n)]);
    let from_list = conj(&hash_map(vec![]), &[list(vec![pair("a", 1), pair("b", 2)])]).unwrap();
    assert_eq!(count(&from_list).unwrap(), 2);
    assert_eq!(get(&from_list, &k("b")), Value::int(2));

    let pairs = lazy::map(|x| Ok(vector(vec![x.clone(), x])), &lazy::range_to(3));
    let merged = merge(&[hash_map(vec![(k("z"), Value::int(9))]), pairs]).unwrap();
    assert_eq!(count(&merged).unwrap(), 4);
    assert_eq!(get(&merged, &Value::int(2)), Value::int(2));

    let r = conj(&record(vec![]), &[list(vec![list(vec![k("name"), k("ada")])])]).unwrap();
    assert_eq!(get(&r, &k("name")), k("ada"));

    let summed = merge_with(
        |a, b| Ok(Value::int(a.as_int().unwrap_or(0) + b.as_int().unwrap_or(0))),
        &[hash_map(vec![(k("a"), Value::int(1))]), list(vec![pair("a", 2)])],
    )
    .unwrap();
    assert_eq!(get(&summed, &k("a")), Value::int(3));
}

#[test]
fn test_map_rejects_malformed_entries() {
    let m = hash_map(vec![]);
    assert!(matches!(
        conj(&m, &[ints(&[1, 2, 3])]),
        Err(Error::IllegalArgument { op: "conj", .. })
    ));
    assert!(matches!(
        conj(&m, &[list(vec![Value::int(1)])]),
        Err(Error::UnsupportedType { op: "conj", .. })
    ));
    assert!(matches!(
        merge(&[m.clone(), Value::Bool(true)]),
        Err(Error::UnsupportedType { op: "merge", .. })
    ));
}
