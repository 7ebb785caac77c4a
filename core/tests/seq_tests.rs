//! Integration tests for the sequence layer: nil punning, laziness and
//! restartable traversal.

use std::cell::Cell;
use std::rc::Rc;

use weft::lazy::{self, concat, cycle, interleave, iterate, partition, partition_all, repeatedly, take};
use weft::{Error, Value, count, first, iter, next, rest, seq, to_vec, vector};

fn ints(ns: &[i64]) -> Value {
    vector(ns.iter().map(|n| Value::int(*n)).collect())
}

fn int_vec(ns: &[i64]) -> Vec<Value> {
    ns.iter().map(|n| Value::int(*n)).collect()
}

fn counting_source(calls: &Rc<Cell<usize>>) -> Value {
    let calls = Rc::clone(calls);
    repeatedly(move || {
        calls.set(calls.get() + 1);
        Ok(Value::from(calls.get()))
    })
}

// ============================================================================
// Nil Punning
// ============================================================================

#[test]
fn test_nil_is_the_empty_sequence() {
    assert_eq!(first(&Value::Nil).unwrap(), Value::Nil);
    assert!(to_vec(&rest(&Value::Nil)).unwrap().is_empty());
    assert_eq!(count(&Value::Nil).unwrap(), 0);
    assert_eq!(seq(&Value::Nil).unwrap(), None);
    assert_eq!(next(&Value::Nil).unwrap(), Value::Nil);
}

#[test]
fn test_map_iterates_entries() {
    let m = weft::hash_map(vec![(Value::from("k"), Value::int(1))]);
    assert_eq!(
        to_vec(&m).unwrap(),
        vec![vector(vec![Value::from("k"), Value::int(1)])]
    );
}

#[test]
fn test_scalar_is_not_iterable() {
    assert!(matches!(iter(&Value::Bool(true)), Err(Error::NotIterable { .. })));
    assert!(matches!(count(&Value::int(3)), Err(Error::UnsupportedType { op: "count", .. })));
}

// ============================================================================
// Laziness
// ============================================================================

#[test]
fn test_take_three_of_range_terminates() {
    assert_eq!(to_vec(&take(3, &lazy::range())).unwrap(), int_vec(&[0, 1, 2]));
}

#[test]
fn test_take_pulls_at_most_n() {
    let calls = Rc::new(Cell::new(0));
    let src = counting_source(&calls);
    let firsts = take(3, &src);
    assert_eq!(calls.get(), 0);
    assert_eq!(to_vec(&firsts).unwrap().len(), 3);
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_chained_stages_share_one_source_cursor() {
    let calls = Rc::new(Cell::new(0));
    let src = counting_source(&calls);
    let evens = lazy::filter(|x| Ok(x.as_int().unwrap_or(1) % 2 == 0), &src);
    let doubled = lazy::map(|x| Ok(Value::int(x.as_int().unwrap_or(0) * 2)), &evens);
    assert_eq!(to_vec(&take(2, &doubled)).unwrap(), int_vec(&[4, 8]));
    assert_eq!(calls.get(), 4);
}

#[test]
fn test_iterate_restarts_each_traversal() {
    let powers = take(4, &iterate(|x| Ok(Value::int(x.as_int().unwrap_or(0) * 3)), Value::int(1)));
    assert_eq!(to_vec(&powers).unwrap(), int_vec(&[1, 3, 9, 27]));
    assert_eq!(to_vec(&powers).unwrap(), int_vec(&[1, 3, 9, 27]));
}

#[test]
fn test_effectful_producer_is_rerun() {
    let calls = Rc::new(Cell::new(0));
    let src = take(2, &counting_source(&calls));
    assert_eq!(to_vec(&src).unwrap(), int_vec(&[1, 2]));
    assert_eq!(to_vec(&src).unwrap(), int_vec(&[3, 4]));
}

// ============================================================================
// Combinators
// ============================================================================

#[test]
fn test_concat_lazy_and_eager() {
    let eager = concat(&[ints(&[1, 2]), ints(&[3, 4]), ints(&[5])]);
    let mixed = concat(&[lazy::range_between(1, 3), ints(&[3, 4]), Value::list(int_vec(&[5]))]);
    assert_eq!(to_vec(&eager).unwrap(), int_vec(&[1, 2, 3, 4, 5]));
    assert_eq!(to_vec(&mixed).unwrap(), int_vec(&[1, 2, 3, 4, 5]));
}

#[test]
fn test_concat_does_not_touch_later_inputs_early() {
    let calls = Rc::new(Cell::new(0));
    let joined = concat(&[ints(&[1, 2]), counting_source(&calls)]);
    assert_eq!(to_vec(&take(2, &joined)).unwrap(), int_vec(&[1, 2]));
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_interleave_discards_partial_round() {
    let s = interleave(&[ints(&[1, 2, 3]), Value::from("ab")]);
    assert_eq!(
        to_vec(&s).unwrap(),
        vec![Value::int(1), Value::from("a"), Value::int(2), Value::from("b")]
    );
}

#[test]
fn test_partition_and_partition_all() {
    let coll = ints(&[1, 2, 3, 4, 5]);
    assert_eq!(to_vec(&partition(3, &coll)).unwrap(), vec![ints(&[1, 2, 3])]);
    assert_eq!(
        to_vec(&partition_all(3, &coll)).unwrap(),
        vec![ints(&[1, 2, 3]), ints(&[4, 5])]
    );
}

#[test]
fn test_cycle_of_infinite_use() {
    let s = take(7, &cycle(&Value::list(int_vec(&[1, 2, 3]))));
    assert_eq!(to_vec(&s).unwrap(), int_vec(&[1, 2, 3, 1, 2, 3, 1]));
}

#[test]
fn test_errors_surface_at_traversal_not_construction() {
    let bad = lazy::map(|_| Err(Error::illegal("test", "boom")), &ints(&[1, 2]));
    assert!(matches!(to_vec(&bad), Err(Error::IllegalArgument { op: "test", .. })));
}
