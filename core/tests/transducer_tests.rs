//! Integration tests for reduction and transducer pipelines.

use std::cell::RefCell;
use std::rc::Rc;

use weft::reduce::{completing, conj_rf, step_fn, sum_rf, with_init};
use weft::xform::{
    self, cat, filter, map, partition_all, partition_by, take, take_while, transduce_n,
};
use weft::{Error, Value, comp, fold, into, into_with, lazy, reduce, reduced, transduce, transduce_default, vector};

fn ints(ns: &[i64]) -> Value {
    vector(ns.iter().map(|n| Value::int(*n)).collect())
}

fn inc(x: Value) -> weft::Result<Value> {
    Ok(Value::int(x.as_int().unwrap_or(0) + 1))
}

fn even(x: &Value) -> weft::Result<bool> {
    Ok(x.as_int().unwrap_or(1) % 2 == 0)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// Early Termination
// ============================================================================

#[test]
fn test_reduce_stops_at_reduced() {
    init_tracing();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let result = fold(
        move |acc, x| {
            log.borrow_mut().push(x.as_int().unwrap());
            if x.as_int().unwrap() > 3 {
                Ok(reduced(acc))
            } else {
                Ok(Value::int(acc.as_int().unwrap() + x.as_int().unwrap()))
            }
        },
        Value::int(0),
        &ints(&[1, 2, 3, 4, 5, 6]),
    )
    .unwrap();
    assert_eq!(result, Value::int(6));
    assert!(!seen.borrow().contains(&5));
    assert!(!seen.borrow().contains(&6));
}

#[test]
fn test_reduce_empty_uses_init() {
    assert_eq!(reduce(&mut sum_rf(), &Value::Nil).unwrap(), Value::int(0));
    let mut rf = with_init(Value::from("seed"), |acc, _| Ok(acc));
    assert_eq!(reduce(&mut rf, &ints(&[])).unwrap(), Value::from("seed"));
    assert!(matches!(reduce(&mut step_fn(|a, _| Ok(a)), &ints(&[])), Err(Error::Arity { .. })));
}

// ============================================================================
// Pipelines
// ============================================================================

#[test]
fn test_filter_then_map_into_vector() {
    let xf = comp(&[filter(even), map(inc)]);
    assert_eq!(into_with(&ints(&[]), &xf, &ints(&[1, 2, 3, 4, 5])).unwrap(), ints(&[3, 5]));
}

#[test]
fn test_transducer_over_infinite_source() {
    init_tracing();
    let xf = comp(&[map(inc), filter(even), take(3)]);
    let out = into_with(&ints(&[]), &xf, &lazy::range()).unwrap();
    assert_eq!(out, ints(&[2, 4, 6]));
}

#[test]
fn test_transduce_completes_once() {
    let completions = Rc::new(RefCell::new(0));
    let c = Rc::clone(&completions);
    let rf = completing(sum_rf(), move |acc| {
        *c.borrow_mut() += 1;
        Ok(acc)
    });
    let total = transduce(&take(2), rf, Value::int(0), &lazy::range_between(10, 20)).unwrap();
    assert_eq!(total, Value::int(21));
    assert_eq!(*completions.borrow(), 1);
}

#[test]
fn test_transduce_default_seeds_from_reducer() {
    assert_eq!(transduce_default(&map(inc), sum_rf(), &ints(&[1, 2, 3])).unwrap(), Value::int(9));
    let collected = transduce_default(&xform::identity(), conj_rf(), &ints(&[1])).unwrap();
    assert_eq!(collected, ints(&[1]));
}

#[test]
fn test_partition_stages_flush_buffers() {
    let chunks = into_with(&ints(&[]), &partition_all(2), &ints(&[1, 2, 3, 4, 5])).unwrap();
    assert_eq!(chunks, vector(vec![ints(&[1, 2]), ints(&[3, 4]), ints(&[5])]));

    let runs = into_with(
        &ints(&[]),
        &partition_by(|x| Ok(Value::Bool(even(x)?))),
        &ints(&[2, 4, 1, 3, 6]),
    )
    .unwrap();
    assert_eq!(runs, vector(vec![ints(&[2, 4]), ints(&[1, 3]), ints(&[6])]));
}

fn parity(x: &Value) -> weft::Result<Value> {
    Ok(Value::Bool(even(x)?))
}

fn first_is_odd(run: &Value) -> weft::Result<bool> {
    Ok(weft::first(run)?.as_int().is_some_and(|n| n % 2 != 0))
}

#[test]
fn test_partition_by_stops_with_downstream() {
    let xf = comp(&[partition_by(parity), take_while(first_is_odd)]);
    let runs = into_with(&ints(&[]), &xf, &ints(&[1, 1, 2, 2, 3])).unwrap();
    assert_eq!(runs, vector(vec![ints(&[1, 1])]));

    let xf = comp(&[partition_by(parity), take(2)]);
    let runs = into_with(&ints(&[]), &xf, &ints(&[1, 3, 2, 5, 7, 4])).unwrap();
    assert_eq!(runs, vector(vec![ints(&[1, 3]), ints(&[2])]));
}

#[test]
fn test_buffering_stages_send_nothing_after_reduced() {
    for xf in [partition_by(parity), partition_all(2)] {
        let steps = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&steps);
        let rf = with_init(Value::Nil, move |_, chunk| {
            log.borrow_mut().push(chunk.clone());
            Ok(reduced(chunk))
        });
        let out = transduce(&xf, rf, Value::Nil, &ints(&[1, 1, 2, 2, 3])).unwrap();
        assert_eq!(out, ints(&[1, 1]));
        assert_eq!(*steps.borrow(), vec![ints(&[1, 1])]);
    }
}

#[test]
fn test_into_nil_keeps_source_order() {
    let out = into_with(&Value::Nil, &map(inc), &ints(&[1, 2, 3])).unwrap();
    assert_eq!(out, ints(&[2, 3, 4]));
    assert_eq!(into(&Value::Nil, &lazy::range_to(3)).unwrap(), ints(&[0, 1, 2]));
}

#[test]
fn test_one_transducer_many_pipelines() {
    let xf = comp(&[partition_all(2), cat(), take(3)]);
    let a = into_with(&ints(&[]), &xf, &ints(&[1, 2, 3, 4])).unwrap();
    let b = into_with(&ints(&[]), &xf, &ints(&[5, 6, 7, 8])).unwrap();
    assert_eq!(a, ints(&[1, 2, 3]));
    assert_eq!(b, ints(&[5, 6, 7]));
}

#[test]
fn test_into_targets() {
    let set = into(&Value::set(vec![]), &ints(&[1, 1, 2])).unwrap();
    assert_eq!(set, Value::set(vec![Value::int(1), Value::int(2)]));
    let m = into(
        &weft::hash_map(vec![]),
        &vector(vec![vector(vec![Value::from("a"), Value::int(1)])]),
    )
    .unwrap();
    assert_eq!(weft::get(&m, &Value::from("a")), Value::int(1));
}

#[test]
fn test_multi_input_map() {
    let add = xform::map_n(|xs| Ok(Value::int(xs.iter().filter_map(Value::as_int).sum())));
    let out = transduce_n(&add, conj_rf(), ints(&[]), &[ints(&[1, 2, 3]), lazy::range()]).unwrap();
    assert_eq!(out, ints(&[1, 3, 5]));
}

#[test]
fn test_single_input_stage_rejects_multi_input_step() {
    let r = transduce_n(&map(inc), conj_rf(), ints(&[]), &[ints(&[1]), ints(&[2])]);
    assert!(matches!(r, Err(Error::Arity { .. })));
}
