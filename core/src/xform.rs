//! Transducers: composable reducer transformations.
//!
//! A [`Transducer`] turns a downstream [`Reducer`] into a new reducer. Each
//! stage forwards `init` and `complete` and intercepts `step`. Stateful
//! stages create their state when the transducer is applied, so one
//! transducer can drive any number of independent pipelines.

#![allow(clippy::mutable_key_type)]

use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::error::{Error, Result};
use crate::iter::iter;
use crate::kind::{Kind, empty_of};
use crate::reduce::{Reducer, conj_rf, drive, ensure_reduced, is_reduced, reduce_from, reduced, unreduced};
use crate::value::Value;

type Down = Box<dyn Reducer>;

/// A reducer transformer.
#[derive(Clone)]
pub struct Transducer(Rc<dyn Fn(Down) -> Down>);

impl Transducer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Down) -> Down + 'static,
    {
        Transducer(Rc::new(f))
    }

    /// Wrap `rf`.
    pub fn apply(&self, rf: Down) -> Down {
        (self.0)(rf)
    }
}

impl std::fmt::Debug for Transducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Transducer")
    }
}

/// Compose transducers so that data flows through them left to right.
pub fn comp(xfs: &[Transducer]) -> Transducer {
    let xfs = xfs.to_vec();
    Transducer::new(move |rf| xfs.iter().rev().fold(rf, |rf, xf| xf.apply(rf)))
}

/// The identity transducer.
pub fn identity() -> Transducer {
    Transducer::new(|rf| rf)
}

// Stages that only intercept `step` share this forwarding.
macro_rules! forward_init_complete {
    () => {
        fn init(&mut self) -> Result<Value> {
            self.down.init()
        }

        fn complete(&mut self, acc: Value) -> Result<Value> {
            self.down.complete(acc)
        }
    };
}

// ============================================================================
// Mapping
// ============================================================================

struct MapStage {
    down: Down,
    f: Rc<dyn Fn(&[Value]) -> Result<Value>>,
}

impl Reducer for MapStage {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        let y = (self.f)(std::slice::from_ref(&x))?;
        self.down.step(acc, y)
    }

    fn step_n(&mut self, acc: Value, xs: &[Value]) -> Result<Value> {
        let y = (self.f)(xs)?;
        self.down.step(acc, y)
    }
}

/// Apply `f` to every input.
pub fn map<F>(f: F) -> Transducer
where
    F: Fn(Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    map_n(move |xs: &[Value]| match xs {
        [x] => f(x.clone()),
        _ => Err(Error::arity(
            "map",
            format!("function takes one input, stepped with {}", xs.len()),
        )),
    })
}

/// Apply `f` to the inputs of each step. Accepts multi-input steps, so it can
/// lead a pipeline driven by [`transduce_n`].
pub fn map_n<F>(f: F) -> Transducer
where
    F: Fn(&[Value]) -> Result<Value> + 'static,
{
    let f: Rc<dyn Fn(&[Value]) -> Result<Value>> = Rc::new(f);
    Transducer::new(move |down| {
        Box::new(MapStage {
            down,
            f: Rc::clone(&f),
        })
    })
}

struct MapIndexed {
    down: Down,
    f: Rc<dyn Fn(usize, Value) -> Result<Value>>,
    index: usize,
}

impl Reducer for MapIndexed {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        let i = self.index;
        self.index += 1;
        let y = (self.f)(i, x)?;
        self.down.step(acc, y)
    }
}

pub fn map_indexed<F>(f: F) -> Transducer
where
    F: Fn(usize, Value) -> Result<Value> + 'static,
{
    let f: Rc<dyn Fn(usize, Value) -> Result<Value>> = Rc::new(f);
    Transducer::new(move |down| {
        Box::new(MapIndexed {
            down,
            f: Rc::clone(&f),
            index: 0,
        })
    })
}

struct Keep {
    down: Down,
    f: Rc<dyn Fn(usize, Value) -> Result<Value>>,
    index: usize,
}

impl Reducer for Keep {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        let i = self.index;
        self.index += 1;
        match (self.f)(i, x)? {
            Value::Nil => Ok(acc),
            y => self.down.step(acc, y),
        }
    }
}

/// Non-nil results of `f`.
pub fn keep<F>(f: F) -> Transducer
where
    F: Fn(Value) -> Result<Value> + 'static,
{
    keep_indexed(move |_, x| f(x))
}

pub fn keep_indexed<F>(f: F) -> Transducer
where
    F: Fn(usize, Value) -> Result<Value> + 'static,
{
    let f: Rc<dyn Fn(usize, Value) -> Result<Value>> = Rc::new(f);
    Transducer::new(move |down| {
        Box::new(Keep {
            down,
            f: Rc::clone(&f),
            index: 0,
        })
    })
}

// ============================================================================
// Filtering
// ============================================================================

type Pred = Rc<dyn Fn(&Value) -> Result<bool>>;

struct Filter {
    down: Down,
    pred: Pred,
}

impl Reducer for Filter {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        if (self.pred)(&x)? {
            self.down.step(acc, x)
        } else {
            Ok(acc)
        }
    }
}

pub fn filter<P>(pred: P) -> Transducer
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    let pred: Pred = Rc::new(pred);
    Transducer::new(move |down| {
        Box::new(Filter {
            down,
            pred: Rc::clone(&pred),
        })
    })
}

pub fn remove<P>(pred: P) -> Transducer
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    filter(move |x| pred(x).map(|keep| !keep))
}

struct Distinct {
    down: Down,
    seen: FxHashSet<Value>,
}

impl Reducer for Distinct {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        if self.seen.insert(x.clone()) {
            self.down.step(acc, x)
        } else {
            Ok(acc)
        }
    }
}

pub fn distinct() -> Transducer {
    Transducer::new(|down| {
        Box::new(Distinct {
            down,
            seen: FxHashSet::default(),
        })
    })
}

struct Dedupe {
    down: Down,
    last: Option<Value>,
}

impl Reducer for Dedupe {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        if self.last.as_ref() == Some(&x) {
            return Ok(acc);
        }
        self.last = Some(x.clone());
        self.down.step(acc, x)
    }
}

/// Drop consecutive duplicates.
pub fn dedupe() -> Transducer {
    Transducer::new(|down| Box::new(Dedupe { down, last: None }))
}

// ============================================================================
// Slicing
// ============================================================================

struct Take {
    down: Down,
    remaining: usize,
}

impl Reducer for Take {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        if self.remaining == 0 {
            return Ok(reduced(acc));
        }
        self.remaining -= 1;
        let acc = self.down.step(acc, x)?;
        if self.remaining == 0 {
            Ok(ensure_reduced(acc))
        } else {
            Ok(acc)
        }
    }
}

/// First `n` inputs. Signals early termination as soon as the `n`th input
/// has been passed on, so no extra input is pulled.
pub fn take(n: usize) -> Transducer {
    Transducer::new(move |down| Box::new(Take { down, remaining: n }))
}

struct TakeWhile {
    down: Down,
    pred: Pred,
}

impl Reducer for TakeWhile {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        if (self.pred)(&x)? {
            self.down.step(acc, x)
        } else {
            Ok(reduced(acc))
        }
    }
}

pub fn take_while<P>(pred: P) -> Transducer
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    let pred: Pred = Rc::new(pred);
    Transducer::new(move |down| {
        Box::new(TakeWhile {
            down,
            pred: Rc::clone(&pred),
        })
    })
}

struct TakeNth {
    down: Down,
    n: usize,
    index: usize,
}

impl Reducer for TakeNth {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        let i = self.index;
        self.index += 1;
        if i % self.n == 0 {
            self.down.step(acc, x)
        } else {
            Ok(acc)
        }
    }
}

/// Every `n`th input starting with the first. `n` of zero is treated as one.
pub fn take_nth(n: usize) -> Transducer {
    let n = n.max(1);
    Transducer::new(move |down| Box::new(TakeNth { down, n, index: 0 }))
}

struct DropN {
    down: Down,
    remaining: usize,
}

impl Reducer for DropN {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        if self.remaining > 0 {
            self.remaining -= 1;
            Ok(acc)
        } else {
            self.down.step(acc, x)
        }
    }
}

pub fn drop(n: usize) -> Transducer {
    Transducer::new(move |down| Box::new(DropN { down, remaining: n }))
}

struct DropWhile {
    down: Down,
    pred: Pred,
    dropping: bool,
}

impl Reducer for DropWhile {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        if self.dropping && (self.pred)(&x)? {
            return Ok(acc);
        }
        self.dropping = false;
        self.down.step(acc, x)
    }
}

pub fn drop_while<P>(pred: P) -> Transducer
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    let pred: Pred = Rc::new(pred);
    Transducer::new(move |down| {
        Box::new(DropWhile {
            down,
            pred: Rc::clone(&pred),
            dropping: true,
        })
    })
}

// ============================================================================
// Buffering
// ============================================================================

// Pass a pending buffer downstream before completing.
fn flush(down: &mut Down, acc: Value, buffer: &mut Vec<Value>) -> Result<Value> {
    let acc = if buffer.is_empty() {
        acc
    } else {
        let chunk = Value::array(std::mem::take(buffer));
        unreduced(down.step(acc, chunk)?)
    };
    down.complete(acc)
}

struct PartitionAll {
    down: Down,
    n: usize,
    buffer: Vec<Value>,
}

impl Reducer for PartitionAll {
    fn init(&mut self) -> Result<Value> {
        self.down.init()
    }

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        self.buffer.push(x);
        if self.buffer.len() < self.n {
            return Ok(acc);
        }
        let chunk = Value::array(std::mem::take(&mut self.buffer));
        self.down.step(acc, chunk)
    }

    fn complete(&mut self, acc: Value) -> Result<Value> {
        flush(&mut self.down, acc, &mut self.buffer)
    }
}

/// Arrays of `n` inputs; the short remainder is passed on at completion.
pub fn partition_all(n: usize) -> Transducer {
    let n = n.max(1);
    Transducer::new(move |down| {
        Box::new(PartitionAll {
            down,
            n,
            buffer: Vec::with_capacity(n),
        })
    })
}

struct PartitionBy {
    down: Down,
    f: Rc<dyn Fn(&Value) -> Result<Value>>,
    key: Option<Value>,
    buffer: Vec<Value>,
}

impl Reducer for PartitionBy {
    fn init(&mut self) -> Result<Value> {
        self.down.init()
    }

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        let k = (self.f)(&x)?;
        let same = match &self.key {
            Some(prev) => prev.loose_eq(&k),
            None => true,
        };
        self.key = Some(k);
        if same {
            self.buffer.push(x);
            return Ok(acc);
        }
        let run = Value::array(std::mem::take(&mut self.buffer));
        let acc = self.down.step(acc, run)?;
        // A finished downstream must not see `x` again at completion.
        if !is_reduced(&acc) {
            self.buffer.push(x);
        }
        Ok(acc)
    }

    fn complete(&mut self, acc: Value) -> Result<Value> {
        flush(&mut self.down, acc, &mut self.buffer)
    }
}

/// Runs of consecutive inputs whose `f` results are loosely equal.
pub fn partition_by<F>(f: F) -> Transducer
where
    F: Fn(&Value) -> Result<Value> + 'static,
{
    let f: Rc<dyn Fn(&Value) -> Result<Value>> = Rc::new(f);
    Transducer::new(move |down| {
        Box::new(PartitionBy {
            down,
            f: Rc::clone(&f),
            key: None,
            buffer: Vec::new(),
        })
    })
}

struct Interpose {
    down: Down,
    sep: Value,
    started: bool,
}

impl Reducer for Interpose {
    forward_init_complete!();

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        if !self.started {
            self.started = true;
            return self.down.step(acc, x);
        }
        let acc = self.down.step(acc, self.sep.clone())?;
        if is_reduced(&acc) {
            return Ok(acc);
        }
        self.down.step(acc, x)
    }
}

pub fn interpose(sep: Value) -> Transducer {
    Transducer::new(move |down| {
        Box::new(Interpose {
            down,
            sep: sep.clone(),
            started: false,
        })
    })
}

// ============================================================================
// Concatenation
// ============================================================================

struct Cat {
    down: Down,
}

impl Reducer for Cat {
    forward_init_complete!();

    /// Steps every element of the input collection. A `Reduced` from
    /// downstream is passed back still boxed so the outer reduction stops.
    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        let mut acc = acc;
        for item in iter(&x)? {
            acc = self.down.step(acc, item?)?;
            if is_reduced(&acc) {
                return Ok(acc);
            }
        }
        Ok(acc)
    }
}

/// Concatenate input collections.
pub fn cat() -> Transducer {
    Transducer::new(|down| Box::new(Cat { down }))
}

/// `comp(map(f), cat())`
pub fn mapcat<F>(f: F) -> Transducer
where
    F: Fn(Value) -> Result<Value> + 'static,
{
    comp(&[map(f), cat()])
}

// ============================================================================
// Drivers
// ============================================================================

/// Reduce `coll` through `xf` applied to `rf`, then complete once.
pub fn transduce<R>(xf: &Transducer, rf: R, init: Value, coll: &Value) -> Result<Value>
where
    R: Reducer + 'static,
{
    let mut rf = xf.apply(Box::new(rf));
    let acc = reduce_from(&mut rf, init, coll)?;
    trace!(target: "weft::xform", "transduce complete");
    rf.complete(acc)
}

/// [`transduce`] seeded with the transformed reducer's `init`.
pub fn transduce_default<R>(xf: &Transducer, rf: R, coll: &Value) -> Result<Value>
where
    R: Reducer + 'static,
{
    let mut rf = xf.apply(Box::new(rf));
    let init = rf.init()?;
    let acc = reduce_from(&mut rf, init, coll)?;
    rf.complete(acc)
}

/// Step the pipeline with one element from each collection at a time,
/// stopping at the shortest. The first stage must accept multi-input steps
/// (see [`map_n`]).
pub fn transduce_n<R>(xf: &Transducer, rf: R, init: Value, colls: &[Value]) -> Result<Value>
where
    R: Reducer + 'static,
{
    let mut rf = xf.apply(Box::new(rf));
    if is_reduced(&init) {
        return rf.complete(unreduced(init));
    }
    let mut cursors = colls.iter().map(iter).collect::<Result<Vec<_>>>()?;
    let mut acc = init;
    if !cursors.is_empty() {
        'outer: loop {
            let mut args = Vec::with_capacity(cursors.len());
            for cursor in cursors.iter_mut() {
                match cursor.next() {
                    Some(item) => args.push(item?),
                    None => break 'outer,
                }
            }
            acc = rf.step_n(acc, &args)?;
            if is_reduced(&acc) {
                acc = unreduced(acc);
                break;
            }
        }
    }
    rf.complete(acc)
}

// Fresh receiver for `into`. Nil becomes an empty Array so elements keep
// source order; lazy targets become Lists and conj prepends onto them.
fn into_target(to: &Value) -> Result<Value> {
    match to {
        Value::Nil => Ok(empty_of(Kind::Array)),
        Value::Lazy(_) => crate::iter::to_list(to),
        other => Ok(other.shallow_copy()),
    }
}

/// Conj every element of `from` onto a copy of `to`.
pub fn into(to: &Value, from: &Value) -> Result<Value> {
    let target = into_target(to)?;
    drive(&mut conj_rf(), target, iter(from)?)
}

/// Conj every element produced by `xf` over `from` onto a copy of `to`.
pub fn into_with(to: &Value, xf: &Transducer, from: &Value) -> Result<Value> {
    let target = into_target(to)?;
    transduce(xf, conj_rf(), target, from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy;
    use crate::reduce::{step_fn, sum_rf};
    use crate::value::vector;
    use std::cell::Cell;

    fn ints(ns: &[i64]) -> Value {
        vector(ns.iter().map(|n| Value::int(*n)).collect())
    }

    fn inc(x: Value) -> Result<Value> {
        Ok(Value::int(x.as_int().unwrap_or(0) + 1))
    }

    fn even(x: &Value) -> Result<bool> {
        Ok(x.as_int().unwrap_or(1) % 2 == 0)
    }

    #[test]
    fn test_comp_runs_left_to_right() {
        let xf = comp(&[filter(even), map(inc)]);
        assert_eq!(into_with(&ints(&[]), &xf, &ints(&[1, 2, 3, 4, 5])).unwrap(), ints(&[3, 5]));
    }

    #[test]
    fn test_into_copies_target() {
        let to = ints(&[0]);
        let out = into(&to, &ints(&[1, 2])).unwrap();
        assert_eq!(out, ints(&[0, 1, 2]));
        assert_eq!(to, ints(&[0]));
    }

    #[test]
    fn test_into_nil_keeps_source_order() {
        let out = into(&Value::Nil, &ints(&[1, 2])).unwrap();
        assert_eq!(out, ints(&[1, 2]));
        let out = into_with(&Value::Nil, &map(|x| Ok(x)), &ints(&[3, 4])).unwrap();
        assert_eq!(out, ints(&[3, 4]));
    }

    #[test]
    fn test_take_stops_source() {
        let pulls = std::rc::Rc::new(Cell::new(0));
        let p = std::rc::Rc::clone(&pulls);
        let src = lazy::map(
            move |x| {
                p.set(p.get() + 1);
                Ok(x)
            },
            &lazy::range(),
        );
        let out = into_with(&ints(&[]), &take(3), &src).unwrap();
        assert_eq!(out, ints(&[0, 1, 2]));
        assert_eq!(pulls.get(), 3);
    }

    #[test]
    fn test_stage_state_is_per_application() {
        let xf = take(2);
        assert_eq!(into_with(&ints(&[]), &xf, &ints(&[1, 2, 3])).unwrap(), ints(&[1, 2]));
        assert_eq!(into_with(&ints(&[]), &xf, &ints(&[4, 5, 6])).unwrap(), ints(&[4, 5]));
    }

    #[test]
    fn test_partition_all_flushes_on_complete() {
        let out = into_with(&ints(&[]), &partition_all(2), &ints(&[1, 2, 3])).unwrap();
        assert_eq!(out, vector(vec![ints(&[1, 2]), ints(&[3])]));
    }

    #[test]
    fn test_partition_by_flushes_on_complete() {
        let out = into_with(&ints(&[]), &partition_by(|x| Ok(Value::Bool(even(x)?))), &ints(&[1, 3, 2])).unwrap();
        assert_eq!(out, vector(vec![ints(&[1, 3]), ints(&[2])]));
    }

    #[test]
    fn test_take_then_partition_all_keeps_tail() {
        let xf = comp(&[take(3), partition_all(2)]);
        let out = into_with(&ints(&[]), &xf, &lazy::range()).unwrap();
        assert_eq!(out, vector(vec![ints(&[0, 1]), ints(&[2])]));
    }

    #[test]
    fn test_cat_and_mapcat() {
        let nested = vector(vec![ints(&[1, 2]), ints(&[]), ints(&[3])]);
        assert_eq!(into_with(&ints(&[]), &cat(), &nested).unwrap(), ints(&[1, 2, 3]));
        let dup = mapcat(|x| Ok(vector(vec![x.clone(), x])));
        assert_eq!(into_with(&ints(&[]), &dup, &ints(&[1, 2])).unwrap(), ints(&[1, 1, 2, 2]));
        let first_two = comp(&[cat(), take(2)]);
        assert_eq!(into_with(&ints(&[]), &first_two, &nested).unwrap(), ints(&[1, 2]));
    }

    #[test]
    fn test_misc_stages() {
        let src = ints(&[1, 1, 2, 3, 3, 1]);
        assert_eq!(into_with(&ints(&[]), &dedupe(), &src).unwrap(), ints(&[1, 2, 3, 1]));
        assert_eq!(into_with(&ints(&[]), &distinct(), &src).unwrap(), ints(&[1, 2, 3]));
        assert_eq!(into_with(&ints(&[]), &drop(4), &src).unwrap(), ints(&[3, 1]));
        assert_eq!(into_with(&ints(&[]), &take_nth(2), &src).unwrap(), ints(&[1, 2, 3]));
        assert_eq!(
            into_with(&ints(&[]), &interpose(Value::int(0)), &ints(&[1, 2])).unwrap(),
            ints(&[1, 0, 2])
        );
        let small = |x: &Value| Ok(x.as_int().unwrap_or(0) < 2);
        assert_eq!(into_with(&ints(&[]), &take_while(small), &src).unwrap(), ints(&[1, 1]));
        assert_eq!(into_with(&ints(&[]), &drop_while(small), &src).unwrap(), ints(&[2, 3, 3, 1]));
        let odd_index = keep_indexed(|i, x| Ok(if i % 2 == 1 { x } else { Value::Nil }));
        assert_eq!(into_with(&ints(&[]), &odd_index, &src).unwrap(), ints(&[1, 3, 1]));
    }

    #[test]
    fn test_transduce_default_uses_init() {
        assert_eq!(transduce_default(&map(inc), sum_rf(), &ints(&[1, 2])).unwrap(), Value::int(5));
        assert_eq!(transduce_default(&map(inc), sum_rf(), &Value::Nil).unwrap(), Value::int(0));
    }

    #[test]
    fn test_transduce_n_zips_inputs() {
        let add = map_n(|xs| Ok(Value::int(xs.iter().filter_map(Value::as_int).sum())));
        let out = transduce_n(&add, sum_rf(), Value::int(0), &[ints(&[1, 2, 3]), ints(&[10, 20])]).unwrap();
        assert_eq!(out, Value::int(33));
    }

    #[test]
    fn test_multi_input_step_needs_multi_input_stage() {
        let r = transduce_n(&filter(even), step_fn(|a, _| Ok(a)), Value::Nil, &[ints(&[1]), ints(&[2])]);
        assert!(matches!(r, Err(Error::Arity { .. })));
    }
}
