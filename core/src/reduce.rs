//! Reduction with early termination.
//!
//! A reduction folds a collection through a [`Reducer`]. A step that returns
//! a [`Value::Reduced`] box ends the fold immediately: the box is unwrapped
//! and no further element is pulled from the source.

use tracing::trace;

use crate::error::{Error, Result};
use crate::iter::{Cursor, iter};
use crate::value::Value;

// ============================================================================
// Reduced
// ============================================================================

/// Box `value` to signal "stop reducing".
pub fn reduced(value: Value) -> Value {
    Value::Reduced(Box::new(value))
}

pub fn is_reduced(value: &Value) -> bool {
    matches!(value, Value::Reduced(_))
}

/// Unwrap one level of `Reduced`, leaving other values untouched.
pub fn unreduced(value: Value) -> Value {
    match value {
        Value::Reduced(inner) => *inner,
        other => other,
    }
}

/// Box `value` unless it is already boxed.
pub fn ensure_reduced(value: Value) -> Value {
    if is_reduced(&value) {
        value
    } else {
        reduced(value)
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// A reducing function: the seed, the per-element step, and a completion
/// that flushes any buffered state.
pub trait Reducer {
    /// Seed for a reduction over an empty collection.
    fn init(&mut self) -> Result<Value>;

    fn step(&mut self, acc: Value, x: Value) -> Result<Value>;

    /// Called exactly once when the reduction finishes.
    fn complete(&mut self, acc: Value) -> Result<Value> {
        Ok(acc)
    }

    /// Step with several inputs at once. Only stages that combine inputs
    /// (such as a multi-collection map) define it.
    fn step_n(&mut self, acc: Value, xs: &[Value]) -> Result<Value> {
        let _ = acc;
        Err(Error::arity(
            "step",
            format!("reducer does not accept {} inputs per step", xs.len()),
        ))
    }
}

impl<R: Reducer + ?Sized> Reducer for Box<R> {
    fn init(&mut self) -> Result<Value> {
        (**self).init()
    }

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        (**self).step(acc, x)
    }

    fn complete(&mut self, acc: Value) -> Result<Value> {
        (**self).complete(acc)
    }

    fn step_n(&mut self, acc: Value, xs: &[Value]) -> Result<Value> {
        (**self).step_n(acc, xs)
    }
}

/// Reducer built from a step closure. It has no seed, so reducing an empty
/// collection with it is an [`Error::Arity`].
pub struct StepFn<F> {
    f: F,
}

impl<F> Reducer for StepFn<F>
where
    F: FnMut(Value, Value) -> Result<Value>,
{
    fn init(&mut self) -> Result<Value> {
        Err(Error::arity("reduce", "reducing function takes no zero-argument call"))
    }

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        (self.f)(acc, x)
    }
}

pub fn step_fn<F>(f: F) -> StepFn<F>
where
    F: FnMut(Value, Value) -> Result<Value>,
{
    StepFn { f }
}

/// Step closure with a fixed seed.
pub struct WithInit<F> {
    init: Value,
    f: F,
}

impl<F> Reducer for WithInit<F>
where
    F: FnMut(Value, Value) -> Result<Value>,
{
    fn init(&mut self) -> Result<Value> {
        Ok(self.init.clone())
    }

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        (self.f)(acc, x)
    }
}

pub fn with_init<F>(init: Value, f: F) -> WithInit<F>
where
    F: FnMut(Value, Value) -> Result<Value>,
{
    WithInit { init, f }
}

/// Wraps a reducer with a custom completion.
pub struct Completing<R, C> {
    rf: R,
    done: C,
}

impl<R, C> Reducer for Completing<R, C>
where
    R: Reducer,
    C: FnMut(Value) -> Result<Value>,
{
    fn init(&mut self) -> Result<Value> {
        self.rf.init()
    }

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        self.rf.step(acc, x)
    }

    fn complete(&mut self, acc: Value) -> Result<Value> {
        let acc = self.rf.complete(acc)?;
        (self.done)(acc)
    }

    fn step_n(&mut self, acc: Value, xs: &[Value]) -> Result<Value> {
        self.rf.step_n(acc, xs)
    }
}

pub fn completing<R, C>(rf: R, done: C) -> Completing<R, C>
where
    R: Reducer,
    C: FnMut(Value) -> Result<Value>,
{
    Completing { rf, done }
}

/// Conj each element onto the accumulator in place. Seeds with an empty
/// Array.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConjRf;

impl Reducer for ConjRf {
    fn init(&mut self) -> Result<Value> {
        Ok(Value::array(Vec::new()))
    }

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        crate::assoc::conj_mut(&acc, &[x])
    }
}

pub fn conj_rf() -> ConjRf {
    ConjRf
}

/// Numeric sum, seeded with 0. Promotes to BigInt on overflow.
#[derive(Debug, Default, Clone, Copy)]
pub struct SumRf;

impl Reducer for SumRf {
    fn init(&mut self) -> Result<Value> {
        Ok(Value::int(0))
    }

    fn step(&mut self, acc: Value, x: Value) -> Result<Value> {
        match (&acc, &x) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.add(b))),
            (Value::Number(_), other) | (other, _) => {
                Err(Error::unsupported("+", "number", other))
            }
        }
    }
}

pub fn sum_rf() -> SumRf {
    SumRf
}

// ============================================================================
// Drivers
// ============================================================================

// Feed the rest of `cursor` into `rf`, stopping at the first Reduced.
pub(crate) fn drive<R>(rf: &mut R, mut acc: Value, cursor: Cursor) -> Result<Value>
where
    R: Reducer + ?Sized,
{
    for item in cursor {
        acc = rf.step(acc, item?)?;
        if is_reduced(&acc) {
            trace!(target: "weft::reduce", "reduction terminated early");
            return Ok(unreduced(acc));
        }
    }
    Ok(acc)
}

/// Two-argument reduce: seeds with the first element and folds the rest.
/// An empty collection returns `rf.init()`.
pub fn reduce<R>(rf: &mut R, coll: &Value) -> Result<Value>
where
    R: Reducer + ?Sized,
{
    let mut cursor = iter(coll)?;
    match cursor.next() {
        None => rf.init(),
        Some(first) => {
            let first = first?;
            if is_reduced(&first) {
                return Ok(unreduced(first));
            }
            drive(rf, first, cursor)
        }
    }
}

/// Three-argument reduce. A `Reduced` seed is returned unwrapped without
/// touching the collection.
pub fn reduce_from<R>(rf: &mut R, init: Value, coll: &Value) -> Result<Value>
where
    R: Reducer + ?Sized,
{
    if is_reduced(&init) {
        return Ok(unreduced(init));
    }
    drive(rf, init, iter(coll)?)
}

/// `reduce_from` with a plain closure.
pub fn fold<F>(f: F, init: Value, coll: &Value) -> Result<Value>
where
    F: FnMut(Value, Value) -> Result<Value>,
{
    reduce_from(&mut step_fn(f), init, coll)
}

/// Fold `f(acc, key, value)` over the entries of a Map or Record, or the
/// indexed elements of an Array. Nil folds to `init`.
pub fn reduce_kv<F>(mut f: F, init: Value, coll: &Value) -> Result<Value>
where
    F: FnMut(Value, Value, Value) -> Result<Value>,
{
    if is_reduced(&init) {
        return Ok(unreduced(init));
    }
    let entries: Vec<(Value, Value)> = match coll {
        Value::Nil => return Ok(init),
        Value::Map(m) => m.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Record(r) => r
            .borrow()
            .iter()
            .map(|(k, v)| (Value::from(k.resolve()), v.clone()))
            .collect(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (Value::from(i), v.clone()))
            .collect(),
        other => return Err(Error::unsupported("reduce-kv", "Map, Record or Array", other)),
    };
    let mut acc = init;
    for (k, v) in entries {
        acc = f(acc, k, v)?;
        if is_reduced(&acc) {
            trace!(target: "weft::reduce", "reduce-kv terminated early");
            return Ok(unreduced(acc));
        }
    }
    Ok(acc)
}
