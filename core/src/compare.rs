//! Natural ordering and sorting.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::iter::{iter, to_vec};
use crate::value::Value;

/// Natural ordering of two values.
///
/// Equal values compare `Equal` whatever their type. Nil sorts before
/// everything. Numbers, strings and booleans compare among themselves;
/// arrays and lists compare by length, then element by element. Any other
/// pairing is a [`Error::Comparison`].
pub fn compare(x: &Value, y: &Value) -> Result<Ordering> {
    if x == y {
        return Ok(Ordering::Equal);
    }
    match (x, y) {
        (Value::Nil, _) => Ok(Ordering::Less),
        (_, Value::Nil) => Ok(Ordering::Greater),
        (Value::Number(a), Value::Number(b)) => {
            a.partial_cmp(b).ok_or_else(|| Error::comparison(x, y))
        }
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (a, b) if is_indexed(a) && is_indexed(b) => {
            let left = to_vec(a)?;
            let right = to_vec(b)?;
            match left.len().cmp(&right.len()) {
                Ordering::Equal => {}
                unequal => return Ok(unequal),
            }
            for (l, r) in left.iter().zip(&right) {
                match compare(l, r)? {
                    Ordering::Equal => {}
                    unequal => return Ok(unequal),
                }
            }
            Ok(Ordering::Equal)
        }
        _ => Err(Error::comparison(x, y)),
    }
}

fn is_indexed(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::List(_))
}

/// Turn a user comparator result into an ordering.
///
/// A number is read by its sign. A boolean means "`a` sorts before `b`", so
/// the comparator is called again with the arguments swapped to tell
/// `Greater` from `Equal`.
fn user_ordering<C>(op: &'static str, cmp: &C, a: &Value, b: &Value) -> Result<Ordering>
where
    C: Fn(&Value, &Value) -> Result<Value>,
{
    match cmp(a, b)? {
        Value::Number(n) => Ok(n.signum().cmp(&0)),
        Value::Bool(true) => Ok(Ordering::Less),
        Value::Bool(false) => match cmp(b, a)? {
            Value::Bool(true) => Ok(Ordering::Greater),
            Value::Bool(false) => Ok(Ordering::Equal),
            other => Err(Error::callback(op, "a number or a boolean", &other)),
        },
        other => Err(Error::callback(op, "a number or a boolean", &other)),
    }
}

// Stable bottom-up merge sort. The first comparator error ends the sort.
fn sort_items<T, F>(items: &mut Vec<T>, mut cmp: F) -> Result<()>
where
    T: Clone,
    F: FnMut(&T, &T) -> Result<Ordering>,
{
    let len = items.len();
    let mut merged: Vec<T> = Vec::with_capacity(len);
    let mut width = 1;
    while width < len {
        merged.clear();
        for start in (0..len).step_by(2 * width) {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j) = (start, mid);
            while i < mid && j < end {
                // Ties keep the left run first.
                if cmp(&items[j], &items[i])? == Ordering::Less {
                    merged.push(items[j].clone());
                    j += 1;
                } else {
                    merged.push(items[i].clone());
                    i += 1;
                }
            }
            merged.extend_from_slice(&items[i..mid]);
            merged.extend_from_slice(&items[j..end]);
        }
        std::mem::swap(items, &mut merged);
        width *= 2;
    }
    Ok(())
}

/// Elements of `coll` in natural order, as a fresh Array.
pub fn sort(coll: &Value) -> Result<Value> {
    let mut items = to_vec(coll)?;
    sort_items(&mut items, compare)?;
    Ok(Value::array(items))
}

/// Sort with a user comparator returning a number or a boolean.
pub fn sort_with<C>(cmp: C, coll: &Value) -> Result<Value>
where
    C: Fn(&Value, &Value) -> Result<Value>,
{
    let mut items = to_vec(coll)?;
    sort_items(&mut items, |a, b| user_ordering("sort", &cmp, a, b))?;
    Ok(Value::array(items))
}

// Each element's key is computed once.
fn decorate<K>(key: &K, coll: &Value) -> Result<Vec<(Value, Value)>>
where
    K: Fn(&Value) -> Result<Value>,
{
    iter(coll)?
        .map(|item| {
            let item = item?;
            Ok((key(&item)?, item))
        })
        .collect()
}

/// Sort by the natural order of `key(x)`.
pub fn sort_by<K>(key: K, coll: &Value) -> Result<Value>
where
    K: Fn(&Value) -> Result<Value>,
{
    let mut keyed = decorate(&key, coll)?;
    sort_items(&mut keyed, |(a, _), (b, _)| compare(a, b))?;
    Ok(Value::array(keyed.into_iter().map(|(_, v)| v).collect()))
}

/// Sort by `key(x)` ordered with a user comparator.
pub fn sort_by_with<K, C>(key: K, cmp: C, coll: &Value) -> Result<Value>
where
    K: Fn(&Value) -> Result<Value>,
    C: Fn(&Value, &Value) -> Result<Value>,
{
    let mut keyed = decorate(&key, coll)?;
    sort_items(&mut keyed, |(a, _), (b, _)| user_ordering("sort-by", &cmp, a, b))?;
    Ok(Value::array(keyed.into_iter().map(|(_, v)| v).collect()))
}

fn extreme_key<K>(key: K, coll: &Value, wanted: Ordering) -> Result<Value>
where
    K: Fn(&Value) -> Result<Value>,
{
    let mut best: Option<(Value, Value)> = None;
    for item in iter(coll)? {
        let item = item?;
        let k = key(&item)?;
        let replace = match &best {
            None => true,
            // Ties go to the later element
            Some((best_key, _)) => compare(&k, best_key)? != wanted.reverse(),
        };
        if replace {
            best = Some((k, item));
        }
    }
    Ok(best.map(|(_, v)| v).unwrap_or(Value::Nil))
}

/// Element with the smallest `key`; the last one wins ties. Nil when empty.
pub fn min_key<K>(key: K, coll: &Value) -> Result<Value>
where
    K: Fn(&Value) -> Result<Value>,
{
    extreme_key(key, coll, Ordering::Less)
}

/// Element with the largest `key`; the last one wins ties. Nil when empty.
pub fn max_key<K>(key: K, coll: &Value) -> Result<Value>
where
    K: Fn(&Value) -> Result<Value>,
{
    extreme_key(key, coll, Ordering::Greater)
}
