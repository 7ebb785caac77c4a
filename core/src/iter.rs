//! Iteration normalizer.
//!
//! Turns any value into a pull-based [`Cursor`] over its entries. Nil puns to
//! the empty sequence, strings iterate as single-character strings, maps and
//! records iterate as `[key, value]` pairs.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::kind::{Kind, empty_of, kind_of};
use crate::value::Value;

/// A pull-based cursor over sequence elements. An `Err` item ends the
/// traversal; consumers stop at the first one.
pub type Cursor = Box<dyn Iterator<Item = Result<Value>>>;

/// The empty cursor.
pub fn empty_cursor() -> Cursor {
    Box::new(std::iter::empty())
}

/// A cursor that fails on its first pull.
pub fn failing(err: Error) -> Cursor {
    Box::new(std::iter::once(Err(err)))
}

pub(crate) fn ok(value: Value) -> Result<Value> {
    Ok(value)
}

/// A cursor over already-realized elements.
pub fn from_vec(items: Vec<Value>) -> Cursor {
    Box::new(items.into_iter().map(ok))
}

fn pair(k: Value, v: Value) -> Value {
    Value::array(vec![k, v])
}

/// Normalize a value into a cursor over its entries.
pub fn iter(value: &Value) -> Result<Cursor> {
    match value {
        Value::Nil => Ok(empty_cursor()),
        Value::Str(s) => {
            let chars: Vec<Value> = s.chars().map(|c| Value::from(c.to_string())).collect();
            Ok(from_vec(chars))
        }
        // Index-based so that a partial traversal does not copy the array
        Value::Array(items) => {
            let items = Rc::clone(items);
            Ok(Box::new(
                (0..).map_while(move |i| items.borrow().get(i).cloned().map(ok)),
            ))
        }
        Value::List(items) => {
            let items = Rc::clone(items);
            Ok(Box::new(
                (0..).map_while(move |i| items.borrow().get(i).cloned().map(ok)),
            ))
        }
        Value::Map(m) => {
            let entries: Vec<Value> = m
                .borrow()
                .iter()
                .map(|(k, v)| pair(k.clone(), v.clone()))
                .collect();
            Ok(from_vec(entries))
        }
        Value::Record(r) => {
            let entries: Vec<Value> = r
                .borrow()
                .iter()
                .map(|(k, v)| pair(Value::from(k.resolve()), v.clone()))
                .collect();
            Ok(from_vec(entries))
        }
        Value::Set(s) => {
            let items: Vec<Value> = s.borrow().iter().cloned().collect();
            Ok(from_vec(items))
        }
        Value::SortedSet(s) => {
            let items: Vec<Value> = s.borrow().iter().cloned().collect();
            Ok(from_vec(items))
        }
        Value::Lazy(l) => Ok(l.cursor()),
        other => Err(Error::not_iterable(other)),
    }
}

/// Like [`iter`], but defers a not-iterable failure to the first pull.
/// Lazy constructors use this so they do no work until traversed.
pub fn cursor_or_fail(value: &Value) -> Cursor {
    iter(value).unwrap_or_else(failing)
}

/// Whether `iter` accepts the value.
pub fn is_seqable(value: &Value) -> bool {
    matches!(value, Value::Nil | Value::Str(_)) || kind_of(value).is_some()
}

/// Like `iter`, but an empty result collapses to `None`, the "no sequence"
/// sentinel. A non-empty value is returned as its own sequence, except that
/// records become an Array of their `[key, value]` pairs.
pub fn seq(value: &Value) -> Result<Option<Value>> {
    let mut cursor = iter(value)?;
    match cursor.next() {
        None => Ok(None),
        Some(Err(e)) => Err(e),
        Some(Ok(_)) => match value {
            Value::Record(_) => Ok(Some(Value::array(to_vec(value)?))),
            other => Ok(Some(other.clone())),
        },
    }
}

/// Realize every element.
pub fn to_vec(value: &Value) -> Result<Vec<Value>> {
    iter(value)?.collect()
}

/// `vec`: realize into a fresh Array.
pub fn vec(value: &Value) -> Result<Value> {
    Ok(Value::array(to_vec(value)?))
}

/// `set`: realize into a fresh hash Set.
pub fn set(value: &Value) -> Result<Value> {
    let items = to_vec(value)?;
    Ok(Value::set(items))
}

// ============================================================================
// Eager accessors
// ============================================================================

/// First element, nil when empty.
pub fn first(value: &Value) -> Result<Value> {
    iter(value)?.next().unwrap_or(Ok(Value::Nil))
}

pub fn second(value: &Value) -> Result<Value> {
    nth(value, 1)
}

pub fn ffirst(value: &Value) -> Result<Value> {
    first(&first(value)?)
}

/// Everything after the first element, or nil when there is nothing left.
pub fn next(value: &Value) -> Result<Value> {
    let rest = crate::lazy::rest(value);
    match seq(&rest)? {
        Some(s) => Ok(s),
        None => Ok(Value::Nil),
    }
}

pub fn nnext(value: &Value) -> Result<Value> {
    next(&next(value)?)
}

/// Last element, nil when empty. Arrays and lists answer without walking.
pub fn last(value: &Value) -> Result<Value> {
    match value {
        Value::Array(items) => Ok(items.borrow().last().cloned().unwrap_or(Value::Nil)),
        Value::List(items) => Ok(items.borrow().back().cloned().unwrap_or(Value::Nil)),
        other => {
            let mut last = Value::Nil;
            for item in iter(other)? {
                last = item?;
            }
            Ok(last)
        }
    }
}

/// Element at `index`, nil when out of range.
pub fn nth(value: &Value, index: usize) -> Result<Value> {
    match value {
        Value::Array(items) => Ok(items.borrow().get(index).cloned().unwrap_or(Value::Nil)),
        Value::List(items) => Ok(items.borrow().get(index).cloned().unwrap_or(Value::Nil)),
        other => iter(other)?.nth(index).unwrap_or(Ok(Value::Nil)),
    }
}

/// Number of elements. Walks lazy sequences, so never returns for an
/// infinite one; see [`bounded_count`].
pub fn count(value: &Value) -> Result<usize> {
    match value {
        Value::Nil => Ok(0),
        Value::Str(s) => Ok(s.chars().count()),
        Value::Array(items) => Ok(items.borrow().len()),
        Value::List(items) => Ok(items.borrow().len()),
        Value::Map(m) => Ok(m.borrow().len()),
        Value::Record(r) => Ok(r.borrow().len()),
        Value::Set(s) => Ok(s.borrow().len()),
        Value::SortedSet(s) => Ok(s.borrow().len()),
        Value::Lazy(l) => l.cursor().try_fold(0, |n, item| item.map(|_| n + 1)),
        other => Err(Error::unsupported("count", "nil, string or collection", other)),
    }
}

/// Count at most `limit` elements.
pub fn bounded_count(limit: usize, value: &Value) -> Result<usize> {
    iter(value)?
        .take(limit)
        .try_fold(0, |n, item| item.map(|_| n + 1))
}

pub fn is_empty(value: &Value) -> Result<bool> {
    Ok(seq(value)?.is_none())
}

/// The collection itself, or nil when it is empty.
pub fn not_empty(value: &Value) -> Result<Value> {
    if is_empty(value)? {
        Ok(Value::Nil)
    } else {
        Ok(value.clone())
    }
}

/// Realize a sequence into a List, the "empty list" for nil.
pub fn to_list(value: &Value) -> Result<Value> {
    match kind_of(value) {
        None if value.is_nil() => Ok(empty_of(Kind::List)),
        _ => Ok(Value::list(to_vec(value)?)),
    }
}
