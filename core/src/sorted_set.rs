//! Comparator-ordered set.
//!
//! Elements live in a vector kept in [`compare`] order, with a companion hash
//! set answering membership in constant time.

#![allow(clippy::mutable_key_type)]

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::compare::compare;
use crate::error::{Error, Result};
use crate::iter::iter;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    items: Vec<Value>,
    members: FxHashSet<Value>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` before the first element that compares greater than or
    /// equal to it. Returns `false` when it was already present.
    pub fn add(&mut self, value: Value) -> Result<bool> {
        if self.members.contains(&value) {
            return Ok(false);
        }
        let mut index = self.items.len();
        for (i, item) in self.items.iter().enumerate() {
            if compare(item, &value)? != Ordering::Less {
                index = i;
                break;
            }
        }
        self.items.insert(index, value.clone());
        self.members.insert(value);
        Ok(true)
    }

    /// Returns `false` when `value` was not present.
    pub fn delete(&mut self, value: &Value) -> bool {
        if !self.members.remove(value) {
            return false;
        }
        if let Some(index) = self.items.iter().position(|item| item == value) {
            self.items.remove(index);
        }
        true
    }

    pub fn has(&self, value: &Value) -> bool {
        self.members.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Elements in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&Value> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&Value> {
        self.items.last()
    }
}

/// Build a sorted set value from `items`.
pub fn sorted_set(items: Vec<Value>) -> Result<Value> {
    let mut set = SortedSet::new();
    for item in items {
        set.add(item)?;
    }
    Ok(Value::SortedSet(Rc::new(RefCell::new(set))))
}

/// Realize any seqable into a sorted set value.
pub fn into_sorted_set(coll: &Value) -> Result<Value> {
    let mut set = SortedSet::new();
    for item in iter(coll)? {
        set.add(item?)?;
    }
    Ok(Value::SortedSet(Rc::new(RefCell::new(set))))
}

// ============================================================================
// Range queries
// ============================================================================

/// Bound test for [`subseq`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Bound {
    fn admits(self, item: &Value, key: &Value) -> Result<bool> {
        let ord = compare(item, key)?;
        Ok(match self {
            Bound::Lt => ord == Ordering::Less,
            Bound::Le => ord != Ordering::Greater,
            Bound::Gt => ord == Ordering::Greater,
            Bound::Ge => ord != Ordering::Less,
        })
    }

    fn is_lower(self) -> bool {
        matches!(self, Bound::Gt | Bound::Ge)
    }
}

fn snapshot(op: &'static str, set: &Value) -> Result<Vec<Value>> {
    match set {
        Value::SortedSet(s) => Ok(s.borrow().items.clone()),
        other => Err(Error::unsupported(op, "sorted set", other)),
    }
}

fn select(items: Vec<Value>, tests: &[(Bound, &Value)]) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    'items: for item in items {
        for (bound, key) in tests {
            if !bound.admits(&item, key)? {
                continue 'items;
            }
        }
        out.push(item);
    }
    Ok(out)
}

/// Elements satisfying `test` against `key`, ascending, as an Array.
pub fn subseq(set: &Value, test: Bound, key: &Value) -> Result<Value> {
    let items = snapshot("subseq", set)?;
    Ok(Value::array(select(items, &[(test, key)])?))
}

/// Elements between a lower bound (`>` or `>=`) and an upper bound
/// (`<` or `<=`), ascending, as an Array.
pub fn subseq_range(
    set: &Value,
    start_test: Bound,
    start_key: &Value,
    end_test: Bound,
    end_key: &Value,
) -> Result<Value> {
    check_range("subseq", start_test, end_test)?;
    let items = snapshot("subseq", set)?;
    Ok(Value::array(select(
        items,
        &[(start_test, start_key), (end_test, end_key)],
    )?))
}

/// Like [`subseq`], in descending order.
pub fn rsubseq(set: &Value, test: Bound, key: &Value) -> Result<Value> {
    let mut items = select(snapshot("rsubseq", set)?, &[(test, key)])?;
    items.reverse();
    Ok(Value::array(items))
}

/// Like [`subseq_range`], in descending order.
pub fn rsubseq_range(
    set: &Value,
    start_test: Bound,
    start_key: &Value,
    end_test: Bound,
    end_key: &Value,
) -> Result<Value> {
    check_range("rsubseq", start_test, end_test)?;
    let mut items = select(
        snapshot("rsubseq", set)?,
        &[(start_test, start_key), (end_test, end_key)],
    )?;
    items.reverse();
    Ok(Value::array(items))
}

fn check_range(op: &'static str, start: Bound, end: Bound) -> Result<()> {
    if start.is_lower() && !end.is_lower() {
        Ok(())
    } else {
        Err(Error::illegal(
            op,
            format!("start test must be > or >= and end test < or <=, got {start:?} and {end:?}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::vector;

    fn ints(ns: &[i64]) -> Vec<Value> {
        ns.iter().map(|n| Value::int(*n)).collect()
    }

    #[test]
    fn test_add_keeps_order_and_uniqueness() {
        let mut s = SortedSet::new();
        for n in [5, 1, 3, 1, 4] {
            s.add(Value::int(n)).unwrap();
        }
        assert_eq!(s.iter().cloned().collect::<Vec<_>>(), ints(&[1, 3, 4, 5]));
        assert_eq!(s.len(), 4);
        assert!(!s.add(Value::int(3)).unwrap());
    }

    #[test]
    fn test_delete_and_has() {
        let mut s = SortedSet::new();
        s.add(Value::int(2)).unwrap();
        s.add(Value::int(1)).unwrap();
        assert!(s.has(&Value::int(2)));
        assert!(s.delete(&Value::int(2)));
        assert!(!s.delete(&Value::int(2)));
        assert!(!s.has(&Value::int(2)));
        assert_eq!(s.len(), 1);
        assert_eq!(s.first(), Some(&Value::int(1)));
    }

    #[test]
    fn test_nil_sorts_first() {
        let s = sorted_set(vec![Value::from("b"), Value::Nil, Value::from("a")]).unwrap();
        let items = crate::iter::to_vec(&s).unwrap();
        assert_eq!(items, vec![Value::Nil, Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_incomparable_element_fails() {
        assert!(matches!(
            sorted_set(vec![Value::int(1), Value::from("a")]),
            Err(Error::Comparison { .. })
        ));
    }

    #[test]
    fn test_subseq() {
        let s = sorted_set(ints(&[1, 2, 3, 4, 5])).unwrap();
        assert_eq!(subseq(&s, Bound::Gt, &Value::int(3)).unwrap(), vector(ints(&[4, 5])));
        assert_eq!(subseq(&s, Bound::Le, &Value::int(2)).unwrap(), vector(ints(&[1, 2])));
        assert_eq!(
            subseq_range(&s, Bound::Ge, &Value::int(2), Bound::Lt, &Value::int(4)).unwrap(),
            vector(ints(&[2, 3]))
        );
        assert_eq!(rsubseq(&s, Bound::Ge, &Value::int(4)).unwrap(), vector(ints(&[5, 4])));
        assert_eq!(
            rsubseq_range(&s, Bound::Gt, &Value::int(1), Bound::Le, &Value::int(3)).unwrap(),
            vector(ints(&[3, 2]))
        );
    }

    #[test]
    fn test_subseq_range_rejects_inverted_bounds() {
        let s = sorted_set(ints(&[1])).unwrap();
        assert!(matches!(
            subseq_range(&s, Bound::Lt, &Value::int(1), Bound::Gt, &Value::int(0)),
            Err(Error::IllegalArgument { .. })
        ));
    }

    #[test]
    fn test_subseq_on_hash_set_fails() {
        let s = Value::set(ints(&[1]));
        assert!(matches!(
            subseq(&s, Bound::Gt, &Value::int(0)),
            Err(Error::UnsupportedType { .. })
        ));
    }
}
