//! Container kind discrimination.
//!
//! Every polymorphic operation resolves its receiver to one of the closed set
//! of [`Kind`]s before dispatching.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::lazy;
use crate::sorted_set::SortedSet;
use crate::value::Value;

/// Logical container categories used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Map,
    Array,
    Record,
    List,
    Set,
    LazySeq,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Map => "Map",
            Kind::Array => "Array",
            Kind::Record => "Record",
            Kind::List => "List",
            Kind::Set => "Set",
            Kind::LazySeq => "LazySeq",
        }
    }
}

/// Classify a value. Nil and scalars (numbers, strings, booleans, functions,
/// atoms, reduced boxes) have no kind.
///
/// Sorted sets report as `Set`.
pub fn kind_of(value: &Value) -> Option<Kind> {
    match value {
        Value::Nil => None,
        Value::Record(_) => Some(Kind::Record),
        Value::Map(_) => Some(Kind::Map),
        Value::Set(_) | Value::SortedSet(_) => Some(Kind::Set),
        Value::List(_) => Some(Kind::List),
        Value::Array(_) => Some(Kind::Array),
        Value::Lazy(_) => Some(Kind::LazySeq),
        _ => None,
    }
}

/// Resolve the kind of `value`, failing for nil and scalars.
pub fn require_kind(op: &'static str, expected: &'static str, value: &Value) -> Result<Kind> {
    kind_of(value).ok_or_else(|| Error::unsupported(op, expected, value))
}

/// A fresh empty container of the given kind.
pub fn empty_of(kind: Kind) -> Value {
    match kind {
        Kind::Map => Value::Map(Rc::new(RefCell::new(FxHashMap::default()))),
        Kind::Array => Value::array(Vec::new()),
        Kind::Record => Value::Record(Rc::new(RefCell::new(FxHashMap::default()))),
        Kind::List => Value::List(Rc::new(RefCell::new(VecDeque::new()))),
        Kind::Set => Value::Set(Rc::new(RefCell::new(FxHashSet::default()))),
        Kind::LazySeq => lazy::empty(),
    }
}

/// A fresh empty container of the same kind as `coll`. Sorted sets stay
/// sorted; nil stays nil.
pub fn empty(coll: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::SortedSet(_) => Ok(Value::SortedSet(Rc::new(RefCell::new(SortedSet::new())))),
        other => Ok(empty_of(require_kind(
            "empty",
            "Map, Array, Record, List, Set or LazySeq",
            other,
        )?)),
    }
}

pub fn is_map(value: &Value) -> bool {
    kind_of(value) == Some(Kind::Map)
}

pub fn is_array(value: &Value) -> bool {
    kind_of(value) == Some(Kind::Array)
}

pub fn is_record(value: &Value) -> bool {
    kind_of(value) == Some(Kind::Record)
}

pub fn is_list(value: &Value) -> bool {
    kind_of(value) == Some(Kind::List)
}

pub fn is_set(value: &Value) -> bool {
    kind_of(value) == Some(Kind::Set)
}

pub fn is_lazy(value: &Value) -> bool {
    kind_of(value) == Some(Kind::LazySeq)
}

pub fn is_coll(value: &Value) -> bool {
    kind_of(value).is_some()
}
