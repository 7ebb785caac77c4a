//! The runtime value model.
//!
//! Containers are reference types: cloning a `Value` clones the reference,
//! so the `_mut` operations are visible through every clone while the
//! copy-on-write operations allocate a fresh container.

// Values are used as FxHashMap/FxHashSet keys. Containers sit behind RefCell,
// and mutating a container that is already a key is a caller error; Hash and
// Eq are structural.
#![allow(clippy::mutable_key_type)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use crate::atom::Atom;
use crate::error::{Error, Result};
use crate::interner::Key;
use crate::lazy::LazySeq;
use crate::numeric::NumericType;
use crate::sorted_set::SortedSet;

// ============================================================================
// Container Types
// ============================================================================

pub type ArrayValue = Rc<RefCell<Vec<Value>>>;
pub type ListValue = Rc<RefCell<VecDeque<Value>>>;
pub type MapValue = Rc<RefCell<FxHashMap<Value, Value>>>;
pub type RecordValue = Rc<RefCell<FxHashMap<Key, Value>>>;
pub type SetValue = Rc<RefCell<FxHashSet<Value>>>;
pub type SortedSetValue = Rc<RefCell<SortedSet>>;

/// Native function callable with a slice of arguments.
#[derive(Clone)]
pub struct NativeFn {
    name: Rc<str>,
    f: Rc<dyn Fn(&[Value]) -> Result<Value>>,
}

impl NativeFn {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        NativeFn {
            name: Rc::from(name),
            f: Rc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.f)(args)
    }

    pub fn call1(&self, arg: Value) -> Result<Value> {
        (self.f)(std::slice::from_ref(&arg))
    }

    pub fn ptr_eq(&self, other: &NativeFn) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.f) as *const () as usize
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(NumericType),
    Str(Rc<str>),
    /// Ordered, index-addressable
    Array(ArrayValue),
    /// Ordered, prepend-optimised
    List(ListValue),
    /// Key-unique table with arbitrary keys
    Map(MapValue),
    /// String-keyed bag
    Record(RecordValue),
    /// Unique elements, no positional index
    Set(SetValue),
    /// Set kept in comparator order
    SortedSet(SortedSetValue),
    Lazy(LazySeq),
    Fn(NativeFn),
    Atom(Atom),
    /// Early-termination box for reductions
    Reduced(Box<Value>),
}

// ============================================================================
// Constructors
// ============================================================================

impl Value {
    pub fn int(n: i64) -> Value {
        Value::Number(NumericType::Int(n))
    }

    pub fn float(x: f64) -> Value {
        Value::Number(NumericType::Float(x))
    }

    pub fn string(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn map<I: IntoIterator<Item = (Value, Value)>>(pairs: I) -> Value {
        Value::Map(Rc::new(RefCell::new(pairs.into_iter().collect())))
    }

    pub fn record<'a, I: IntoIterator<Item = (&'a str, Value)>>(pairs: I) -> Value {
        Value::Record(Rc::new(RefCell::new(
            pairs.into_iter().map(|(k, v)| (Key::new(k), v)).collect(),
        )))
    }

    pub fn set<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn function<F>(name: &str, f: F) -> Value
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Value::Fn(NativeFn::new(name, f))
    }
}

/// `vector(...)`: an Array of the arguments.
pub fn vector(items: Vec<Value>) -> Value {
    Value::array(items)
}

/// `list(...)`: a List of the arguments.
pub fn list(items: Vec<Value>) -> Value {
    Value::list(items)
}

pub fn hash_map(pairs: Vec<(Value, Value)>) -> Value {
    Value::map(pairs)
}

pub fn record(pairs: Vec<(&str, Value)>) -> Value {
    Value::record(pairs)
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::int(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::int(n),
            Err(_) => Value::Number(NumericType::from_big(n.into())),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<NumericType> for Value {
    fn from(n: NumericType) -> Self {
        Value::Number(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<NativeFn> for Value {
    fn from(f: NativeFn) -> Self {
        Value::Fn(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Value {
    /// Short name of the value's type, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "sorted-set",
            Value::Lazy(_) => "lazy-seq",
            Value::Fn(_) => "fn",
            Value::Atom(_) => "atom",
            Value::Reduced(_) => "reduced",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except nil and false is truthy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&NumericType> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Array, List and lazy sequences: ordered, sequential collections.
    pub fn is_sequential(&self) -> bool {
        matches!(self, Value::Array(_) | Value::List(_) | Value::Lazy(_))
    }

    /// Copy the outer container into a fresh reference. Elements are shared.
    /// Scalars are returned unchanged.
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::Array(v) => Value::Array(Rc::new(RefCell::new(v.borrow().clone()))),
            Value::List(v) => Value::List(Rc::new(RefCell::new(v.borrow().clone()))),
            Value::Map(m) => Value::Map(Rc::new(RefCell::new(m.borrow().clone()))),
            Value::Record(r) => Value::Record(Rc::new(RefCell::new(r.borrow().clone()))),
            Value::Set(s) => Value::Set(Rc::new(RefCell::new(s.borrow().clone()))),
            Value::SortedSet(s) => Value::SortedSet(Rc::new(RefCell::new(s.borrow().clone()))),
            other => other.clone(),
        }
    }

    /// Same reference, or equal scalars. Containers are never compared by
    /// content.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::SortedSet(a), Value::SortedSet(b)) => Rc::ptr_eq(a, b),
            (Value::Lazy(a), Value::Lazy(b)) => a.ptr_eq(b),
            (Value::Fn(a), Value::Fn(b)) => a.ptr_eq(b),
            (Value::Atom(a), Value::Atom(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Record keys must be strings.
pub(crate) fn record_key(op: &'static str, key: &Value) -> Result<Key> {
    match key {
        Value::Str(s) => Ok(Key::new(s)),
        other => Err(Error::unsupported(op, "string record key", other)),
    }
}

// ============================================================================
// Equality and Hashing
// ============================================================================

fn sequential_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(v) => Some(v.borrow().clone()),
        Value::List(v) => Some(v.borrow().iter().cloned().collect()),
        _ => None,
    }
}

fn set_eq(a: &Value, b: &Value) -> bool {
    let len = |v: &Value| match v {
        Value::Set(s) => s.borrow().len(),
        Value::SortedSet(s) => s.borrow().len(),
        _ => 0,
    };
    if len(a) != len(b) {
        return false;
    }
    let items: Vec<Value> = match a {
        Value::Set(s) => s.borrow().iter().cloned().collect(),
        Value::SortedSet(s) => s.borrow().iter().cloned().collect(),
        _ => return false,
    };
    items.iter().all(|item| match b {
        Value::Set(s) => s.borrow().contains(item),
        Value::SortedSet(s) => s.borrow().has(item),
        _ => false,
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(_) | Value::List(_), Value::Array(_) | Value::List(_)) => {
                if self.loose_eq(other) {
                    return true;
                }
                sequential_items(self) == sequential_items(other)
            }
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Set(_) | Value::SortedSet(_), Value::Set(_) | Value::SortedSet(_)) => {
                self.loose_eq(other) || set_eq(self, other)
            }
            (Value::Lazy(a), Value::Lazy(b)) => a.ptr_eq(b),
            (Value::Fn(a), Value::Fn(b)) => a.ptr_eq(b),
            (Value::Atom(a), Value::Atom(b)) => a.ptr_eq(b),
            (Value::Reduced(a), Value::Reduced(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

// Order-independent hash of an unordered collection
fn unordered_hash<I, T>(items: I) -> u64
where
    I: Iterator<Item = T>,
    T: Hash,
{
    items.fold(0u64, |acc, item| {
        let mut h = FxHasher::default();
        item.hash(&mut h);
        acc.wrapping_add(h.finish())
    })
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Nil => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Number(n) => {
                2u8.hash(state);
                n.hash(state);
            }
            Value::Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            // Arrays and lists that are equal must hash alike
            Value::Array(_) | Value::List(_) => {
                4u8.hash(state);
                if let Some(items) = sequential_items(self) {
                    state.write_usize(items.len());
                    for item in &items {
                        item.hash(state);
                    }
                }
            }
            Value::Map(m) => {
                5u8.hash(state);
                let m = m.borrow();
                state.write_usize(m.len());
                state.write_u64(unordered_hash(m.iter()));
            }
            Value::Record(r) => {
                6u8.hash(state);
                let r = r.borrow();
                state.write_usize(r.len());
                state.write_u64(unordered_hash(r.iter()));
            }
            Value::Set(s) => {
                7u8.hash(state);
                let s = s.borrow();
                state.write_usize(s.len());
                state.write_u64(unordered_hash(s.iter()));
            }
            Value::SortedSet(s) => {
                7u8.hash(state);
                let s = s.borrow();
                state.write_usize(s.len());
                state.write_u64(unordered_hash(s.iter()));
            }
            Value::Lazy(l) => {
                8u8.hash(state);
                l.addr().hash(state);
            }
            Value::Fn(f) => {
                9u8.hash(state);
                f.addr().hash(state);
            }
            Value::Atom(a) => {
                10u8.hash(state);
                a.addr().hash(state);
            }
            Value::Reduced(v) => {
                11u8.hash(state);
                v.hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_and_list_compare_by_elements() {
        let a = Value::array(vec![Value::int(1), Value::int(2)]);
        let l = Value::list(vec![Value::int(1), Value::int(2)]);
        assert_eq!(a, l);

        let mut ha = FxHasher::default();
        let mut hl = FxHasher::default();
        a.hash(&mut ha);
        l.hash(&mut hl);
        assert_eq!(ha.finish(), hl.finish());
    }

    #[test]
    fn test_maps_compare_structurally() {
        let m1 = Value::map(vec![(Value::from("a"), Value::int(1))]);
        let m2 = Value::map(vec![(Value::from("a"), Value::int(1))]);
        assert_eq!(m1, m2);
        assert!(!m1.loose_eq(&m2));
        assert!(m1.loose_eq(&m1.clone()));
    }

    #[test]
    fn test_map_and_record_are_different_kinds() {
        let m = Value::map(vec![(Value::from("a"), Value::int(1))]);
        let r = Value::record(vec![("a", Value::int(1))]);
        assert_ne!(m, r);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::int(0).truthy());
        assert!(Value::from("").truthy());
    }

    #[test]
    fn test_shallow_copy_is_a_new_reference() {
        let a = Value::array(vec![Value::int(1)]);
        let b = a.shallow_copy();
        assert_eq!(a, b);
        assert!(!a.loose_eq(&b));
        if let Value::Array(v) = &b {
            v.borrow_mut().push(Value::int(2));
        }
        assert_ne!(a, b);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Nil);
        assert_eq!(Value::from(Some(3)), Value::int(3));
    }

    #[test]
    fn test_native_fn_identity() {
        let f = NativeFn::new("one", |_| Ok(Value::int(1)));
        let g = f.clone();
        assert!(f.ptr_eq(&g));
        assert_eq!(f.call(&[]).unwrap(), Value::int(1));
        assert_eq!(f.name(), "one");
    }
}
