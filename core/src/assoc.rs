//! Associative and collection-building operations.
//!
//! Plain forms (`assoc`, `conj`, `dissoc`, ...) never touch their input: they
//! copy the outer container and change the copy. The `_mut` forms change the
//! receiver in place and return the same reference. They are not atomic: if
//! one of several changes fails, the earlier ones stay applied.

#![allow(clippy::mutable_key_type)]

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::iter::{is_seqable, iter};
use crate::kind::{Kind, empty_of, kind_of};
use crate::lazy;
use crate::value::{Value, record_key};

const ASSOC_KINDS: &str = "Map, Array or Record";
const CONJ_KINDS: &str = "Set, Array, List, Map, Record or LazySeq";
const CONJ_MUT_KINDS: &str = "Set, Array, List, Map or Record";
const MAP_KINDS: &str = "Map or Record";

// ============================================================================
// Lookup
// ============================================================================

fn index(key: &Value) -> Option<usize> {
    key.as_int().and_then(|i| usize::try_from(i).ok())
}

/// Value at `key`, or nil.
///
/// Maps look up the key, arrays, lists and strings the integer index, records
/// the string key; sets answer the key itself when it is a member. Anything
/// else has no entries.
pub fn get(coll: &Value, key: &Value) -> Value {
    match coll {
        Value::Map(m) => m.borrow().get(key).cloned().unwrap_or(Value::Nil),
        Value::Record(r) => key
            .as_str()
            .and_then(|k| r.borrow().get(&crate::interner::Key::new(k)).cloned())
            .unwrap_or(Value::Nil),
        Value::Array(items) => index(key)
            .and_then(|i| items.borrow().get(i).cloned())
            .unwrap_or(Value::Nil),
        Value::List(items) => index(key)
            .and_then(|i| items.borrow().get(i).cloned())
            .unwrap_or(Value::Nil),
        Value::Str(s) => index(key)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::from(c.to_string()))
            .unwrap_or(Value::Nil),
        Value::Set(s) if s.borrow().contains(key) => key.clone(),
        Value::SortedSet(s) if s.borrow().has(key) => key.clone(),
        _ => Value::Nil,
    }
}

/// [`get`] with a fallback.
///
/// The fallback is returned both when `key` is absent and when it maps to
/// nil; the two cases cannot be told apart through `get`. Use [`contains`]
/// or [`find`] when the difference matters.
pub fn get_or(coll: &Value, key: &Value, default: Value) -> Value {
    match get(coll, key) {
        Value::Nil => default,
        found => found,
    }
}

/// Follow `path` through nested collections. Nil when any step is missing.
pub fn get_in(coll: &Value, path: &[Value]) -> Value {
    path.iter().fold(coll.clone(), |current, key| get(&current, key))
}

pub fn get_in_or(coll: &Value, path: &[Value], default: Value) -> Value {
    match get_in(coll, path) {
        Value::Nil => default,
        found => found,
    }
}

/// Whether `key` is present: a map or record key, an array index, or a set
/// member. Nil contains nothing.
pub fn contains(coll: &Value, key: &Value) -> Result<bool> {
    match coll {
        Value::Nil => Ok(false),
        Value::Map(m) => Ok(m.borrow().contains_key(key)),
        Value::Record(r) => Ok(key
            .as_str()
            .is_some_and(|k| r.borrow().contains_key(&crate::interner::Key::new(k)))),
        Value::Array(items) => Ok(index(key).is_some_and(|i| i < items.borrow().len())),
        Value::Str(s) => Ok(index(key).is_some_and(|i| i < s.chars().count())),
        Value::Set(s) => Ok(s.borrow().contains(key)),
        Value::SortedSet(s) => Ok(s.borrow().has(key)),
        other => Err(Error::unsupported(
            "contains?",
            "Map, Record, Array, String or Set",
            other,
        )),
    }
}

/// The `[key, value]` entry for `key`, or nil when absent.
pub fn find(coll: &Value, key: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::Map(_) | Value::Record(_) | Value::Array(_) => {
            if contains(coll, key)? {
                Ok(Value::array(vec![key.clone(), get(coll, key)]))
            } else {
                Ok(Value::Nil)
            }
        }
        other => Err(Error::unsupported("find", ASSOC_KINDS, other)),
    }
}

fn entries(op: &'static str, coll: &Value) -> Result<Vec<(Value, Value)>> {
    match coll {
        Value::Nil => Ok(Vec::new()),
        Value::Map(m) => Ok(m
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()),
        Value::Record(r) => Ok(r
            .borrow()
            .iter()
            .map(|(k, v)| (Value::from(k.resolve()), v.clone()))
            .collect()),
        other => Err(Error::unsupported(op, MAP_KINDS, other)),
    }
}

/// Keys as an Array, nil when there are none.
pub fn keys(coll: &Value) -> Result<Value> {
    let keys: Vec<Value> = entries("keys", coll)?.into_iter().map(|(k, _)| k).collect();
    Ok(if keys.is_empty() { Value::Nil } else { Value::array(keys) })
}

/// Values as an Array, nil when there are none.
pub fn vals(coll: &Value) -> Result<Value> {
    let vals: Vec<Value> = entries("vals", coll)?.into_iter().map(|(_, v)| v).collect();
    Ok(if vals.is_empty() { Value::Nil } else { Value::array(vals) })
}

// ============================================================================
// assoc / dissoc
// ============================================================================

// Set one entry in place.
fn put(op: &'static str, coll: &Value, key: Value, val: Value) -> Result<()> {
    match coll {
        Value::Map(m) => {
            m.borrow_mut().insert(key, val);
            Ok(())
        }
        Value::Record(r) => {
            let key = record_key(op, &key)?;
            r.borrow_mut().insert(key, val);
            Ok(())
        }
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let i = match key.as_int() {
                Some(i) => i,
                None => return Err(Error::unsupported(op, "integer index", &key)),
            };
            match usize::try_from(i) {
                Ok(i) if i < len => items[i] = val,
                Ok(i) if i == len => items.push(val),
                _ => return Err(Error::IndexOutOfBounds { index: i, len }),
            }
            Ok(())
        }
        other => Err(Error::unsupported(op, ASSOC_KINDS, other)),
    }
}

fn put_kvs(op: &'static str, coll: &Value, kvs: &[Value]) -> Result<()> {
    if kvs.len() % 2 != 0 {
        return Err(Error::arity(
            op,
            format!("expects key/value pairs, got an odd count of {}", kvs.len()),
        ));
    }
    for pair in kvs.chunks_exact(2) {
        put(op, coll, pair[0].clone(), pair[1].clone())?;
    }
    Ok(())
}

// Fresh copy to change, with nil standing for an empty Map.
fn assoc_base(op: &'static str, coll: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(empty_of(Kind::Map)),
        Value::Map(_) | Value::Record(_) | Value::Array(_) => Ok(coll.shallow_copy()),
        other => Err(Error::unsupported(op, ASSOC_KINDS, other)),
    }
}

/// Copy of `coll` with `key` set to `val`. Nil becomes a Map. Array keys
/// are indices; the index one past the end appends.
pub fn assoc(coll: &Value, key: Value, val: Value) -> Result<Value> {
    let out = assoc_base("assoc", coll)?;
    put("assoc", &out, key, val)?;
    Ok(out)
}

/// `assoc` with a flat list of alternating keys and values. An odd count is
/// an [`Error::Arity`].
pub fn assoc_kvs(coll: &Value, kvs: &[Value]) -> Result<Value> {
    let out = assoc_base("assoc", coll)?;
    put_kvs("assoc", &out, kvs)?;
    Ok(out)
}

/// Set `key` in place and return `coll`. Not atomic.
pub fn assoc_mut(coll: &Value, key: Value, val: Value) -> Result<Value> {
    put("assoc!", coll, key, val)?;
    Ok(coll.clone())
}

/// Set several keys in place. Not atomic: the odd-count check happens first,
/// but a bad key part-way leaves the earlier pairs applied.
pub fn assoc_kvs_mut(coll: &Value, kvs: &[Value]) -> Result<Value> {
    put_kvs("assoc!", coll, kvs)?;
    Ok(coll.clone())
}

fn remove_keys(op: &'static str, coll: &Value, keys: &[Value]) -> Result<()> {
    match coll {
        Value::Map(m) => {
            let mut m = m.borrow_mut();
            for k in keys {
                m.remove(k);
            }
            Ok(())
        }
        Value::Record(r) => {
            let mut r = r.borrow_mut();
            for k in keys.iter().filter_map(Value::as_str) {
                r.remove(&crate::interner::Key::new(k));
            }
            Ok(())
        }
        other => Err(Error::unsupported(op, MAP_KINDS, other)),
    }
}

/// Copy of `coll` without `keys`. Nil stays nil.
pub fn dissoc(coll: &Value, keys: &[Value]) -> Result<Value> {
    if coll.is_nil() {
        return Ok(Value::Nil);
    }
    let out = coll.shallow_copy();
    remove_keys("dissoc", &out, keys)?;
    Ok(out)
}

/// Remove `keys` in place and return `coll`.
pub fn dissoc_mut(coll: &Value, keys: &[Value]) -> Result<Value> {
    if coll.is_nil() {
        return Ok(Value::Nil);
    }
    remove_keys("dissoc!", coll, keys)?;
    Ok(coll.clone())
}

// ============================================================================
// conj / disj
// ============================================================================

// Entries to merge into a map-like receiver. An Array is a single
// `[key, value]` pair, a map or record contributes every entry, and any other
// seqable is walked as a sequence of pairs. Collected up front so the
// receiver may appear among the inputs.
fn entries_of(op: &'static str, x: &Value) -> Result<Vec<(Value, Value)>> {
    match x {
        Value::Nil => Ok(Vec::new()),
        Value::Array(_) => Ok(vec![pair_of(op, x)?]),
        Value::Map(_) | Value::Record(_) => entries(op, x),
        other if is_seqable(other) => iter(other)?
            .map(|item| pair_of(op, &item?))
            .collect(),
        other => Err(Error::unsupported(op, "[key value] pair or seqable of pairs", other)),
    }
}

// A two-element Array or List read as a map entry.
fn pair_of(op: &'static str, x: &Value) -> Result<(Value, Value)> {
    let items = match x {
        Value::Array(items) => items.borrow().clone(),
        Value::List(items) => items.borrow().iter().cloned().collect(),
        other => return Err(Error::unsupported(op, "[key value] pair", other)),
    };
    match <[Value; 2]>::try_from(items) {
        Ok([k, v]) => Ok((k, v)),
        Err(items) => Err(Error::illegal(
            op,
            format!("map entry must have 2 elements, got {}", items.len()),
        )),
    }
}

// Add `xs` to a concrete container in place.
fn add_all(op: &'static str, coll: &Value, xs: &[Value]) -> Result<()> {
    match coll {
        Value::Array(items) => {
            items.borrow_mut().extend(xs.iter().cloned());
            Ok(())
        }
        Value::List(items) => {
            let mut items = items.borrow_mut();
            for x in xs {
                items.push_front(x.clone());
            }
            Ok(())
        }
        Value::Set(s) => {
            let mut s = s.borrow_mut();
            for x in xs {
                s.insert(x.clone());
            }
            Ok(())
        }
        Value::SortedSet(s) => {
            let mut s = s.borrow_mut();
            for x in xs {
                s.add(x.clone())?;
            }
            Ok(())
        }
        Value::Map(_) | Value::Record(_) => {
            for x in xs {
                for (k, v) in entries_of(op, x)? {
                    put(op, coll, k, v)?;
                }
            }
            Ok(())
        }
        other => Err(Error::unsupported(op, CONJ_MUT_KINDS, other)),
    }
}

/// Add `xs` to a copy of `coll`.
///
/// Arrays append; lists and lazy sequences prepend, so the last of `xs` ends
/// up first; sets add; maps and records take `[key, value]` pairs or merge in
/// whole maps. Nil becomes a List.
pub fn conj(coll: &Value, xs: &[Value]) -> Result<Value> {
    match coll {
        Value::Nil => {
            let out = empty_of(Kind::List);
            add_all("conj", &out, xs)?;
            Ok(out)
        }
        Value::Lazy(_) => Ok(xs
            .iter()
            .fold(coll.clone(), |seq, x| lazy::cons(x.clone(), &seq))),
        _ if xs.is_empty() => Ok(coll.clone()),
        other => {
            if kind_of(other).is_none() {
                return Err(Error::unsupported("conj", CONJ_KINDS, other));
            }
            let out = other.shallow_copy();
            add_all("conj", &out, xs)?;
            Ok(out)
        }
    }
}

/// Add `xs` in place and return `coll`. Nil becomes a fresh Array. Not
/// atomic.
pub fn conj_mut(coll: &Value, xs: &[Value]) -> Result<Value> {
    let target = match coll {
        Value::Nil => Value::array(Vec::new()),
        other => other.clone(),
    };
    add_all("conj!", &target, xs)?;
    Ok(target)
}

fn remove_members(op: &'static str, coll: &Value, xs: &[Value]) -> Result<()> {
    match coll {
        Value::Set(s) => {
            let mut s = s.borrow_mut();
            for x in xs {
                s.remove(x);
            }
            Ok(())
        }
        Value::SortedSet(s) => {
            let mut s = s.borrow_mut();
            for x in xs {
                s.delete(x);
            }
            Ok(())
        }
        other => Err(Error::unsupported(op, "Set", other)),
    }
}

/// Copy of a set without `xs`. Nil stays nil.
pub fn disj(coll: &Value, xs: &[Value]) -> Result<Value> {
    if coll.is_nil() {
        return Ok(Value::Nil);
    }
    let out = coll.shallow_copy();
    remove_members("disj", &out, xs)?;
    Ok(out)
}

pub fn disj_mut(coll: &Value, xs: &[Value]) -> Result<Value> {
    if coll.is_nil() {
        return Ok(Value::Nil);
    }
    remove_members("disj!", coll, xs)?;
    Ok(coll.clone())
}

// ============================================================================
// update / nested paths
// ============================================================================

/// `assoc(coll, key, f(get(coll, key)))`
pub fn update<F>(coll: &Value, key: Value, f: F) -> Result<Value>
where
    F: FnOnce(Value) -> Result<Value>,
{
    let current = get(coll, &key);
    assoc(coll, key, f(current)?)
}

/// In-place [`update`]. Not atomic.
pub fn update_mut<F>(coll: &Value, key: Value, f: F) -> Result<Value>
where
    F: FnOnce(Value) -> Result<Value>,
{
    let current = get(coll, &key);
    assoc_mut(coll, key, f(current)?)
}

fn check_path(op: &'static str, path: &[Value]) -> Result<()> {
    if path.is_empty() {
        Err(Error::illegal(op, "path must not be empty"))
    } else {
        Ok(())
    }
}

// Walk `path`, substituting an empty container of the root's kind for every
// missing (nil or false) intermediate, then set bottom-up with `set`.
fn assoc_in_with<S>(op: &'static str, coll: &Value, path: &[Value], val: Value, set: S) -> Result<Value>
where
    S: Fn(&Value, Value, Value) -> Result<Value>,
{
    check_path(op, path)?;
    let root = match coll {
        Value::Nil => empty_of(Kind::Map),
        Value::Map(_) | Value::Record(_) | Value::Array(_) => coll.clone(),
        other => return Err(Error::unsupported(op, ASSOC_KINDS, other)),
    };
    let fill = kind_of(&root).unwrap_or(Kind::Map);

    let mut chain = vec![root];
    for key in &path[..path.len() - 1] {
        let parent = chain.last().cloned().unwrap_or(Value::Nil);
        let child = match get(&parent, key) {
            Value::Nil | Value::Bool(false) => empty_of(fill),
            found => found,
        };
        chain.push(child);
    }

    let mut current = val;
    for (node, key) in chain.iter().zip(path).rev() {
        current = set(node, key.clone(), current)?;
    }
    Ok(current)
}

/// Copy-on-write nested assoc. Nil becomes a Map; missing intermediate
/// containers are created with the root's kind.
pub fn assoc_in(coll: &Value, path: &[Value], val: Value) -> Result<Value> {
    assoc_in_with("assoc-in", coll, path, val, assoc)
}

/// Nested assoc that changes existing containers along the path in place.
/// Not atomic.
pub fn assoc_in_mut(coll: &Value, path: &[Value], val: Value) -> Result<Value> {
    assoc_in_with("assoc-in!", coll, path, val, assoc_mut)
}

/// `assoc_in(coll, path, f(get_in(coll, path)))`
pub fn update_in<F>(coll: &Value, path: &[Value], f: F) -> Result<Value>
where
    F: FnOnce(Value) -> Result<Value>,
{
    check_path("update-in", path)?;
    let current = get_in(coll, path);
    assoc_in(coll, path, f(current)?)
}

// ============================================================================
// Merging and building
// ============================================================================

// Base for merge: a copy of the first argument, an empty Record for nil.
fn merge_base(op: &'static str, first: &Value) -> Result<Value> {
    match first {
        Value::Nil => Ok(empty_of(Kind::Record)),
        Value::Lazy(_) => Err(Error::unsupported(op, CONJ_MUT_KINDS, first)),
        other if kind_of(other).is_some() => Ok(other.shallow_copy()),
        other => Err(Error::unsupported(op, CONJ_MUT_KINDS, other)),
    }
}

/// Conj every later map onto a copy of the first. Nil arguments are skipped;
/// a nil first argument starts from an empty Record. Nil when every
/// argument is nil.
pub fn merge(maps: &[Value]) -> Result<Value> {
    let Some(first) = maps.first() else {
        return Ok(Value::Nil);
    };
    if maps.iter().all(Value::is_nil) {
        return Ok(Value::Nil);
    }
    let out = merge_base("merge", first)?;
    let rest: Vec<Value> = maps[1..].iter().filter(|m| !m.is_nil()).cloned().collect();
    add_all("merge", &out, &rest)?;
    Ok(out)
}

/// Like [`merge`], resolving a key present on both sides with
/// `f(existing, incoming)`.
pub fn merge_with<F>(f: F, maps: &[Value]) -> Result<Value>
where
    F: Fn(Value, Value) -> Result<Value>,
{
    let Some(first) = maps.first() else {
        return Ok(Value::Nil);
    };
    if maps.iter().all(Value::is_nil) {
        return Ok(Value::Nil);
    }
    let out = merge_base("merge-with", first)?;
    for m in &maps[1..] {
        for (k, v) in entries_of("merge-with", m)? {
            let merged = if contains(&out, &k)? {
                f(get(&out, &k), v)?
            } else {
                v
            };
            put("merge-with", &out, k, merged)?;
        }
    }
    Ok(out)
}

/// Entries of `coll` whose key is among `keys`, in a container of the same
/// kind. Keys mapped to nil are left out. Nil gives an empty Map.
pub fn select_keys(coll: &Value, keys: &Value) -> Result<Value> {
    let out = match coll {
        Value::Nil => return Ok(empty_of(Kind::Map)),
        Value::Map(_) => empty_of(Kind::Map),
        Value::Record(_) => empty_of(Kind::Record),
        other => return Err(Error::unsupported("select-keys", MAP_KINDS, other)),
    };
    for key in iter(keys)? {
        let key = key?;
        match get(coll, &key) {
            Value::Nil => {}
            found => put("select-keys", &out, key, found)?,
        }
    }
    Ok(out)
}

/// Map from `keys` to `vals`, pairing up to the shorter of the two.
pub fn zipmap(keys: &Value, vals: &Value) -> Result<Value> {
    let out = empty_of(Kind::Map);
    for (k, v) in iter(keys)?.zip(iter(vals)?) {
        put("zipmap", &out, k?, v?)?;
    }
    Ok(out)
}

/// Same-kind container with `f` applied to every key. Nil gives an empty
/// Map. Record results must keep string keys.
pub fn update_keys<F>(coll: &Value, f: F) -> Result<Value>
where
    F: Fn(Value) -> Result<Value>,
{
    let out = match coll {
        Value::Record(_) => empty_of(Kind::Record),
        _ => empty_of(Kind::Map),
    };
    for (k, v) in entries("update-keys", coll)? {
        put("update-keys", &out, f(k)?, v)?;
    }
    Ok(out)
}

/// Same-kind container with `f` applied to every value. Nil gives an empty
/// Map.
pub fn update_vals<F>(coll: &Value, f: F) -> Result<Value>
where
    F: Fn(Value) -> Result<Value>,
{
    let out = match coll {
        Value::Record(_) => empty_of(Kind::Record),
        _ => empty_of(Kind::Map),
    };
    for (k, v) in entries("update-vals", coll)? {
        put("update-vals", &out, k, f(v)?)?;
    }
    Ok(out)
}

// ============================================================================
// Stack access
// ============================================================================

/// The element `conj` would remove first: the head of a List, the last
/// element of an Array.
pub fn peek(coll: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::List(items) => Ok(items.borrow().front().cloned().unwrap_or(Value::Nil)),
        Value::Array(items) => Ok(items.borrow().last().cloned().unwrap_or(Value::Nil)),
        other => Err(Error::unsupported("peek", "List or Array", other)),
    }
}

/// Copy without the [`peek`] element. Popping an empty collection is an
/// [`Error::IllegalArgument`].
pub fn pop(coll: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::List(_) | Value::Array(_) => {
            let out = coll.shallow_copy();
            let popped = match &out {
                Value::List(items) => items.borrow_mut().pop_front(),
                Value::Array(items) => items.borrow_mut().pop(),
                _ => None,
            };
            match popped {
                Some(_) => Ok(out),
                None => Err(Error::illegal("pop", "can't pop an empty collection")),
            }
        }
        other => Err(Error::unsupported("pop", "List or Array", other)),
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Map from each distinct element to how often it occurs.
pub fn frequencies(coll: &Value) -> Result<Value> {
    let mut counts: FxHashMap<Value, i64> = FxHashMap::default();
    for item in iter(coll)? {
        *counts.entry(item?).or_insert(0) += 1;
    }
    Ok(Value::map(counts.into_iter().map(|(k, n)| (k, Value::int(n)))))
}

/// Map from `f(x)` to an Array of the elements with that key, in encounter
/// order.
pub fn group_by<F>(f: F, coll: &Value) -> Result<Value>
where
    F: Fn(&Value) -> Result<Value>,
{
    let mut groups: FxHashMap<Value, Vec<Value>> = FxHashMap::default();
    for item in iter(coll)? {
        let item = item?;
        groups.entry(f(&item)?).or_default().push(item);
    }
    Ok(Value::map(
        groups.into_iter().map(|(k, items)| (k, Value::array(items))),
    ))
}
