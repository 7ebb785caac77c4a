//! Lazy sequence engine.
//!
//! A [`LazySeq`] wraps a producer: a zero-argument closure that returns a
//! fresh [`Cursor`] each time it is called. Every constructor in this module
//! only captures its arguments; no element is computed until the returned
//! sequence is traversed, and every traversal re-runs the producer from
//! scratch. Chained stages share one upstream cursor per traversal, so a
//! source is pulled once for the whole chain.

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::warn;

use crate::config;
use crate::error::{Error, Result};
use crate::iter::{Cursor, cursor_or_fail, empty_cursor, from_vec, ok};
use crate::reduce::is_reduced;
use crate::value::Value;

// ============================================================================
// LazySeq
// ============================================================================

struct LazyInner {
    producer: Box<dyn Fn() -> Cursor>,
    traversals: Cell<usize>,
}

/// Restartable, pull-based sequence.
#[derive(Clone)]
pub struct LazySeq {
    inner: Rc<LazyInner>,
}

impl LazySeq {
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn() -> Cursor + 'static,
    {
        LazySeq {
            inner: Rc::new(LazyInner {
                producer: Box::new(producer),
                traversals: Cell::new(0),
            }),
        }
    }

    /// Start a traversal by running the producer.
    ///
    /// With `warn_on_lazy_reuse` configured, a second and later traversal is
    /// reported, since an effectful producer may yield different elements.
    pub fn cursor(&self) -> Cursor {
        let n = self.inner.traversals.get() + 1;
        self.inner.traversals.set(n);
        if n > 1 && config::current().warn_on_lazy_reuse {
            warn!(
                target: "weft::lazy",
                traversals = n,
                "lazy sequence traversed again; an effectful producer may yield different elements"
            );
        }
        (self.inner.producer)()
    }

    /// How many traversals have been started.
    pub fn traversals(&self) -> usize {
        self.inner.traversals.get()
    }

    pub fn ptr_eq(&self, other: &LazySeq) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for LazySeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySeq")
            .field("traversals", &self.traversals())
            .finish()
    }
}

/// Wrap a producer in a lazy sequence value.
pub fn lazy<F>(producer: F) -> Value
where
    F: Fn() -> Cursor + 'static,
{
    Value::Lazy(LazySeq::new(producer))
}

/// The empty lazy sequence.
pub fn empty() -> Value {
    lazy(empty_cursor)
}

// Most stages transform one upstream cursor per traversal.
fn stage<F>(coll: &Value, wrap: F) -> Value
where
    F: Fn(Cursor) -> Cursor + 'static,
{
    let coll = coll.clone();
    lazy(move || wrap(cursor_or_fail(&coll)))
}

// ============================================================================
// Generators
// ============================================================================

/// `(range)`: 0, 1, 2, ... without bound.
pub fn range() -> Value {
    lazy(|| Box::new((0i64..).map(|n| ok(Value::int(n)))))
}

/// `(range end)`: 0 up to but excluding `end`.
pub fn range_to(end: i64) -> Value {
    range_step(0, end, 1)
}

/// `(range start end)`
pub fn range_between(start: i64, end: i64) -> Value {
    range_step(start, end, 1)
}

/// `(range start end step)`. A zero step repeats `start` forever when the
/// range is non-empty.
pub fn range_step(start: i64, end: i64, step: i64) -> Value {
    lazy(move || {
        let mut current = start;
        Box::new(std::iter::from_fn(move || {
            let more = if step >= 0 { current < end } else { current > end };
            if !more {
                return None;
            }
            let value = current;
            current = current.saturating_add(step);
            if current == value && step != 0 {
                // Saturated at the i64 bound
                current = end;
            }
            Some(ok(Value::int(value)))
        }))
    })
}

/// `x, f(x), f(f(x)), ...`, restarting from `x` on every traversal.
pub fn iterate<F>(f: F, x: Value) -> Value
where
    F: Fn(Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    lazy(move || {
        let f = Rc::clone(&f);
        let mut next = Some(Ok(x.clone()));
        Box::new(std::iter::from_fn(move || {
            let current = next.take()?;
            if let Ok(v) = &current {
                next = Some(f(v.clone()));
            }
            Some(current)
        }))
    })
}

/// `x` forever.
pub fn repeat(x: Value) -> Value {
    lazy(move || Box::new(std::iter::repeat(x.clone()).map(ok)))
}

/// `x` exactly `n` times.
pub fn repeat_n(n: usize, x: Value) -> Value {
    lazy(move || Box::new(std::iter::repeat_n(x.clone(), n).map(ok)))
}

/// Call `f` for each element, forever.
pub fn repeatedly<F>(f: F) -> Value
where
    F: Fn() -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    lazy(move || {
        let f = Rc::clone(&f);
        Box::new(std::iter::repeat_with(move || f()))
    })
}

/// Repeat the elements of `coll` forever.
///
/// An empty `coll` makes the first pull loop forever without yielding:
/// traversing `cycle` of an empty collection never returns.
pub fn cycle(coll: &Value) -> Value {
    let coll = coll.clone();
    lazy(move || {
        let coll = coll.clone();
        Box::new(std::iter::repeat(()).flat_map(move |_| cursor_or_fail(&coll)))
    })
}

// ============================================================================
// Element-wise transforms
// ============================================================================

pub fn map<F>(f: F, coll: &Value) -> Value
where
    F: Fn(Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    stage(coll, move |src| {
        let f = Rc::clone(&f);
        Box::new(src.map(move |item| item.and_then(|x| f(x))))
    })
}

/// Map over several collections in lockstep, stopping at the shortest.
pub fn map_n<F>(f: F, colls: &[Value]) -> Value
where
    F: Fn(&[Value]) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    let colls = colls.to_vec();
    lazy(move || {
        let f = Rc::clone(&f);
        let mut cursors: Vec<Cursor> = colls.iter().map(cursor_or_fail).collect();
        if cursors.is_empty() {
            return empty_cursor();
        }
        Box::new(std::iter::from_fn(move || {
            let mut args = Vec::with_capacity(cursors.len());
            for cursor in cursors.iter_mut() {
                match cursor.next()? {
                    Ok(v) => args.push(v),
                    Err(e) => return Some(Err(e)),
                }
            }
            Some(f(&args))
        }))
    })
}

pub fn map_indexed<F>(f: F, coll: &Value) -> Value
where
    F: Fn(usize, Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    stage(coll, move |src| {
        let f = Rc::clone(&f);
        Box::new(
            src.enumerate()
                .map(move |(i, item)| item.and_then(|x| f(i, x))),
        )
    })
}

pub fn filter<P>(pred: P, coll: &Value) -> Value
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    let pred = Rc::new(pred);
    stage(coll, move |src| {
        let pred = Rc::clone(&pred);
        Box::new(src.filter_map(move |item| match item {
            Ok(x) => match pred(&x) {
                Ok(true) => Some(Ok(x)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        }))
    })
}

pub fn remove<P>(pred: P, coll: &Value) -> Value
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    filter(move |x| pred(x).map(|keep| !keep), coll)
}

/// Non-nil results of `f`.
pub fn keep<F>(f: F, coll: &Value) -> Value
where
    F: Fn(Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    stage(coll, move |src| {
        let f = Rc::clone(&f);
        Box::new(src.filter_map(move |item| match item.and_then(|x| f(x)) {
            Ok(Value::Nil) => None,
            other => Some(other),
        }))
    })
}

pub fn keep_indexed<F>(f: F, coll: &Value) -> Value
where
    F: Fn(usize, Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    stage(coll, move |src| {
        let f = Rc::clone(&f);
        Box::new(
            src.enumerate()
                .filter_map(move |(i, item)| match item.and_then(|x| f(i, x)) {
                    Ok(Value::Nil) => None,
                    other => Some(other),
                }),
        )
    })
}

// ============================================================================
// Slicing
// ============================================================================

/// The first `n` elements. Never pulls more than `n` from the source.
pub fn take(n: usize, coll: &Value) -> Value {
    stage(coll, move |src| Box::new(src.take(n)))
}

pub fn take_while<P>(pred: P, coll: &Value) -> Value
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    let pred = Rc::new(pred);
    stage(coll, move |src| {
        let pred = Rc::clone(&pred);
        let mut src = src;
        let mut done = false;
        Box::new(std::iter::from_fn(move || {
            if done {
                return None;
            }
            match src.next()? {
                Ok(x) => match pred(&x) {
                    Ok(true) => Some(Ok(x)),
                    Ok(false) => {
                        done = true;
                        None
                    }
                    Err(e) => {
                        done = true;
                        Some(Err(e))
                    }
                },
                Err(e) => {
                    done = true;
                    Some(Err(e))
                }
            }
        }))
    })
}

/// Every `n`th element starting with the first. `n` of zero is treated as one.
pub fn take_nth(n: usize, coll: &Value) -> Value {
    stage(coll, move |src| Box::new(src.step_by(n.max(1))))
}

pub fn drop(n: usize, coll: &Value) -> Value {
    stage(coll, move |src| Box::new(src.skip(n)))
}

pub fn drop_while<P>(pred: P, coll: &Value) -> Value
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    let pred = Rc::new(pred);
    stage(coll, move |src| {
        let pred = Rc::clone(&pred);
        let mut dropping = true;
        Box::new(src.filter_map(move |item| {
            if !dropping {
                return Some(item);
            }
            match item {
                Ok(x) => match pred(&x) {
                    Ok(true) => None,
                    Ok(false) => {
                        dropping = false;
                        Some(Ok(x))
                    }
                    Err(e) => Some(Err(e)),
                },
                Err(e) => Some(Err(e)),
            }
        }))
    })
}

/// All but the last `n` elements.
pub fn drop_last(n: usize, coll: &Value) -> Value {
    stage(coll, move |src| {
        let mut src = src;
        let mut buffer: VecDeque<Value> = VecDeque::with_capacity(n + 1);
        Box::new(std::iter::from_fn(move || {
            loop {
                match src.next()? {
                    Ok(x) => {
                        buffer.push_back(x);
                        if buffer.len() > n {
                            return buffer.pop_front().map(ok);
                        }
                    }
                    Err(e) => return Some(Err(e)),
                }
            }
        }))
    })
}

/// Everything after the first element. Nil and empty give the empty sequence.
pub fn rest(coll: &Value) -> Value {
    drop(1, coll)
}

/// `x` followed by the elements of `coll`.
pub fn cons(x: Value, coll: &Value) -> Value {
    let coll = coll.clone();
    lazy(move || Box::new(std::iter::once(Ok(x.clone())).chain(cursor_or_fail(&coll))))
}

/// `[take(n, coll), drop(n, coll)]`
pub fn split_at(n: usize, coll: &Value) -> Value {
    Value::array(vec![take(n, coll), drop(n, coll)])
}

/// `[take_while(pred, coll), drop_while(pred, coll)]`
pub fn split_with<P>(pred: P, coll: &Value) -> Value
where
    P: Fn(&Value) -> Result<bool> + 'static,
{
    let pred = Rc::new(pred);
    let p1 = Rc::clone(&pred);
    Value::array(vec![
        take_while(move |x| p1(x), coll),
        drop_while(move |x| pred(x), coll),
    ])
}

// ============================================================================
// Combining
// ============================================================================

/// Elements of each collection in turn. Collection `i` is drained before
/// collection `i + 1` is touched.
pub fn concat(colls: &[Value]) -> Value {
    let colls = colls.to_vec();
    lazy(move || {
        let colls = colls.clone();
        Box::new(colls.into_iter().flat_map(|c| cursor_or_fail(&c)))
    })
}

/// `concat` of the collections produced by `f`.
pub fn mapcat<F>(f: F, coll: &Value) -> Value
where
    F: Fn(Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    stage(coll, move |src| {
        let f = Rc::clone(&f);
        Box::new(src.flat_map(move |item| match item.and_then(|x| f(x)) {
            Ok(inner) => cursor_or_fail(&inner),
            Err(e) => crate::iter::failing(e),
        }))
    })
}

/// First element of each collection, then the second of each, and so on.
/// Stops at the first exhausted input; the partial round is discarded.
pub fn interleave(colls: &[Value]) -> Value {
    let colls = colls.to_vec();
    lazy(move || {
        let mut cursors: Vec<Cursor> = colls.iter().map(cursor_or_fail).collect();
        if cursors.is_empty() {
            return empty_cursor();
        }
        let mut pending: VecDeque<Value> = VecDeque::new();
        let mut done = false;
        Box::new(std::iter::from_fn(move || {
            if let Some(x) = pending.pop_front() {
                return Some(Ok(x));
            }
            if done {
                return None;
            }
            let mut round = Vec::with_capacity(cursors.len());
            for cursor in cursors.iter_mut() {
                match cursor.next() {
                    Some(Ok(x)) => round.push(x),
                    Some(Err(e)) => {
                        done = true;
                        return Some(Err(e));
                    }
                    None => {
                        done = true;
                        return None;
                    }
                }
            }
            pending.extend(round);
            pending.pop_front().map(ok)
        }))
    })
}

/// Elements of `coll` separated by `sep`.
pub fn interpose(sep: Value, coll: &Value) -> Value {
    stage(coll, move |src| {
        let sep = sep.clone();
        let mut src = src.peekable();
        let mut emit_sep = false;
        Box::new(std::iter::from_fn(move || {
            if emit_sep {
                emit_sep = false;
                return Some(Ok(sep.clone()));
            }
            let item = src.next()?;
            if item.is_ok() && src.peek().is_some() {
                emit_sep = true;
            }
            Some(item)
        }))
    })
}

// ============================================================================
// Windowing
// ============================================================================

struct Windows {
    src: Cursor,
    n: usize,
    step: usize,
    pad: Option<Vec<Value>>,
    all: bool,
    buffer: VecDeque<Value>,
    exhausted: bool,
    done: bool,
}

impl Windows {
    fn fill(&mut self) -> Option<Error> {
        while !self.exhausted && self.buffer.len() < self.n {
            match self.src.next() {
                Some(Ok(x)) => self.buffer.push_back(x),
                Some(Err(e)) => return Some(e),
                None => self.exhausted = true,
            }
        }
        None
    }

    fn advance(&mut self) -> Option<Error> {
        if self.step <= self.buffer.len() {
            self.buffer.drain(..self.step);
            return None;
        }
        let mut skip = self.step - self.buffer.len();
        self.buffer.clear();
        while skip > 0 && !self.exhausted {
            match self.src.next() {
                Some(Ok(_)) => skip -= 1,
                Some(Err(e)) => return Some(e),
                None => self.exhausted = true,
            }
        }
        None
    }

    fn emit(&mut self, window: Vec<Value>) -> Option<Result<Value>> {
        if let Some(e) = self.advance() {
            self.done = true;
            return Some(Err(e));
        }
        Some(Ok(Value::array(window)))
    }
}

impl Iterator for Windows {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(e) = self.fill() {
            self.done = true;
            return Some(Err(e));
        }
        if self.buffer.len() == self.n {
            let window: Vec<Value> = self.buffer.iter().cloned().collect();
            return self.emit(window);
        }
        // Short window: the source is exhausted
        if self.buffer.is_empty() {
            self.done = true;
            return None;
        }
        let mut window: Vec<Value> = self.buffer.iter().cloned().collect();
        if self.all {
            return self.emit(window);
        }
        self.done = true;
        let pad = self.pad.as_ref()?;
        let missing = self.n - window.len();
        window.extend(pad.iter().take(missing).cloned());
        Some(Ok(Value::array(window)))
    }
}

fn windows(n: usize, step: usize, pad: Option<Value>, all: bool, coll: &Value) -> Value {
    let coll = coll.clone();
    lazy(move || {
        if n == 0 {
            return empty_cursor();
        }
        let pad = match &pad {
            Some(p) => match crate::iter::to_vec(p) {
                Ok(items) => Some(items),
                Err(e) => return crate::iter::failing(e),
            },
            None => None,
        };
        Box::new(Windows {
            src: cursor_or_fail(&coll),
            n,
            step: step.max(1),
            pad,
            all,
            buffer: VecDeque::with_capacity(n),
            exhausted: false,
            done: false,
        })
    })
}

/// Non-overlapping windows of `n`; a short final window is dropped.
/// A window size of zero yields nothing.
pub fn partition(n: usize, coll: &Value) -> Value {
    windows(n, n, None, false, coll)
}

/// Windows of `n` starting every `step` elements; a short final window is
/// dropped.
pub fn partition_step(n: usize, step: usize, coll: &Value) -> Value {
    windows(n, step, None, false, coll)
}

/// Like [`partition_step`], but the first short window is filled from `pad`
/// (up to `n` elements) and yielded as the last window.
pub fn partition_pad(n: usize, step: usize, pad: &Value, coll: &Value) -> Value {
    windows(n, step, Some(pad.clone()), false, coll)
}

/// Non-overlapping windows of `n`, keeping the short remainder.
pub fn partition_all(n: usize, coll: &Value) -> Value {
    windows(n, n, None, true, coll)
}

/// Windows of `n` every `step` elements, keeping every short tail window.
pub fn partition_all_step(n: usize, step: usize, coll: &Value) -> Value {
    windows(n, step, None, true, coll)
}

/// Maximal runs of consecutive elements whose `f` results are loosely equal
/// (see [`Value::loose_eq`]): scalars by value, containers by reference.
pub fn partition_by<F>(f: F, coll: &Value) -> Value
where
    F: Fn(&Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    stage(coll, move |src| {
        let f = Rc::clone(&f);
        let mut src = src;
        let mut carry: Option<(Value, Value)> = None;
        let mut done = false;
        Box::new(std::iter::from_fn(move || {
            if done {
                return None;
            }
            let (first, key) = match carry.take() {
                Some(c) => c,
                None => match src.next()? {
                    Ok(x) => match f(&x) {
                        Ok(k) => (x, k),
                        Err(e) => return Some(Err(e)),
                    },
                    Err(e) => return Some(Err(e)),
                },
            };
            let mut run = vec![first];
            loop {
                match src.next() {
                    None => {
                        done = true;
                        break;
                    }
                    Some(Err(e)) => {
                        done = true;
                        return Some(Err(e));
                    }
                    Some(Ok(x)) => match f(&x) {
                        Ok(k) if k.loose_eq(&key) => run.push(x),
                        Ok(k) => {
                            carry = Some((x, k));
                            break;
                        }
                        Err(e) => {
                            done = true;
                            return Some(Err(e));
                        }
                    },
                }
            }
            Some(Ok(Value::array(run)))
        }))
    })
}

// ============================================================================
// Stateful filters
// ============================================================================

/// Elements not seen earlier in the traversal. The seen-set is fresh for each
/// traversal.
#[allow(clippy::mutable_key_type)]
pub fn distinct(coll: &Value) -> Value {
    stage(coll, |src| {
        let mut seen: FxHashSet<Value> = FxHashSet::default();
        Box::new(src.filter(move |item| match item {
            Ok(x) => seen.insert(x.clone()),
            Err(_) => true,
        }))
    })
}

/// Drops consecutive duplicates.
pub fn dedupe(coll: &Value) -> Value {
    stage(coll, |src| {
        let mut last: Option<Value> = None;
        Box::new(src.filter(move |item| match item {
            Ok(x) => {
                if last.as_ref() == Some(x) {
                    false
                } else {
                    last = Some(x.clone());
                    true
                }
            }
            Err(_) => true,
        }))
    })
}

/// Intermediate accumulators of a left fold, starting with `init` (or the
/// first element when `init` is `None`). A `Reduced` result is yielded
/// unwrapped and ends the sequence.
///
/// `f` has no zero-argument form, so with no `init` an empty collection
/// yields an empty sequence. Pass `Some(seed)` to always get the seed.
pub fn reductions<F>(f: F, init: Option<Value>, coll: &Value) -> Value
where
    F: Fn(Value, Value) -> Result<Value> + 'static,
{
    let f = Rc::new(f);
    stage(coll, move |src| {
        let f = Rc::clone(&f);
        let mut src = src;
        let mut acc: Option<Value> = None;
        let mut seed = Some(init.clone());
        let mut done = false;
        Box::new(std::iter::from_fn(move || {
            if done {
                return None;
            }
            if let Some(seed) = seed.take() {
                let start = match seed {
                    Some(v) => v,
                    None => match src.next()? {
                        Ok(v) => v,
                        Err(e) => return Some(Err(e)),
                    },
                };
                if let Value::Reduced(inner) = start {
                    done = true;
                    return Some(Ok(*inner));
                }
                acc = Some(start.clone());
                return Some(Ok(start));
            }
            let x = match src.next()? {
                Ok(x) => x,
                Err(e) => return Some(Err(e)),
            };
            let current = acc.take().unwrap_or(Value::Nil);
            match f(current, x) {
                Ok(next) if is_reduced(&next) => {
                    done = true;
                    Some(Ok(crate::reduce::unreduced(next)))
                }
                Ok(next) => {
                    acc = Some(next.clone());
                    Some(Ok(next))
                }
                Err(e) => Some(Err(e)),
            }
        }))
    })
}

// ============================================================================
// Trees
// ============================================================================

/// Depth-first, pre-order walk of a tree. `children` is called only on nodes
/// for which `branch` holds.
pub fn tree_seq<B, C>(branch: B, children: C, root: Value) -> Value
where
    B: Fn(&Value) -> Result<bool> + 'static,
    C: Fn(&Value) -> Result<Value> + 'static,
{
    let branch = Rc::new(branch);
    let children = Rc::new(children);
    lazy(move || {
        let branch = Rc::clone(&branch);
        let children = Rc::clone(&children);
        let mut stack: Vec<Cursor> = vec![from_vec(vec![root.clone()])];
        Box::new(std::iter::from_fn(move || {
            loop {
                let top = stack.last_mut()?;
                match top.next() {
                    None => {
                        stack.pop();
                    }
                    Some(Err(e)) => {
                        stack.clear();
                        return Some(Err(e));
                    }
                    Some(Ok(node)) => {
                        let expand = branch(&node).and_then(|is_branch| {
                            if is_branch {
                                children(&node).map(|c| Some(cursor_or_fail(&c)))
                            } else {
                                Ok(None)
                            }
                        });
                        match expand {
                            Ok(Some(cursor)) => stack.push(cursor),
                            Ok(None) => {}
                            Err(e) => {
                                stack.clear();
                                return Some(Err(e));
                            }
                        }
                        return Some(Ok(node));
                    }
                }
            }
        }))
    })
}

/// Leaves of arbitrarily nested sequential collections.
pub fn flatten(coll: &Value) -> Value {
    let tree = tree_seq(
        |x| Ok(x.is_sequential()),
        |x| Ok(x.clone()),
        coll.clone(),
    );
    // Skip the root so a non-sequential argument flattens to nothing
    filter(|x| Ok(!x.is_sequential()), &rest(&tree))
}
