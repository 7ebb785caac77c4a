//! Mutable reference cells.
//!
//! [`Atom`] is the single-threaded cell stored inside [`Value`]: plain
//! replacement semantics, watches called synchronously in registration order.
//! [`SharedAtom`] is the thread-safe counterpart for host data that crosses
//! threads; its `swap` is an optimistic compare-and-swap retry loop.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::Result;
use crate::value::Value;

// ============================================================================
// Atom
// ============================================================================

type Watch = Rc<dyn Fn(&str, &Atom, &Value, &Value) -> Result<()>>;

struct AtomInner {
    value: RefCell<Value>,
    watches: RefCell<Vec<(String, Watch)>>,
}

/// Single-threaded mutable reference cell. Clones share the cell.
#[derive(Clone)]
pub struct Atom {
    inner: Rc<AtomInner>,
}

impl Atom {
    pub fn new(value: Value) -> Self {
        Atom {
            inner: Rc::new(AtomInner {
                value: RefCell::new(value),
                watches: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn deref(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Replace the value and notify watches. Returns the new value.
    pub fn reset(&self, value: Value) -> Result<Value> {
        self.reset_vals(value).map(|(_, new)| new)
    }

    /// Replace the value and return `(old, new)`.
    ///
    /// Watches run after the value is stored, so a watch may read or even
    /// reset the atom. The first failing watch stops notification and its
    /// error is returned; the new value stays in place.
    pub fn reset_vals(&self, value: Value) -> Result<(Value, Value)> {
        let old = self.inner.value.replace(value.clone());
        // Snapshot so a watch can add or remove watches
        let watches: Vec<(String, Watch)> = self.inner.watches.borrow().clone();
        for (key, watch) in &watches {
            watch(key, self, &old, &value)?;
        }
        Ok((old, value))
    }

    /// `reset(f(deref()))`. Not a compare-and-swap: a reset from inside `f`
    /// is overwritten.
    pub fn swap<F>(&self, f: F) -> Result<Value>
    where
        F: FnOnce(Value) -> Result<Value>,
    {
        self.swap_vals(f).map(|(_, new)| new)
    }

    pub fn swap_vals<F>(&self, f: F) -> Result<(Value, Value)>
    where
        F: FnOnce(Value) -> Result<Value>,
    {
        let new = f(self.deref())?;
        self.reset_vals(new)
    }

    /// Register a watch under `key`. Re-registering a key replaces its
    /// callback and keeps its position.
    pub fn add_watch<F>(&self, key: &str, f: F)
    where
        F: Fn(&str, &Atom, &Value, &Value) -> Result<()> + 'static,
    {
        let mut watches = self.inner.watches.borrow_mut();
        let watch: Watch = Rc::new(f);
        match watches.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = watch,
            None => watches.push((key.to_string(), watch)),
        }
    }

    /// Returns whether a watch was registered under `key`.
    pub fn remove_watch(&self, key: &str) -> bool {
        let mut watches = self.inner.watches.borrow_mut();
        let before = watches.len();
        watches.retain(|(k, _)| k != key);
        watches.len() != before
    }

    pub fn watch_count(&self) -> usize {
        self.inner.watches.borrow().len()
    }

    pub fn ptr_eq(&self, other: &Atom) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("value", &*self.inner.value.borrow())
            .field("watches", &self.watch_count())
            .finish()
    }
}

/// Wrap `value` in a new atom.
pub fn atom(value: Value) -> Value {
    Value::Atom(Atom::new(value))
}

// ============================================================================
// SharedAtom
// ============================================================================

type SharedWatch<T> = Arc<dyn Fn(&str, &T, &T) + Send + Sync>;

struct Slot<T> {
    value: T,
    version: u64,
}

/// Thread-safe reference cell.
///
/// `swap` reads a snapshot, runs the update function without holding the
/// lock, and commits only if no other writer got in first; otherwise it
/// retries with the fresh value. The update function may therefore run more
/// than once and should be free of side effects.
pub struct SharedAtom<T> {
    slot: Mutex<Slot<T>>,
    watches: Mutex<Vec<(String, SharedWatch<T>)>>,
}

impl<T: Clone> SharedAtom<T> {
    pub fn new(value: T) -> Self {
        SharedAtom {
            slot: Mutex::new(Slot { value, version: 0 }),
            watches: Mutex::new(Vec::new()),
        }
    }

    pub fn load(&self) -> T {
        self.slot.lock().value.clone()
    }

    /// Store `value` unconditionally and return the previous value.
    pub fn reset(&self, value: T) -> T {
        let old = {
            let mut slot = self.slot.lock();
            slot.version += 1;
            std::mem::replace(&mut slot.value, value.clone())
        };
        self.notify(&old, &value);
        old
    }

    /// Apply `f` until it commits against an unchanged value. Returns
    /// `(old, new)`.
    pub fn swap_vals<F>(&self, f: F) -> (T, T)
    where
        F: Fn(&T) -> T,
    {
        let mut attempts = 0u32;
        loop {
            let (snapshot, version) = {
                let slot = self.slot.lock();
                (slot.value.clone(), slot.version)
            };
            let next = f(&snapshot);
            let committed = {
                let mut slot = self.slot.lock();
                if slot.version == version {
                    slot.version += 1;
                    slot.value = next.clone();
                    true
                } else {
                    false
                }
            };
            if committed {
                self.notify(&snapshot, &next);
                return (snapshot, next);
            }
            attempts += 1;
            trace!(target: "weft::atom", attempts, "swap lost a race, retrying");
        }
    }

    pub fn swap<F>(&self, f: F) -> T
    where
        F: Fn(&T) -> T,
    {
        self.swap_vals(f).1
    }

    pub fn add_watch<F>(&self, key: &str, f: F)
    where
        F: Fn(&str, &T, &T) + Send + Sync + 'static,
    {
        let mut watches = self.watches.lock();
        let watch: SharedWatch<T> = Arc::new(f);
        match watches.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = watch,
            None => watches.push((key.to_string(), watch)),
        }
    }

    pub fn remove_watch(&self, key: &str) -> bool {
        let mut watches = self.watches.lock();
        let before = watches.len();
        watches.retain(|(k, _)| k != key);
        watches.len() != before
    }

    // Watches run outside both locks.
    fn notify(&self, old: &T, new: &T) {
        let watches: Vec<(String, SharedWatch<T>)> = self.watches.lock().clone();
        for (key, watch) in &watches {
            watch(key, old, new);
        }
    }
}

impl<T: Clone + PartialEq> SharedAtom<T> {
    /// Store `new` only if the current value equals `expected`.
    pub fn compare_and_set(&self, expected: &T, new: T) -> bool {
        let old = {
            let mut slot = self.slot.lock();
            if slot.value != *expected {
                return false;
            }
            slot.version += 1;
            std::mem::replace(&mut slot.value, new.clone())
        };
        self.notify(&old, &new);
        true
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for SharedAtom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedAtom")
            .field("value", &self.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_reset_and_swap() {
        let a = Atom::new(Value::int(1));
        assert_eq!(a.swap(|v| Ok(Value::int(v.as_int().unwrap() + 1))).unwrap(), Value::int(2));
        assert_eq!(a.reset(Value::from("x")).unwrap(), Value::from("x"));
        let (old, new) = a.reset_vals(Value::Nil).unwrap();
        assert_eq!(old, Value::from("x"));
        assert_eq!(new, Value::Nil);
    }

    #[test]
    fn test_watch_sees_old_and_new() {
        let a = Atom::new(Value::int(1));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        a.add_watch("w", move |key, _, old, new| {
            log.borrow_mut().push((key.to_string(), old.clone(), new.clone()));
            Ok(())
        });
        a.swap(|v| Ok(Value::int(v.as_int().unwrap() + 1))).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![("w".to_string(), Value::int(1), Value::int(2))]
        );
    }

    #[test]
    fn test_watches_fire_in_registration_order() {
        let a = Atom::new(Value::Nil);
        let order = Rc::new(RefCell::new(Vec::new()));
        for key in ["b", "a", "c"] {
            let order = Rc::clone(&order);
            a.add_watch(key, move |k, _, _, _| {
                order.borrow_mut().push(k.to_string());
                Ok(())
            });
        }
        a.reset(Value::int(1)).unwrap();
        assert_eq!(*order.borrow(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_remove_watch() {
        let a = Atom::new(Value::Nil);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        a.add_watch("w", move |_, _, _, _| {
            c.set(c.get() + 1);
            Ok(())
        });
        assert!(a.remove_watch("w"));
        assert!(!a.remove_watch("w"));
        a.reset(Value::int(1)).unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_watch_may_read_atom() {
        let a = Atom::new(Value::int(0));
        a.add_watch("check", |_, atom, _, new| {
            assert_eq!(&atom.deref(), new);
            Ok(())
        });
        a.reset(Value::int(5)).unwrap();
    }

    #[test]
    fn test_failing_watch_keeps_new_value() {
        let a = Atom::new(Value::int(0));
        a.add_watch("bad", |_, _, _, _| Err(Error::illegal("watch", "boom")));
        assert!(a.reset(Value::int(1)).is_err());
        assert_eq!(a.deref(), Value::int(1));
    }

    #[test]
    fn test_shared_atom_counts_across_threads() {
        let counter = Arc::new(SharedAtom::new(0u64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.swap(|n| n + 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.load(), 8000);
    }

    #[test]
    fn test_shared_atom_compare_and_set() {
        let a = SharedAtom::new(String::from("a"));
        assert!(!a.compare_and_set(&"b".to_string(), "c".to_string()));
        assert!(a.compare_and_set(&"a".to_string(), "c".to_string()));
        assert_eq!(a.load(), "c");
    }

    #[test]
    fn test_shared_atom_watch() {
        let a = SharedAtom::new(1i64);
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        a.add_watch("w", move |_, old, new| {
            assert_eq!((*old, *new), (1, 2));
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(a.swap_vals(|n| n + 1), (1, 2));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(a.remove_watch("w"));
        assert_eq!(a.reset(7), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
