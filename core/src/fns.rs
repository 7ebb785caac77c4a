//! Function values and combinators.
//!
//! Combinators take and return [`Value::Fn`] so they compose with values
//! stored in collections. The eager predicates at the bottom take Rust
//! closures and stop at the first deciding element.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::iter::to_vec;
use crate::reduce::{fold, reduced};
use crate::value::{NativeFn, Value};

fn as_fn<'a>(op: &'static str, f: &'a Value) -> Result<&'a NativeFn> {
    match f {
        Value::Fn(func) => Ok(func),
        other => Err(Error::unsupported(op, "fn", other)),
    }
}

fn as_fns(op: &'static str, fs: &[Value]) -> Result<Vec<NativeFn>> {
    fs.iter().map(|f| as_fn(op, f).cloned()).collect()
}

/// Call a function value.
pub fn call(f: &Value, args: &[Value]) -> Result<Value> {
    as_fn("call", f)?.call(args)
}

/// Call `f` with `args` followed by the elements of `last`.
pub fn apply(f: &Value, args: &[Value], last: &Value) -> Result<Value> {
    let func = as_fn("apply", f)?;
    let mut all = args.to_vec();
    all.extend(to_vec(last)?);
    func.call(&all)
}

/// Returns its first argument, nil when called with none.
pub fn identity() -> Value {
    Value::function("identity", |args| Ok(args.first().cloned().unwrap_or(Value::Nil)))
}

/// Ignores its arguments and returns `x`.
pub fn constantly(x: Value) -> Value {
    Value::function("constantly", move |_| Ok(x.clone()))
}

/// Logical negation of `f`'s result.
pub fn complement(f: &Value) -> Result<Value> {
    let f = as_fn("complement", f)?.clone();
    Ok(Value::function("complement", move |args| {
        Ok(Value::Bool(!f.call(args)?.truthy()))
    }))
}

/// Compose right to left: `comp_fn([f, g])(x) == f(g(x))`. With no
/// functions, identity.
pub fn comp_fn(fs: &[Value]) -> Result<Value> {
    let fs = as_fns("comp", fs)?;
    if fs.is_empty() {
        return Ok(identity());
    }
    Ok(Value::function("comp", move |args| {
        let mut rest = fs.iter().rev();
        let mut acc = match rest.next() {
            Some(innermost) => innermost.call(args)?,
            None => return Ok(Value::Nil),
        };
        for f in rest {
            acc = f.call1(acc)?;
        }
        Ok(acc)
    }))
}

/// Fix the leading arguments of `f`.
pub fn partial(f: &Value, fixed: &[Value]) -> Result<Value> {
    let f = as_fn("partial", f)?.clone();
    let fixed = fixed.to_vec();
    Ok(Value::function("partial", move |args| {
        let mut all = fixed.clone();
        all.extend_from_slice(args);
        f.call(&all)
    }))
}

/// Call every function with the same arguments; results as an Array.
pub fn juxt(fs: &[Value]) -> Result<Value> {
    let fs = as_fns("juxt", fs)?;
    Ok(Value::function("juxt", move |args| {
        let results = fs.iter().map(|f| f.call(args)).collect::<Result<Vec<_>>>()?;
        Ok(Value::array(results))
    }))
}

/// Replace nil arguments of `f` with `defaults`, position by position.
pub fn fnil(f: &Value, defaults: &[Value]) -> Result<Value> {
    let f = as_fn("fnil", f)?.clone();
    let defaults = defaults.to_vec();
    Ok(Value::function("fnil", move |args| {
        let patched: Vec<Value> = args
            .iter()
            .enumerate()
            .map(|(i, arg)| match (arg, defaults.get(i)) {
                (Value::Nil, Some(default)) => default.clone(),
                _ => arg.clone(),
            })
            .collect();
        f.call(&patched)
    }))
}

/// Cache `f`'s results by argument list. Errors are not cached.
#[allow(clippy::mutable_key_type)]
pub fn memoize(f: &Value) -> Result<Value> {
    let f = as_fn("memoize", f)?.clone();
    let cache: Rc<RefCell<FxHashMap<Vec<Value>, Value>>> = Rc::default();
    Ok(Value::function("memoize", move |args| {
        if let Some(hit) = cache.borrow().get(args) {
            return Ok(hit.clone());
        }
        let result = f.call(args)?;
        cache.borrow_mut().insert(args.to_vec(), result.clone());
        Ok(result)
    }))
}

/// The first truthy result of any predicate on any argument, else nil.
pub fn some_fn(preds: &[Value]) -> Result<Value> {
    let preds = as_fns("some-fn", preds)?;
    Ok(Value::function("some-fn", move |args| {
        for arg in args {
            for p in &preds {
                let r = p.call1(arg.clone())?;
                if r.truthy() {
                    return Ok(r);
                }
            }
        }
        Ok(Value::Nil)
    }))
}

/// True when every predicate holds for every argument.
pub fn every_pred(preds: &[Value]) -> Result<Value> {
    let preds = as_fns("every-pred", preds)?;
    Ok(Value::function("every-pred", move |args| {
        for arg in args {
            for p in &preds {
                if !p.call1(arg.clone())?.truthy() {
                    return Ok(Value::Bool(false));
                }
            }
        }
        Ok(Value::Bool(true))
    }))
}

// ============================================================================
// Eager predicates
// ============================================================================

/// The first truthy `pred(x)`, or nil. Stops pulling at the first hit.
pub fn some<P>(pred: P, coll: &Value) -> Result<Value>
where
    P: Fn(&Value) -> Result<Value>,
{
    fold(
        |acc, x| {
            let r = pred(&x)?;
            Ok(if r.truthy() { reduced(r) } else { acc })
        },
        Value::Nil,
        coll,
    )
}

/// Whether `pred` holds for every element. True for an empty collection.
pub fn every<P>(pred: P, coll: &Value) -> Result<bool>
where
    P: Fn(&Value) -> Result<bool>,
{
    let r = fold(
        |acc, x| Ok(if pred(&x)? { acc } else { reduced(Value::Bool(false)) }),
        Value::Bool(true),
        coll,
    )?;
    Ok(r.truthy())
}

pub fn not_every<P>(pred: P, coll: &Value) -> Result<bool>
where
    P: Fn(&Value) -> Result<bool>,
{
    every(pred, coll).map(|all| !all)
}

pub fn not_any<P>(pred: P, coll: &Value) -> Result<bool>
where
    P: Fn(&Value) -> Result<bool>,
{
    let hit = some(|x| pred(x).map(Value::Bool), coll)?;
    Ok(!hit.truthy())
}
