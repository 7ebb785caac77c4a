//! Printing.
//!
//! `Display` renders values in reader-like notation for logs and test
//! failures. [`pr_str`] renders JSON-like text through `serde_json`; it is
//! lossy and meant for debugging.

use std::fmt;

use serde_json::{Map as JsonMap, Number as JsonNumber, Value as Json};

use crate::error::Result;
use crate::iter::to_vec;
use crate::numeric::NumericType;
use crate::value::Value;

fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            c => result.push(c),
        }
    }
    result
}

fn write_seq<'a, I>(f: &mut fmt::Formatter<'_>, open: &str, close: &str, items: I) -> fmt::Result
where
    I: IntoIterator<Item = &'a Value>,
{
    f.write_str(open)?;
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Array(items) => write_seq(f, "[", "]", items.borrow().iter()),
            Value::List(items) => write_seq(f, "(", ")", items.borrow().iter()),
            Value::Set(s) => write_seq(f, "#{", "}", s.borrow().iter()),
            Value::SortedSet(s) => write_seq(f, "#sorted{", "}", s.borrow().iter()),
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} {v}")?;
                }
                f.write_str("}")
            }
            Value::Record(r) => {
                f.write_str("{")?;
                for (i, (k, v)) in r.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, ":{k} {v}")?;
                }
                f.write_str("}")
            }
            // Printing must not run a producer
            Value::Lazy(_) => f.write_str("#<lazy>"),
            Value::Fn(func) => write!(f, "#<fn {}>", func.name()),
            Value::Atom(a) => write!(f, "#<atom {}>", a.deref()),
            Value::Reduced(inner) => write!(f, "#reduced({inner})"),
        }
    }
}

fn number_to_json(n: &NumericType) -> Json {
    match n {
        NumericType::Int(i) => Json::Number(JsonNumber::from(*i)),
        NumericType::Float(x) => JsonNumber::from_f64(*x).map_or(Json::Null, Json::Number),
        // JSON numbers cannot carry arbitrary precision
        NumericType::BigInt(b) => Json::String(b.to_string()),
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::Str(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn array_to_json(items: &[Value]) -> Result<Json> {
    items
        .iter()
        .map(to_json)
        .collect::<Result<Vec<_>>>()
        .map(Json::Array)
}

/// Convert a value to a `serde_json` tree.
///
/// Sets and lazy sequences become arrays, maps and records objects with
/// stringified keys, nil `null`, and an atom `{"val": ...}`. Lazy sequences
/// are realized, so an infinite one never returns.
pub fn to_json(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => number_to_json(n),
        Value::Str(s) => Json::String(s.to_string()),
        Value::Array(_) | Value::List(_) | Value::Set(_) | Value::SortedSet(_) | Value::Lazy(_) => {
            array_to_json(&to_vec(value)?)?
        }
        Value::Map(m) => {
            let entries: Vec<(Value, Value)> =
                m.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let mut obj = JsonMap::new();
            for (k, v) in entries {
                obj.insert(key_to_string(&k), to_json(&v)?);
            }
            Json::Object(obj)
        }
        Value::Record(r) => {
            let entries: Vec<(String, Value)> = r
                .borrow()
                .iter()
                .map(|(k, v)| (k.resolve(), v.clone()))
                .collect();
            let mut obj = JsonMap::new();
            for (k, v) in entries {
                obj.insert(k, to_json(&v)?);
            }
            Json::Object(obj)
        }
        Value::Fn(func) => Json::String(format!("#<fn {}>", func.name())),
        Value::Atom(a) => {
            let mut obj = JsonMap::new();
            obj.insert("val".to_string(), to_json(&a.deref())?);
            Json::Object(obj)
        }
        Value::Reduced(inner) => to_json(inner)?,
    })
}

/// JSON-like rendering of each value, separated by spaces.
pub fn pr_str(values: &[Value]) -> Result<String> {
    let parts = values
        .iter()
        .map(|v| to_json(v).map(|json| json.to_string()))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(" "))
}

/// Display rendering of each value, concatenated. Strings print without
/// quotes and nil prints as nothing.
pub fn str_of(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::Str(s) => s.to_string(),
            Value::Nil => String::new(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("")
}
