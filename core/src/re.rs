//! Regular-expression sequences over `regex`.
//!
//! A match without capture groups is returned as the matched string. A match
//! with groups is an Array of the whole match followed by each group, nil for
//! a group that did not participate.

use std::rc::Rc;

use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::lazy::lazy;
use crate::value::Value;

/// Compile `pattern`, reporting a syntax error as an illegal argument.
pub fn re_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::illegal("re-pattern", e.to_string()))
}

fn match_value(caps: &Captures<'_>) -> Value {
    if caps.len() == 1 {
        return caps
            .get(0)
            .map(|m| Value::from(m.as_str()))
            .unwrap_or(Value::Nil);
    }
    Value::array(
        caps.iter()
            .map(|group| group.map(|m| Value::from(m.as_str())).unwrap_or(Value::Nil))
            .collect(),
    )
}

/// First match of `re` in `s`, or nil.
pub fn re_find(re: &Regex, s: &str) -> Value {
    re.captures(s).as_ref().map(match_value).unwrap_or(Value::Nil)
}

/// Match of `re` against the whole of `s`, or nil.
pub fn re_matches(re: &Regex, s: &str) -> Result<Value> {
    let anchored = re_pattern(&format!("^(?:{})$", re.as_str()))?;
    Ok(re_find(&anchored, s))
}

/// Lazy sequence of successive matches of `re` in `s`. An empty match
/// advances by one character so the sequence always makes progress.
pub fn re_seq(re: &Regex, s: &str) -> Value {
    let re = re.clone();
    let text: Rc<str> = Rc::from(s);
    lazy(move || {
        let re = re.clone();
        let text = Rc::clone(&text);
        let mut pos = 0usize;
        Box::new(std::iter::from_fn(move || {
            if pos > text.len() {
                return None;
            }
            let caps = re.captures_at(&text, pos)?;
            let whole = caps.get(0)?;
            pos = if whole.end() > whole.start() {
                whole.end()
            } else {
                // Step over one character after an empty match
                whole.end() + text[whole.end()..].chars().next().map_or(1, char::len_utf8)
            };
            Some(Ok(match_value(&caps)))
        }))
    })
}
