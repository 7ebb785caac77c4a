//! Interned record keys.
//!
//! Records are string-keyed bags; their keys are interned once in a global
//! table so lookups hash and compare a small integer.

use std::fmt;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static INTERNER: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::default()));

/// A record key that has been interned in the global string interner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(DefaultSymbol);

impl Key {
    /// Intern a string and return its key
    pub fn new(s: &str) -> Self {
        if let Some(sym) = INTERNER.read().get(s) {
            return Key(sym);
        }
        Key(INTERNER.write().get_or_intern(s))
    }

    /// Resolve the key back to its string representation
    pub fn resolve(&self) -> String {
        self.with_str(str::to_string)
    }

    /// Resolve the key and run a function with the string slice.
    /// Cheaper than `resolve` which allocates a String.
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let interner = INTERNER.read();
        // Keys are only minted by `new`, so resolution cannot miss.
        f(interner.resolve(self.0).unwrap_or_default())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::new(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "{s}"))
    }
}
