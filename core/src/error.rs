//! Error types for the sequence runtime.
//!
//! Every error is raised synchronously at the point of detection and
//! propagated with `?`. Nothing in the runtime catches or retries.

use thiserror::Error;

use crate::value::Value;

/// Result type used throughout the runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by runtime operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Operation invoked on a receiver kind it has no behaviour for.
    #[error("{op}: unsupported receiver {got}, expected {expected}")]
    UnsupportedType {
        op: &'static str,
        expected: &'static str,
        got: String,
    },

    /// A value that had to be iterable was not.
    #[error("{what} is not iterable: expected nil, a string or a collection")]
    NotIterable { what: String },

    /// Key/value argument lists of the wrong parity, or a step arity the
    /// reducing pipeline does not define.
    #[error("{op}: {message}")]
    Arity { op: &'static str, message: String },

    /// `compare` on operands of incompatible kinds.
    #[error("cannot compare {left} with {right}")]
    Comparison { left: String, right: String },

    /// Exact arithmetic left the i64 range.
    #[error("{op}: integer overflow")]
    Overflow { op: &'static str },

    #[error("{op}: divide by zero")]
    DivideByZero { op: &'static str },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    /// An argument that is well-typed but not acceptable (empty path,
    /// reversed range bounds, popping an empty collection).
    #[error("{op}: {message}")]
    IllegalArgument { op: &'static str, message: String },

    /// A user callback returned a value of the wrong shape.
    #[error("{op}: callback returned {got}, expected {expected}")]
    Callback {
        op: &'static str,
        expected: &'static str,
        got: String,
    },

    /// User-raised structured error carrying arbitrary data.
    #[error("{}", .0.message)]
    ExInfo(Box<ExInfo>),
}

/// Payload of an `ex_info` error.
#[derive(Debug, Clone)]
pub struct ExInfo {
    pub message: String,
    pub data: Value,
    pub cause: Option<Error>,
}

impl Error {
    /// Create an unsupported receiver error.
    pub fn unsupported(op: &'static str, expected: &'static str, got: &Value) -> Self {
        Error::UnsupportedType {
            op,
            expected,
            got: got.kind_name().to_string(),
        }
    }

    /// Create a not-iterable error.
    pub fn not_iterable(value: &Value) -> Self {
        Error::NotIterable {
            what: value.kind_name().to_string(),
        }
    }

    /// Create an arity error.
    pub fn arity(op: &'static str, message: impl Into<String>) -> Self {
        Error::Arity {
            op,
            message: message.into(),
        }
    }

    /// Create a comparison error from the two offending operands.
    pub fn comparison(left: &Value, right: &Value) -> Self {
        Error::Comparison {
            left: left.kind_name().to_string(),
            right: right.kind_name().to_string(),
        }
    }

    pub fn illegal(op: &'static str, message: impl Into<String>) -> Self {
        Error::IllegalArgument {
            op,
            message: message.into(),
        }
    }

    pub fn callback(op: &'static str, expected: &'static str, got: &Value) -> Self {
        Error::Callback {
            op,
            expected,
            got: got.kind_name().to_string(),
        }
    }
}

/// Build a structured error carrying `data` and an optional `cause`.
pub fn ex_info(message: impl Into<String>, data: Value, cause: Option<Error>) -> Error {
    Error::ExInfo(Box::new(ExInfo {
        message: message.into(),
        data,
        cause,
    }))
}

/// The data attached by `ex_info`, or `None` for runtime errors.
pub fn ex_data(err: &Error) -> Option<&Value> {
    match err {
        Error::ExInfo(info) => Some(&info.data),
        _ => None,
    }
}

/// The message of any error.
pub fn ex_message(err: &Error) -> String {
    match err {
        Error::ExInfo(info) => info.message.clone(),
        other => other.to_string(),
    }
}

/// The cause chained onto an `ex_info` error.
pub fn ex_cause(err: &Error) -> Option<&Error> {
    match err {
        Error::ExInfo(info) => info.cause.as_ref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display_names_op_and_kinds() {
        let err = Error::unsupported("assoc", "Map, Array or Record", &Value::from(1));
        assert_eq!(
            err.to_string(),
            "assoc: unsupported receiver number, expected Map, Array or Record"
        );
    }

    #[test]
    fn test_ex_info_accessors() {
        let cause = Error::arity("assoc", "odd number of key/value arguments");
        let err = ex_info("boom", Value::from("payload"), Some(cause));
        assert_eq!(ex_message(&err), "boom");
        assert_eq!(ex_data(&err), Some(&Value::from("payload")));
        assert!(matches!(ex_cause(&err), Some(Error::Arity { op: "assoc", .. })));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_runtime_errors_have_no_data() {
        let err = Error::not_iterable(&Value::from(true));
        assert!(ex_data(&err).is_none());
        assert!(ex_cause(&err).is_none());
        assert!(ex_message(&err).contains("boolean is not iterable"));
    }

    #[test]
    fn test_overflow_display() {
        let err = Error::Overflow { op: "add_exact" };
        assert_eq!(err.to_string(), "add_exact: integer overflow");
    }
}
