use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt as BigInteger;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::error::{Error, Result};

// ============================================================================
// Numeric Type System
// ============================================================================

#[derive(Debug, Clone)]
pub enum NumericType {
    /// Primary integer type - promotes to BigInt on overflow
    Int(i64),

    /// Arbitrary precision integer, only ever holds values outside i64
    BigInt(Arc<BigInteger>),

    /// IEEE 754 double precision floating point
    Float(f64),
}

// ============================================================================
// Display Implementation
// ============================================================================

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NumericType::Int(n) => write!(f, "{n}"),
            NumericType::BigInt(n) => write!(f, "{n}N"),
            NumericType::Float(x) => {
                if x.is_nan() {
                    write!(f, "NaN")
                } else if x.is_infinite() {
                    let sign = if *x > 0.0 { "Infinity" } else { "-Infinity" };
                    write!(f, "{sign}")
                } else if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
        }
    }
}

// ============================================================================
// Equality and Comparison
// ============================================================================

// Ints and floats are distinct values: 1 and 1.0 are not equal, which keeps
// Hash consistent with Eq. Ordering still compares them numerically.
impl PartialEq for NumericType {
    fn eq(&self, other: &Self) -> bool {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for NumericType {}

impl Hash for NumericType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use NumericType::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Int(n) => n.hash(state),
            BigInt(n) => n.hash(state),
            Float(x) => {
                // NaN values all hash to the same value
                if x.is_nan() {
                    u64::MAX.hash(state);
                } else {
                    x.to_bits().hash(state);
                }
            }
        }
    }
}

impl PartialOrd for NumericType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => a.partial_cmp(b),
            (BigInt(a), BigInt(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b),

            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),

            (Int(a), BigInt(b)) => BigInteger::from(*a).partial_cmp(b),
            (BigInt(a), Int(b)) => a.as_ref().partial_cmp(&BigInteger::from(*b)),

            (BigInt(_), Float(b)) => self.to_float().partial_cmp(b),
            (Float(a), BigInt(_)) => a.partial_cmp(&other.to_float()),
        }
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

impl NumericType {
    /// Wrap a big integer, demoting it to Int when it fits.
    pub fn from_big(n: BigInteger) -> NumericType {
        match n.to_i64() {
            Some(small) => NumericType::Int(small),
            None => NumericType::BigInt(Arc::new(n)),
        }
    }

    fn to_big(&self) -> Option<BigInteger> {
        match self {
            NumericType::Int(n) => Some(BigInteger::from(*n)),
            NumericType::BigInt(n) => Some(n.as_ref().clone()),
            NumericType::Float(_) => None,
        }
    }

    /// Convert to float (may lose precision)
    pub fn to_float(&self) -> f64 {
        match self {
            NumericType::Int(n) => *n as f64,
            NumericType::BigInt(n) => n.to_f64().unwrap_or(f64::INFINITY),
            NumericType::Float(x) => *x,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumericType::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Check if number is zero
    pub fn is_zero(&self) -> bool {
        match self {
            NumericType::Int(n) => *n == 0,
            NumericType::BigInt(n) => n.is_zero(),
            NumericType::Float(x) => *x == 0.0,
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            NumericType::Int(n) => *n < 0,
            NumericType::BigInt(n) => n.is_negative(),
            NumericType::Float(x) => *x < 0.0,
        }
    }

    /// Sign as -1, 0 or 1. NaN counts as 0.
    pub fn signum(&self) -> i64 {
        match self.partial_cmp(&NumericType::Int(0)) {
            Some(Ordering::Less) => -1,
            Some(Ordering::Greater) => 1,
            _ => 0,
        }
    }

    pub fn is_even(&self) -> Result<bool> {
        match self {
            NumericType::Int(n) => Ok(n % 2 == 0),
            NumericType::BigInt(n) => Ok((n.as_ref() % 2u8).is_zero()),
            NumericType::Float(_) => Err(Error::IllegalArgument {
                op: "even?",
                message: format!("argument must be an integer: {self}"),
            }),
        }
    }

    pub fn is_odd(&self) -> Result<bool> {
        self.is_even().map(|even| !even)
    }
}

// ============================================================================
// Arithmetic Operations
// ============================================================================

impl NumericType {
    /// Addition with automatic type promotion
    pub fn add(&self, other: &NumericType) -> NumericType {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => match a.checked_add(*b) {
                Some(result) => Int(result),
                // Promote to BigInt on overflow
                None => BigInt(Arc::new(BigInteger::from(*a) + BigInteger::from(*b))),
            },
            (Float(_), _) | (_, Float(_)) => Float(self.to_float() + other.to_float()),
            _ => match (self.to_big(), other.to_big()) {
                (Some(a), Some(b)) => Self::from_big(a + b),
                _ => Float(self.to_float() + other.to_float()),
            },
        }
    }

    /// Subtraction with automatic type promotion
    pub fn sub(&self, other: &NumericType) -> NumericType {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => match a.checked_sub(*b) {
                Some(result) => Int(result),
                None => BigInt(Arc::new(BigInteger::from(*a) - BigInteger::from(*b))),
            },
            (Float(_), _) | (_, Float(_)) => Float(self.to_float() - other.to_float()),
            _ => match (self.to_big(), other.to_big()) {
                (Some(a), Some(b)) => Self::from_big(a - b),
                _ => Float(self.to_float() - other.to_float()),
            },
        }
    }

    /// Multiplication with automatic type promotion
    pub fn mul(&self, other: &NumericType) -> NumericType {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => match a.checked_mul(*b) {
                Some(result) => Int(result),
                None => BigInt(Arc::new(BigInteger::from(*a) * BigInteger::from(*b))),
            },
            (Float(_), _) | (_, Float(_)) => Float(self.to_float() * other.to_float()),
            _ => match (self.to_big(), other.to_big()) {
                (Some(a), Some(b)) => Self::from_big(a * b),
                _ => Float(self.to_float() * other.to_float()),
            },
        }
    }

    pub fn inc(&self) -> NumericType {
        self.add(&NumericType::Int(1))
    }

    pub fn dec(&self) -> NumericType {
        self.sub(&NumericType::Int(1))
    }

    /// Negation
    pub fn neg(&self) -> NumericType {
        use NumericType::*;

        match self {
            Int(n) => match n.checked_neg() {
                Some(result) => Int(result),
                None => BigInt(Arc::new(-BigInteger::from(*n))),
            },
            BigInt(n) => Self::from_big(-n.as_ref()),
            Float(x) => Float(-x),
        }
    }
}

// ============================================================================
// Exact Arithmetic - fails instead of promoting
// ============================================================================

impl NumericType {
    fn exact(
        &self,
        other: &NumericType,
        op: &'static str,
        checked: fn(i64, i64) -> Option<i64>,
        float: fn(f64, f64) -> f64,
    ) -> Result<NumericType> {
        use NumericType::*;

        match (self, other) {
            (Int(a), Int(b)) => checked(*a, *b).map(Int).ok_or(Error::Overflow { op }),
            (Float(_), _) | (_, Float(_)) => Ok(Float(float(self.to_float(), other.to_float()))),
            // A BigInt operand is already outside the exact range
            _ => Err(Error::Overflow { op }),
        }
    }

    pub fn add_exact(&self, other: &NumericType) -> Result<NumericType> {
        self.exact(other, "add_exact", i64::checked_add, |a, b| a + b)
    }

    pub fn sub_exact(&self, other: &NumericType) -> Result<NumericType> {
        self.exact(other, "sub_exact", i64::checked_sub, |a, b| a - b)
    }

    pub fn mul_exact(&self, other: &NumericType) -> Result<NumericType> {
        self.exact(other, "mul_exact", i64::checked_mul, |a, b| a * b)
    }

    pub fn inc_exact(&self) -> Result<NumericType> {
        self.exact(&NumericType::Int(1), "inc_exact", i64::checked_add, |a, b| a + b)
    }

    pub fn dec_exact(&self) -> Result<NumericType> {
        self.exact(&NumericType::Int(1), "dec_exact", i64::checked_sub, |a, b| a - b)
    }
}

// ============================================================================
// Integer Division
// ============================================================================

impl NumericType {
    /// Quotient truncated toward zero.
    pub fn quot(&self, other: &NumericType) -> Result<NumericType> {
        use NumericType::*;

        if other.is_zero() {
            return Err(Error::DivideByZero { op: "quot" });
        }
        match (self, other) {
            (Int(a), Int(b)) => Ok(a
                .checked_div(*b)
                .map(Int)
                .unwrap_or_else(|| Self::from_big(BigInteger::from(*a) / BigInteger::from(*b)))),
            (Float(_), _) | (_, Float(_)) => Ok(Float((self.to_float() / other.to_float()).trunc())),
            _ => match (self.to_big(), other.to_big()) {
                (Some(a), Some(b)) => Ok(Self::from_big(a / b)),
                _ => Ok(Float((self.to_float() / other.to_float()).trunc())),
            },
        }
    }

    /// Remainder with the sign of the dividend.
    pub fn rem(&self, other: &NumericType) -> Result<NumericType> {
        use NumericType::*;

        if other.is_zero() {
            return Err(Error::DivideByZero { op: "rem" });
        }
        match (self, other) {
            (Int(a), Int(b)) => Ok(Int(a.checked_rem(*b).unwrap_or(0))),
            (Float(_), _) | (_, Float(_)) => Ok(Float(self.to_float() % other.to_float())),
            _ => match (self.to_big(), other.to_big()) {
                (Some(a), Some(b)) => Ok(Self::from_big(a % b)),
                _ => Ok(Float(self.to_float() % other.to_float())),
            },
        }
    }

    /// Modulus with the sign of the divisor.
    pub fn modulo(&self, other: &NumericType) -> Result<NumericType> {
        let r = self.rem(other)?;
        if !r.is_zero() && r.is_negative() != other.is_negative() {
            Ok(r.add(other))
        } else {
            Ok(r)
        }
    }
}
