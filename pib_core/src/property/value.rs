use crate::error::PropertyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, equality-comparable scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Token {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Token::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Bool(b) => write!(f, "{}", b),
            Token::Number(n) => write!(f, "{}", n),
            Token::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A closed numeric interval `[lo, hi]` with `lo <= hi`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct Range {
    lo: f64,
    hi: f64,
}

impl Range {
    /// Create a range, rejecting inverted or NaN bounds.
    pub fn new(lo: f64, hi: f64) -> Result<Self, PropertyError> {
        // written this way so NaN bounds fail as well
        if !(lo <= hi) {
            return Err(PropertyError::MalformedRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }
}

impl TryFrom<(f64, f64)> for Range {
    type Error = PropertyError;

    fn try_from((lo, hi): (f64, f64)) -> Result<Self, Self::Error> {
        Range::new(lo, hi)
    }
}

impl From<Range> for (f64, f64) {
    fn from(range: Range) -> Self {
        (range.lo, range.hi)
    }
}

/// The value slot of a property: a scalar token or a numeric range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(Token),
    Range(Range),
}

impl Value {
    /// Build a range value, failing with `MalformedRange` when `lo > hi`.
    pub fn range(lo: f64, hi: f64) -> Result<Self, PropertyError> {
        Ok(Value::Range(Range::new(lo, hi)?))
    }

    /// Numeric bounds of this value. A numeric scalar is the degenerate
    /// range `[v, v]`; booleans and strings have no bounds.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            Value::Range(r) => Some((r.lo, r.hi)),
            Value::Scalar(token) => token.as_number().map(|v| (v, v)),
        }
    }

    /// Overlap of two numeric values.
    ///
    /// Returns `None` when the intervals are disjoint or either side is not
    /// numeric. An overlap that narrows to a single point collapses to a
    /// numeric scalar.
    pub fn overlap(&self, other: &Value) -> Option<Value> {
        let (a_lo, a_hi) = self.bounds()?;
        let (b_lo, b_hi) = other.bounds()?;

        if !(a_lo <= b_hi && b_lo <= a_hi) {
            return None;
        }

        let lo = a_lo.max(b_lo);
        let hi = a_hi.min(b_hi);
        if lo == hi {
            Some(Value::Scalar(Token::Number(lo)))
        } else {
            Some(Value::Range(Range { lo, hi }))
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(token) => write!(f, "{}", token),
            Value::Range(r) => write!(f, "{}-{}", r.lo, r.hi),
        }
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        Value::Scalar(token)
    }
}

impl From<Range> for Value {
    fn from(range: Range) -> Self {
        Value::Range(range)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Token::Bool(b))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Scalar(Token::Number(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Scalar(Token::Number(f64::from(n)))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Scalar(Token::Number(f64::from(n)))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Token::Number(n as f64))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Token::Text(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Token::Text(s))
    }
}
