//! Scalar values: predicate literals, aggregate results, and projected cells.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A single scalar value, typed according to one of Hustle's three logical
/// column types plus a null marker.
///
/// Used both for predicate literals (spec §4.5) and for materialized result
/// cells (spec §6: "each cell typed as declared by the projection's column
/// refs").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Bytes(Vec<u8>),
    Str(String),
    /// The result of a MEAN aggregate, which is not necessarily integral.
    Float(f64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Orders values for SMA/order-by comparisons. NULLs compare as
    /// [`Ordering::Less`] unconditionally; callers implementing NULLS LAST
    /// semantics (spec §4.8) must special-case nullness before calling this.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sorts_first() {
        assert_eq!(Value::Null.compare(&Value::Int(0)), Some(Ordering::Less));
        assert_eq!(Value::Int(0).compare(&Value::Null), Some(Ordering::Greater));
    }

    #[test]
    fn mixed_numeric_compare() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.0)), Some(Ordering::Equal));
    }
}
