//! Value classification for the differ.

use serde_json::{Map, Number, Value};

/// Shape of one side of a comparison, computed once per comparison.
#[derive(Debug, Clone, Copy)]
pub enum ValueKind<'a> {
    /// No value at all (missing field or unresolvable path)
    Undefined,
    /// Explicit null
    Null,
    Scalar(Scalar<'a>),
    Sequence(&'a [Value]),
    Keyed(&'a Map<String, Value>),
}

/// Leaf values.
#[derive(Debug, Clone, Copy)]
pub enum Scalar<'a> {
    Bool(bool),
    Number(&'a Number),
    String(&'a str),
}

impl<'a> ValueKind<'a> {
    #[must_use]
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            None => Self::Undefined,
            Some(Value::Null) => Self::Null,
            Some(Value::Bool(b)) => Self::Scalar(Scalar::Bool(*b)),
            Some(Value::Number(n)) => Self::Scalar(Scalar::Number(n)),
            Some(Value::String(s)) => Self::Scalar(Scalar::String(s)),
            Some(Value::Array(items)) => Self::Sequence(items),
            Some(Value::Object(fields)) => Self::Keyed(fields),
        }
    }

    /// Null or undefined.
    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }
}

impl Scalar<'_> {
    /// Equal kind and equal value. Numbers compare numerically, so `1` and
    /// `1.0` are the same value.
    #[must_use]
    pub fn same_as(&self, other: &Scalar<'_>) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::String(a), Scalar::String(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => numbers_equal(a, b),
            _ => false,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
