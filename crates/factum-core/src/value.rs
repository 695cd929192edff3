//! Typed cell values.
//!
//! Tabular sources carry heterogeneous cells. The encoder only knows how
//! to serialize strings, integers and floats; everything else is rejected
//! at encoding time, and missing cells are imputed with a per-predicate
//! dummy entity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of a tabular dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A string cell, serialized as an entity reference.
    Str(String),
    /// An integer cell, serialized as an XML-Schema integer literal.
    Int(i64),
    /// A floating-point cell, serialized as an XML-Schema double literal.
    Float(f64),
    /// A boolean cell. Not representable in the triple grammar; the
    /// encoder rejects it with `UnsupportedLiteral`.
    Bool(bool),
    /// An explicitly missing cell.
    Missing,
}

impl Value {
    /// Whether this cell counts as missing.
    ///
    /// Missingness is decided by string form: a float NaN and the literal
    /// string "nan" both render as "nan" and are imputed identically to an
    /// absent cell.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Float(f) => f.is_nan(),
            Value::Str(s) => s == "nan",
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Missing => write!(f, "nan"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
