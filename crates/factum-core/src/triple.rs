//! Triple encoding: one (subject, predicate, value) cell to one
//! n-triples-like line.
//!
//! The serialization grammar is line oriented:
//!
//! ```text
//! <subject> <predicate> object .
//! ```
//!
//! where `object` is either an angle-bracketed entity token or a quoted
//! literal suffixed with an XML-Schema datatype.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// XML-Schema datatype URI for integer literals.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// XML-Schema datatype URI for double literals.
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

/// A raw (subject, predicate, object) triple.
///
/// Identifiers are plain strings; decoration (brackets, datatype tags)
/// only exists in the serialized form. Immutable once created; triple
/// ordering is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawTriple {
    /// Subject entity identifier.
    pub subject: String,
    /// Predicate (relation) identifier.
    pub predicate: String,
    /// Object identifier or literal string form.
    pub object: String,
}

impl RawTriple {
    /// Create a new raw triple.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for RawTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// Encode one cell as a serialized triple line.
///
/// Pure function: bit-reproducible given identical inputs, no side
/// effects beyond string construction.
///
/// - A missing value (explicit, float NaN, or the string "nan") becomes
///   the per-predicate sentinel entity `{predicate}Dummy`, so every cell
///   yields a triple.
/// - A string object becomes an entity reference with internal
///   whitespace stripped.
/// - Integer and float objects become typed literals.
/// - Any other value is a fatal encoding error.
///
/// # Example
///
/// ```rust
/// use factum_core::{encode_line, Value};
///
/// let line = encode_line("Event_0", "price", &Value::Float(f64::NAN)).unwrap();
/// assert_eq!(line, "<Event_0> <price> <priceDummy> .");
/// ```
pub fn encode_line(subject: &str, predicate: &str, value: &Value) -> Result<String> {
    let object = if value.is_missing() {
        format!("<{predicate}Dummy>")
    } else {
        match value {
            Value::Str(s) => format!("<{}>", s.replace(' ', "")),
            Value::Int(i) => format!("\"{i}\"^^<{XSD_INTEGER}>"),
            Value::Float(f) => format!("\"{f:?}\"^^<{XSD_DOUBLE}>"),
            Value::Bool(_) | Value::Missing => {
                return Err(Error::UnsupportedLiteral {
                    predicate: predicate.to_string(),
                    value: value.to_string(),
                })
            }
        }
    };
    Ok(format!("<{subject}> <{predicate}> {object} ."))
}
