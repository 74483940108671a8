use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::data_type::DataType;
use crate::error::{Error, Result};

/// Represents a single typed value stored in a table.
///
/// This enum wraps all supported Rust types into a single type that can be
/// passed around the engine. Every value belongs to exactly one [DataType];
/// there is no NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A 64-bit signed integer value.
    Int(i64),
    /// A finite 64-bit floating-point value.
    Float(f64),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning.
    Text(Arc<str>),
    /// A boolean value.
    Bool(bool),
}

impl Value {
    /// Converts raw text into a value of the given type.
    ///
    /// This is the only place where type semantics live: insert, update and
    /// condition literals all go through it.
    ///
    /// - `integer`: base-10 signed integer.
    /// - `float`: finite decimal number.
    /// - `boolean`: `true` iff the text is `"true"` or `"1"` (any case), `false` for
    ///   anything else. Never fails.
    /// - `string`: the raw text, untouched.
    ///
    /// Surrounding whitespace is ignored for every type except `string`.
    ///
    /// # Example
    /// ```
    /// use flatdb::{DataType, Value};
    ///
    /// assert_eq!(Value::coerce("42", DataType::Int).unwrap(), Value::Int(42));
    /// assert_eq!(Value::coerce("TRUE", DataType::Bool).unwrap(), Value::Bool(true));
    /// assert_eq!(Value::coerce("yes", DataType::Bool).unwrap(), Value::Bool(false));
    /// assert!(Value::coerce("forty", DataType::Int).is_err());
    /// ```
    pub fn coerce(raw: &str, data_type: DataType) -> Result<Value> {
        match data_type {
            DataType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Error::type_mismatch(raw, data_type)),
            DataType::Float => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => Err(Error::type_mismatch(raw, data_type)),
            },
            DataType::Bool => {
                let normalized = raw.trim().to_lowercase();
                Ok(Value::Bool(normalized == "true" || normalized == "1"))
            }
            DataType::Text => Ok(Value::Text(Arc::from(raw))),
        }
    }

    /// Returns the inner integer value if this is a [Value::Int].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }


    /// Returns the [DataType] this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int(_) => DataType::Int,
            Self::Float(_) => DataType::Float,
            Self::Text(_) => DataType::Text,
            Self::Bool(_) => DataType::Bool,
        }
    }

    /// Compares two values of the same type using that type's natural ordering:
    /// numeric for integers and floats, lexical for strings, `false < true`
    /// for booleans.
    ///
    /// Returns `None` when the two values have different types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
            (Value::Float(l), Value::Float(r)) => l.partial_cmp(r),
            (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => i.fmt(f),
            Value::Float(x) => fmt::Debug::fmt(x, f),
            Value::Text(s) => s.fmt(f),
            Value::Bool(b) => b.fmt(f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─────────────────────────────────────────────────────────────
    // Coercion
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_coerce_integer() {
        assert_eq!(Value::coerce("1", DataType::Int).unwrap(), Value::Int(1));
        assert_eq!(Value::coerce(" -17 ", DataType::Int).unwrap(), Value::Int(-17));
        assert!(matches!(
            Value::coerce("1.5", DataType::Int),
            Err(Error::TypeMismatch { expected: DataType::Int, .. })
        ));
        assert!(Value::coerce("abc", DataType::Int).is_err());
        assert!(Value::coerce("", DataType::Int).is_err());
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(Value::coerce("25.5", DataType::Float).unwrap(), Value::Float(25.5));
        assert_eq!(Value::coerce("3", DataType::Float).unwrap(), Value::Float(3.0));
        assert!(Value::coerce("three", DataType::Float).is_err());
        assert!(Value::coerce("NaN", DataType::Float).is_err());
        assert!(Value::coerce("inf", DataType::Float).is_err());
    }

    #[test]
    fn test_coerce_boolean_is_total() {
        assert_eq!(Value::coerce("TRUE", DataType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(Value::coerce("1", DataType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(Value::coerce("0", DataType::Bool).unwrap(), Value::Bool(false));
        assert_eq!(Value::coerce("false", DataType::Bool).unwrap(), Value::Bool(false));
        assert_eq!(Value::coerce("yes", DataType::Bool).unwrap(), Value::Bool(false));
        assert_eq!(Value::coerce("", DataType::Bool).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_coerce_string_is_identity() {
        assert_eq!(
            Value::coerce(" Alice ", DataType::Text).unwrap(),
            Value::Text(" Alice ".into())
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Float(1.0).as_int(), None);
        assert_eq!(Value::Text("42".into()).as_int(), None);
    }

    #[test]
    fn test_data_type() {
        assert_eq!(Value::Int(1).data_type(), DataType::Int);
        assert_eq!(Value::Float(1.0).data_type(), DataType::Float);
        assert_eq!(Value::Text("x".into()).data_type(), DataType::Text);
        assert_eq!(Value::Bool(true).data_type(), DataType::Bool);
    }

    // ─────────────────────────────────────────────────────────────
    // Ordering
    // ─────────────────────────────────────────────────────────────
    #[test]
    fn test_compare_natural_ordering() {
        assert_eq!(Value::Int(9).compare(&Value::Int(10)), Some(Ordering::Less));
        assert_eq!(
            Value::Float(2.5).compare(&Value::Float(2.5)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Text("b".into()).compare(&Value::Text("a".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Bool(false).compare(&Value::Bool(true)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Int(1).compare(&Value::Float(1.0)), None);
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(Value::Float(30.0).to_string(), "30.0");
        assert_eq!(Value::Text("Bob".into()).to_string(), "Bob");
        assert_eq!(serde_json::to_string(&Value::Int(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&Value::Float(1.0)).unwrap(), "1.0");
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Value::Text("a".into())).unwrap(), "\"a\"");
    }
}
