use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Represents the supported data types in a table schema.
/// These types define the structure of columns and how raw text is coerced into values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// A 64-bit signed integer.
    #[serde(rename = "integer")]
    Int,
    /// A 64-bit floating-point number.
    #[serde(rename = "float")]
    Float,
    /// A boolean value (true or false).
    #[serde(rename = "boolean")]
    Bool,
    /// A variable-length UTF-8 character string.
    #[serde(rename = "string")]
    Text,
}

impl DataType {
    /// The name used in column definitions and in persisted documents.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int => "integer",
            DataType::Float => "float",
            DataType::Bool => "boolean",
            DataType::Text => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

impl FromStr for DataType {
    type Err = Error;

    /// Parses a type name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "integer" => Ok(DataType::Int),
            "float" => Ok(DataType::Float),
            "boolean" => Ok(DataType::Bool),
            "string" => Ok(DataType::Text),
            other => Err(Error::UnsupportedType(other.to_string())),
        }
    }
}
