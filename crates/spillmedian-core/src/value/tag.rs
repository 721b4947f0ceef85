use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// ValueType
///
/// Declared input type of one median aggregate.
/// Labels are stable: they appear in config files, CLI flags and errors.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Uint,
    Float64,
    Text,
    Blob,
    List,
}

impl ValueType {
    pub const ALL: [Self; 7] = [
        Self::Bool,
        Self::Int,
        Self::Uint,
        Self::Float64,
        Self::Text,
        Self::Blob,
        Self::List,
    ];

    /// Stable human-readable type label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float64 => "float64",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// ParseValueTypeError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
#[error("unknown value type '{0}'")]
pub struct ParseValueTypeError(pub String);

impl FromStr for ValueType {
    type Err = ParseValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Self::Bool,
            "int" | "int8" | "bigint" | "i64" => Self::Int,
            "uint" | "u64" => Self::Uint,
            "float" | "float64" | "float8" | "double" | "f64" => Self::Float64,
            "text" | "string" | "varchar" => Self::Text,
            "blob" | "bytea" | "bytes" => Self::Blob,
            "list" | "array" => Self::List,
            _ => return Err(ParseValueTypeError(s.to_string())),
        };

        Ok(ty)
    }
}
