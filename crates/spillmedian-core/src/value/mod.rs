mod tag;


use crate::types::Float64;
use serde::{Deserialize, Serialize};
use std::{fmt, mem::size_of};

// re-exports
pub use tag::{ParseValueTypeError, ValueType};

///
/// Value
///
/// Dynamically typed input datum supplied by the host. The host coerces
/// every non-null input to the accumulator's declared [`ValueType`].
///
/// Null → SQL NULL; excluded from the median entirely.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float64(Float64),
    Text(String),
    Blob(Vec<u8>),
    List(Vec<Self>),
}

impl Value {
    /// Declared type of this value, or `None` for `Null`.
    #[must_use]
    pub const fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueType::Bool),
            Self::Int(_) => Some(ValueType::Int),
            Self::Uint(_) => Some(ValueType::Uint),
            Self::Float64(_) => Some(ValueType::Float64),
            Self::Text(_) => Some(ValueType::Text),
            Self::Blob(_) => Some(ValueType::Blob),
            Self::List(_) => Some(ValueType::List),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Build a float value, mapping non-finite input to `None`.
    #[must_use]
    pub fn from_f64(v: f64) -> Option<Self> {
        Float64::try_new(v).map(Self::Float64)
    }

    /// Approximate resident size in bytes: the enum slot plus owned heap data.
    #[must_use]
    pub fn heap_footprint(&self) -> usize {
        let heap = match self {
            Self::Text(s) => s.capacity(),
            Self::Blob(b) => b.capacity(),
            Self::List(items) => items.iter().map(Self::heap_footprint).sum(),
            _ => 0,
        };

        size_of::<Self>() + heap
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Blob(bytes) => {
                f.write_str("\\x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<Float64> for Value {
    fn from(v: Float64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
