use crate::{
    compare::{Collation, Comparator, ComparatorResolver},
    error::InternalError,
    value::{Value, ValueType},
};
use std::{cmp::Ordering, collections::BTreeMap};

///
/// ValueComparatorRegistry
///
/// Resolves a [`Comparator`] for each orderable [`ValueType`].
/// `List` has no registered order and fails resolution.
///

#[derive(Clone, Debug)]
pub struct ValueComparatorRegistry {
    entries: BTreeMap<ValueType, Comparator<Value>>,
}

impl ValueComparatorRegistry {
    /// Registry with no bound orders.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry with the built-in order for every scalar type.
    /// Text binds binary collation so ordering never depends on locale.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        for ty in [
            ValueType::Bool,
            ValueType::Int,
            ValueType::Uint,
            ValueType::Float64,
            ValueType::Blob,
        ] {
            registry.register(ty, Comparator::new(ty.label(), value_cmp));
        }

        let text = Comparator::new(ValueType::Text.label(), |left: &Value, right: &Value| {
            match (left, right) {
                (Value::Text(a), Value::Text(b)) => Collation::Binary.compare_text(a, b),
                _ => value_cmp(left, right),
            }
        })
        .with_collation(Collation::Binary);
        registry.register(ValueType::Text, text);

        registry
    }

    /// Bind (or replace) the order for one type.
    /// Comparators without their own admission predicate only admit `ty`.
    pub fn register(&mut self, ty: ValueType, comparator: Comparator<Value>) {
        let comparator = if comparator.has_admission() {
            comparator
        } else {
            comparator.with_admission(move |value: &Value| value.value_type() == Some(ty))
        };

        self.entries.insert(ty, comparator);
    }

    /// Remove the order bound for one type.
    pub fn unregister(&mut self, ty: ValueType) -> Option<Comparator<Value>> {
        self.entries.remove(&ty)
    }

    #[must_use]
    pub fn supports(&self, ty: ValueType) -> bool {
        self.entries.contains_key(&ty)
    }
}

impl Default for ValueComparatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ComparatorResolver<Value> for ValueComparatorRegistry {
    type Ty = ValueType;

    fn resolve(&self, ty: &ValueType) -> Result<Comparator<Value>, InternalError> {
        self.entries
            .get(ty)
            .cloned()
            .ok_or_else(|| InternalError::unsupported_type(ty.label()))
    }
}

/// Total comparator over scalar values.
///
/// Same-variant values compare by their natural order; mixed variants
/// compare by a fixed variant rank so the result stays deterministic.
#[must_use]
pub fn value_cmp(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
        (Value::Float64(a), Value::Float64(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
        (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => value_cmp_list(a, b),
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => rank(left).cmp(&rank(right)),
    }
}

fn value_cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = value_cmp(left, right);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

// Cross-variant rank; nulls sort last.
const fn rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Int(_) => 1,
        Value::Uint(_) => 2,
        Value::Float64(_) => 3,
        Value::Text(_) => 4,
        Value::Blob(_) => 5,
        Value::List(_) => 6,
        Value::Null => 7,
    }
}
