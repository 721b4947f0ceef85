//! Comparator binding: resolves a total order for a declared value type.
//!
//! Resolution is an injected service ([`ComparatorResolver`]) rather than a
//! global lookup, so hosts and tests can bind their own orders.

mod registry;

#[cfg(test)]
mod tests;

use crate::error::InternalError;
use std::{any::type_name, cmp::Ordering, fmt, sync::Arc};

// re-exports
pub use registry::{ValueComparatorRegistry, value_cmp};

type CompareFn<T> = dyn Fn(&T, &T) -> Ordering + Send + Sync;
type AdmitFn<T> = dyn Fn(&T) -> bool + Send + Sync;

///
/// Collation
///
/// Text collation bound alongside a comparator.
/// Only deterministic, session-independent collations exist here.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Collation {
    /// Plain byte order of the UTF-8 encoding.
    Binary,
}

impl Collation {
    #[must_use]
    pub fn compare_text(self, left: &str, right: &str) -> Ordering {
        match self {
            Self::Binary => left.as_bytes().cmp(right.as_bytes()),
        }
    }
}

///
/// Comparator
///
/// Cheap-to-clone handle over one total order, fixed at bind time.
/// Carries the type label it was bound for and an admission predicate
/// that rejects values of any other type.
///

pub struct Comparator<T> {
    label: Arc<str>,
    collation: Option<Collation>,
    compare: Arc<CompareFn<T>>,
    admit: Option<Arc<AdmitFn<T>>>,
}

impl<T> Comparator<T> {
    pub fn new(
        label: impl Into<Arc<str>>,
        compare: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            collation: None,
            compare: Arc::new(compare),
            admit: None,
        }
    }

    #[must_use]
    pub const fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = Some(collation);
        self
    }

    /// Restrict the values this comparator accepts.
    #[must_use]
    pub fn with_admission(mut self, admit: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.admit = Some(Arc::new(admit));
        self
    }

    #[must_use]
    pub fn compare(&self, left: &T, right: &T) -> Ordering {
        (self.compare)(left, right)
    }

    #[must_use]
    pub fn admits(&self, value: &T) -> bool {
        self.admit.as_ref().is_none_or(|admit| admit(value))
    }

    #[must_use]
    pub const fn has_admission(&self) -> bool {
        self.admit.is_some()
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn collation(&self) -> Option<Collation> {
        self.collation
    }
}

impl<T: Ord + 'static> Comparator<T> {
    /// Bind the type's own `Ord` implementation.
    #[must_use]
    pub fn natural() -> Self {
        Self::new(type_name::<T>(), T::cmp)
    }
}

impl<T> Clone for Comparator<T> {
    fn clone(&self) -> Self {
        Self {
            label: Arc::clone(&self.label),
            collation: self.collation,
            compare: Arc::clone(&self.compare),
            admit: self.admit.clone(),
        }
    }
}

impl<T> fmt::Debug for Comparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("label", &self.label)
            .field("collation", &self.collation)
            .field("admission", &self.admit.is_some())
            .finish_non_exhaustive()
    }
}

///
/// ComparatorResolver
///
/// Comparator-resolution service consumed by accumulator init.
/// Fails with an unsupported-type error when no total order is registered.
///

pub trait ComparatorResolver<T> {
    type Ty: fmt::Debug;

    fn resolve(&self, ty: &Self::Ty) -> Result<Comparator<T>, InternalError>;
}

///
/// NaturalOrder
///
/// Resolver for plain Rust types that already carry a total order.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalOrder;

impl<T: Ord + 'static> ComparatorResolver<T> for NaturalOrder {
    type Ty = ();

    fn resolve(&self, _ty: &()) -> Result<Comparator<T>, InternalError> {
        Ok(Comparator::natural())
    }
}
