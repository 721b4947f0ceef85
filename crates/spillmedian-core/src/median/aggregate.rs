use crate::{
    compare::{ComparatorResolver, ValueComparatorRegistry},
    error::InternalError,
    median::MedianAccumulator,
    sort::{FileSpillStorage, SortConfig, SortValue, SpillStorage},
};
use std::marker::PhantomData;

///
/// MedianAggregate
///
/// Host-facing median aggregate. Owns the comparator-resolution service and
/// the sort config every group's accumulator is created with.
///
/// The host drives each group through `init`, `insert` and `finalize`, or
/// through the `transition`/`final_value` pair when it carries the state as
/// an optional value between calls.
///

pub struct MedianAggregate<R, S = FileSpillStorage> {
    resolver: R,
    config: SortConfig,
    _storage: PhantomData<fn() -> S>,
}

impl<R, S: SpillStorage> MedianAggregate<R, S> {
    #[must_use]
    pub const fn new(resolver: R, config: SortConfig) -> Self {
        Self {
            resolver,
            config,
            _storage: PhantomData,
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Mutable access, e.g. to register extra comparators before use.
    pub const fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    #[must_use]
    pub const fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Start the state for one group.
    pub fn init<T>(
        &self,
        ty: &<R as ComparatorResolver<T>>::Ty,
    ) -> Result<MedianAccumulator<T, S>, InternalError>
    where
        T: SortValue,
        R: ComparatorResolver<T>,
    {
        MedianAccumulator::init(ty, &self.resolver, self.config.clone())
    }

    #[allow(clippy::unused_self)]
    pub fn insert<T: SortValue>(
        &self,
        state: &mut MedianAccumulator<T, S>,
        value: Option<T>,
    ) -> Result<(), InternalError> {
        state.insert(value)
    }

    #[allow(clippy::unused_self)]
    pub fn finalize<T: SortValue>(
        &self,
        state: MedianAccumulator<T, S>,
    ) -> Result<Option<T>, InternalError> {
        state.finalize()
    }

    /// Aggregate transition step: create the state on the first row of a
    /// group, then fold `value` into it.
    pub fn transition<T>(
        &self,
        state: Option<MedianAccumulator<T, S>>,
        ty: &<R as ComparatorResolver<T>>::Ty,
        value: Option<T>,
    ) -> Result<MedianAccumulator<T, S>, InternalError>
    where
        T: SortValue,
        R: ComparatorResolver<T>,
    {
        let mut state = match state {
            Some(state) => state,
            None => self.init(ty)?,
        };
        state.insert(value)?;

        Ok(state)
    }

    /// Aggregate final step: a group that never produced state has no median.
    #[allow(clippy::unused_self)]
    pub fn final_value<T: SortValue>(
        &self,
        state: Option<MedianAccumulator<T, S>>,
    ) -> Result<Option<T>, InternalError> {
        match state {
            Some(state) => state.finalize(),
            None => Ok(None),
        }
    }
}

impl<S: SpillStorage> MedianAggregate<ValueComparatorRegistry, S> {
    /// Aggregate over dynamic values with the built-in comparators.
    #[must_use]
    pub fn builtin(config: SortConfig) -> Self {
        Self::new(ValueComparatorRegistry::builtin(), config)
    }
}

impl<R: std::fmt::Debug, S> std::fmt::Debug for MedianAggregate<R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MedianAggregate")
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
