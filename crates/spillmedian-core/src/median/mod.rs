//! Exact median aggregation over an external sort.
//!
//! One [`MedianAccumulator`] holds the state of one aggregation group.
//! [`MedianAggregate`] is the host-facing init/insert/finalize protocol.

mod aggregate;
mod select;


use crate::{
    compare::{Comparator, ComparatorResolver},
    error::InternalError,
    obs::sink::{FinalizeSpan, MetricsEvent, record},
    sort::{ExternalSorter, FileSpillStorage, SortConfig, SortValue, SorterStats, SpillStorage},
};

// re-exports
pub use aggregate::MedianAggregate;
pub use select::{median_position, select, select_nth};

///
/// MedianAccumulator
///
/// Per-group state: the bound comparator, the count of non-null values and
/// the sorter holding them. The sorter and its spill storage are only
/// provisioned once the first non-null value arrives.
///

pub struct MedianAccumulator<T, S: SpillStorage = FileSpillStorage> {
    comparator: Comparator<T>,
    config: SortConfig,
    sorter: Option<ExternalSorter<T, S>>,
    count: u64,
}

impl<T: SortValue, S: SpillStorage> MedianAccumulator<T, S> {
    /// Resolve the comparator for `ty` and start an empty accumulator.
    pub fn init<R>(ty: &R::Ty, resolver: &R, config: SortConfig) -> Result<Self, InternalError>
    where
        R: ComparatorResolver<T> + ?Sized,
    {
        let comparator = resolver.resolve(ty)?;

        Self::with_comparator(comparator, config)
    }

    /// Start an empty accumulator over an already bound comparator.
    pub fn with_comparator(
        comparator: Comparator<T>,
        config: SortConfig,
    ) -> Result<Self, InternalError> {
        config.validate()?;

        Ok(Self {
            comparator,
            config,
            sorter: None,
            count: 0,
        })
    }

    /// Add one input. Nulls are skipped and never counted.
    pub fn insert(&mut self, value: Option<T>) -> Result<(), InternalError> {
        let Some(value) = value.filter(|value| !value.is_null()) else {
            record(MetricsEvent::NullSkipped);
            return Ok(());
        };

        if !self.comparator.admits(&value) {
            return Err(InternalError::type_mismatch(
                self.comparator.label(),
                &value,
            ));
        }

        let sorter = match &mut self.sorter {
            Some(sorter) => sorter,
            slot @ None => slot.insert(ExternalSorter::provision(
                self.comparator.clone(),
                self.config.clone(),
            )?),
        };
        sorter.insert(value)?;

        self.count += 1;
        record(MetricsEvent::ValueInserted);

        Ok(())
    }

    /// Sort everything inserted and return the median, or `None` when no
    /// non-null value was seen.
    pub fn finalize(self) -> Result<Option<T>, InternalError> {
        let Self { sorter, count, .. } = self;
        let _span = FinalizeSpan::new(count);

        let Some(mut sorter) = sorter.filter(|_| count > 0) else {
            return Ok(None);
        };
        sorter.sort()?;

        select(&mut sorter, count).map(Some)
    }

    /// Number of non-null values inserted so far.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub const fn comparator(&self) -> &Comparator<T> {
        &self.comparator
    }

    #[must_use]
    pub const fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Whether the sorter (and its spill storage) has been created yet.
    #[must_use]
    pub const fn is_provisioned(&self) -> bool {
        self.sorter.is_some()
    }

    #[must_use]
    pub fn stats(&self) -> SorterStats {
        self.sorter
            .as_ref()
            .map(ExternalSorter::stats)
            .unwrap_or_default()
    }
}

impl<T, S: SpillStorage> std::fmt::Debug for MedianAccumulator<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MedianAccumulator")
            .field("comparator", &self.comparator)
            .field("count", &self.count)
            .field("provisioned", &self.sorter.is_some())
            .finish_non_exhaustive()
    }
}
