use crate::{
    compare::Comparator,
    error::InternalError,
    sort::{SortValue, codec::RunReader},
};
use std::{cmp::Ordering, collections::BinaryHeap, io::Read};

///
/// MergeSource
///
/// One ascending input of a k-way merge.
///

pub(super) enum MergeSource<T, R> {
    Run(RunReader<T, R>),
    Memory(std::vec::IntoIter<T>),
}

impl<T: SortValue, R: Read> MergeSource<T, R> {
    fn next_value(&mut self) -> Result<Option<T>, InternalError> {
        match self {
            Self::Run(reader) => reader.next_value(),
            Self::Memory(values) => Ok(values.next()),
        }
    }
}

///
/// Frontier
///
/// Heap entry for the current head of one source.
/// Ordered so the std max-heap pops the smallest value first, and equal
/// values pop in source order.
///

struct Frontier<T> {
    value: T,
    source: usize,
    comparator: Comparator<T>,
}

impl<T> Ord for Frontier<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator
            .compare(&other.value, &self.value)
            .then_with(|| other.source.cmp(&self.source))
    }
}

impl<T> PartialOrd for Frontier<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Frontier<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Frontier<T> {}

///
/// KWayMerge
///
/// Lazily merges ascending sources into one ascending sequence.
/// Holds exactly one frontier value per non-exhausted source.
///

pub(super) struct KWayMerge<T, R> {
    sources: Vec<MergeSource<T, R>>,
    heap: BinaryHeap<Frontier<T>>,
    comparator: Comparator<T>,
}

impl<T: SortValue, R: Read> KWayMerge<T, R> {
    pub(super) fn new(
        mut sources: Vec<MergeSource<T, R>>,
        comparator: Comparator<T>,
    ) -> Result<Self, InternalError> {
        let mut heap = BinaryHeap::with_capacity(sources.len());

        for (source, input) in sources.iter_mut().enumerate() {
            if let Some(value) = input.next_value()? {
                heap.push(Frontier {
                    value,
                    source,
                    comparator: comparator.clone(),
                });
            }
        }

        Ok(Self {
            sources,
            heap,
            comparator,
        })
    }

    /// Pop the smallest frontier value and refill from its source.
    pub(super) fn next_value(&mut self) -> Result<Option<T>, InternalError> {
        let Some(Frontier { value, source, .. }) = self.heap.pop() else {
            return Ok(None);
        };

        if let Some(next) = self.sources[source].next_value()? {
            self.heap.push(Frontier {
                value: next,
                source,
                comparator: self.comparator.clone(),
            });
        }

        Ok(Some(value))
    }
}
