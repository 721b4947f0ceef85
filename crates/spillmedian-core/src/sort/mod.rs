//! External sorter: buffers values under a memory budget, spills sorted
//! runs to [`SpillStorage`], and serves one forward-only ascending sequence.

mod codec;
mod config;
mod cursor;
mod merge;
mod sorter;
mod spill;

#[cfg(test)]
mod tests;

use crate::{error::InternalError, types::Float64, value::Value};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Debug, mem::size_of};

// re-exports
pub use config::{
    DEFAULT_MAX_FRAME_BYTES, DEFAULT_MERGE_FAN_IN, DEFAULT_WORK_MEM_KB, SortConfig,
};
pub use sorter::{ExternalSorter, SortPhase, SorterStats};
pub use spill::{FileSpillStorage, MemorySpillStorage, SegmentId, SpillStorage};

///
/// SortValue
///
/// Capability required of anything the external sorter buffers and spills.
///

pub trait SortValue: Debug + Serialize + DeserializeOwned + 'static {
    /// Approximate in-memory size in bytes, charged against the sort budget.
    fn footprint(&self) -> usize;

    /// Whether this value represents SQL NULL.
    fn is_null(&self) -> bool {
        false
    }
}

impl SortValue for Value {
    fn footprint(&self) -> usize {
        self.heap_footprint()
    }

    fn is_null(&self) -> bool {
        Self::is_null(self)
    }
}

impl SortValue for String {
    fn footprint(&self) -> usize {
        size_of::<Self>() + self.capacity()
    }
}

impl SortValue for Vec<u8> {
    fn footprint(&self) -> usize {
        size_of::<Self>() + self.capacity()
    }
}

macro_rules! impl_sort_value_fixed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SortValue for $ty {
                fn footprint(&self) -> usize {
                    size_of::<Self>()
                }
            }
        )*
    };
}

impl_sort_value_fixed!(
    bool, char, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, Float64,
);

///
/// SortedSequence
///
/// Forward-only view over an ascending sequence, as consumed by selection.
///

pub trait SortedSequence<T> {
    /// Discard exactly `n` elements; fails if fewer remain.
    fn skip(&mut self, n: u64) -> Result<(), InternalError>;

    /// Return the next element and whether it was the last one.
    fn next_value(&mut self) -> Result<(T, bool), InternalError>;
}
