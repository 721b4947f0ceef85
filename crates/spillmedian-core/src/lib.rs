//! Core runtime for spillmedian: exact medians over value streams of any
//! size, using a memory-bounded external sort with spill-to-disk runs.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod compare;
pub mod error;
pub mod median;
pub mod obs;
pub mod serialize;
pub mod sort;
pub mod types;
pub mod value;

///
/// CONSTANTS
///

/// Default sort memory budget, in KiB, before a buffer is spilled as a run.
pub const DEFAULT_WORK_MEM_KB: usize = sort::DEFAULT_WORK_MEM_KB;

/// Largest single encoded value a spill run frame may carry.
pub const DEFAULT_MAX_FRAME_BYTES: usize = sort::DEFAULT_MAX_FRAME_BYTES;

/// Runs read at once by one merge pass.
pub const DEFAULT_MERGE_FAN_IN: usize = sort::DEFAULT_MERGE_FAN_IN;

///
/// Prelude
///
/// Prelude contains the host-facing vocabulary: values, comparators,
/// the accumulator and its config.
///

pub mod prelude {
    pub use crate::{
        compare::{Comparator, ComparatorResolver, NaturalOrder, ValueComparatorRegistry},
        error::InternalError,
        median::{MedianAccumulator, MedianAggregate},
        sort::SortConfig,
        types::Float64,
        value::{Value, ValueType},
    };
}
