use crate::{
    error::{InternalError, SortError},
    sort::{SortValue, merge::KWayMerge},
};
use std::io::Read;

///
/// SortedCursor
///
/// Read position over the sorted output, served either straight from the
/// in-memory buffer or from a streaming merge of spilled runs.
///

pub(super) struct SortedCursor<T, R> {
    source: CursorSource<T, R>,
    remaining: u64,
}

enum CursorSource<T, R> {
    Memory(std::vec::IntoIter<T>),
    Merge(KWayMerge<T, R>),
}

impl<T: SortValue, R: Read> SortedCursor<T, R> {
    pub(super) fn memory(values: Vec<T>) -> Self {
        let remaining = values.len() as u64;

        Self {
            source: CursorSource::Memory(values.into_iter()),
            remaining,
        }
    }

    pub(super) const fn merge(merge: KWayMerge<T, R>, total: u64) -> Self {
        Self {
            source: CursorSource::Merge(merge),
            remaining: total,
        }
    }

    pub(super) const fn remaining(&self) -> u64 {
        self.remaining
    }

    pub(super) fn skip(&mut self, n: u64) -> Result<(), InternalError> {
        if n > self.remaining {
            return Err(SortError::OutOfRange {
                requested: n,
                remaining: self.remaining,
            }
            .into());
        }

        match &mut self.source {
            CursorSource::Memory(values) => {
                if n > 0 {
                    let last = usize::try_from(n - 1).map_err(|_| {
                        InternalError::sort_invariant("skip count exceeds addressable memory")
                    })?;
                    values.nth(last).ok_or_else(ended_early)?;
                }
            }
            CursorSource::Merge(merge) => {
                for _ in 0..n {
                    merge.next_value()?.ok_or_else(ended_early)?;
                }
            }
        }
        self.remaining -= n;

        Ok(())
    }

    pub(super) fn next_value(&mut self) -> Result<(T, bool), InternalError> {
        if self.remaining == 0 {
            return Err(SortError::Exhausted.into());
        }

        let value = match &mut self.source {
            CursorSource::Memory(values) => values.next(),
            CursorSource::Merge(merge) => merge.next_value()?,
        }
        .ok_or_else(ended_early)?;
        self.remaining -= 1;

        Ok((value, self.remaining == 0))
    }
}

fn ended_early() -> InternalError {
    InternalError::sort_invariant("sorted sequence ended before its recorded length")
}
