use crate::{
    compare::Comparator,
    error::{InternalError, SortError},
    obs::sink::{MetricsEvent, record},
    sort::{
        SortConfig, SortValue, SortedSequence,
        codec::{RunReader, encode_frame},
        cursor::SortedCursor,
        merge::{KWayMerge, MergeSource},
        spill::{SegmentId, SpillStorage},
    },
};
use derive_more::{Add, AddAssign, Sum};
use serde::Serialize;

///
/// SortPhase
///
/// `Accepting` permits inserts; `Sorted` permits skip/next only.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortPhase {
    Accepting,
    Sorted,
}

///
/// SorterStats
///
/// Per-sorter counters, summable across groups.
///

#[derive(Add, AddAssign, Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Sum)]
pub struct SorterStats {
    pub values: u64,
    pub runs_spilled: u64,
    pub values_spilled: u64,
    pub bytes_spilled: u64,
    pub in_memory_sorts: u64,
    pub external_merges: u64,
    pub merge_passes: u64,
}

///
/// SpilledRun
///

#[derive(Clone, Copy, Debug)]
struct SpilledRun {
    segment: SegmentId,
    values: u64,
}

///
/// SortBuffer
///

struct SortBuffer<T> {
    values: Vec<T>,
    bytes: usize,
}

impl<T: SortValue> SortBuffer<T> {
    const fn new() -> Self {
        Self {
            values: Vec::new(),
            bytes: 0,
        }
    }

    fn push(&mut self, value: T) {
        self.bytes = self.bytes.saturating_add(value.footprint());
        self.values.push(value);
    }

    fn take(&mut self) -> Vec<T> {
        self.bytes = 0;
        std::mem::take(&mut self.values)
    }
}

enum SorterState<T, R> {
    Accepting(SortBuffer<T>),
    Sorted(SortedCursor<T, R>),
}

///
/// ExternalSorter
///
/// Buffers values in memory and spills the buffer as one sorted run each
/// time its footprint exceeds the configured budget. `sort` then serves all
/// values exactly once, ascending, without materializing spilled runs.
/// Duplicates are kept with full multiplicity.
///

pub struct ExternalSorter<T, S: SpillStorage> {
    comparator: Comparator<T>,
    config: SortConfig,
    storage: S,
    runs: Vec<SpilledRun>,
    state: SorterState<T, S::Reader>,
    stats: SorterStats,
}

impl<T: SortValue, S: SpillStorage> ExternalSorter<T, S> {
    /// Build a sorter over caller-supplied storage.
    pub fn new(
        comparator: Comparator<T>,
        storage: S,
        config: SortConfig,
    ) -> Result<Self, InternalError> {
        config.validate()?;

        Ok(Self {
            comparator,
            config,
            storage,
            runs: Vec::new(),
            state: SorterState::Accepting(SortBuffer::new()),
            stats: SorterStats::default(),
        })
    }

    /// Build a sorter whose storage is provisioned from the config.
    pub fn provision(comparator: Comparator<T>, config: SortConfig) -> Result<Self, InternalError> {
        config.validate()?;
        let storage = S::provision(&config)?;

        Self::new(comparator, storage, config)
    }

    #[must_use]
    pub const fn phase(&self) -> SortPhase {
        match self.state {
            SorterState::Accepting(_) => SortPhase::Accepting,
            SorterState::Sorted(_) => SortPhase::Sorted,
        }
    }

    #[must_use]
    pub const fn stats(&self) -> SorterStats {
        self.stats
    }

    #[must_use]
    pub const fn comparator(&self) -> &Comparator<T> {
        &self.comparator
    }

    /// Number of runs currently held in spill storage.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Bytes currently buffered in memory, as charged against the budget.
    #[must_use]
    pub const fn buffered_bytes(&self) -> usize {
        match &self.state {
            SorterState::Accepting(buffer) => buffer.bytes,
            SorterState::Sorted(_) => 0,
        }
    }

    /// Elements not yet consumed, once sorted.
    #[must_use]
    pub const fn remaining(&self) -> Option<u64> {
        match &self.state {
            SorterState::Accepting(_) => None,
            SorterState::Sorted(cursor) => Some(cursor.remaining()),
        }
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Buffer one value, spilling a sorted run if the budget is exceeded.
    pub fn insert(&mut self, value: T) -> Result<(), InternalError> {
        let SorterState::Accepting(buffer) = &mut self.state else {
            return Err(SortError::NotAccepting.into());
        };

        buffer.push(value);
        self.stats.values += 1;

        if buffer.bytes > self.config.memory_budget_bytes() {
            let values = buffer.take();
            self.spill_run(values)?;
        }

        Ok(())
    }

    /// Finish input and switch to sorted iteration.
    ///
    /// Without spills the buffer is sorted in place and served from memory.
    /// Otherwise runs are merged in passes of at most `merge_fan_in` until
    /// that many remain, and the residual buffer is merged with them lazily.
    pub fn sort(&mut self) -> Result<(), InternalError> {
        let SorterState::Accepting(buffer) = &mut self.state else {
            return Err(SortError::NotAccepting.into());
        };

        let mut values = buffer.take();
        self.sort_values(&mut values);

        let cursor = if self.runs.is_empty() {
            self.stats.in_memory_sorts += 1;
            record(MetricsEvent::SortFinished {
                values: self.stats.values,
                runs: 0,
                merged: false,
            });

            SortedCursor::memory(values)
        } else {
            while self.runs.len() > self.config.merge_fan_in() {
                self.merge_oldest_runs()?;
            }

            let mut sources = Vec::with_capacity(self.runs.len() + 1);
            for run in &self.runs {
                sources.push(self.open_run(*run)?);
            }
            if !values.is_empty() {
                sources.push(MergeSource::Memory(values.into_iter()));
            }

            let merge = KWayMerge::new(sources, self.comparator.clone())?;
            self.stats.external_merges += 1;
            record(MetricsEvent::SortFinished {
                values: self.stats.values,
                runs: self.runs.len() as u64,
                merged: true,
            });

            SortedCursor::merge(merge, self.stats.values)
        };

        self.state = SorterState::Sorted(cursor);

        Ok(())
    }

    fn sort_values(&self, values: &mut [T]) {
        let comparator = &self.comparator;
        values.sort_by(|left, right| comparator.compare(left, right));
    }

    fn open_run(&self, run: SpilledRun) -> Result<MergeSource<T, S::Reader>, InternalError> {
        let reader = self.storage.open(run.segment)?;

        Ok(MergeSource::Run(RunReader::new(
            reader,
            run.segment,
            run.values,
            self.config.max_frame_bytes(),
        )))
    }

    // Sort one full buffer and write it out as a new run.
    fn spill_run(&mut self, mut values: Vec<T>) -> Result<(), InternalError> {
        self.sort_values(&mut values);

        let mut values = values.into_iter();
        let (run, bytes) = self.write_run(|| Ok(values.next()))?;

        self.runs.push(run);
        self.stats.runs_spilled += 1;
        self.stats.values_spilled += run.values;
        self.stats.bytes_spilled += bytes;
        record(MetricsEvent::RunSpilled {
            values: run.values,
            bytes,
        });

        Ok(())
    }

    // Replace the oldest `merge_fan_in` runs with one run holding their
    // merged contents. The merged run takes their place at the front, so
    // equal values still come out in spill order.
    fn merge_oldest_runs(&mut self) -> Result<(), InternalError> {
        let fan_in = self.config.merge_fan_in().min(self.runs.len());
        let batch = self.runs[..fan_in].to_vec();

        let mut sources = Vec::with_capacity(fan_in);
        for run in &batch {
            sources.push(self.open_run(*run)?);
        }
        let mut merge = KWayMerge::new(sources, self.comparator.clone())?;
        let (merged, bytes) = self.write_run(|| merge.next_value())?;
        drop(merge);

        self.runs.drain(..fan_in);
        self.runs.insert(0, merged);
        self.stats.merge_passes += 1;
        self.stats.bytes_spilled += bytes;
        record(MetricsEvent::MergePass {
            runs: fan_in as u64,
            values: merged.values,
            bytes,
        });

        for run in batch {
            self.storage.delete(run.segment)?;
        }

        Ok(())
    }

    // Write every value `next` yields as one sealed run. A segment that
    // fails part way is deleted before the error is returned.
    fn write_run(
        &mut self,
        mut next: impl FnMut() -> Result<Option<T>, InternalError>,
    ) -> Result<(SpilledRun, u64), InternalError> {
        let segment = self.storage.create()?;

        match self.fill_segment(segment, &mut next) {
            Ok(written) => Ok(written),
            Err(err) => {
                let _ = self.storage.delete(segment);
                Err(err)
            }
        }
    }

    fn fill_segment(
        &mut self,
        segment: SegmentId,
        next: &mut impl FnMut() -> Result<Option<T>, InternalError>,
    ) -> Result<(SpilledRun, u64), InternalError> {
        let max_frame_bytes = self.config.max_frame_bytes();
        let mut values = 0u64;

        while let Some(value) = next()? {
            let frame = encode_frame(&value, max_frame_bytes)?;
            self.storage.append(segment, &frame)?;
            values += 1;
        }
        let bytes = self.storage.seal(segment)?;

        Ok((SpilledRun { segment, values }, bytes))
    }

    fn cursor_mut(&mut self) -> Result<&mut SortedCursor<T, S::Reader>, InternalError> {
        match &mut self.state {
            SorterState::Sorted(cursor) => Ok(cursor),
            SorterState::Accepting(_) => Err(SortError::NotSorted.into()),
        }
    }
}

impl<T: SortValue, S: SpillStorage> SortedSequence<T> for ExternalSorter<T, S> {
    fn skip(&mut self, n: u64) -> Result<(), InternalError> {
        self.cursor_mut()?.skip(n)
    }

    fn next_value(&mut self) -> Result<(T, bool), InternalError> {
        self.cursor_mut()?.next_value()
    }
}

impl<T, S: SpillStorage> Drop for ExternalSorter<T, S> {
    fn drop(&mut self) {
        // best effort: storage implementations also clean up on their own drop
        for run in self.runs.drain(..) {
            let _ = self.storage.delete(run.segment);
        }
    }
}
