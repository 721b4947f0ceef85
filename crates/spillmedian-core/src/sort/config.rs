use crate::error::InternalError;
use std::path::{Path, PathBuf};

///
/// CONSTANTS
///

/// Default sort memory budget in kilobytes.
pub const DEFAULT_WORK_MEM_KB: usize = 5000;

/// Default upper bound on one encoded run frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Default number of runs one merge pass reads at the same time.
pub const DEFAULT_MERGE_FAN_IN: usize = 64;

///
/// SortConfig
///
/// Tunables for one external sorter. The budget is fixed up front and never
/// derived from the input.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortConfig {
    memory_budget_bytes: usize,
    spill_dir: Option<PathBuf>,
    max_frame_bytes: usize,
    merge_fan_in: usize,
}

impl SortConfig {
    #[must_use]
    pub const fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    #[must_use]
    pub const fn with_work_mem_kb(self, kb: usize) -> Self {
        self.with_memory_budget(kb.saturating_mul(1024))
    }

    #[must_use]
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub const fn with_max_frame_bytes(mut self, bytes: usize) -> Self {
        self.max_frame_bytes = bytes;
        self
    }

    /// Cap on runs open at once during a merge. More runs than this are
    /// merged in intermediate passes before the final merge.
    #[must_use]
    pub const fn with_merge_fan_in(mut self, runs: usize) -> Self {
        self.merge_fan_in = runs;
        self
    }

    #[must_use]
    pub const fn memory_budget_bytes(&self) -> usize {
        self.memory_budget_bytes
    }

    #[must_use]
    pub fn spill_dir(&self) -> Option<&Path> {
        self.spill_dir.as_deref()
    }

    #[must_use]
    pub const fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    #[must_use]
    pub const fn merge_fan_in(&self) -> usize {
        self.merge_fan_in
    }

    /// Reject settings that can never sort anything.
    pub fn validate(&self) -> Result<(), InternalError> {
        if self.memory_budget_bytes == 0 {
            return Err(InternalError::config_invalid(
                "sort memory budget must be greater than zero",
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(InternalError::config_invalid(
                "max frame size must be greater than zero",
            ));
        }
        if u32::try_from(self.max_frame_bytes).is_err() {
            return Err(InternalError::config_invalid(format!(
                "max frame size {} exceeds the 32-bit frame header",
                self.max_frame_bytes
            )));
        }
        if self.merge_fan_in < 2 {
            return Err(InternalError::config_invalid(format!(
                "merge fan-in must be at least 2, got {}",
                self.merge_fan_in
            )));
        }

        Ok(())
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_WORK_MEM_KB * 1024,
            spill_dir: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            merge_fan_in: DEFAULT_MERGE_FAN_IN,
        }
    }
}
