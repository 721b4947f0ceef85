use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters and simple perf totals for one thread.
///

#[derive(Clone, Debug)]
pub(crate) struct EventState {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            perf: EventPerf::default(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Accumulator input
    pub values_inserted: u64,
    pub nulls_skipped: u64,

    // Spills
    pub runs_spilled: u64,
    pub values_spilled: u64,
    pub bytes_spilled: u64,

    // Final sort
    pub in_memory_sorts: u64,
    pub external_merges: u64,
    pub merge_passes: u64,
    pub runs_merged: u64,

    // Selection
    pub medians_selected: u64,
    pub empty_finalizes: u64,
}

///
/// EventPerf
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventPerf {
    pub finalize_calls: u64,
    pub finalize_micros_total: u128,
    pub finalize_micros_max: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all event state: counters and perf.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Accumulate a duration and track a max.
pub(crate) fn add_micros(total: &mut u128, max: &mut u64, delta: u64) {
    *total = total.saturating_add(u128::from(delta));
    if delta > *max {
        *max = delta;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

///
/// EventReport
/// Point-in-time snapshot of this thread's counters.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub since_ms: u64,
}

/// Build a metrics report from in-memory counters only.
#[must_use]
pub(crate) fn report() -> EventReport {
    with_state(|state| EventReport {
        ops: state.ops.clone(),
        perf: state.perf.clone(),
        since_ms: state.since_ms,
    })
}
