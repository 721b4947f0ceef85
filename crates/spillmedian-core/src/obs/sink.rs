//! Where sorter and accumulator events go.
//!
//! Callers emit a `MetricsEvent` through `record`; the event lands in the
//! thread-local counters unless a host has installed its own sink with
//! `with_metrics_sink` for the current scope.
use crate::obs::metrics;
use std::{cell::RefCell, rc::Rc, time::Instant};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ValueInserted,
    NullSkipped,
    RunSpilled {
        values: u64,
        bytes: u64,
    },
    MergePass {
        runs: u64,
        values: u64,
        bytes: u64,
    },
    SortFinished {
        values: u64,
        runs: u64,
        merged: bool,
    },
    FinalizeStart,
    FinalizeFinish {
        count: u64,
        elapsed_micros: u64,
    },
    MedianSelected {
        count: u64,
        position: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into the metrics counters.
/// Acts as the concrete sink when no scoped override is installed.

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ValueInserted => {
                metrics::with_state_mut(|m| {
                    m.ops.values_inserted = m.ops.values_inserted.saturating_add(1);
                });
            }

            MetricsEvent::NullSkipped => {
                metrics::with_state_mut(|m| {
                    m.ops.nulls_skipped = m.ops.nulls_skipped.saturating_add(1);
                });
            }

            MetricsEvent::RunSpilled { values, bytes } => {
                metrics::with_state_mut(|m| {
                    m.ops.runs_spilled = m.ops.runs_spilled.saturating_add(1);
                    m.ops.values_spilled = m.ops.values_spilled.saturating_add(values);
                    m.ops.bytes_spilled = m.ops.bytes_spilled.saturating_add(bytes);
                });
            }

            MetricsEvent::MergePass { runs, bytes, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.merge_passes = m.ops.merge_passes.saturating_add(1);
                    m.ops.runs_merged = m.ops.runs_merged.saturating_add(runs);
                    m.ops.bytes_spilled = m.ops.bytes_spilled.saturating_add(bytes);
                });
            }

            MetricsEvent::SortFinished { runs, merged, .. } => {
                metrics::with_state_mut(|m| {
                    if merged {
                        m.ops.external_merges = m.ops.external_merges.saturating_add(1);
                        m.ops.runs_merged = m.ops.runs_merged.saturating_add(runs);
                    } else {
                        m.ops.in_memory_sorts = m.ops.in_memory_sorts.saturating_add(1);
                    }
                });
            }

            MetricsEvent::FinalizeStart => {
                metrics::with_state_mut(|m| {
                    m.perf.finalize_calls = m.perf.finalize_calls.saturating_add(1);
                });
            }

            MetricsEvent::FinalizeFinish {
                count,
                elapsed_micros,
            } => {
                metrics::with_state_mut(|m| {
                    if count == 0 {
                        m.ops.empty_finalizes = m.ops.empty_finalizes.saturating_add(1);
                    }
                    metrics::add_micros(
                        &mut m.perf.finalize_micros_total,
                        &mut m.perf.finalize_micros_max,
                        elapsed_micros,
                    );
                });
            }

            MetricsEvent::MedianSelected { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.medians_selected = m.ops.medians_selected.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    // Clone the override out so the slot is not borrowed while the sink runs.
    let override_sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match override_sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current thread's metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state (counters + perf).
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
/// The previous sink is restored on every exit, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// FinalizeSpan
/// RAII guard that emits start/finish events for one finalize call.
/// Ensures finish accounting happens even on early error return.

pub(crate) struct FinalizeSpan {
    start: Instant,
    count: u64,
}

impl FinalizeSpan {
    #[must_use]
    pub(crate) fn new(count: u64) -> Self {
        record(MetricsEvent::FinalizeStart);

        Self {
            start: Instant::now(),
            count,
        }
    }
}

impl Drop for FinalizeSpan {
    fn drop(&mut self) {
        let elapsed_micros = u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX);

        record(MetricsEvent::FinalizeFinish {
            count: self.count,
            elapsed_micros,
        });
    }
}

///
/// TESTS
///
